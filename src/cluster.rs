use serde::{Deserialize, Serialize};
use std::fmt;

pub type ClusterId = u64;

/// One slot of a cluster template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateToken {
    Literal(String),
    Wildcard,
}

impl TemplateToken {
    #[inline]
    pub fn accepts(&self, token: &str) -> bool {
        match self {
            TemplateToken::Literal(literal) => literal == token,
            TemplateToken::Wildcard => true,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TemplateToken::Wildcard)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NewCluster,
    MatchedExisting,
    TemplateChanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeKind::NewCluster => "new_cluster",
            ChangeKind::MatchedExisting => "matched_existing",
            ChangeKind::TemplateChanged => "template_changed",
        };
        f.write_str(s)
    }
}

/// Per-message outcome handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub cluster_id: ClusterId,
    pub template: String,
    pub change_kind: ChangeKind,
    pub cluster_size: u64,
}

/// Rendered, read-only view of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: ClusterId,
    pub template: String,
    pub size: u64,
}

/// A group of messages sharing one template.
///
/// Templates only ever gain wildcards: once a slot is generalised it never
/// turns back into a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCluster {
    id: ClusterId,
    template: Vec<TemplateToken>,
    size: u64,
}

impl LogCluster {
    pub(crate) fn new(id: ClusterId, tokens: &[&str]) -> Self {
        Self {
            id,
            template: tokens
                .iter()
                .map(|t| TemplateToken::Literal((*t).to_string()))
                .collect(),
            size: 1,
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.template.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }

    pub fn tokens(&self) -> &[TemplateToken] {
        &self.template
    }

    pub fn wildcard_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.template
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_wildcard())
            .map(|(i, _)| i)
    }

    /// Count of positions where the template accepts the incoming token.
    /// Callers guarantee equal lengths; the index never pairs different ones.
    #[inline]
    pub fn matching_tokens(&self, tokens: &[&str]) -> usize {
        debug_assert_eq!(self.template.len(), tokens.len());
        self.template
            .iter()
            .zip(tokens)
            .filter(|(slot, token)| slot.accepts(token))
            .count()
    }

    /// Every literal slot equals the corresponding token.
    pub fn accepts(&self, tokens: &[&str]) -> bool {
        self.template.len() == tokens.len() && self.matching_tokens(tokens) == tokens.len()
    }

    /// Wildcard every mismatching slot and count the message.
    /// Returns whether any slot was newly wildcarded.
    pub(crate) fn absorb(&mut self, tokens: &[&str]) -> bool {
        let mut changed = false;
        for (slot, token) in self.template.iter_mut().zip(tokens) {
            if !slot.accepts(token) {
                *slot = TemplateToken::Wildcard;
                changed = true;
            }
        }
        self.size += 1;
        changed
    }

    /// Values at the wildcard positions, or `None` when the message does not
    /// fit this template.
    pub fn extract_parameters(&self, tokens: &[&str]) -> Option<Vec<String>> {
        if !self.accepts(tokens) {
            return None;
        }
        Some(
            self.template
                .iter()
                .zip(tokens)
                .filter(|(slot, _)| slot.is_wildcard())
                .map(|(_, token)| (*token).to_string())
                .collect(),
        )
    }

    /// Template tokens joined by single spaces, wildcards rendered as `wildcard`.
    ///
    /// A literal token spelled like the marker renders identically; use
    /// [`tokens`](Self::tokens) or [`wildcard_positions`](Self::wildcard_positions)
    /// to tell them apart.
    pub fn render(&self, wildcard: &str) -> String {
        let mut out = String::new();
        for (i, slot) in self.template.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match slot {
                TemplateToken::Literal(literal) => out.push_str(literal),
                TemplateToken::Wildcard => out.push_str(wildcard),
            }
        }
        out
    }

    pub fn summary(&self, wildcard: &str) -> ClusterSummary {
        ClusterSummary {
            cluster_id: self.id,
            template: self.render(wildcard),
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cluster_is_literal() {
        let cluster = LogCluster::new(7, &["user", "login", "ok"]);
        assert_eq!(cluster.id(), 7);
        assert_eq!(cluster.size(), 1);
        assert_eq!(cluster.render("<*>"), "user login ok");
        assert_eq!(cluster.wildcard_positions().count(), 0);
    }

    #[test]
    fn test_absorb_generalizes_monotonically() {
        let mut cluster = LogCluster::new(1, &["user", "alice", "ok"]);

        assert!(cluster.absorb(&["user", "bob", "ok"]));
        assert_eq!(cluster.render("<*>"), "user <*> ok");

        // a message agreeing with the old literal does not restore it
        assert!(!cluster.absorb(&["user", "alice", "ok"]));
        assert_eq!(cluster.render("<*>"), "user <*> ok");
        assert_eq!(cluster.size(), 3);
    }

    #[test]
    fn test_matching_tokens_counts_wildcards() {
        let mut cluster = LogCluster::new(1, &["a", "b", "c", "d"]);
        cluster.absorb(&["a", "x", "c", "d"]);
        assert_eq!(cluster.matching_tokens(&["a", "zzz", "c", "q"]), 3);
    }

    #[test]
    fn test_extract_parameters() {
        let mut cluster = LogCluster::new(1, &["conn", "from", "<IP>", "port", "22"]);
        cluster.absorb(&["conn", "from", "<IP>", "port", "2222"]);

        assert_eq!(
            cluster.extract_parameters(&["conn", "from", "<IP>", "port", "8080"]),
            Some(vec!["8080".to_string()])
        );
        assert_eq!(
            cluster.extract_parameters(&["drop", "from", "<IP>", "port", "8080"]),
            None
        );
        assert_eq!(cluster.extract_parameters(&["conn"]), None);
    }

    #[test]
    fn test_empty_template_renders_empty() {
        let cluster = LogCluster::new(1, &[]);
        assert!(cluster.is_empty());
        assert_eq!(cluster.render("<*>"), "");
        assert!(cluster.accepts(&[]));
    }

    #[test]
    fn test_change_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeKind::TemplateChanged).unwrap();
        assert_eq!(json, "\"template_changed\"");
        assert_eq!(ChangeKind::NewCluster.to_string(), "new_cluster");
    }

    #[test]
    fn test_literal_marker_token_is_not_a_wildcard() {
        let mut cluster = LogCluster::new(1, &["value", "<*>", "set"]);
        assert_eq!(cluster.render("<*>"), "value <*> set");
        assert_eq!(cluster.wildcard_positions().count(), 0);

        // the literal slot still requires the exact text
        assert!(!cluster.accepts(&["value", "42", "set"]));
        assert!(!cluster.absorb(&["value", "<*>", "set"]));
        assert_eq!(cluster.extract_parameters(&["value", "<*>", "set"]), Some(vec![]));
    }
}

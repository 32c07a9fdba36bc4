//! Masking of volatile substrings
//!
//! A [`Masker`] applies an ordered list of [`MaskingRule`]s to a raw log line.
//! Each rule rewrites every non-overlapping match into its placeholder and the
//! result is carried forward to the next rule, so order matters:
//! `[2024-01-02 10:00:00]` must be taken by a timestamp rule before the bare
//! `DATE` and `TIME` rules get to see it.
//!
//! Placeholders come in two flavours:
//! - `Delimited`: free-standing values (`<IP>`, `<UUID>`, ...) wrapped in the
//!   configured prefix/suffix
//! - `Literal`: placeholders that keep surrounding syntax (`[PID]`, `:NUM)`)
use crate::error::{ConfigError, ConfigResult};
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const DEFAULT_MASK_PREFIX: &str = "<";
pub const DEFAULT_MASK_SUFFIX: &str = ">";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WrapStyle {
    /// Emit `prefix + placeholder + suffix`
    #[default]
    Delimited,
    /// Emit the placeholder verbatim
    Literal,
}

/// One pattern-to-placeholder rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingRule {
    pub pattern: String,
    pub placeholder: String,
    #[serde(default)]
    pub wrap: WrapStyle,
}

impl MaskingRule {
    pub fn delimited(pattern: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            placeholder: placeholder.into(),
            wrap: WrapStyle::Delimited,
        }
    }

    pub fn literal(pattern: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            placeholder: placeholder.into(),
            wrap: WrapStyle::Literal,
        }
    }
}

/// The built-in rule catalog, in application order.
pub fn default_rules() -> Vec<MaskingRule> {
    vec![
        // IP addresses
        MaskingRule::delimited(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}", "IP"),
        // Timestamps in various formats
        MaskingRule::delimited(
            r"\[\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(\+|-)\d{2}:\d{2}\]",
            "TIMESTAMP",
        ),
        MaskingRule::delimited(r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(\.\d+)?\]", "TIMESTAMP"),
        MaskingRule::delimited(
            r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(\+|-)\d{2}:\d{2}",
            "TIMESTAMP",
        ),
        MaskingRule::delimited(
            r"\d{2}/[A-Za-z]{3}/\d{4}:\d{2}:\d{2}:\d{2} (\+|-)\d{4}",
            "TIMESTAMP",
        ),
        MaskingRule::delimited(r"[A-Z][a-z]{2} \d{1,2} \d{2}:\d{2}:\d{2}", "TIMESTAMP"),
        MaskingRule::delimited(r"\d{4}-\d{2}-\d{2}", "DATE"),
        MaskingRule::delimited(r"\d{2}:\d{2}:\d{2}(\.\d+)?", "TIME"),
        // Identifiers
        MaskingRule::delimited(
            r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
            "UUID",
        ),
        MaskingRule::delimited(r"\b[0-9a-f]{16,}\b", "HEX"),
        // Process ids
        MaskingRule::literal(r"\[\d+\]", "[PID]"),
        // Line numbers in stack traces
        MaskingRule::literal(r"line:? \d+", "line: NUM"),
        MaskingRule::literal(r":\d+\)", ":NUM)"),
        // Query parameters in URLs
        MaskingRule::literal(r#"\?[^"'<>\s]*"#, "?PARAMS"),
    ]
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    replacement: String,
}

/// Compiled, immutable rule list. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Masker {
    rules: Vec<CompiledRule>,
}

impl Masker {
    /// Compile `rules`, failing on the first invalid pattern.
    pub fn new(rules: &[MaskingRule], prefix: &str, suffix: &str) -> ConfigResult<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.pattern).map_err(|source| {
                    ConfigError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    }
                })?;
                let replacement = match rule.wrap {
                    WrapStyle::Delimited => format!("{}{}{}", prefix, rule.placeholder, suffix),
                    WrapStyle::Literal => rule.placeholder.clone(),
                };
                Ok(CompiledRule { regex, replacement })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        tracing::debug!("Built masker with {} rules", rules.len());
        Ok(Self { rules })
    }

    /// Masker over [`default_rules`] with `<`/`>` delimiters.
    pub fn with_defaults() -> ConfigResult<Self> {
        Self::new(&default_rules(), DEFAULT_MASK_PREFIX, DEFAULT_MASK_SUFFIX)
    }

    /// Apply every rule in order.
    pub fn mask(&self, raw: &str) -> String {
        let mut current = raw.to_string();
        for rule in &self.rules {
            let replaced = match rule.regex.replace_all(&current, NoExpand(&rule.replacement)) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(replaced) => replaced,
            };
            current = replaced;
        }
        current
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

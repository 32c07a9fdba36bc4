use crate::error::{ConfigError, ConfigResult};
use aho_corasick::AhoCorasick;
use smallvec::SmallVec;
use std::borrow::Cow;

/// Most log lines have well under 32 tokens, so they stay on the stack.
pub type TokenVec<'a> = SmallVec<[&'a str; 32]>;

const ADJACENT_BRACKETS: &str = "][";
const SPLIT_BRACKETS: &str = "] [";

/// Splits masked messages into tokens.
///
/// Any Unicode whitespace separates tokens, embedded newlines included.
/// Before splitting, configured extra delimiters become spaces and, when
/// enabled, bracket groups written back to back (`[svc][error]`) are pulled
/// apart into `[svc] [error]`.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    rewrites: Option<Rewrites>,
}

#[derive(Debug, Clone)]
struct Rewrites {
    matcher: AhoCorasick,
    replacements: Vec<&'static str>,
}

impl Tokenizer {
    pub fn new(extra_delimiters: &[String], split_adjacent_brackets: bool) -> ConfigResult<Self> {
        if let Some(bad) = extra_delimiters.iter().find(|d| d.is_empty()) {
            return Err(ConfigError::InvalidDelimiter(bad.clone()));
        }

        let mut patterns: Vec<&str> = extra_delimiters.iter().map(String::as_str).collect();
        let mut replacements = vec![" "; patterns.len()];
        if split_adjacent_brackets {
            patterns.push(ADJACENT_BRACKETS);
            replacements.push(SPLIT_BRACKETS);
        }
        if patterns.is_empty() {
            return Ok(Self { rewrites: None });
        }

        let matcher = AhoCorasick::new(&patterns)
            .map_err(|e| ConfigError::InvalidDelimiter(e.to_string()))?;
        Ok(Self {
            rewrites: Some(Rewrites {
                matcher,
                replacements,
            }),
        })
    }

    /// Apply the rewrites; borrows when there is nothing to replace.
    pub fn normalize<'a>(&self, masked: &'a str) -> Cow<'a, str> {
        match &self.rewrites {
            Some(r) if r.matcher.is_match(masked) => {
                Cow::Owned(r.matcher.replace_all(masked, &r.replacements))
            }
            _ => Cow::Borrowed(masked),
        }
    }

    pub fn split(text: &str) -> TokenVec<'_> {
        text.split_whitespace().collect()
    }
}

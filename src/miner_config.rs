use crate::error::{ConfigError, ConfigResult};
use crate::masking::{default_rules, MaskingRule, DEFAULT_MASK_PREFIX, DEFAULT_MASK_SUFFIX};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WILDCARD: &str = "<*>";

/// Similarity threshold kept as an exact fraction.
///
/// A candidate with `matches` equal tokens out of `len` passes when
/// `matches / len >= numerator / denominator`, evaluated by cross
/// multiplication so boundary values like 2/4 vs 1/2 compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityThreshold {
    numerator: u32,
    denominator: u32,
}

impl SimilarityThreshold {
    const F64_SCALE: u32 = 1_000_000;

    pub fn new(numerator: u32, denominator: u32) -> ConfigResult<Self> {
        if denominator == 0 || numerator > denominator {
            return Err(ConfigError::InvalidThreshold(format!(
                "{}/{}",
                numerator, denominator
            )));
        }
        let g = gcd(numerator, denominator);
        Ok(Self {
            numerator: numerator / g,
            denominator: denominator / g,
        })
    }

    /// Convert a decimal threshold, rounded to six decimal places.
    pub fn from_f64(value: f64) -> ConfigResult<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::InvalidThreshold(value.to_string()));
        }
        let numerator = (value * Self::F64_SCALE as f64).round() as u32;
        Self::new(numerator, Self::F64_SCALE)
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// `matches / len >= self`, inclusive. An empty sequence always passes.
    #[inline]
    pub fn is_met(&self, matches: usize, len: usize) -> bool {
        (matches as u128) * (self.denominator as u128) >= (self.numerator as u128) * (len as u128)
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl Default for SimilarityThreshold {
    fn default() -> Self {
        Self {
            numerator: 1,
            denominator: 2,
        }
    }
}

impl fmt::Display for SimilarityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a.max(1)
    } else {
        gcd(b, a % b)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinerConfig {
    pub masking_rules: Vec<MaskingRule>,
    pub mask_prefix: String,
    pub mask_suffix: String,
    pub similarity_threshold: SimilarityThreshold,
    /// Tree depth counting the root and the token-count level; the index
    /// keys on the first `max_depth - 2` tokens.
    pub max_depth: usize,
    /// Literal children per index node before new tokens share the wildcard branch
    pub max_children: usize,
    /// `None` keeps every cluster for the lifetime of the clusterer
    pub max_clusters: Option<usize>,
    /// Route tokens containing digits to the wildcard branch of the index
    pub parametrize_numeric_tokens: bool,
    /// Extra token separators, replaced by a space before splitting
    pub extra_delimiters: Vec<String>,
    /// Split `[a][b]` into the tokens `[a]` and `[b]`
    pub split_adjacent_brackets: bool,
    /// Rendered in place of generalised slots. Input tokens that happen to
    /// equal it stay literal and render the same way.
    pub wildcard: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            masking_rules: default_rules(),
            mask_prefix: DEFAULT_MASK_PREFIX.to_string(),
            mask_suffix: DEFAULT_MASK_SUFFIX.to_string(),
            similarity_threshold: SimilarityThreshold::default(),
            max_depth: 4,
            max_children: 100,
            max_clusters: None,
            parametrize_numeric_tokens: true,
            extra_delimiters: Vec::new(),
            split_adjacent_brackets: true,
            wildcard: DEFAULT_WILDCARD.to_string(),
        }
    }
}

impl MinerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings with an LRU-evicting cluster table
    pub fn bounded(max_clusters: usize) -> Self {
        Self {
            max_clusters: Some(max_clusters),
            ..Default::default()
        }
    }

    /// Tighter grouping: 80% of tokens must agree
    pub fn strict() -> Self {
        Self {
            similarity_threshold: SimilarityThreshold {
                numerator: 4,
                denominator: 5,
            },
            ..Default::default()
        }
    }

    pub fn with_masking_rules(mut self, rules: Vec<MaskingRule>) -> Self {
        self.masking_rules = rules;
        self
    }

    pub fn with_mask_delimiters(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.mask_prefix = prefix.into();
        self.mask_suffix = suffix.into();
        self
    }

    pub fn with_threshold(mut self, threshold: SimilarityThreshold) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    pub fn with_max_clusters(mut self, max_clusters: Option<usize>) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn with_numeric_parametrization(mut self, enabled: bool) -> Self {
        self.parametrize_numeric_tokens = enabled;
        self
    }

    pub fn with_extra_delimiters(mut self, delimiters: Vec<String>) -> Self {
        self.extra_delimiters = delimiters;
        self
    }

    pub fn with_bracket_splitting(mut self, enabled: bool) -> Self {
        self.split_adjacent_brackets = enabled;
        self
    }

    pub fn with_wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.wildcard = wildcard.into();
        self
    }

    /// Number of leading tokens the prefix index keys on.
    pub fn prefix_tokens(&self) -> usize {
        self.max_depth.saturating_sub(2)
    }

    /// Check every clustering parameter. Masking patterns are checked when
    /// the masker compiles them.
    pub fn validate(&self) -> ConfigResult<()> {
        let t = self.similarity_threshold;
        if t.denominator == 0 || t.numerator > t.denominator {
            return Err(ConfigError::InvalidThreshold(t.to_string()));
        }
        if self.max_depth < 3 {
            return Err(ConfigError::InvalidDepth(self.max_depth));
        }
        if self.max_children == 0 {
            return Err(ConfigError::InvalidMaxChildren(self.max_children));
        }
        if let Some(0) = self.max_clusters {
            return Err(ConfigError::InvalidCapacity(0));
        }
        if let Some(bad) = self.extra_delimiters.iter().find(|d| d.is_empty()) {
            return Err(ConfigError::InvalidDelimiter(bad.clone()));
        }
        if self.wildcard.is_empty() || self.wildcard.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidWildcard(self.wildcard.clone()));
        }
        Ok(())
    }
}

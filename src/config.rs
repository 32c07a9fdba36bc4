use anyhow::{Context, Result};
use log_template_miner::error::ConfigError;
use log_template_miner::masking::MaskingRule;
use log_template_miner::miner_config::{MinerConfig, SimilarityThreshold};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub miner: MinerConfig,

    // Where the masking rules came from, for reporting
    pub rules_file: Option<PathBuf>,

    // Parallelism: 1 runs a single miner, more runs a sharded one
    pub shards: usize,
    pub batch_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut miner = MinerConfig::default();

        if let Some(threshold) = parse::<f64, _>(&lookup, "MINER_SIM_THRESHOLD")? {
            miner.similarity_threshold = SimilarityThreshold::from_f64(threshold)?;
        }
        if let Some(depth) = parse(&lookup, "MINER_MAX_DEPTH")? {
            miner.max_depth = depth;
        }
        if let Some(children) = parse(&lookup, "MINER_MAX_CHILDREN")? {
            miner.max_children = children;
        }
        if let Some(max) = parse(&lookup, "MINER_MAX_CLUSTERS")? {
            miner.max_clusters = Some(max);
        }
        if let Some(prefix) = lookup("MINER_MASK_PREFIX") {
            miner.mask_prefix = prefix;
        }
        if let Some(suffix) = lookup("MINER_MASK_SUFFIX") {
            miner.mask_suffix = suffix;
        }

        let rules_file = lookup("MINER_RULES_FILE").map(PathBuf::from);
        if let Some(path) = &rules_file {
            miner.masking_rules = load_rules(path)?;
        }

        let config = Config {
            miner,
            rules_file,
            shards: parse(&lookup, "MINER_SHARDS")?.unwrap_or(1),
            batch_size: parse(&lookup, "MINER_BATCH_SIZE")?
                .unwrap_or(DEFAULT_BATCH_SIZE)
                .max(1),
        };
        config.validate()?;
        Ok(config)
    }

    /// Miner parameters plus the binary's own settings.
    pub fn validate(&self) -> Result<()> {
        self.miner.validate()?;
        if self.shards == 0 {
            return Err(ConfigError::InvalidShardCount(self.shards).into());
        }
        Ok(())
    }

    pub fn log_config(&self) {
        let miner = &self.miner;
        tracing::info!("📋 Configuration:");
        tracing::info!(
            "   Similarity threshold: {} ({:.3})",
            miner.similarity_threshold,
            miner.similarity_threshold.as_f64()
        );
        tracing::info!(
            "   Max depth: {} (indexing {} leading tokens)",
            miner.max_depth,
            miner.prefix_tokens()
        );
        tracing::info!("   Max children: {}", miner.max_children);
        match miner.max_clusters {
            Some(max) => tracing::info!("   Max clusters: {} per shard (LRU eviction)", max),
            None => tracing::info!("   Max clusters: unbounded"),
        }
        tracing::info!(
            "   Masking rules: {}{}",
            miner.masking_rules.len(),
            self.rules_file
                .as_ref()
                .map(|p| format!(" from {}", p.display()))
                .unwrap_or_default()
        );
        tracing::info!("   Mask delimiters: {} {}", miner.mask_prefix, miner.mask_suffix);
        tracing::info!("   Shards: {}", self.shards);
        tracing::info!("   Batch size: {}", self.batch_size);
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {:?}", key, raw))
        })
        .transpose()
}

/// Read a JSON array of masking rules.
pub fn load_rules(path: &Path) -> Result<Vec<MaskingRule>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse rules file {}", path.display()))
}

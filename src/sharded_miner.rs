//! Parallel mining over independent clusterer shards
//!
//! Clusters never span token counts, so routing every message to shard
//! `token_count % shards` loses nothing: each shard sees every message that
//! could ever join its clusters, in arrival order. Shards share no state and
//! are driven in parallel with rayon; within a shard messages are processed
//! sequentially.
//!
//! Shard-local ids are interleaved into one global id space:
//! `global = (local - 1) * shards + shard + 1`.
use crate::cluster::{ClusterId, ClusterSummary, MatchResult};
use crate::error::{ConfigError, ConfigResult};
use crate::masking::Masker;
use crate::miner_config::MinerConfig;
use crate::template_clusterer::TemplateClusterer;
use crate::tokenizer::{TokenVec, Tokenizer};
use rayon::prelude::*;
use std::borrow::Cow;

pub struct ShardedMiner {
    masker: Masker,
    tokenizer: Tokenizer,
    shards: Vec<TemplateClusterer>,
}

impl ShardedMiner {
    pub fn new(config: MinerConfig, shard_count: usize) -> ConfigResult<Self> {
        if shard_count == 0 {
            return Err(ConfigError::InvalidShardCount(shard_count));
        }
        config.validate()?;
        let masker = Masker::new(&config.masking_rules, &config.mask_prefix, &config.mask_suffix)?;
        let tokenizer = Tokenizer::new(&config.extra_delimiters, config.split_adjacent_brackets)?;
        let shards = (0..shard_count)
            .map(|_| TemplateClusterer::new(config.clone()))
            .collect::<ConfigResult<Vec<_>>>()?;

        tracing::debug!("Built sharded miner with {} shards", shard_count);
        Ok(Self {
            masker,
            tokenizer,
            shards,
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn global_id(local: ClusterId, shard: usize, shards: usize) -> ClusterId {
        (local - 1) * shards as u64 + shard as u64 + 1
    }

    /// Shard index and shard-local id for a global cluster id.
    pub fn locate(&self, global: ClusterId) -> Option<(usize, ClusterId)> {
        if global == 0 {
            return None;
        }
        let n = self.shards.len() as u64;
        let zero_based = global - 1;
        Some(((zero_based % n) as usize, zero_based / n + 1))
    }

    fn globalize(mut result: MatchResult, shard: usize, shards: usize) -> MatchResult {
        result.cluster_id = Self::global_id(result.cluster_id, shard, shards);
        result
    }

    pub fn add_log_message(&mut self, raw: &str) -> MatchResult {
        let masked = self.masker.mask(raw);
        let normalized = self.tokenizer.normalize(&masked);
        let tokens = Tokenizer::split(&normalized);

        let n = self.shards.len();
        let shard = tokens.len() % n;
        let result = self.shards[shard].process_tokens(&tokens);
        Self::globalize(result, shard, n)
    }

    /// Mine a batch, masking and clustering shards in parallel.
    /// Results come back in input order and match what feeding the lines one
    /// by one through [`add_log_message`](Self::add_log_message) would give.
    pub fn add_batch(&mut self, lines: &[&str]) -> Vec<MatchResult> {
        let n = self.shards.len();
        let masker = &self.masker;
        let tokenizer = &self.tokenizer;

        let masked: Vec<String> = lines.par_iter().map(|line| masker.mask(line)).collect();
        let normalized: Vec<Cow<'_, str>> = masked.iter().map(|m| tokenizer.normalize(m)).collect();

        let mut routed: Vec<Vec<(usize, TokenVec<'_>)>> = (0..n).map(|_| Vec::new()).collect();
        for (index, text) in normalized.iter().enumerate() {
            let tokens = Tokenizer::split(text);
            routed[tokens.len() % n].push((index, tokens));
        }

        let per_shard: Vec<Vec<(usize, MatchResult)>> = self
            .shards
            .par_iter_mut()
            .zip(routed)
            .enumerate()
            .map(|(shard, (clusterer, batch))| {
                batch
                    .into_iter()
                    .map(|(index, tokens)| {
                        let result = clusterer.process_tokens(&tokens);
                        (index, Self::globalize(result, shard, n))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut ordered: Vec<Option<MatchResult>> = vec![None; lines.len()];
        for (index, result) in per_shard.into_iter().flatten() {
            ordered[index] = Some(result);
        }
        ordered.into_iter().flatten().collect()
    }

    pub fn extract_parameters(&self, cluster_id: ClusterId, raw: &str) -> Option<Vec<String>> {
        let (shard, local) = self.locate(cluster_id)?;
        let masked = self.masker.mask(raw);
        self.shards.get(shard)?.extract_parameters(local, &masked)
    }

    /// Clusters of every shard with global ids, ordered by id.
    pub fn cluster_summaries(&self) -> Vec<ClusterSummary> {
        let n = self.shards.len();
        let mut summaries: Vec<ClusterSummary> = self
            .shards
            .iter()
            .enumerate()
            .flat_map(|(shard, clusterer)| {
                clusterer.clusters().into_iter().map(move |c| {
                    let mut summary = c.summary(&clusterer.config().wildcard);
                    summary.cluster_id = Self::global_id(summary.cluster_id, shard, n);
                    summary
                })
            })
            .collect();
        summaries.sort_unstable_by_key(|s| s.cluster_id);
        summaries
    }

    pub fn cluster_count(&self) -> usize {
        self.shards.iter().map(TemplateClusterer::cluster_count).sum()
    }
}

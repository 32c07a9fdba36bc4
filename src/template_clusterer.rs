//! Online template clustering
//!
//! Each masked message is tokenized, routed through the [`PrefixTree`] to a
//! small set of same-length candidates, and scored position by position.
//! The best candidate at or above the similarity threshold absorbs the
//! message (mismatching slots become wildcards); otherwise a new cluster is
//! created from the message's tokens.
//!
//! All state lives in the clusterer instance. Calls take `&mut self` and run
//! to completion, so sharing one instance across threads needs an outer lock;
//! see [`crate::sharded_miner::ShardedMiner`] for the lock-free alternative.
use crate::cluster::{ChangeKind, ClusterId, LogCluster, MatchResult};
use crate::error::ConfigResult;
use crate::miner_config::MinerConfig;
use crate::prefix_tree::PrefixTree;
use crate::tokenizer::Tokenizer;
use lru::LruCache;
use std::cmp::Reverse;
use tracing::{debug, trace};

pub struct TemplateClusterer {
    config: MinerConfig,
    tokenizer: Tokenizer,
    tree: PrefixTree,
    // Recency order is last creation or last successful match
    clusters: LruCache<ClusterId, LogCluster>,
    last_id: ClusterId,
    evicted: u64,
}

impl TemplateClusterer {
    pub fn new(config: MinerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new(&config.extra_delimiters, config.split_adjacent_brackets)?;
        let tree = PrefixTree::new(
            config.prefix_tokens(),
            config.max_children,
            config.parametrize_numeric_tokens,
        );

        Ok(Self {
            config,
            tokenizer,
            tree,
            clusters: LruCache::unbounded(),
            last_id: 0,
            evicted: 0,
        })
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Assign a masked message to a cluster, creating or generalising as needed.
    pub fn process(&mut self, masked: &str) -> MatchResult {
        let normalized = self.tokenizer.normalize(masked);
        let tokens = Tokenizer::split(&normalized);
        self.process_tokens(&tokens)
    }

    /// [`process`](Self::process) for an already tokenized message.
    pub fn process_tokens(&mut self, tokens: &[&str]) -> MatchResult {
        if let Some(id) = self.best_candidate(tokens) {
            if let Some(cluster) = self.clusters.get_mut(&id) {
                let changed = cluster.absorb(tokens);
                let template = cluster.render(&self.config.wildcard);
                if changed {
                    debug!(cluster_id = id, template = %template, "Template generalized");
                }
                return MatchResult {
                    cluster_id: id,
                    template,
                    change_kind: if changed {
                        ChangeKind::TemplateChanged
                    } else {
                        ChangeKind::MatchedExisting
                    },
                    cluster_size: cluster.size(),
                };
            }
        }

        self.create_cluster(tokens)
    }

    /// Highest-scoring candidate that clears the threshold.
    /// Ties go to the larger cluster, then to the lower id.
    fn best_candidate(&self, tokens: &[&str]) -> Option<ClusterId> {
        let mut best: Option<(usize, u64, Reverse<ClusterId>)> = None;

        for &id in self.tree.candidates(tokens) {
            let Some(cluster) = self.clusters.peek(&id) else {
                continue;
            };
            let score = (cluster.matching_tokens(tokens), cluster.size(), Reverse(id));
            trace!(cluster_id = id, matches = score.0, len = tokens.len(), "Scored candidate");
            if best.map_or(true, |b| score > b) {
                best = Some(score);
            }
        }

        let (matches, _, Reverse(id)) = best?;
        self.config
            .similarity_threshold
            .is_met(matches, tokens.len())
            .then_some(id)
    }

    fn create_cluster(&mut self, tokens: &[&str]) -> MatchResult {
        if let Some(max) = self.config.max_clusters {
            while self.clusters.len() >= max {
                let Some((victim, cluster)) = self.clusters.pop_lru() else {
                    break;
                };
                self.tree.remove(victim);
                self.evicted += 1;
                debug!(
                    cluster_id = victim,
                    size = cluster.size(),
                    "Evicted least recently matched cluster"
                );
            }
        }

        self.last_id += 1;
        let id = self.last_id;
        let cluster = LogCluster::new(id, tokens);
        let template = cluster.render(&self.config.wildcard);

        self.tree.insert(id, tokens);
        self.clusters.put(id, cluster);
        debug!(cluster_id = id, template = %template, "Created cluster");

        MatchResult {
            cluster_id: id,
            template,
            change_kind: ChangeKind::NewCluster,
            cluster_size: 1,
        }
    }

    /// Read-only lookup: the cluster whose template fully accepts the message.
    /// Does not change templates, sizes or recency.
    pub fn find_match(&self, masked: &str) -> Option<&LogCluster> {
        let normalized = self.tokenizer.normalize(masked);
        let tokens = Tokenizer::split(&normalized);

        self.tree
            .candidates(&tokens)
            .iter()
            .filter_map(|id| self.clusters.peek(id))
            .filter(|cluster| cluster.accepts(&tokens))
            .max_by_key(|cluster| (cluster.size(), Reverse(cluster.id())))
    }

    /// Values at the wildcard slots of `cluster_id` for this message.
    pub fn extract_parameters(&self, cluster_id: ClusterId, masked: &str) -> Option<Vec<String>> {
        let cluster = self.clusters.peek(&cluster_id)?;
        let normalized = self.tokenizer.normalize(masked);
        let tokens = Tokenizer::split(&normalized);
        cluster.extract_parameters(&tokens)
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&LogCluster> {
        self.clusters.peek(&id)
    }

    /// Live clusters ordered by id.
    pub fn clusters(&self) -> Vec<&LogCluster> {
        let mut clusters: Vec<&LogCluster> = self.clusters.iter().map(|(_, c)| c).collect();
        clusters.sort_unstable_by_key(|c| c.id());
        clusters
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn total_message_count(&self) -> u64 {
        self.clusters.iter().map(|(_, c)| c.size()).sum()
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }
}

/// Common interface over the single-instance and sharded miners
///
/// Callers that only feed lines and read results (the CLI, benchmarks) can
/// hold a `Box<dyn LogMiner>` and pick the implementation from configuration.
use crate::cluster::{ClusterSummary, MatchResult};

// ============================================================================
// Log Miner Trait
// ============================================================================

pub trait LogMiner: Send {
    /// Mask and cluster one raw log line
    fn add_log_message(&mut self, line: &str) -> MatchResult;

    /// Mine several lines, returning results in input order
    ///
    /// Default implementation calls `add_log_message` for each line
    fn add_batch(&mut self, lines: &[&str]) -> Vec<MatchResult> {
        lines.iter().map(|line| self.add_log_message(line)).collect()
    }

    /// Live clusters ordered by id
    fn cluster_summaries(&self) -> Vec<ClusterSummary>;

    fn cluster_count(&self) -> usize {
        self.cluster_summaries().len()
    }

    /// Get the name/identifier of this miner (for reporting)
    fn name(&self) -> &str;
}

// ============================================================================
// Implementations
// ============================================================================

impl LogMiner for crate::template_miner::TemplateMiner {
    fn add_log_message(&mut self, line: &str) -> MatchResult {
        crate::template_miner::TemplateMiner::add_log_message(self, line)
    }

    fn cluster_summaries(&self) -> Vec<ClusterSummary> {
        crate::template_miner::TemplateMiner::cluster_summaries(self)
    }

    fn cluster_count(&self) -> usize {
        self.clusterer().cluster_count()
    }

    fn name(&self) -> &str {
        "template-miner"
    }
}

impl LogMiner for crate::sharded_miner::ShardedMiner {
    fn add_log_message(&mut self, line: &str) -> MatchResult {
        crate::sharded_miner::ShardedMiner::add_log_message(self, line)
    }

    fn add_batch(&mut self, lines: &[&str]) -> Vec<MatchResult> {
        crate::sharded_miner::ShardedMiner::add_batch(self, lines)
    }

    fn cluster_summaries(&self) -> Vec<ClusterSummary> {
        crate::sharded_miner::ShardedMiner::cluster_summaries(self)
    }

    fn cluster_count(&self) -> usize {
        crate::sharded_miner::ShardedMiner::cluster_count(self)
    }

    fn name(&self) -> &str {
        "sharded-template-miner"
    }
}

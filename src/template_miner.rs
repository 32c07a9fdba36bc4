use crate::cluster::{ClusterId, ClusterSummary, LogCluster, MatchResult};
use crate::error::ConfigResult;
use crate::masking::Masker;
use crate::miner_config::MinerConfig;
use crate::template_clusterer::TemplateClusterer;

/// Raw line in, cluster assignment out: masking followed by clustering.
pub struct TemplateMiner {
    masker: Masker,
    clusterer: TemplateClusterer,
}

impl TemplateMiner {
    /// Validate `config` and compile its masking rules.
    pub fn new(config: MinerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let masker = Masker::new(&config.masking_rules, &config.mask_prefix, &config.mask_suffix)?;
        let clusterer = TemplateClusterer::new(config)?;
        Ok(Self { masker, clusterer })
    }

    pub fn with_defaults() -> ConfigResult<Self> {
        Self::new(MinerConfig::default())
    }

    pub fn mask(&self, raw: &str) -> String {
        self.masker.mask(raw)
    }

    pub fn add_log_message(&mut self, raw: &str) -> MatchResult {
        let masked = self.masker.mask(raw);
        let result = self.clusterer.process(&masked);
        tracing::trace!(masked = %masked, cluster_id = result.cluster_id, "Mined message");
        result
    }

    /// Look up the cluster a line belongs to without learning from it.
    pub fn match_log_message(&self, raw: &str) -> Option<&LogCluster> {
        let masked = self.masker.mask(raw);
        self.clusterer.find_match(&masked)
    }

    pub fn extract_parameters(&self, cluster_id: ClusterId, raw: &str) -> Option<Vec<String>> {
        let masked = self.masker.mask(raw);
        self.clusterer.extract_parameters(cluster_id, &masked)
    }

    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    pub fn clusterer(&self) -> &TemplateClusterer {
        &self.clusterer
    }

    pub fn cluster_summaries(&self) -> Vec<ClusterSummary> {
        let wildcard = &self.clusterer.config().wildcard;
        self.clusterer
            .clusters()
            .into_iter()
            .map(|c| c.summary(wildcard))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ChangeKind;

    #[test]
    fn test_masks_before_clustering() {
        let mut miner = TemplateMiner::with_defaults().unwrap();
        let first = miner.add_log_message("Connected to 10.0.0.1 on port 22");
        let second = miner.add_log_message("Connected to 10.0.0.2 on port 22");

        assert_eq!(first.template, "Connected to <IP> on port 22");
        assert_eq!(second.cluster_id, first.cluster_id);
        assert_eq!(second.change_kind, ChangeKind::MatchedExisting);
    }

    #[test]
    fn test_match_log_message_does_not_learn() {
        let mut miner = TemplateMiner::with_defaults().unwrap();
        miner.add_log_message("cache miss for key alpha");
        miner.add_log_message("cache miss for key beta");

        let found = miner.match_log_message("cache miss for key gamma");
        assert_eq!(found.map(|c| c.id()), Some(1));
        assert!(miner.match_log_message("cache hit for key gamma").is_none());
        assert_eq!(miner.clusterer().cluster_count(), 1);
    }

    #[test]
    fn test_extract_parameters_after_masking() {
        let mut miner = TemplateMiner::with_defaults().unwrap();
        miner.add_log_message("job done in 12 ms");
        miner.add_log_message("job done in 40 ms");
        assert_eq!(
            miner.extract_parameters(1, "job done in 7 ms"),
            Some(vec!["7".to_string()])
        );
    }

    #[test]
    fn test_invalid_rule_is_a_config_error() {
        let config = MinerConfig::new()
            .with_masking_rules(vec![crate::masking::MaskingRule::delimited("[", "X")]);
        assert!(TemplateMiner::new(config).is_err());
    }

    #[test]
    fn test_cluster_summaries() {
        let mut miner = TemplateMiner::with_defaults().unwrap();
        miner.add_log_message("disk full on sda");
        miner.add_log_message("disk full on sdb");
        let summaries = miner.cluster_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].template, "disk full on <*>");
        assert_eq!(summaries[0].size, 2);
    }
}

// Core modules
pub mod cluster;
pub mod error;
pub mod masking;
pub mod miner_config;
pub mod prefix_tree;
pub mod template_clusterer;
pub mod tokenizer;

// Pipelines built on the core
pub mod sharded_miner;
pub mod template_miner;
pub mod traits;

pub use cluster::{ChangeKind, ClusterId, ClusterSummary, LogCluster, MatchResult};
pub use error::ConfigError;
pub use masking::{Masker, MaskingRule, WrapStyle};
pub use miner_config::{MinerConfig, SimilarityThreshold};
pub use sharded_miner::ShardedMiner;
pub use template_clusterer::TemplateClusterer;
pub use template_miner::TemplateMiner;
pub use traits::LogMiner;

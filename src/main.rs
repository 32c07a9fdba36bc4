mod config;

use anyhow::{Context, Result};
use clap::Parser;
use log_template_miner::cluster::{ChangeKind, MatchResult};
use log_template_miner::miner_config::SimilarityThreshold;
use log_template_miner::{LogMiner, ShardedMiner, TemplateMiner};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

/// Group log lines into templates, one JSON record per input line
#[derive(Debug, Parser)]
#[command(name = "log-miner", version)]
struct Cli {
    /// Input file, one log message per line (defaults to stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Similarity threshold in [0, 1]
    #[arg(long)]
    threshold: Option<f64>,

    /// Prefix tree depth (root and length levels included)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Evict least recently matched clusters beyond this many per shard
    #[arg(long)]
    max_clusters: Option<usize>,

    /// JSON file with the masking rule list
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Number of independent shards mined in parallel
    #[arg(long)]
    shards: Option<usize>,

    /// Print the final cluster table after the records
    #[arg(long)]
    summary: bool,
}

#[derive(Debug, Default)]
struct RunStats {
    lines: u64,
    new_clusters: u64,
    matched: u64,
    changed: u64,
}

impl RunStats {
    fn record(&mut self, result: &MatchResult) {
        self.lines += 1;
        match result.change_kind {
            ChangeKind::NewCluster => self.new_clusters += 1,
            ChangeKind::MatchedExisting => self.matched += 1,
            ChangeKind::TemplateChanged => self.changed += 1,
        }
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(threshold) = cli.threshold {
        config.miner.similarity_threshold = SimilarityThreshold::from_f64(threshold)?;
    }
    if let Some(depth) = cli.max_depth {
        config.miner.max_depth = depth;
    }
    if let Some(max) = cli.max_clusters {
        config.miner.max_clusters = Some(max);
    }
    if let Some(path) = &cli.rules {
        config.miner.masking_rules = config::load_rules(path)?;
        config.rules_file = Some(path.clone());
    }
    if let Some(shards) = cli.shards {
        config.shards = shards;
    }
    config.validate()?;
    Ok(())
}

fn flush_batch<W: Write>(
    miner: &mut dyn LogMiner,
    batch: &mut Vec<String>,
    out: &mut W,
    stats: &mut RunStats,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    let lines: Vec<&str> = batch.iter().map(String::as_str).collect();
    for result in miner.add_batch(&lines) {
        stats.record(&result);
        serde_json::to_writer(&mut *out, &result).context("failed to write record")?;
        out.write_all(b"\n")?;
    }
    batch.clear();
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays line-delimited JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid environment configuration")?;
    apply_overrides(&mut config, &cli).context("invalid command line configuration")?;
    config.log_config();

    let mut miner: Box<dyn LogMiner> = if config.shards > 1 {
        Box::new(ShardedMiner::new(config.miner.clone(), config.shards)?)
    } else {
        Box::new(TemplateMiner::new(config.miner.clone())?)
    };
    info!("🚀 {} ready", miner.name());

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let started = Instant::now();
    let mut stats = RunStats::default();
    let mut batch = Vec::with_capacity(config.batch_size);

    for line in reader.lines() {
        batch.push(line.context("failed to read input")?);
        if batch.len() >= config.batch_size {
            flush_batch(miner.as_mut(), &mut batch, &mut out, &mut stats)?;
        }
    }
    flush_batch(miner.as_mut(), &mut batch, &mut out, &mut stats)?;

    if cli.summary {
        serde_json::to_writer_pretty(&mut out, &miner.cluster_summaries())
            .context("failed to write summary")?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    let elapsed = started.elapsed();
    info!("✅ Processed {} lines in {:.2?}", stats.lines, elapsed);
    info!(
        "   New clusters: {}, matched: {}, template changes: {}",
        stats.new_clusters, stats.matched, stats.changed
    );
    info!("   Live clusters: {}", miner.cluster_count());

    Ok(())
}

use log_template_miner::{LogMiner, MinerConfig, ShardedMiner, TemplateMiner};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn generate_lines(seed: u64, count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let levels = ["INFO", "WARN", "ERROR"];
    let hosts = ["web-1", "web-2", "db-1"];

    (0..count)
        .map(|_| {
            let level = levels[rng.gen_range(0..levels.len())];
            match rng.gen_range(0..5) {
                0 => format!("{} connection from {} accepted", level, hosts[rng.gen_range(0..hosts.len())]),
                1 => format!(
                    "{} request {} took {} ms on {}",
                    level,
                    rng.gen_range(1..100_000),
                    rng.gen_range(1..2_000),
                    hosts[rng.gen_range(0..hosts.len())]
                ),
                2 => format!("{} pool size {}", level, rng.gen_range(1..64)),
                3 => format!(
                    "{} session {:08x}-{:04x}-{:04x}-{:04x}-{:012x} expired",
                    level,
                    rng.gen::<u32>(),
                    rng.gen::<u16>(),
                    rng.gen::<u16>(),
                    rng.gen::<u16>(),
                    rng.gen::<u64>() & 0xffff_ffff_ffff
                ),
                _ => format!("{} shutdown requested", level),
            }
        })
        .collect()
}

#[test]
fn test_sharded_agrees_with_single_miner() {
    let lines = generate_lines(1234, 4_000);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let mut single = TemplateMiner::with_defaults().unwrap();
    let mut sharded = ShardedMiner::new(MinerConfig::default(), 4).unwrap();

    let expected: Vec<_> = refs.iter().map(|l| single.add_log_message(l)).collect();
    let mut actual = Vec::with_capacity(refs.len());
    for chunk in refs.chunks(500) {
        actual.extend(sharded.add_batch(chunk));
    }
    assert_eq!(actual.len(), expected.len());

    // ids differ between the two id spaces but must map one to one
    let mut forward: HashMap<u64, u64> = HashMap::new();
    let mut backward: HashMap<u64, u64> = HashMap::new();
    for (e, a) in expected.iter().zip(&actual) {
        assert_eq!(e.template, a.template);
        assert_eq!(e.change_kind, a.change_kind);
        assert_eq!(e.cluster_size, a.cluster_size);
        assert_eq!(*forward.entry(e.cluster_id).or_insert(a.cluster_id), a.cluster_id);
        assert_eq!(*backward.entry(a.cluster_id).or_insert(e.cluster_id), e.cluster_id);
    }

    assert_eq!(single.cluster_summaries().len(), sharded.cluster_count());
    println!("{} clusters over {} lines", sharded.cluster_count(), lines.len());
}

#[test]
fn test_one_shard_keeps_single_miner_ids() {
    let lines = generate_lines(99, 1_000);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let mut single = TemplateMiner::with_defaults().unwrap();
    let mut sharded = ShardedMiner::new(MinerConfig::default(), 1).unwrap();

    assert_eq!(single.add_batch(&refs), sharded.add_batch(&refs));
    assert_eq!(single.cluster_summaries(), sharded.cluster_summaries());
}

#[test]
fn test_batches_and_single_calls_interleave() {
    let lines = generate_lines(5, 600);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();

    let mut mixed = ShardedMiner::new(MinerConfig::default(), 3).unwrap();
    let mut batched = ShardedMiner::new(MinerConfig::default(), 3).unwrap();

    let mut from_mixed = mixed.add_batch(&refs[..200]);
    from_mixed.extend(refs[200..400].iter().map(|l| mixed.add_log_message(l)));
    from_mixed.extend(mixed.add_batch(&refs[400..]));

    assert_eq!(from_mixed, batched.add_batch(&refs));
}

#[test]
fn test_dyn_log_miner_reports_names() {
    let miners: Vec<Box<dyn LogMiner>> = vec![
        Box::new(TemplateMiner::with_defaults().unwrap()),
        Box::new(ShardedMiner::new(MinerConfig::default(), 2).unwrap()),
    ];
    let names: Vec<&str> = miners.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["template-miner", "sharded-template-miner"]);
}

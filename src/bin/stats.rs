use kgcrawl::cache::{CacheOptions, GraphCache};
use kgcrawl::Config;

/// Percentile of an ascending-sorted slice
fn percentile(sorted_values: &[usize], p: f64) -> usize {
    if sorted_values.is_empty() {
        return 0;
    }
    let index = ((sorted_values.len() - 1) as f64 * p).ceil() as usize;
    sorted_values[index.min(sorted_values.len() - 1)]
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::load()?;
    let cache = GraphCache::open(config.cache_path(), CacheOptions::from(&config.cache));
    let entries = cache.snapshot();

    println!("\n=== kgcrawl Graph Cache Statistics ===\n");
    println!("Document: {}", config.cache_path().display());

    if entries.is_empty() {
        println!("The cache is empty.");
        println!("\nRun `kgcrawl crawl <resource>` to populate it.");
        return Ok(());
    }

    let mut node_counts: Vec<usize> = entries.iter().map(|(_, e)| e.graph.len()).collect();
    node_counts.sort_unstable();
    let total_nodes: usize = node_counts.iter().sum();
    let total_links: usize = entries.iter().map(|(_, e)| e.graph.link_count()).sum();
    let labelled = entries
        .iter()
        .filter(|(id, e)| e.graph.get(id).is_some_and(|n| n.has_label()))
        .count();

    println!("{:-<60}", "");
    println!("{:<30} {:>12}", "Cached resources", entries.len());
    println!("{:<30} {:>12}", "  with a label", labelled);
    println!("{:<30} {:>12}", "Nodes (all entries)", total_nodes);
    println!("{:<30} {:>12}", "Links (all entries)", total_links);
    println!("{:<30} {:>12}", "Nodes per entry (p50)", percentile(&node_counts, 0.50));
    println!("{:<30} {:>12}", "Nodes per entry (p95)", percentile(&node_counts, 0.95));
    println!("{:<30} {:>12}", "Nodes per entry (max)", percentile(&node_counts, 1.0));
    println!("{:-<60}", "");

    let oldest = entries.iter().min_by_key(|(_, e)| e.fetched_at);
    let newest = entries.iter().max_by_key(|(_, e)| e.fetched_at);
    if let (Some((old_id, old)), Some((new_id, new))) = (oldest, newest) {
        println!("Oldest entry: {} ({})", old.fetched_at.to_rfc3339(), old_id);
        println!("Newest entry: {} ({})", new.fetched_at.to_rfc3339(), new_id);
    }

    if let Some(ttl) = config.cache.ttl() {
        let stale = entries.iter().filter(|(_, e)| e.is_older_than(ttl)).count();
        println!("Stale entries (older than {:?}): {}", ttl, stale);
    }

    Ok(())
}

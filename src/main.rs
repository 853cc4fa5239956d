use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kgcrawl::cache::{CacheOptions, FlushPolicy, GraphCache};
use kgcrawl::{Config, Crawler, CrawlerOptions, SparqlClient};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kgcrawl")]
#[command(about = "Crawl a knowledge graph around a resource, with a persistent graph cache")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search resources by label
    Search {
        /// Case-insensitive search term
        term: String,
    },
    /// Crawl the graph around a resource and print it as JSON
    Crawl {
        /// Resource identifier (IRI)
        resource: String,

        /// Expansion depth (1 = the resource's own graph only)
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        depth: Option<u64>,

        /// Maximum nodes kept per resource graph
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

/// Wire the cache, SPARQL client and crawler from configuration.
fn build_crawler(config: &Config) -> Result<Arc<Crawler>> {
    let cache = Arc::new(GraphCache::open(
        config.cache_path(),
        CacheOptions::from(&config.cache),
    ));

    if config.cache.flush_policy == FlushPolicy::Interval {
        cache.spawn_flusher(config.cache.flush_interval());
    }

    let client = SparqlClient::new(
        &config.endpoint,
        &config.crawler.label_predicate,
        &config.crawler.language,
    )
        .context("Failed to create SPARQL client")?;
    log::info!("Endpoint: {}", client.endpoint());

    Ok(Arc::new(Crawler::new(
        Arc::new(client),
        cache,
        CrawlerOptions::from(&config.crawler),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load()?;

    // Logs go to stderr; stdout carries the JSON output
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.log_level.as_str()),
    )
    .init();

    let crawler = build_crawler(&config)?;

    match args.command {
        Command::Search { term } => {
            let hits = crawler.search(&term).await;
            if hits.is_empty() {
                log::warn!("No resources matched '{}'", term);
            }
            for hit in &hits {
                println!("{}", serde_json::to_string(hit)?);
            }
        }
        Command::Crawl {
            resource,
            depth,
            limit,
            pretty,
        } => {
            let depth = depth.map_or(config.crawler.default_depth, |d| d as usize);
            let limit = limit.map_or(config.crawler.default_limit, |l| l as usize);

            let graph = crawler.get(&resource, depth, limit).await;

            let json = if pretty {
                serde_json::to_string_pretty(&graph)?
            } else {
                serde_json::to_string(&graph)?
            };
            println!("{}", json);
        }
    }

    crawler
        .cache()
        .flush_if_dirty()
        .with_context(|| format!("Failed to write {}", config.cache_path().display()))?;

    Ok(())
}

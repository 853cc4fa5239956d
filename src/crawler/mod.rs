//! Depth-bounded crawler over the query endpoint.
//!
//! A request for `(resource, depth, limit)` resolves the resource's unlimited
//! graph (cache first, endpoint second), projects it to `limit` nodes, and for
//! `depth > 1` crawls every node of that projection one level shallower,
//! merging each finished branch back into the composite.

mod state;

use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{FlushPolicy, GraphCache};
use crate::config::CrawlerConfig;
use crate::graph::{GraphBuilder, KnowledgeGraph};
use crate::query::{QueryClient, SearchHit};
use state::CrawlState;

/// Tunables for [`Crawler`].
#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    /// Upper bound on concurrent describe calls, shared by all crawls.
    pub max_concurrent_fetches: usize,
    pub builder: GraphBuilder,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 16,
            builder: GraphBuilder::default(),
        }
    }
}

impl From<&CrawlerConfig> for CrawlerOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrent_fetches: config.max_concurrent_fetches,
            builder: GraphBuilder::new(config.label_predicate.clone(), config.language.clone()),
        }
    }
}

pub struct Crawler {
    client: Arc<dyn QueryClient>,
    cache: Arc<GraphCache>,
    builder: GraphBuilder,
    fetch_permits: Semaphore,
}

impl Crawler {
    /// Create a crawler over `client`, caching resource graphs in `cache`
    ///
    /// # Arguments
    ///
    /// * `client` - Query client used for search and describe
    /// * `cache` - Graph cache shared with other crawlers and the flusher
    /// * `options` - Fetch concurrency bound and graph builder settings
    pub fn new(client: Arc<dyn QueryClient>, cache: Arc<GraphCache>, options: CrawlerOptions) -> Self {
        Self {
            client,
            cache,
            builder: options.builder,
            fetch_permits: Semaphore::new(options.max_concurrent_fetches.max(1)),
        }
    }

    /// The graph cache backing this crawler
    pub fn cache(&self) -> &Arc<GraphCache> {
        &self.cache
    }

    /// Keyword search, passed straight to the query client.
    pub async fn search(&self, term: &str) -> Vec<SearchHit> {
        self.client.search(term).await
    }

    /// Graph rooted at `resource`, expanded to `depth` levels, with every
    /// per-resource graph projected to at most `limit` nodes.
    ///
    /// # Arguments
    ///
    /// * `resource` - Root resource identifier
    /// * `depth` - Expansion levels, 1 returns the resource's own graph
    /// * `limit` - Maximum nodes kept from each resource graph
    ///
    /// # Returns
    ///
    /// The merged graph. It always contains `resource` and has no dangling links.
    ///
    /// Never fails: unreachable resources degrade to bare nodes and failed
    /// branches are left out. `depth` and `limit` below 1 are treated as 1.
    pub async fn get(self: &Arc<Self>, resource: &str, depth: usize, limit: usize) -> KnowledgeGraph {
        if depth == 0 || limit == 0 {
            log::warn!(
                "Clamping depth={} limit={} to at least 1 for {}",
                depth,
                limit,
                resource
            );
        }
        let depth = depth.max(1);
        let limit = limit.max(1);

        let start = std::time::Instant::now();
        log::info!("Crawling {} (depth {}, limit {})", resource, depth, limit);

        let state = Arc::new(CrawlState::new(resource, depth));
        let crawl = Arc::clone(self).crawl(resource.to_string(), depth, limit, Arc::clone(&state));

        let graph = match tokio::spawn(crawl).await {
            Ok(graph) => graph,
            Err(e) => {
                log::warn!("Crawl of {} failed: {}", resource, e);
                KnowledgeGraph::placeholder(resource)
            }
        };

        if self.cache.flush_policy() == FlushPolicy::AfterRequest {
            if let Err(e) = self.cache.flush_if_dirty() {
                log::warn!("Failed to persist graph cache: {}", e);
            }
        }

        log::info!(
            "Graph load finished for {}: {} nodes, {} links, {} resources requested in {:?}",
            resource,
            graph.len(),
            graph.link_count(),
            state.requested_count(),
            start.elapsed()
        );
        graph
    }

    /// Unlimited graph for one resource, from the cache or the endpoint.
    /// `None` if the endpoint returned nothing; failures are not cached.
    async fn resource_graph(&self, resource: &str) -> Option<Arc<KnowledgeGraph>> {
        if let Some(graph) = self.cache.get(resource) {
            log::debug!("Cache hit for {}", resource);
            return Some(graph);
        }

        let triples = {
            let _permit = match self.fetch_permits.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    log::warn!("Fetch limiter closed, skipping {}: {}", resource, e);
                    return None;
                }
            };
            self.client.describe(resource).await
        };

        if triples.is_empty() {
            log::debug!("No triples for {}", resource);
            return None;
        }

        let graph = self.builder.build(&triples, None);
        if !graph.contains(resource) {
            log::debug!("Triples for {} do not describe it, not caching", resource);
            return None;
        }
        log::debug!("Fetched {}: {} triples, {} nodes", resource, triples.len(), graph.len());
        Some(self.cache.put(resource, graph))
    }

    fn crawl(
        self: Arc<Self>,
        resource: String,
        depth: usize,
        limit: usize,
        state: Arc<CrawlState>,
    ) -> BoxFuture<'static, KnowledgeGraph> {
        Box::pin(async move {
            let unlimited = match self.resource_graph(&resource).await {
                Some(graph) => graph,
                None => return KnowledgeGraph::placeholder(&resource),
            };

            let mut composite = unlimited.project(limit);
            if depth <= 1 {
                return composite;
            }

            let remaining = depth - 1;
            let pending: Vec<String> = composite
                .node_ids()
                .filter(|id| state.claim(id, remaining))
                .map(str::to_string)
                .collect();

            log::debug!(
                "Expanding {}: {} of {} nodes at depth {}",
                resource,
                pending.len(),
                composite.len(),
                remaining
            );

            let mut branches = JoinSet::new();
            for id in pending {
                let branch = Arc::clone(&self).crawl(id, remaining, limit, Arc::clone(&state));
                branches.spawn(branch);
            }

            while let Some(joined) = branches.join_next().await {
                match joined {
                    Ok(subgraph) => composite.merge(&subgraph),
                    Err(e) => log::warn!("Dropped a subgraph branch below {}: {}", resource, e),
                }
            }

            composite
        })
    }
}

pub mod cache;
pub mod config;
pub mod crawler;
pub mod error;
pub mod graph;
pub mod query;

pub use cache::{FlushPolicy, GraphCache};
pub use config::Config;
pub use crawler::{Crawler, CrawlerOptions};
pub use error::{KgcrawlError, Result};
pub use graph::{GraphBuilder, KnowledgeGraph, Node, Term, Triple};
pub use query::{QueryClient, SearchHit, SparqlClient};

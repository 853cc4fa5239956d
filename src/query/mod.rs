//! Remote query endpoint access.
//!
//! The crawler only talks to the endpoint through [`QueryClient`], whose
//! operations never fail: errors and timeouts are logged by the implementation
//! and surface as empty results.

mod sparql;

pub use sparql::SparqlClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::Triple;

/// One keyword search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub resource: String,
    pub label: String,
}

#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Case-insensitive label search. Empty on any failure.
    async fn search(&self, term: &str) -> Vec<SearchHit>;

    /// All triples with `resource` as subject. Empty on timeout or failure.
    async fn describe(&self, resource: &str) -> Vec<Triple>;
}

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use super::{QueryClient, SearchHit};
use crate::config::EndpointConfig;
use crate::error::{KgcrawlError, Result};
use crate::graph::{Term, Triple};

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Characters that may not appear inside an IRI reference in a SPARQL query.
const IRI_FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '^', '`', '\\'];

/// SELECT response in the W3C SPARQL 1.1 JSON results format.
#[derive(Deserialize)]
struct SelectResponse {
    results: SelectResults,
}

#[derive(Deserialize)]
struct SelectResults {
    bindings: Vec<HashMap<String, BindingValue>>,
}

/// A single bound RDF term.
#[derive(Deserialize)]
struct BindingValue {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    language: Option<String>,
    datatype: Option<String>,
}

impl BindingValue {
    fn into_term(self) -> Option<Term> {
        match self.kind.as_str() {
            "uri" => Some(Term::Resource { value: self.value }),
            "bnode" => Some(Term::blank(self.value)),
            "literal" | "typed-literal" => Some(Term::Literal {
                value: self.value,
                language: self.language,
                datatype: self.datatype,
            }),
            other => {
                log::debug!("Skipping binding of unknown type '{}'", other);
                None
            }
        }
    }
}

/// Escape a value for use inside a double-quoted SPARQL string literal.
fn escape_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// Escape XPath regex metacharacters so the term is matched literally.
fn escape_regex(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(
            c,
            '\\' | '|' | '.' | '-' | '^' | '?' | '*' | '+' | '{' | '}' | '(' | ')' | '[' | ']' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn search_query(term: &str, label_predicate: &str, language: &str, limit: usize) -> String {
    format!(
        "SELECT DISTINCT ?resource ?label WHERE {{\n  \
           ?resource <{label}> ?label .\n  \
           FILTER(regex(?label, \"{pattern}\", \"i\") && langMatches(lang(?label), \"{lang}\"))\n\
         }}\n\
         LIMIT {limit}",
        label = label_predicate,
        pattern = escape_string_literal(&escape_regex(term)),
        lang = escape_string_literal(language),
        limit = limit,
    )
}

/// Reject identifiers that cannot be written as `<iri>` in a query.
fn validate_iri(resource: &str) -> Result<()> {
    if resource.chars().any(|c| c.is_whitespace() || IRI_FORBIDDEN.contains(&c)) {
        return Err(KgcrawlError::InvalidInput(format!(
            "'{}' contains characters not allowed in an IRI",
            resource
        )));
    }
    Url::parse(resource)
        .map_err(|e| KgcrawlError::InvalidInput(format!("'{}' is not an absolute IRI: {}", resource, e)))?;
    Ok(())
}

fn describe_query(resource: &str, limit: usize) -> Result<String> {
    validate_iri(resource)?;
    Ok(format!(
        "SELECT ?p ?o WHERE {{ <{}> ?p ?o }} LIMIT {}",
        resource, limit
    ))
}

/// [`QueryClient`] backed by a SPARQL 1.1 protocol endpoint.
pub struct SparqlClient {
    client: Client,
    endpoint: Url,
    label_predicate: String,
    language: String,
    search_limit: usize,
    describe_limit: usize,
    describe_timeout: Duration,
}

impl SparqlClient {
    /// Create a client for the endpoint described by `config`.
    ///
    /// # Arguments
    /// * `config` - Endpoint url, limits and timeouts
    /// * `label_predicate` - Predicate IRI that search matches labels through
    /// * `language` - Search only matches labels tagged with this language
    ///
    /// # Returns
    /// The client, or a config error if the url or predicate is not an IRI
    pub fn new(config: &EndpointConfig, label_predicate: &str, language: &str) -> Result<Self> {
        let endpoint = Url::parse(&config.url)
            .map_err(|e| KgcrawlError::Config(format!("Invalid endpoint url '{}': {}", config.url, e)))?;
        validate_iri(label_predicate).map_err(|e| {
            KgcrawlError::Config(format!("Invalid label predicate: {}", e))
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint,
            label_predicate: label_predicate.to_string(),
            language: language.to_string(),
            search_limit: config.search_limit,
            describe_limit: config.describe_limit,
            describe_timeout: config.describe_timeout(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run a SELECT query and return its bindings.
    async fn select(&self, query: &str) -> Result<Vec<HashMap<String, BindingValue>>> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("query", query)])
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            let body: String = body.chars().take(200).collect();
            return Err(KgcrawlError::Query(format!(
                "Endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: SelectResponse = response
            .json()
            .await
            .map_err(|e| KgcrawlError::Query(format!("Failed to parse response: {}", e)))?;

        log::debug!(
            "SELECT returned {} bindings in {:?}",
            parsed.results.bindings.len(),
            start.elapsed()
        );
        Ok(parsed.results.bindings)
    }

    /// Label search that reports failures instead of swallowing them.
    pub async fn try_search(&self, term: &str) -> Result<Vec<SearchHit>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(KgcrawlError::InvalidInput("Search term cannot be empty".to_string()));
        }

        let query = search_query(term, &self.label_predicate, &self.language, self.search_limit);
        let bindings = self.select(&query).await?;

        Ok(bindings
            .into_iter()
            .filter_map(|mut row| {
                let resource = row.remove("resource")?;
                let label = row.remove("label")?;
                Some(SearchHit {
                    resource: resource.value,
                    label: label.value,
                })
            })
            .collect())
    }

    /// Describe that reports failures instead of swallowing them.
    pub async fn try_describe(&self, resource: &str) -> Result<Vec<Triple>> {
        let query = describe_query(resource, self.describe_limit)?;

        let bindings = tokio::time::timeout(self.describe_timeout, self.select(&query))
            .await
            .map_err(|_| KgcrawlError::Timeout(self.describe_timeout))??;

        Ok(bindings
            .into_iter()
            .filter_map(|mut row| {
                let predicate = row.remove("p")?;
                if predicate.kind != "uri" {
                    return None;
                }
                let object = row.remove("o")?.into_term()?;
                Some(Triple::new(resource, predicate.value, object))
            })
            .collect())
    }
}

#[async_trait]
impl QueryClient for SparqlClient {
    async fn search(&self, term: &str) -> Vec<SearchHit> {
        match self.try_search(term).await {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("Search for '{}' failed: {}", term, e);
                Vec::new()
            }
        }
    }

    async fn describe(&self, resource: &str) -> Vec<Triple> {
        match self.try_describe(resource).await {
            Ok(triples) => triples,
            Err(e) => {
                log::warn!("Failed to load graph for {}: {}", resource, e);
                Vec::new()
            }
        }
    }
}

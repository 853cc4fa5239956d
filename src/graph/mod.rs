//! Knowledge graph model: triples in, node/link graphs out.
//!
//! A [`KnowledgeGraph`] keeps its nodes in admission order (the order in which
//! they were first created) so that a node-count limit can be applied as a
//! simple prefix projection. Triples are classified into labels, properties and
//! links by [`GraphBuilder`].

mod builder;
mod merge;

pub use builder::{GraphBuilder, RDFS_LABEL};
pub use merge::merge_node;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Term {
    /// An IRI naming another resource.
    Resource { value: String },
    /// A blank node, kept under its `_:` label.
    BlankNode { value: String },
    /// A literal, optionally language-tagged or typed.
    Literal {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
    },
}

impl Term {
    pub fn resource(iri: impl Into<String>) -> Self {
        Term::Resource { value: iri.into() }
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::BlankNode { value: label.into() }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            language: None,
            datatype: Some(datatype.into()),
        }
    }

    /// Language tag, if this is a language-tagged literal.
    pub fn language(&self) -> Option<&str> {
        match self {
            Term::Literal { language, .. } => language.as_deref().filter(|l| !l.is_empty()),
            _ => None,
        }
    }

    /// Identifier-like form of the term (blank nodes keep their `_:` prefix).
    pub fn lexical(&self) -> String {
        match self {
            Term::Resource { value } => value.clone(),
            Term::BlankNode { value } => {
                if value.starts_with("_:") {
                    value.clone()
                } else {
                    format!("_:{}", value)
                }
            }
            Term::Literal { value, .. } => value.clone(),
        }
    }
}

/// A single (subject, predicate, object) statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

/// One resource in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Resource identifier (globally unique key).
    pub id: String,
    /// Display name; empty when the resource has no English label.
    #[serde(default)]
    pub label: String,
    /// predicate -> literal value, first value wins.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// predicate -> ordered, de-duplicated link targets.
    #[serde(default)]
    pub links: BTreeMap<String, Vec<String>>,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn has_label(&self) -> bool {
        !self.label.is_empty()
    }

    /// Add a property unless the predicate already has a value.
    /// Returns true if the value was stored.
    pub fn add_property(&mut self, predicate: &str, value: &str) -> bool {
        if self.properties.contains_key(predicate) {
            return false;
        }
        self.properties.insert(predicate.to_string(), value.to_string());
        true
    }

    /// Append a link target unless it is already present for the predicate.
    /// Returns true if the link was added.
    pub fn add_link(&mut self, predicate: &str, target: &str) -> bool {
        let targets = self.links.entry(predicate.to_string()).or_default();
        if targets.iter().any(|t| t == target) {
            return false;
        }
        targets.push(target.to_string());
        true
    }

    /// All link targets across predicates.
    pub fn link_targets(&self) -> impl Iterator<Item = &str> {
        self.links.values().flatten().map(String::as_str)
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }
}

/// Resource identifier -> node, in admission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphDocument", into = "GraphDocument")]
pub struct KnowledgeGraph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

/// Wire form of a graph: the ordered node list.
#[derive(Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    nodes: Vec<Node>,
}

impl From<GraphDocument> for KnowledgeGraph {
    fn from(doc: GraphDocument) -> Self {
        let mut graph = KnowledgeGraph::new();
        for node in doc.nodes {
            match graph.get_mut(&node.id) {
                Some(existing) => merge_node(existing, &node),
                None => {
                    graph.insert_if_absent(node);
                }
            }
        }
        graph
    }
}

impl From<KnowledgeGraph> for GraphDocument {
    fn from(graph: KnowledgeGraph) -> Self {
        GraphDocument { nodes: graph.nodes }
    }
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph holding a single bare node, used when a resource could not be fetched.
    pub fn placeholder(id: &str) -> Self {
        let mut graph = Self::new();
        graph.insert_if_absent(Node::new(id));
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => None,
        }
    }

    /// Nodes in admission order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(Node::link_count).sum()
    }

    /// Insert `node` unless a node with the same id exists. Returns true on insert.
    pub fn insert_if_absent(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Existing node for `id`, or a freshly admitted empty one.
    pub fn get_or_insert(&mut self, id: &str) -> &mut Node {
        let i = match self.index.get(id) {
            Some(&i) => i,
            None => {
                self.index.insert(id.to_string(), self.nodes.len());
                self.nodes.push(Node::new(id));
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[i]
    }

    /// Keep the first `limit` admitted nodes and drop every link whose target
    /// did not survive. Predicates left without targets are removed.
    pub fn project(&self, limit: usize) -> KnowledgeGraph {
        let kept: HashSet<&str> = self.nodes.iter().take(limit).map(|n| n.id.as_str()).collect();

        let mut projected = KnowledgeGraph::new();
        for node in self.nodes.iter().take(limit) {
            let mut node = node.clone();
            node.links.retain(|_, targets| {
                targets.retain(|t| kept.contains(t.as_str()));
                !targets.is_empty()
            });
            projected.insert_if_absent(node);
        }
        projected
    }

    /// Every link target that has no node entry. Empty for graphs produced by
    /// [`GraphBuilder`] and by [`KnowledgeGraph::project`].
    pub fn dangling_links(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|n| n.link_targets().map(move |t| (n.id.as_str(), t)))
            .filter(|(_, t)| !self.contains(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new();
        g.get_or_insert("a").add_link("knows", "b");
        g.get_or_insert("b").add_link("knows", "c");
        g.get_or_insert("c").add_link("knows", "a");
        g
    }

    #[test]
    fn test_placeholder_has_single_bare_node() {
        let g = KnowledgeGraph::placeholder("X");
        assert_eq!(g.len(), 1);
        let node = g.get("X").unwrap();
        assert_eq!(node.label, "");
        assert!(node.properties.is_empty());
        assert!(node.links.is_empty());
    }

    #[test]
    fn test_admission_order_preserved() {
        let g = chain();
        let ids: Vec<_> = g.node_ids().collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_link_dedupes() {
        let mut node = Node::new("a");
        assert!(node.add_link("p", "b"));
        assert!(!node.add_link("p", "b"));
        assert!(node.add_link("q", "b"));
        assert_eq!(node.link_count(), 2);
    }

    #[test]
    fn test_add_property_first_wins() {
        let mut node = Node::new("a");
        assert!(node.add_property("p", "first"));
        assert!(!node.add_property("p", "second"));
        assert_eq!(node.properties["p"], "first");
    }

    #[test]
    fn test_project_prunes_links_outside_kept_set() {
        let projected = chain().project(2);
        assert_eq!(projected.len(), 2);
        assert!(projected.contains("a"));
        assert!(projected.contains("b"));
        assert!(!projected.contains("c"));
        assert_eq!(projected.get("a").unwrap().links["knows"], vec!["b".to_string()]);
        assert!(projected.get("b").unwrap().links.is_empty());
        assert!(projected.dangling_links().is_empty());
    }

    #[test]
    fn test_project_larger_than_graph_is_identity() {
        let g = chain();
        assert_eq!(g.project(10), g);
    }

    #[test]
    fn test_graph_serializes_as_node_list() {
        let g = chain();
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["nodes"][0]["id"], "a");

        let back: KnowledgeGraph = serde_json::from_value(json).unwrap();
        assert_eq!(back, g);
        assert!(back.contains("c"));
    }

    #[test]
    fn test_deserialize_merges_duplicate_ids() {
        let json = serde_json::json!({
            "nodes": [
                {"id": "a", "links": {"p": ["b"]}},
                {"id": "b"},
                {"id": "a", "label": "A", "links": {"p": ["c"]}}
            ]
        });
        let g: KnowledgeGraph = serde_json::from_value(json).unwrap();
        assert_eq!(g.len(), 2);
        let a = g.get("a").unwrap();
        assert_eq!(a.label, "A");
        assert_eq!(a.links["p"], vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_term_lexical_and_language() {
        assert_eq!(Term::blank("b0").lexical(), "_:b0");
        assert_eq!(Term::blank("_:b0").lexical(), "_:b0");
        assert_eq!(Term::lang_literal("Berlin", "en").language(), Some("en"));
        assert_eq!(Term::lang_literal("Berlin", "").language(), None);
        assert_eq!(Term::typed_literal("1", "xsd:int").language(), None);
        assert_eq!(Term::resource("http://x").lexical(), "http://x");
    }
}

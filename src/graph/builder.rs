//! Triple classification: label vs. property vs. link.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::{KnowledgeGraph, Triple};

/// The default label predicate.
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

fn language_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{1,8})(?:-[A-Za-z0-9]{1,8})*$").expect("Invalid regex pattern")
    })
}

/// Primary subtag of a BCP 47 language tag, lowercased. `None` if the tag is malformed.
fn primary_subtag(tag: &str) -> Option<String> {
    language_tag_regex()
        .captures(tag)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Converts triple sets into [`KnowledgeGraph`]s.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    label_predicate: String,
    language: String,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(RDFS_LABEL, "en")
    }
}

impl GraphBuilder {
    /// `language` is compared against the primary subtag of literal tags,
    /// so `en` also accepts `en-GB` and `EN`.
    pub fn new(label_predicate: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            label_predicate: label_predicate.into(),
            language: language.into().to_ascii_lowercase(),
        }
    }

    pub fn label_predicate(&self) -> &str {
        &self.label_predicate
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn is_kept_language(&self, tag: &str) -> bool {
        primary_subtag(tag).is_some_and(|primary| primary == self.language)
    }

    /// Build a graph from `triples`.
    ///
    /// Triples are de-duplicated keeping their first occurrence. Without a limit
    /// the result is the unlimited graph: every link target has a node entry.
    /// With `Some(limit)` the result is the limit projection of that graph,
    /// which is exactly what admitting nodes only while fewer than `limit`
    /// exist would have produced.
    pub fn build(&self, triples: &[Triple], limit: Option<usize>) -> KnowledgeGraph {
        let mut seen: HashSet<&Triple> = HashSet::with_capacity(triples.len());
        let mut graph = KnowledgeGraph::new();

        for triple in triples {
            if !seen.insert(triple) {
                continue;
            }
            self.apply(&mut graph, triple);
        }

        match limit {
            Some(limit) => graph.project(limit),
            None => graph,
        }
    }

    fn apply(&self, graph: &mut KnowledgeGraph, triple: &Triple) {
        // The subject gets a node even when its object is discarded below.
        graph.get_or_insert(&triple.subject);

        match triple.object.language() {
            Some(tag) => {
                if !self.is_kept_language(tag) {
                    return;
                }
                let value = triple.object.lexical();
                let node = graph.get_or_insert(&triple.subject);
                if triple.predicate == self.label_predicate {
                    if !node.has_label() {
                        node.label = value;
                    }
                } else {
                    node.add_property(&triple.predicate, &value);
                }
            }
            None => {
                let target = triple.object.lexical();
                graph
                    .get_or_insert(&triple.subject)
                    .add_link(&triple.predicate, &target);
                graph.get_or_insert(&target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Term;

    const KNOWS: &str = "http://xmlns.com/foaf/0.1/knows";
    const ABSTRACT: &str = "http://dbpedia.org/ontology/abstract";

    fn cycle() -> Vec<Triple> {
        vec![
            Triple::new("A", KNOWS, Term::resource("B")),
            Triple::new("B", KNOWS, Term::resource("C")),
            Triple::new("C", KNOWS, Term::resource("A")),
        ]
    }

    #[test]
    fn test_every_link_target_has_node() {
        let triples = vec![
            Triple::new("A", KNOWS, Term::resource("B")),
            Triple::new("A", KNOWS, Term::resource("C")),
            Triple::new("A", "http://ex/born", Term::typed_literal("1879", "xsd:gYear")),
            Triple::new("D", KNOWS, Term::blank("b1")),
        ];
        let g = GraphBuilder::default().build(&triples, None);
        assert!(g.dangling_links().is_empty());
        for id in ["A", "B", "C", "1879", "D", "_:b1"] {
            assert!(g.contains(id), "missing node {}", id);
        }
        assert!(g.get("B").unwrap().links.is_empty());
    }

    #[test]
    fn test_english_label_wins_other_languages_dropped() {
        let triples = vec![
            Triple::new("S", RDFS_LABEL, Term::lang_literal("Berlin", "en")),
            Triple::new("S", RDFS_LABEL, Term::lang_literal("Berlin", "de")),
        ];
        let g = GraphBuilder::default().build(&triples, None);
        assert_eq!(g.len(), 1);
        let node = g.get("S").unwrap();
        assert_eq!(node.label, "Berlin");
        assert!(node.properties.is_empty());
        assert!(node.links.is_empty());
    }

    #[test]
    fn test_non_english_triple_keeps_bare_subject() {
        let triples = vec![Triple::new("S", ABSTRACT, Term::lang_literal("Hauptstadt", "de"))];
        let g = GraphBuilder::default().build(&triples, None);
        assert_eq!(g.len(), 1);
        let node = g.get("S").unwrap();
        assert!(!node.has_label());
        assert!(node.properties.is_empty());
        assert!(node.links.is_empty());
    }

    #[test]
    fn test_english_variants_accepted() {
        let triples = vec![
            Triple::new("S", ABSTRACT, Term::lang_literal("Capital", "en-GB")),
            Triple::new("S", "http://ex/motto", Term::lang_literal("Motto", "EN")),
        ];
        let g = GraphBuilder::default().build(&triples, None);
        let node = g.get("S").unwrap();
        assert_eq!(node.properties[ABSTRACT], "Capital");
        assert_eq!(node.properties["http://ex/motto"], "Motto");
    }

    #[test]
    fn test_malformed_language_tag_discarded() {
        let triples = vec![Triple::new("S", ABSTRACT, Term::lang_literal("x", "en_US!"))];
        let g = GraphBuilder::default().build(&triples, None);
        assert_eq!(g.len(), 1);
        assert!(g.get("S").unwrap().properties.is_empty());
    }

    #[test]
    fn test_property_first_value_wins() {
        let triples = vec![
            Triple::new("S", ABSTRACT, Term::lang_literal("first", "en")),
            Triple::new("S", ABSTRACT, Term::lang_literal("second", "en")),
        ];
        let g = GraphBuilder::default().build(&triples, None);
        assert_eq!(g.get("S").unwrap().properties[ABSTRACT], "first");
    }

    #[test]
    fn test_duplicate_triples_and_links_suppressed() {
        let triples = vec![
            Triple::new("A", KNOWS, Term::resource("B")),
            Triple::new("A", KNOWS, Term::resource("B")),
            Triple::new("A", KNOWS, Term::resource("C")),
        ];
        let g = GraphBuilder::default().build(&triples, None);
        assert_eq!(
            g.get("A").unwrap().links[KNOWS],
            vec!["B".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn test_cycle_with_limit_two() {
        let g = GraphBuilder::default().build(&cycle(), Some(2));
        let ids: Vec<_> = g.node_ids().collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(g.get("A").unwrap().links[KNOWS], vec!["B".to_string()]);
        assert!(!g.get("B").unwrap().links.contains_key(KNOWS));
        assert!(!g.contains("C"));
    }

    #[test]
    fn test_limit_never_exceeded_and_no_dangling() {
        let mut triples = Vec::new();
        for i in 0..20 {
            triples.push(Triple::new("hub", KNOWS, Term::resource(format!("n{}", i))));
            triples.push(Triple::new(format!("n{}", i), KNOWS, Term::resource("hub")));
        }
        let builder = GraphBuilder::default();
        for limit in [1, 2, 5, 21, 50] {
            let g = builder.build(&triples, Some(limit));
            assert!(g.len() <= limit);
            assert!(g.dangling_links().is_empty());
        }
    }

    #[test]
    fn test_limited_equals_projection_of_unlimited() {
        let builder = GraphBuilder::default();
        let unlimited = builder.build(&cycle(), None);
        assert_eq!(builder.build(&cycle(), Some(2)), unlimited.project(2));
    }

    #[test]
    fn test_custom_label_predicate_and_language() {
        let builder = GraphBuilder::new("http://schema.org/name", "DE");
        let triples = vec![
            Triple::new("S", "http://schema.org/name", Term::lang_literal("München", "de")),
            Triple::new("S", RDFS_LABEL, Term::lang_literal("Munich", "en")),
        ];
        let g = builder.build(&triples, None);
        let node = g.get("S").unwrap();
        assert_eq!(node.label, "München");
        assert!(node.properties.is_empty());
    }
}

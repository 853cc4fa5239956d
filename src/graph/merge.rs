//! Union of graphs discovered by separate crawl branches.

use super::{KnowledgeGraph, Node};

/// Merge `source` into `target`.
///
/// Properties already on the target win; missing ones are copied over. Links
/// are unioned per predicate without duplicates. An empty target label is
/// filled from the source.
pub fn merge_node(target: &mut Node, source: &Node) {
    if !target.has_label() && source.has_label() {
        target.label = source.label.clone();
    }

    for (predicate, value) in &source.properties {
        target
            .properties
            .entry(predicate.clone())
            .or_insert_with(|| value.clone());
    }

    for (predicate, targets) in &source.links {
        let existing = target.links.entry(predicate.clone()).or_default();
        for link in targets {
            if !existing.contains(link) {
                existing.push(link.clone());
            }
        }
    }
}

impl KnowledgeGraph {
    /// Fold `other` into this graph. Nodes already present are merged with
    /// [`merge_node`]; new ones are appended in `other`'s order.
    pub fn merge(&mut self, other: &KnowledgeGraph) {
        for node in other.iter() {
            match self.get_mut(&node.id) {
                Some(existing) => merge_node(existing, node),
                None => {
                    self.insert_if_absent(node.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> Node {
        let mut n = Node::new(id);
        n.label = format!("{} label", id);
        n.add_property("p", "one");
        n.add_link("knows", "b");
        n.add_link("knows", "c");
        n
    }

    #[test]
    fn test_merge_with_self_is_idempotent() {
        let original = node("a");
        let mut merged = original.clone();
        merge_node(&mut merged, &original);
        assert_eq!(merged, original);
    }

    #[test]
    fn test_existing_property_wins() {
        let mut target = node("a");
        let mut source = Node::new("a");
        source.add_property("p", "two");
        source.add_property("q", "three");
        merge_node(&mut target, &source);
        assert_eq!(target.properties["p"], "one");
        assert_eq!(target.properties["q"], "three");
    }

    #[test]
    fn test_links_unioned_without_duplicates() {
        let mut target = node("a");
        let mut source = Node::new("a");
        source.add_link("knows", "c");
        source.add_link("knows", "d");
        source.add_link("likes", "e");
        merge_node(&mut target, &source);
        assert_eq!(
            target.links["knows"],
            vec!["b".to_string(), "c".to_string(), "d".to_string()]
        );
        assert_eq!(target.links["likes"], vec!["e".to_string()]);
    }

    #[test]
    fn test_label_filled_only_when_empty() {
        let mut placeholder = Node::new("a");
        merge_node(&mut placeholder, &node("a"));
        assert_eq!(placeholder.label, "a label");

        let mut labelled = node("a");
        let mut other = Node::new("a");
        other.label = "other".to_string();
        merge_node(&mut labelled, &other);
        assert_eq!(labelled.label, "a label");
    }

    #[test]
    fn test_graph_merge_inserts_and_unions() {
        let mut composite = KnowledgeGraph::new();
        composite.get_or_insert("a").add_link("knows", "b");
        composite.get_or_insert("b");

        let mut child = KnowledgeGraph::new();
        child.get_or_insert("b").add_link("knows", "c");
        child.get_or_insert("c");

        composite.merge(&child);
        let ids: Vec<_> = composite.node_ids().collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(composite.get("b").unwrap().links["knows"], vec!["c".to_string()]);
        assert!(composite.dangling_links().is_empty());
    }

    #[test]
    fn test_graph_merge_order_independent_node_set() {
        let mut left = KnowledgeGraph::placeholder("a");
        left.get_or_insert("a").add_property("p", "x");
        let mut right = KnowledgeGraph::placeholder("a");
        right.get_or_insert("a").add_link("k", "z");
        right.get_or_insert("z");

        let mut ab = KnowledgeGraph::new();
        ab.merge(&left);
        ab.merge(&right);
        let mut ba = KnowledgeGraph::new();
        ba.merge(&right);
        ba.merge(&left);

        assert_eq!(ab.get("a"), ba.get("a"));
        assert_eq!(ab.len(), ba.len());
    }
}

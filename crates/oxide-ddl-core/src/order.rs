//! Dependency ordering for creation actions.

use std::collections::{BTreeMap, BTreeSet};

/// Nodes with "must come after" edges, sorted stably by declaration order.
#[derive(Debug, Clone)]
pub(crate) struct DependencyOrder<K> {
    nodes: Vec<K>,
    deps: BTreeMap<K, BTreeSet<K>>,
}

impl<K: Ord + Clone> DependencyOrder<K> {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            deps: BTreeMap::new(),
        }
    }

    /// Adds a node. Adding the same node twice is a no-op.
    pub(crate) fn add_node(&mut self, node: K) {
        if !self.deps.contains_key(&node) {
            self.deps.insert(node.clone(), BTreeSet::new());
            self.nodes.push(node);
        }
    }

    /// Records that `node` must come after `dependency`. Edges to unknown
    /// nodes and self-edges are ignored.
    pub(crate) fn add_dependency(&mut self, node: &K, dependency: &K) {
        if node == dependency || !self.deps.contains_key(dependency) {
            return;
        }
        if let Some(deps) = self.deps.get_mut(node) {
            deps.insert(dependency.clone());
        }
    }

    /// Orders the nodes so every node follows its dependencies, keeping
    /// declaration order wherever the edges allow.
    ///
    /// On a cycle, returns the nodes that take part in it, sorted.
    pub(crate) fn sort(&self) -> Result<Vec<K>, Vec<K>> {
        let mut placed: BTreeSet<&K> = BTreeSet::new();
        let mut sorted = Vec::with_capacity(self.nodes.len());

        while sorted.len() < self.nodes.len() {
            let next = self.nodes.iter().find(|node| {
                !placed.contains(node) && self.deps[*node].iter().all(|d| placed.contains(d))
            });
            match next {
                Some(node) => {
                    placed.insert(node);
                    sorted.push(node.clone());
                }
                None => return Err(self.cycle(&placed)),
            }
        }
        Ok(sorted)
    }

    /// Strips the unplaced nodes that are only blocked by a cycle, leaving
    /// the cycle members themselves.
    fn cycle(&self, placed: &BTreeSet<&K>) -> Vec<K> {
        let mut remaining: BTreeSet<&K> = self
            .nodes
            .iter()
            .filter(|node| !placed.contains(node))
            .collect();
        loop {
            let leaf = remaining
                .iter()
                .find(|node| {
                    !remaining
                        .iter()
                        .any(|other| self.deps[*other].contains(**node))
                })
                .copied();
            match leaf {
                Some(node) => {
                    remaining.remove(node);
                }
                None => break,
            }
        }
        remaining.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(nodes: &[&'static str], edges: &[(&'static str, &'static str)]) -> DependencyOrder<&'static str> {
        let mut order = DependencyOrder::new();
        for node in nodes {
            order.add_node(*node);
        }
        for (node, dependency) in edges {
            order.add_dependency(node, dependency);
        }
        order
    }

    #[test]
    fn test_keeps_declaration_order_without_edges() {
        let order = order(&["actor", "film", "language"], &[]);
        assert_eq!(order.sort().unwrap(), vec!["actor", "film", "language"]);
    }

    #[test]
    fn test_dependencies_come_first() {
        let order = order(
            &["city", "address", "country"],
            &[("city", "country"), ("address", "city")],
        );
        assert_eq!(order.sort().unwrap(), vec!["country", "city", "address"]);
    }

    #[test]
    fn test_unknown_and_self_edges_are_ignored() {
        let order = order(&["staff"], &[("staff", "staff"), ("staff", "store")]);
        assert_eq!(order.sort().unwrap(), vec!["staff"]);
    }

    #[test]
    fn test_cycle_reports_members_only() {
        let order = order(
            &["payment", "staff", "store"],
            &[("payment", "staff"), ("staff", "store"), ("store", "staff")],
        );
        assert_eq!(order.sort().unwrap_err(), vec!["staff", "store"]);
    }

    #[test]
    fn test_cycle_blocks_everything_downstream() {
        let order = order(&["a", "b", "c", "d"], &[("a", "b"), ("b", "a"), ("c", "a")]);
        assert_eq!(order.sort().unwrap_err(), vec!["a", "b"]);
    }
}

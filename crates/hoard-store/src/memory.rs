use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use hoard_types::ContentId;

use crate::error::{StoreError, StoreResult};
use crate::graph::DependencyGraph;

/// In-memory, HashMap-based dependency graph.
///
/// Intended for tests and short-lived processes; edges are lost when the
/// graph is dropped. Dependents are kept sorted so listings are stable.
pub struct InMemoryDependencyGraph<I: ContentId> {
    edges: RwLock<HashMap<I, BTreeSet<I>>>,
}

impl<I: ContentId> InMemoryDependencyGraph<I> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            edges: RwLock::new(HashMap::new()),
        }
    }

    /// Number of parents with at least one dependent.
    pub fn parent_count(&self) -> usize {
        self.edges.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges
            .read()
            .map(|m| m.values().map(BTreeSet::len).sum())
            .unwrap_or(0)
    }

    /// Returns `true` if no edges are recorded.
    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }
}

impl<I: ContentId> Default for InMemoryDependencyGraph<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ContentId> DependencyGraph<I> for InMemoryDependencyGraph<I> {
    fn get_dependencies(&self, parent: &I) -> StoreResult<Vec<I>> {
        let edges = self.edges.read().map_err(|_| StoreError::Poisoned)?;
        Ok(edges
            .get(parent)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default())
    }

    fn set_dependency(&self, parent: &I, child: &I) -> StoreResult<()> {
        let mut edges = self.edges.write().map_err(|_| StoreError::Poisoned)?;
        edges.entry(*parent).or_default().insert(*child);
        Ok(())
    }

    fn remove_dependency(&self, parent: &I, child: &I) -> StoreResult<bool> {
        let mut edges = self.edges.write().map_err(|_| StoreError::Poisoned)?;
        let Some(children) = edges.get_mut(parent) else {
            return Ok(false);
        };
        let removed = children.remove(child);
        if children.is_empty() {
            edges.remove(parent);
        }
        Ok(removed)
    }

    fn clear_dependencies(&self, parent: &I) -> StoreResult<()> {
        let mut edges = self.edges.write().map_err(|_| StoreError::Poisoned)?;
        edges.remove(parent);
        Ok(())
    }
}

impl<I: ContentId> std::fmt::Debug for InMemoryDependencyGraph<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDependencyGraph")
            .field("parents", &self.parent_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_types::Md5Id;

    fn id(data: &[u8]) -> Md5Id {
        Md5Id::digest(data)
    }

    #[test]
    fn unknown_parent_has_no_dependencies() {
        let graph = InMemoryDependencyGraph::<Md5Id>::new();
        assert!(graph.get_dependencies(&id(b"nobody")).unwrap().is_empty());
    }

    #[test]
    fn set_dependency_is_idempotent() {
        let graph = InMemoryDependencyGraph::new();
        let (parent, child) = (id(b"p"), id(b"c"));
        graph.set_dependency(&parent, &child).unwrap();
        graph.set_dependency(&parent, &child).unwrap();
        assert_eq!(graph.get_dependencies(&parent).unwrap(), vec![child]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn parent_accumulates_dependents() {
        let graph = InMemoryDependencyGraph::new();
        let parent = id(b"p");
        let children = [id(b"a"), id(b"b"), id(b"c")];
        graph.set_dependencies(&parent, &children).unwrap();
        let mut expected = children.to_vec();
        expected.sort();
        assert_eq!(graph.get_dependencies(&parent).unwrap(), expected);
    }

    #[test]
    fn remove_single_edge() {
        let graph = InMemoryDependencyGraph::new();
        let (parent, child) = (id(b"p"), id(b"c"));
        graph.set_dependency(&parent, &child).unwrap();
        assert!(graph.remove_dependency(&parent, &child).unwrap());
        assert!(!graph.remove_dependency(&parent, &child).unwrap());
        assert_eq!(graph.parent_count(), 0);
    }

    #[test]
    fn clear_drops_all_edges_of_parent() {
        let graph = InMemoryDependencyGraph::new();
        let (p1, p2) = (id(b"p1"), id(b"p2"));
        graph.set_dependencies(&p1, &[id(b"a"), id(b"b")]).unwrap();
        graph.set_dependency(&p2, &id(b"a")).unwrap();
        graph.clear_dependencies(&p1).unwrap();
        assert!(graph.get_dependencies(&p1).unwrap().is_empty());
        assert_eq!(graph.get_dependencies(&p2).unwrap().len(), 1);
    }

    #[test]
    fn cycles_are_representable() {
        let graph = InMemoryDependencyGraph::new();
        let (a, b) = (id(b"a"), id(b"b"));
        graph.set_dependency(&a, &b).unwrap();
        graph.set_dependency(&b, &a).unwrap();
        assert_eq!(graph.get_dependencies(&a).unwrap(), vec![b]);
        assert_eq!(graph.get_dependencies(&b).unwrap(), vec![a]);
    }

    #[test]
    fn debug_format() {
        let graph = InMemoryDependencyGraph::new();
        graph.set_dependency(&id(b"p"), &id(b"c")).unwrap();
        let debug = format!("{graph:?}");
        assert!(debug.contains("InMemoryDependencyGraph"));
        assert!(debug.contains("edges: 1"));
    }
}

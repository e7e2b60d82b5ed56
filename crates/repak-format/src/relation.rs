//! Cross-asset dependency edges
//!
//! Edges are append-only and keep creation order. Each edge belongs to the
//! asset that declared it (the dependent). Its target is either another
//! asset of this pak, a GUID of an asset not emitted yet, or a dependency
//! the runtime loader resolves from another pak.

use crate::hash::Guid;
use std::collections::HashMap;

/// What a relation edge points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationTarget {
    /// Asset already present in the directory
    Asset(u32),
    /// In-pak asset not emitted yet
    Pending(Guid),
    /// Dependency resolved by the runtime loader through GUID descriptors
    Runtime,
}

/// One directed dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationEdge {
    /// Index of the asset holding the reference
    pub dependent: u32,
    /// Referenced asset
    pub target: RelationTarget,
}

/// Append-only edge list with an index of unresolved GUIDs
#[derive(Debug, Default)]
pub struct RelationGraph {
    edges: Vec<RelationEdge>,
    pending: HashMap<Guid, Vec<u32>>,
    first_edge: HashMap<u32, u32>,
}

impl RelationGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `count` runtime-resolved edges for `dependent`
    ///
    /// Returns the index of the first appended edge so the caller can store
    /// a contiguous span.
    pub fn add_file_relation(&mut self, dependent: u32, count: u32) -> u32 {
        let start = self.edges.len() as u32;
        if count > 0 {
            self.first_edge.entry(dependent).or_insert(start);
        }
        for _ in 0..count {
            self.edges.push(RelationEdge {
                dependent,
                target: RelationTarget::Runtime,
            });
        }
        start
    }

    /// Append one edge with an explicit target
    pub fn push(&mut self, dependent: u32, target: RelationTarget) -> u32 {
        let index = self.edges.len() as u32;
        if let RelationTarget::Pending(guid) = target {
            self.pending.entry(guid).or_default().push(index);
        }
        self.first_edge.entry(dependent).or_insert(index);
        self.edges.push(RelationEdge { dependent, target });
        index
    }

    /// Resolve every pending edge waiting for `guid`
    ///
    /// Returns the resolved edge indices in creation order.
    pub fn resolve(&mut self, guid: Guid, asset: u32) -> Vec<u32> {
        let Some(indices) = self.pending.remove(&guid) else {
            return Vec::new();
        };
        for &index in &indices {
            self.edges[index as usize].target = RelationTarget::Asset(asset);
        }
        indices
    }

    /// Edges still waiting for their target, in creation order
    pub fn unresolved(&self) -> impl Iterator<Item = (u32, &RelationEdge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| matches!(edge.target, RelationTarget::Pending(_)))
            .map(|(index, edge)| (index as u32, edge))
    }

    /// Trailing run of edges belonging to `dependent`
    ///
    /// Returns `(start, count)` of the run, or the index of the first edge of
    /// `dependent` when it lies before the run. Costs one step per edge in
    /// the run, independent of the total edge count.
    pub fn trailing_span(&self, dependent: u32) -> Result<(u32, u32), u32> {
        let run = self
            .edges
            .iter()
            .rev()
            .take_while(|edge| edge.dependent == dependent)
            .count();
        let start = (self.edges.len() - run) as u32;

        match self.first_edge.get(&dependent) {
            Some(&first) if first < start => Err(first),
            _ => Ok((start, run as u32)),
        }
    }

    /// Edge by index
    pub fn get(&self, index: u32) -> Option<&RelationEdge> {
        self.edges.get(index as usize)
    }

    /// All edges in creation order
    pub fn edges(&self) -> &[RelationEdge] {
        &self.edges
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if no edge was added
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_relation_returns_start() {
        let mut graph = RelationGraph::new();
        assert_eq!(graph.add_file_relation(0, 3), 0);
        assert_eq!(graph.add_file_relation(1, 1), 3);
        assert_eq!(graph.len(), 4);
        assert!(
            graph
                .edges()
                .iter()
                .all(|edge| edge.target == RelationTarget::Runtime)
        );
    }

    #[test]
    fn test_duplicate_edges_allowed() {
        let mut graph = RelationGraph::new();
        graph.push(1, RelationTarget::Asset(0));
        graph.push(1, RelationTarget::Asset(0));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_pending_resolution() {
        let mut graph = RelationGraph::new();
        let guid = Guid(0xBEEF);
        let a = graph.push(0, RelationTarget::Pending(guid));
        let b = graph.push(0, RelationTarget::Pending(guid));
        graph.push(0, RelationTarget::Pending(Guid(1)));
        assert_eq!(graph.unresolved().count(), 3);

        assert_eq!(graph.resolve(guid, 4), vec![a, b]);
        assert_eq!(graph.get(a).unwrap().target, RelationTarget::Asset(4));
        assert_eq!(graph.unresolved().count(), 1);
        assert!(graph.resolve(guid, 4).is_empty());
    }

    #[test]
    fn test_trailing_span() {
        let mut graph = RelationGraph::new();
        assert_eq!(graph.trailing_span(0), Ok((0, 0)));

        graph.add_file_relation(0, 2);
        graph.add_file_relation(1, 3);
        assert_eq!(graph.trailing_span(1), Ok((2, 3)));
        assert_eq!(graph.trailing_span(2), Ok((5, 0)));
        assert_eq!(graph.trailing_span(0), Err(0));
    }

    #[test]
    fn test_trailing_span_detects_interleaving() {
        let mut graph = RelationGraph::new();
        graph.add_file_relation(2, 1);
        graph.add_file_relation(3, 1);
        graph.add_file_relation(2, 1);
        assert_eq!(graph.trailing_span(2), Err(0));
    }

    #[test]
    fn test_trailing_span_over_long_history() {
        let mut graph = RelationGraph::new();
        graph.push(0, RelationTarget::Pending(Guid(9)));
        for dependent in 1..500 {
            graph.add_file_relation(dependent, 2);
        }
        graph.add_file_relation(500, 0);
        graph.push(0, RelationTarget::Asset(3));

        assert_eq!(graph.trailing_span(0), Err(0));
        assert_eq!(graph.trailing_span(499), Err(997));
        assert_eq!(graph.trailing_span(500), Ok((1000, 0)));
    }
}

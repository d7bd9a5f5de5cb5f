//! Dependency graph management using `petgraph`.
//!
//! Builds a directed graph from reference edges and resolves a stable
//! topological ordering for provisioning.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use cairn_common::error::{CairnError, Result};
use cairn_common::types::NodeId;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

/// A dependency graph of resource nodes.
///
/// Edges are labelled with the consumer input slot that created them.
#[derive(Debug)]
pub struct DependencyGraph {
    /// Internal petgraph representation.
    graph: petgraph::Graph<NodeId, String>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: petgraph::Graph::new(),
        }
    }

    /// Adds a resource node to the graph.
    ///
    /// Node indices follow insertion order, which is the tie-break used by
    /// [`resolve_order`](Self::resolve_order).
    pub fn add_resource(&mut self, id: impl Into<NodeId>) -> NodeIndex {
        self.graph.add_node(id.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency` through
    /// the input `slot`.
    ///
    /// The graph edge points from `dependency` to `dependent` so that the
    /// ordering yields dependencies first.
    pub fn add_dependency(
        &mut self,
        dependent: NodeIndex,
        dependency: NodeIndex,
        slot: impl Into<String>,
    ) {
        let _ = self.graph.add_edge(dependency, dependent, slot.into());
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns a topological ordering of the nodes.
    ///
    /// Dependencies appear before the nodes that depend on them. Among the
    /// nodes whose dependencies are all placed, the one added first wins, so
    /// the result only departs from insertion order where an edge forces it.
    ///
    /// # Errors
    ///
    /// Returns `CairnError::CyclicDependency` if the graph contains a cycle.
    pub fn resolve_order(&self) -> Result<Vec<NodeId>> {
        let mut pending: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(i)) = ready.pop() {
            let idx = NodeIndex::new(i);
            order.push(self.graph[idx].clone());
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let next = edge.target().index();
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == self.graph.node_count() {
            Ok(order)
        } else {
            Err(self.cycle_error(&pending))
        }
    }

    fn cycle_error(&self, pending: &[usize]) -> CairnError {
        let stuck = pending.iter().position(|count| *count > 0).unwrap_or(0);
        let idx = NodeIndex::new(stuck);
        let slot = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .find(|edge| pending[edge.source().index()] > 0)
            .map(|edge| edge.weight().clone())
            .unwrap_or_default();
        CairnError::CyclicDependency {
            node: self
                .graph
                .node_weight(idx)
                .map(ToString::to_string)
                .unwrap_or_default(),
            slot,
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

// This file is part of Metropolis-Freight.
// Copyright © 2025 André de Palma, Lucas Javaudin
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Single-source, multi-target Dijkstra's algorithm.
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use log::debug;

use crate::graph::{AdjacencyEntry, AdjacencyGraph, EdgeId, VertexId};
use crate::tree::{reverse_edge_path, ShortestPathTree};
use crate::workspace::{Predecessor, SearchWorkspace};

/// Number of extracted vertices between two checks of the interruption flag.
const CHECK_INTERVAL: usize = 1024;

/// Outcome of a Dijkstra computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    /// All the requested targets have been settled.
    TargetsReached,
    /// The queue was drained: every reachable vertex is settled.
    ///
    /// When targets were requested, at least one of them is unreachable.
    Exhausted,
    /// The interruption flag was raised during the search.
    Interrupted,
}

/// Dijkstra's algorithm with a reusable [SearchWorkspace].
///
/// One engine must be used by a single thread at a time; the graph can be shared.
#[derive(Clone, Debug, Default)]
pub struct DijkstraEngine {
    workspace: SearchWorkspace,
    source: VertexId,
    nb_settled: usize,
}

impl DijkstraEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the shortest paths from `source`, using the weights stored on the edges.
    ///
    /// The search stops as soon as all the vertices in `targets` are settled. An empty set of
    /// targets computes the full tree.
    pub fn compute(
        &mut self,
        graph: &AdjacencyGraph,
        source: VertexId,
        targets: &[VertexId],
    ) -> SearchStatus {
        self.compute_with(graph, source, targets, |_, entry| entry.weight, None)
    }

    /// Same as [DijkstraEngine::compute] but stops early when `interrupt` is set.
    pub fn compute_interruptible(
        &mut self,
        graph: &AdjacencyGraph,
        source: VertexId,
        targets: &[VertexId],
        interrupt: &AtomicBool,
    ) -> SearchStatus {
        self.compute_with(graph, source, targets, |_, entry| entry.weight, Some(interrupt))
    }

    /// Compute the shortest paths from `source` with the edge weights given by `edge_weight`.
    ///
    /// Edges with an infinite weight are ignored.
    pub fn compute_with<F>(
        &mut self,
        graph: &AdjacencyGraph,
        source: VertexId,
        targets: &[VertexId],
        edge_weight: F,
        interrupt: Option<&AtomicBool>,
    ) -> SearchStatus
    where
        F: Fn(EdgeId, &AdjacencyEntry) -> f64,
    {
        debug_assert!(source < graph.nb_vertices(), "Invalid source vertex {source}");
        self.source = source;
        self.nb_settled = 0;
        self.workspace.reset(graph.nb_vertices(), source);
        self.workspace.set_targets(targets);
        while let Some((u, weight)) = self.workspace.heap.extract_min() {
            if weight.is_infinite() {
                // All the remaining vertices are unreachable.
                break;
            }
            self.nb_settled += 1;
            if let Some(flag) = interrupt {
                if self.nb_settled % CHECK_INTERVAL == 0 && flag.load(Ordering::Relaxed) {
                    debug!(
                        "Search from vertex {source} interrupted after {} settled vertices",
                        self.nb_settled
                    );
                    return SearchStatus::Interrupted;
                }
            }
            if self.workspace.settle(u) {
                return SearchStatus::TargetsReached;
            }
            for (edge_id, entry) in graph.edges_from(u) {
                let w = edge_weight(edge_id, entry);
                if w.is_finite() {
                    self.workspace.relax(u, entry.target, edge_id, w);
                }
            }
        }
        SearchStatus::Exhausted
    }

    /// Return the source of the last computation.
    pub fn source(&self) -> VertexId {
        self.source
    }

    /// Return the number of vertices settled by the last computation.
    pub fn nb_settled(&self) -> usize {
        self.nb_settled
    }

    /// Return the weights of the last computation (infinite for unreached vertices).
    pub fn weights(&self) -> &[f64] {
        self.workspace.weights()
    }

    pub fn weight(&self, vertex: VertexId) -> f64 {
        self.workspace.weights()[vertex]
    }

    pub fn predecessors(&self) -> &[Option<Predecessor>] {
        self.workspace.predecessors()
    }

    pub fn predecessor(&self, vertex: VertexId) -> Option<Predecessor> {
        self.workspace.predecessors()[vertex]
    }

    /// Return the edges of the shortest path to `end`, or `None` if `end` was not reached.
    pub fn edge_path(&self, end: VertexId) -> Result<Option<Vec<EdgeId>>> {
        if end == self.source {
            return Ok(Some(Vec::new()));
        }
        let mut edges = reverse_edge_path(self.workspace.predecessors(), end)?;
        if let Some(edges) = edges.as_mut() {
            edges.reverse();
        }
        Ok(edges)
    }

    /// Copy the result of the last computation into a [ShortestPathTree].
    pub fn to_tree(&self) -> ShortestPathTree {
        ShortestPathTree::new(
            self.source,
            self.workspace.weights().to_vec(),
            self.workspace.predecessors().to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Five-vertex graph, shortest paths from vertex 1:
    /// 1 -> 3 (1), 3 -> 2 (3), 2 -> 4 (4), 4 -> 0 (7).
    fn hand_built_graph() -> AdjacencyGraph {
        let mut graph = AdjacencyGraph::with_vertices(5);
        graph.add_edge(1, 2, 4.0, 0);
        graph.add_edge(1, 3, 1.0, 1);
        graph.add_edge(3, 2, 2.0, 2);
        graph.add_edge(2, 4, 1.0, 3);
        graph.add_edge(3, 4, 5.0, 4);
        graph.add_edge(4, 0, 3.0, 5);
        graph.add_edge(0, 1, 1.0, 6);
        graph
    }

    #[test]
    fn hand_built_test() {
        let graph = hand_built_graph();
        let mut engine = DijkstraEngine::new();
        let status = engine.compute(&graph, 1, &[]);
        assert_eq!(status, SearchStatus::Exhausted);
        assert_eq!(engine.weights(), &[7.0, 0.0, 3.0, 1.0, 4.0]);
        assert_eq!(engine.predecessor(1), None);
        assert_eq!(engine.predecessor(3).map(|p| p.vertex), Some(1));
        assert_eq!(engine.predecessor(2).map(|p| p.vertex), Some(3));
        assert_eq!(engine.predecessor(4).map(|p| p.vertex), Some(2));
        assert_eq!(engine.predecessor(0).map(|p| p.vertex), Some(4));
        assert_eq!(engine.nb_settled(), 5);
        let edges = engine.edge_path(0).unwrap().unwrap();
        let links: Vec<_> = edges.iter().map(|&e| graph.edge(e).link).collect();
        assert_eq!(links, vec![1, 2, 3, 5]);
        let tree = engine.to_tree();
        assert_eq!(tree.get_path(0).unwrap(), vec![1, 3, 2, 4, 0]);
    }

    #[test]
    fn early_stop_test() {
        let graph = hand_built_graph();
        let mut engine = DijkstraEngine::new();
        let status = engine.compute(&graph, 1, &[2]);
        assert_eq!(status, SearchStatus::TargetsReached);
        assert_eq!(engine.weight(2), 3.0);
        // Vertices 1, 3 and 2 are settled.
        assert_eq!(engine.nb_settled(), 3);
        assert_eq!(engine.weight(0), f64::INFINITY);
        // The source can be its own target.
        let status = engine.compute(&graph, 1, &[1]);
        assert_eq!(status, SearchStatus::TargetsReached);
        assert_eq!(engine.nb_settled(), 1);
    }

    #[test]
    fn unreachable_test() {
        let mut graph = AdjacencyGraph::with_vertices(3);
        graph.add_edge(0, 1, 1.0, 0);
        let mut engine = DijkstraEngine::new();
        let status = engine.compute(&graph, 0, &[1, 2]);
        assert_eq!(status, SearchStatus::Exhausted);
        assert_eq!(engine.weight(1), 1.0);
        assert_eq!(engine.weight(2), f64::INFINITY);
        assert_eq!(engine.predecessor(2), None);
        assert_eq!(engine.edge_path(2).unwrap(), None);
    }

    #[test]
    fn custom_weights_test() {
        let graph = hand_built_graph();
        let mut engine = DijkstraEngine::new();
        // Close the edge 1 -> 3.
        engine.compute_with(
            &graph,
            1,
            &[],
            |_, e| if e.link == 1 { f64::INFINITY } else { e.weight },
            None,
        );
        assert_eq!(engine.weight(3), f64::INFINITY);
        assert_eq!(engine.weight(2), 4.0);
        assert_eq!(engine.weight(0), 8.0);
    }

    #[test]
    fn interrupt_test() {
        let n = 3 * CHECK_INTERVAL;
        let mut graph = AdjacencyGraph::with_vertices(n);
        for i in 0..n - 1 {
            graph.add_edge(i, i + 1, 1.0, i);
        }
        let mut engine = DijkstraEngine::new();
        let flag = AtomicBool::new(true);
        let status = engine.compute_interruptible(&graph, 0, &[], &flag);
        assert_eq!(status, SearchStatus::Interrupted);
        assert_eq!(engine.nb_settled(), CHECK_INTERVAL);
        let flag = AtomicBool::new(false);
        let status = engine.compute_interruptible(&graph, 0, &[n - 1], &flag);
        assert_eq!(status, SearchStatus::TargetsReached);
        assert_eq!(engine.weight(n - 1), (n - 1) as f64);
    }
}

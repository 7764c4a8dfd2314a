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

//! Single-goal A* search with a straight-line heuristic.
use anyhow::Result;

use crate::graph::{AdjacencyEntry, AdjacencyGraph, EdgeId, VertexId};
use crate::tree::{reverse_edge_path, ShortestPathTree};
use crate::workspace::{Predecessor, SearchWorkspace};

/// Outcome of an A* computation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AStarStatus {
    /// The goal was settled, with the given weight.
    GoalReached(f64),
    /// The queue was drained before the goal was settled.
    ///
    /// The weights of the settled vertices are still available.
    GoalUnreachable,
}

/// A* search ordering the queue by `weight + heuristic_scale * distance(vertex, goal)`.
///
/// Settled vertices are never reopened so the heuristic must be consistent: this holds when
/// every edge weight is at least `heuristic_scale` times the straight-line length of the edge.
/// With a scale of 0 the search is a plain Dijkstra stopping at the goal.
#[derive(Clone, Debug)]
pub struct AStarEngine {
    workspace: SearchWorkspace,
    heuristic_scale: f64,
    source: VertexId,
    nb_settled: usize,
}

impl Default for AStarEngine {
    fn default() -> Self {
        AStarEngine::new(1.0)
    }
}

impl AStarEngine {
    pub fn new(heuristic_scale: f64) -> Self {
        debug_assert!(heuristic_scale >= 0.0);
        AStarEngine {
            workspace: SearchWorkspace::default(),
            heuristic_scale,
            source: 0,
            nb_settled: 0,
        }
    }

    pub fn heuristic_scale(&self) -> f64 {
        self.heuristic_scale
    }

    /// Compute the shortest path from `source` to `goal`, using the weights stored on the
    /// edges.
    pub fn compute(
        &mut self,
        graph: &AdjacencyGraph,
        source: VertexId,
        goal: VertexId,
    ) -> AStarStatus {
        self.compute_with(graph, source, goal, |_, entry| entry.weight)
    }

    /// Compute the shortest path from `source` to `goal` with the edge weights given by
    /// `edge_weight`. Edges with an infinite weight are ignored.
    pub fn compute_with<F>(
        &mut self,
        graph: &AdjacencyGraph,
        source: VertexId,
        goal: VertexId,
        edge_weight: F,
    ) -> AStarStatus
    where
        F: Fn(EdgeId, &AdjacencyEntry) -> f64,
    {
        debug_assert!(source < graph.nb_vertices(), "Invalid source vertex {source}");
        debug_assert!(goal < graph.nb_vertices(), "Invalid goal vertex {goal}");
        self.source = source;
        self.nb_settled = 0;
        self.workspace.reset(graph.nb_vertices(), source);
        let goal_coords = *graph.coordinates(goal);
        let h = self.heuristic_scale * graph.coordinates(source).distance(&goal_coords);
        self.workspace.heap.set_heuristic(source, h);
        while let Some((u, weight)) = self.workspace.heap.extract_min() {
            if weight.is_infinite() {
                break;
            }
            self.nb_settled += 1;
            if u == goal {
                return AStarStatus::GoalReached(weight);
            }
            for (edge_id, entry) in graph.edges_from(u) {
                let w = edge_weight(edge_id, entry);
                if !w.is_finite() {
                    continue;
                }
                let v = entry.target;
                if !self.workspace.heap.contains(v) {
                    continue;
                }
                if self.workspace.heap.heuristic(v).is_none() {
                    let h = self.heuristic_scale * graph.coordinates(v).distance(&goal_coords);
                    self.workspace.heap.set_heuristic(v, h);
                }
                self.workspace.relax(u, v, edge_id, w);
            }
        }
        AStarStatus::GoalUnreachable
    }

    /// Return the number of vertices settled by the last computation.
    pub fn nb_settled(&self) -> usize {
        self.nb_settled
    }

    /// Return the weights of the last computation. Only the settled vertices have a final
    /// weight.
    pub fn weights(&self) -> &[f64] {
        self.workspace.weights()
    }

    pub fn weight(&self, vertex: VertexId) -> f64 {
        self.workspace.weights()[vertex]
    }

    pub fn predecessor(&self, vertex: VertexId) -> Option<Predecessor> {
        self.workspace.predecessors()[vertex]
    }

    /// Return the edges of the path found to `end`, or `None` if `end` was not reached.
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
    use crate::graph::Coordinates;

    fn line_graph() -> AdjacencyGraph {
        // 0 - 1 - 2 - 3 on a line, plus a long detour 0 -> 4 -> 3 and an isolated vertex 5.
        let mut graph = AdjacencyGraph::with_coordinates(vec![
            Coordinates::new(0.0, 0.0),
            Coordinates::new(1.0, 0.0),
            Coordinates::new(2.0, 0.0),
            Coordinates::new(3.0, 0.0),
            Coordinates::new(1.5, 5.0),
            Coordinates::new(10.0, 10.0),
        ]);
        for i in 0..3 {
            graph.add_edge(i, i + 1, 1.0, i);
            graph.add_edge(i + 1, i, 1.0, 10 + i);
        }
        graph.add_edge(0, 4, 6.0, 20);
        graph.add_edge(4, 3, 6.0, 21);
        graph
    }

    #[test]
    fn goal_reached_test() {
        let graph = line_graph();
        let mut engine = AStarEngine::new(1.0);
        assert_eq!(engine.compute(&graph, 0, 3), AStarStatus::GoalReached(3.0));
        let edges = engine.edge_path(3).unwrap().unwrap();
        let links: Vec<_> = edges.iter().map(|&e| graph.edge(e).link).collect();
        assert_eq!(links, vec![0, 1, 2]);
        // The detour vertex is never settled.
        assert_eq!(engine.nb_settled(), 4);
    }

    #[test]
    fn goal_is_source_test() {
        let graph = line_graph();
        let mut engine = AStarEngine::default();
        assert_eq!(engine.compute(&graph, 2, 2), AStarStatus::GoalReached(0.0));
        assert_eq!(engine.edge_path(2).unwrap(), Some(vec![]));
    }

    #[test]
    fn goal_unreachable_test() {
        let graph = line_graph();
        let mut engine = AStarEngine::new(1.0);
        assert_eq!(engine.compute(&graph, 0, 5), AStarStatus::GoalUnreachable);
        // Weights of the settled vertices are kept.
        assert_eq!(engine.weight(3), 3.0);
        assert_eq!(engine.weight(4), 6.0);
        assert_eq!(engine.edge_path(5).unwrap(), None);
    }

    #[test]
    fn zero_scale_test() {
        let graph = line_graph();
        let mut engine = AStarEngine::new(0.0);
        assert_eq!(engine.compute(&graph, 3, 0), AStarStatus::GoalReached(3.0));
    }
}

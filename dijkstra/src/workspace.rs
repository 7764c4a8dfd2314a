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

//! Scratch data of one search engine.
use fixedbitset::FixedBitSet;

use crate::graph::{EdgeId, VertexId};
use crate::heap::IndexedBinaryHeap;

/// Vertex and edge a vertex was reached from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Predecessor {
    pub vertex: VertexId,
    pub edge: EdgeId,
}

/// Labels, predecessors, queue and target set of a search.
///
/// A workspace belongs to a single engine and is reset at the start of every computation, so it
/// is never shared between concurrent searches.
#[derive(Clone, Debug, Default)]
pub struct SearchWorkspace {
    pub(crate) heap: IndexedBinaryHeap,
    weights: Vec<f64>,
    predecessors: Vec<Option<Predecessor>>,
    targets: FixedBitSet,
    nb_targets_left: usize,
}

impl SearchWorkspace {
    /// Reset all the labels for a search from `source` over `nb_vertices` vertices.
    pub fn reset(&mut self, nb_vertices: usize, source: VertexId) {
        self.heap.init(nb_vertices, source);
        self.weights.clear();
        self.weights.resize(nb_vertices, f64::INFINITY);
        self.weights[source] = 0.0;
        self.predecessors.clear();
        self.predecessors.resize(nb_vertices, None);
        self.targets.clear();
        self.targets.grow(nb_vertices);
        self.nb_targets_left = 0;
    }

    /// Mark the vertices to reach and return the number of distinct targets.
    pub fn set_targets(&mut self, targets: &[VertexId]) -> usize {
        for &t in targets {
            debug_assert!(t < self.weights.len(), "Invalid target vertex {t}");
            if !self.targets.put(t) {
                self.nb_targets_left += 1;
            }
        }
        self.nb_targets_left
    }

    pub fn is_target(&self, vertex: VertexId) -> bool {
        self.targets.contains(vertex)
    }

    /// Return the number of targets not settled yet.
    pub fn nb_targets_left(&self) -> usize {
        self.nb_targets_left
    }

    /// Register that a vertex has been extracted from the queue.
    ///
    /// Return `true` if it was the last target left.
    pub fn settle(&mut self, vertex: VertexId) -> bool {
        if self.targets.contains(vertex) {
            self.nb_targets_left -= 1;
            self.nb_targets_left == 0
        } else {
            false
        }
    }

    /// Relax the edge `u -> v` with weight `edge_weight`.
    ///
    /// Nothing happens if `v` has already been extracted. Return `true` if the label of `v` was
    /// improved.
    pub fn relax(
        &mut self,
        u: VertexId,
        v: VertexId,
        edge: EdgeId,
        edge_weight: f64,
    ) -> bool {
        if !self.heap.contains(v) {
            return false;
        }
        let candidate = self.weights[u] + edge_weight;
        if candidate < self.weights[v] {
            self.weights[v] = candidate;
            self.predecessors[v] = Some(Predecessor { vertex: u, edge });
            self.heap.decrease_key(v, candidate);
            true
        } else {
            false
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn predecessors(&self) -> &[Option<Predecessor>] {
        &self.predecessors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relax_test() {
        let mut ws = SearchWorkspace::default();
        ws.reset(3, 0);
        assert_eq!(ws.heap.extract_min(), Some((0, 0.0)));
        assert!(ws.relax(0, 1, 7, 4.0));
        assert!(!ws.relax(0, 1, 8, 5.0));
        assert!(ws.relax(0, 1, 9, 3.0));
        assert_eq!(ws.weights()[1], 3.0);
        assert_eq!(ws.predecessors()[1], Some(Predecessor { vertex: 0, edge: 9 }));
        // Extracted vertices are never relaxed again.
        assert!(!ws.relax(1, 0, 10, 0.0));
        assert_eq!(ws.weights()[0], 0.0);
    }

    #[test]
    fn targets_test() {
        let mut ws = SearchWorkspace::default();
        ws.reset(4, 0);
        assert_eq!(ws.set_targets(&[2, 3, 2]), 2);
        assert!(!ws.settle(1));
        assert!(!ws.settle(2));
        assert!(ws.settle(3));
        // Targets are cleared on reset.
        ws.reset(4, 1);
        assert_eq!(ws.nb_targets_left(), 0);
        assert!(!ws.is_target(2));
    }
}

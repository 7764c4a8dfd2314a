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

//! Shortest-path trees and path reconstruction.
use anyhow::{anyhow, Result};
use fixedbitset::FixedBitSet;

use crate::graph::{EdgeId, VertexId};
use crate::workspace::Predecessor;

/// Return the edges from the root of the predecessor tree to `end`, in reverse order.
///
/// Return `None` if `end` has no predecessor and an error if the predecessors form a loop.
pub(crate) fn reverse_edge_path(
    predecessors: &[Option<Predecessor>],
    end: VertexId,
) -> Result<Option<Vec<EdgeId>>> {
    let mut next = match predecessors[end] {
        Some(pred) => pred,
        None => return Ok(None),
    };
    let mut visited = FixedBitSet::with_capacity(predecessors.len());
    visited.insert(end);
    let mut edges = vec![next.edge];
    while let Some(pred) = predecessors[next.vertex] {
        if visited.put(next.vertex) {
            return Err(anyhow!(
                "Found a loop in the shortest path to vertex {end}: {:?}",
                edges
            ));
        }
        edges.push(pred.edge);
        next = pred;
    }
    Ok(Some(edges))
}

/// Weights and predecessors of a single-source search.
#[derive(Clone, Debug, PartialEq)]
pub struct ShortestPathTree {
    source: VertexId,
    weights: Vec<f64>,
    predecessors: Vec<Option<Predecessor>>,
}

impl ShortestPathTree {
    pub fn new(
        source: VertexId,
        weights: Vec<f64>,
        predecessors: Vec<Option<Predecessor>>,
    ) -> Self {
        debug_assert_eq!(weights.len(), predecessors.len());
        ShortestPathTree {
            source,
            weights,
            predecessors,
        }
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    /// Return the weight of the shortest path to a vertex (infinite if it was not reached).
    pub fn weight(&self, vertex: VertexId) -> f64 {
        self.weights[vertex]
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn predecessor(&self, vertex: VertexId) -> Option<Predecessor> {
        self.predecessors[vertex]
    }

    pub fn predecessors(&self) -> &[Option<Predecessor>] {
        &self.predecessors
    }

    /// Return `true` if the vertex was reached by the search.
    pub fn is_reached(&self, vertex: VertexId) -> bool {
        vertex == self.source || self.predecessors[vertex].is_some()
    }

    /// Return the path from the source to `end` as a vector of vertices, in reverse order.
    ///
    /// If `end` was not reached, the path only contains `end`.
    pub fn get_reverse_path(&self, end: VertexId) -> Result<Vec<VertexId>> {
        let mut path = vec![end];
        let mut visited = FixedBitSet::with_capacity(self.predecessors.len());
        visited.insert(end);
        let mut next = end;
        while let Some(pred) = self.predecessors[next] {
            path.push(pred.vertex);
            if visited.put(pred.vertex) {
                return Err(anyhow!("Found a loop in the shortest path: {:?}", path));
            }
            next = pred.vertex;
        }
        Ok(path)
    }

    /// Return the path from the source to `end` as a vector of vertices.
    pub fn get_path(&self, end: VertexId) -> Result<Vec<VertexId>> {
        let mut path = self.get_reverse_path(end)?;
        path.reverse();
        Ok(path)
    }

    /// Return the edges of the path from the source to `end`, or `None` if `end` was not
    /// reached.
    ///
    /// The path to the source itself is empty.
    pub fn edge_path(&self, end: VertexId) -> Result<Option<Vec<EdgeId>>> {
        if end == self.source {
            return Ok(Some(Vec::new()));
        }
        let mut edges = reverse_edge_path(&self.predecessors, end)?;
        if let Some(edges) = edges.as_mut() {
            edges.reverse();
        }
        Ok(edges)
    }
}

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

//! Arena adjacency graph read by the search engines.

/// Dense vertex index, in `0..nb_vertices`.
pub type VertexId = usize;

/// Index of an edge in the edge arena.
pub type EdgeId = usize;

/// End-of-chain marker in the adjacency lists.
pub const NO_EDGE: EdgeId = usize::MAX;

/// Planar coordinates of a vertex, used by the A* heuristic.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Coordinates {
            longitude,
            latitude,
        }
    }

    /// Straight-line distance between two points.
    pub fn distance(&self, other: &Coordinates) -> f64 {
        (self.longitude - other.longitude).hypot(self.latitude - other.latitude)
    }
}

/// One outgoing edge of a vertex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjacencyEntry {
    /// Head vertex of the edge.
    pub target: VertexId,
    /// Weight of the edge for the active commodity group.
    pub weight: f64,
    /// Next edge of the same tail vertex, or [NO_EDGE].
    pub next: EdgeId,
    /// Identifier of the link this edge was built from.
    pub link: usize,
}

/// Directed graph stored as a flat edge array with one linked chain per vertex.
///
/// The graph is built once and then only read by the search engines, so it can be shared between
/// threads.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyGraph {
    first_edge: Vec<EdgeId>,
    edges: Vec<AdjacencyEntry>,
    coordinates: Vec<Coordinates>,
}

impl AdjacencyGraph {
    /// Create a graph with `nb_vertices` vertices, no edge and all coordinates at the origin.
    pub fn with_vertices(nb_vertices: usize) -> Self {
        AdjacencyGraph {
            first_edge: vec![NO_EDGE; nb_vertices],
            edges: Vec::new(),
            coordinates: vec![Coordinates::default(); nb_vertices],
        }
    }

    /// Create a graph with one vertex per coordinates and no edge.
    pub fn with_coordinates(coordinates: Vec<Coordinates>) -> Self {
        AdjacencyGraph {
            first_edge: vec![NO_EDGE; coordinates.len()],
            edges: Vec::new(),
            coordinates,
        }
    }

    /// Reserve capacity for at least `additional` more edges.
    pub fn reserve_edges(&mut self, additional: usize) {
        self.edges.reserve(additional);
    }

    /// Add an edge and return its id.
    ///
    /// The edge is put at the head of the source's chain.
    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: f64,
        link: usize,
    ) -> EdgeId {
        debug_assert!(source < self.nb_vertices(), "Invalid source vertex {source}");
        debug_assert!(target < self.nb_vertices(), "Invalid target vertex {target}");
        let id = self.edges.len();
        self.edges.push(AdjacencyEntry {
            target,
            weight,
            next: self.first_edge[source],
            link,
        });
        self.first_edge[source] = id;
        id
    }

    pub fn nb_vertices(&self) -> usize {
        self.first_edge.len()
    }

    pub fn nb_edges(&self) -> usize {
        self.edges.len()
    }

    /// Return the edge with the given id.
    pub fn edge(&self, id: EdgeId) -> &AdjacencyEntry {
        &self.edges[id]
    }

    /// Return all the edges, indexed by [EdgeId].
    pub fn edges(&self) -> &[AdjacencyEntry] {
        &self.edges
    }

    /// Iterate over the outgoing edges of a vertex, as `(EdgeId, &AdjacencyEntry)` pairs.
    pub fn edges_from(&self, vertex: VertexId) -> OutgoingEdges<'_> {
        OutgoingEdges {
            graph: self,
            current: self.first_edge[vertex],
        }
    }

    /// Return the id of the cheapest edge from `source` to `target`, if any.
    pub fn find_edge(&self, source: VertexId, target: VertexId) -> Option<EdgeId> {
        self.edges_from(source)
            .filter(|(_, e)| e.target == target)
            .min_by(|(_, a), (_, b)| a.weight.total_cmp(&b.weight))
            .map(|(id, _)| id)
    }

    /// Return the coordinates of a vertex.
    pub fn coordinates(&self, vertex: VertexId) -> &Coordinates {
        &self.coordinates[vertex]
    }

    pub fn set_coordinates(&mut self, vertex: VertexId, coordinates: Coordinates) {
        self.coordinates[vertex] = coordinates;
    }
}

/// Iterator over the adjacency chain of a vertex.
#[derive(Clone, Debug)]
pub struct OutgoingEdges<'a> {
    graph: &'a AdjacencyGraph,
    current: EdgeId,
}

impl<'a> Iterator for OutgoingEdges<'a> {
    type Item = (EdgeId, &'a AdjacencyEntry);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NO_EDGE {
            return None;
        }
        let id = self.current;
        let entry = &self.graph.edges[id];
        self.current = entry.next;
        Some((id, entry))
    }
}

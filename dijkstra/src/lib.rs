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

//! Shortest-path searches over an arena adjacency graph, with an indexed binary heap.
//!
//! ```
//! use dijkstra::{AdjacencyGraph, DijkstraEngine, SearchStatus};
//!
//! let mut graph = AdjacencyGraph::with_vertices(3);
//! graph.add_edge(0, 1, 2.0, 0);
//! graph.add_edge(1, 2, 3.0, 1);
//! graph.add_edge(0, 2, 6.0, 2);
//! let mut engine = DijkstraEngine::new();
//! let status = engine.compute(&graph, 0, &[2]);
//! assert_eq!(status, SearchStatus::TargetsReached);
//! assert_eq!(engine.weight(2), 5.0);
//! assert_eq!(engine.edge_path(2).unwrap(), Some(vec![0, 1]));
//! ```
#![doc(html_no_source)]

mod astar;
pub mod graph;
pub mod heap;
mod search;
mod tree;
mod workspace;

pub use astar::{AStarEngine, AStarStatus};
pub use graph::{AdjacencyEntry, AdjacencyGraph, Coordinates, EdgeId, VertexId, NO_EDGE};
pub use search::{DijkstraEngine, SearchStatus};
pub use tree::ShortestPathTree;
pub use workspace::{Predecessor, SearchWorkspace};

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

//! Paths of the virtual network, with their costs broken down by type of link.
use choice::Alternative;
use dijkstra::EdgeId;
use serde_derive::{Deserialize, Serialize};

use crate::network::{GroupNetwork, LinkType};

/// Factor used to combine the modes of a transhipment into a mode key.
const MODE_KEY_FACTOR: u32 = 100;

/// Cost of a path, by type of link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DetailedCosts {
    pub loading: f64,
    pub unloading: f64,
    pub transit: f64,
    pub transhipment: f64,
    pub moving: f64,
    pub stop: f64,
    pub switch: f64,
}

impl DetailedCosts {
    fn add(&mut self, link_type: LinkType, cost: f64) {
        let value = match link_type {
            LinkType::Load => &mut self.loading,
            LinkType::Unload => &mut self.unloading,
            LinkType::Transit => &mut self.transit,
            LinkType::Tranship => &mut self.transhipment,
            LinkType::Move => &mut self.moving,
            LinkType::Stop => &mut self.stop,
            LinkType::Switch => &mut self.switch,
        };
        *value += cost;
    }

    pub fn total(&self) -> f64 {
        self.loading
            + self.unloading
            + self.transit
            + self.transhipment
            + self.moving
            + self.stop
            + self.switch
    }
}

/// A path from a loading node to an unloading node.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct PathResult {
    pub detailed_costs: DetailedCosts,
    /// Total cost of the path, with the original link costs.
    pub cost: f64,
    /// Total duration of the path, in seconds: moves plus loading and unloading.
    pub duration: f64,
    /// Total length of the moves of the path.
    pub length: f64,
    pub loading_mode: u32,
    pub loading_means: u32,
    pub unloading_mode: u32,
    pub unloading_means: u32,
    pub nb_transhipments: usize,
    /// Mode of a unimodal path, or combination of the transhipments of an intermodal path.
    pub mode_key: u32,
    /// Identifiers of the virtual links of the path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<u64>,
}

impl PathResult {
    /// Builds the path made of the given edges of the group network.
    ///
    /// The edges must go from a loading vertex to an unloading vertex.
    pub fn from_edges(network: &GroupNetwork, edges: &[EdgeId]) -> Self {
        let mut path = PathResult {
            links: Vec::with_capacity(edges.len()),
            ..Default::default()
        };
        let mut transhipment_key: u32 = 1;
        for &edge in edges {
            let entry = network.graph().edge(edge);
            let link = network.link(edge);
            path.detailed_costs.add(link.link_type, entry.weight);
            path.cost += entry.weight;
            if matches!(
                link.link_type,
                LinkType::Move | LinkType::Load | LinkType::Unload
            ) {
                path.duration += link.duration;
            }
            if link.link_type == LinkType::Move {
                path.length += link.length;
            }
            path.links.push(link.id);
            match link.link_type {
                LinkType::Load => {
                    let node = network.node(entry.target);
                    path.loading_mode = node.mode;
                    path.loading_means = node.means;
                }
                LinkType::Unload => {
                    let node = network.node(network.source(edge));
                    path.unloading_mode = node.mode;
                    path.unloading_means = node.means;
                }
                LinkType::Tranship => {
                    let from = network.node(network.source(edge));
                    let to = network.node(entry.target);
                    path.nb_transhipments += 1;
                    let factor = MODE_KEY_FACTOR.wrapping_mul(from.mode).wrapping_add(to.mode);
                    transhipment_key = transhipment_key.wrapping_mul(factor);
                }
                _ => (),
            }
        }
        path.mode_key = if path.nb_transhipments == 0 {
            path.loading_mode
        } else {
            transhipment_key
        };
        path
    }

    /// Returns `true` if the freight changes mode along the path.
    pub fn is_intermodal(&self) -> bool {
        self.nb_transhipments > 0
    }
}

impl Alternative for PathResult {
    fn cost(&self) -> f64 {
        self.cost
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn loading_mode(&self) -> Option<u32> {
        Some(self.loading_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::rules::RuleBook;
    use crate::network::tests::{sample_data, sample_network};
    use crate::network::VirtualNetwork;

    #[test]
    fn from_edges_test() {
        let network = sample_network();
        let gn = network.group_network(0, &RuleBook::new(), 0).unwrap();
        let source = gn.loading_vertex(1).unwrap();
        let target = gn.unloading_vertex(3).unwrap();
        let mut engine = dijkstra::DijkstraEngine::new();
        engine.compute(gn.graph(), source, &[target]);
        let edges = engine.edge_path(target).unwrap().unwrap();
        let path = PathResult::from_edges(&gn, &edges);
        assert_eq!(path.links, vec![2, 5, 6, 8]);
        assert_eq!(path.cost, 16.0);
        assert_eq!(path.detailed_costs.total(), 16.0);
        assert_eq!(path.detailed_costs.loading, 2.0);
        assert_eq!(path.detailed_costs.moving, 12.0);
        assert_eq!(path.duration, 4.0 * 3600.0);
        assert_eq!(path.length, 200.0);
        assert_eq!((path.loading_mode, path.loading_means), (2, 1));
        assert_eq!((path.unloading_mode, path.unloading_means), (2, 1));
        assert_eq!(path.mode_key, 2);
        assert!(!path.is_intermodal());
        assert_eq!(path.cost(), 16.0);
    }

    #[test]
    fn intermodal_test() {
        let mut data = sample_data();
        // Only the moves count in the length.
        data.links[8].length = 50.0;
        let network = VirtualNetwork::from_data(data).unwrap();
        let gn = network.group_network(0, &RuleBook::new(), 0).unwrap();
        // Load on rail, tranship to road at node 2.
        let edges: Vec<EdgeId> = [2, 5, 9, 4, 7]
            .iter()
            .map(|&id| {
                (0..gn.graph().nb_edges())
                    .find(|&e| gn.link(e).id == id)
                    .unwrap()
            })
            .collect();
        let path = PathResult::from_edges(&gn, &edges);
        assert_eq!(path.cost, 20.0);
        assert_eq!(path.detailed_costs.transhipment, 1.0);
        assert_eq!(path.nb_transhipments, 1);
        assert_eq!(path.mode_key, 201);
        assert_eq!(path.length, 200.0);
        // The transhipment duration is not counted.
        assert_eq!(path.duration, 4.0 * 3600.0);
        assert_eq!(path.loading_mode(), Some(2));
        assert_eq!((path.unloading_mode, path.loading_mode), (1, 2));
        assert!(path.is_intermodal());
    }
}

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

//! Virtual network: one node per (real node, mode, means, service) combination and one link per
//! possible move, transfer, loading or unloading operation.
pub mod rules;

use anyhow::{anyhow, bail, Result};
use dijkstra::{AdjacencyGraph, Coordinates, EdgeId, VertexId};
use hashbrown::HashMap;
use log::debug;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde_derive::{Deserialize, Serialize};

use self::rules::{RuleBook, Transition};
use crate::logging::{send_warning_at_most_n_times, WarningType};

/// Identifier of a node of the real (geographic) network.
pub type RealNodeId = u64;

/// Role of a virtual node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NodeRole {
    /// Node of a mode / means on the network.
    #[default]
    Network,
    /// Centroid node where the freight is loaded.
    Loading,
    /// Centroid node where the freight is unloaded.
    Unloading,
}

/// Type of a virtual link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum LinkType {
    /// Move along a real link, with a given mode and means.
    Move,
    /// Go through a real node without changing mode or means.
    Transit,
    /// Load the freight on a mode and means.
    Load,
    /// Unload the freight from a mode and means.
    Unload,
    /// Transfer the freight to another mode.
    Tranship,
    /// Change the means without changing the mode.
    Switch,
    /// Stop at a real node.
    Stop,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct VirtualNode {
    /// Identifier of the node in the input data.
    pub id: u64,
    pub real_node: RealNodeId,
    #[serde(default)]
    pub mode: u32,
    #[serde(default)]
    pub means: u32,
    #[serde(default)]
    pub service: u32,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub role: NodeRole,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct VirtualLink {
    /// Identifier of the link in the input data.
    pub id: u64,
    /// Identifier of the origin virtual node.
    pub from: u64,
    /// Identifier of the destination virtual node.
    pub to: u64,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Cost of the link for each group, in the order of the network groups.
    pub costs: Vec<f64>,
    /// Duration of the link, in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub length: f64,
}

/// Input description of a [VirtualNetwork].
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NetworkData {
    /// Commodity groups, in the order of the link costs.
    pub groups: Vec<u32>,
    pub nodes: Vec<VirtualNode>,
    pub links: Vec<VirtualLink>,
}

/// Loading and unloading virtual nodes of a real node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Centroid {
    pub loading: Option<NodeIndex>,
    pub unloading: Option<NodeIndex>,
}

/// The virtual network, shared by all the groups.
#[derive(Clone, Debug)]
pub struct VirtualNetwork {
    graph: DiGraph<VirtualNode, VirtualLink>,
    groups: Vec<u32>,
    centroids: HashMap<RealNodeId, Centroid>,
}

impl VirtualNetwork {
    /// Builds and validates the virtual network.
    pub fn from_data(data: NetworkData) -> Result<Self> {
        if data.groups.is_empty() {
            bail!("The network must have at least one group");
        }
        for (i, g) in data.groups.iter().enumerate() {
            if data.groups[..i].contains(g) {
                bail!("Group {g} is defined twice");
            }
        }
        let mut graph = DiGraph::with_capacity(data.nodes.len(), data.links.len());
        let mut node_map: HashMap<u64, NodeIndex> = HashMap::with_capacity(data.nodes.len());
        let mut centroids: HashMap<RealNodeId, Centroid> = HashMap::new();
        for node in data.nodes {
            if node_map.contains_key(&node.id) {
                bail!("Virtual node {} is defined twice", node.id);
            }
            let (id, real_node, role) = (node.id, node.real_node, node.role);
            if role != NodeRole::Network && (node.mode != 0 || node.means != 0) {
                bail!("Centroid virtual node {id} must have mode and means 0");
            }
            let idx = graph.add_node(node);
            node_map.insert(id, idx);
            let slot = match role {
                NodeRole::Network => continue,
                NodeRole::Loading => &mut centroids.entry(real_node).or_default().loading,
                NodeRole::Unloading => &mut centroids.entry(real_node).or_default().unloading,
            };
            if slot.replace(idx).is_some() {
                bail!("Real node {real_node} has two {role:?} virtual nodes");
            }
        }
        let nb_groups = data.groups.len();
        for link in data.links {
            let get_node = |id: u64| {
                node_map
                    .get(&id)
                    .copied()
                    .ok_or_else(|| anyhow!("Link {} refers to unknown virtual node {id}", link.id))
            };
            let from = get_node(link.from)?;
            let to = get_node(link.to)?;
            if link.costs.len() != nb_groups {
                bail!(
                    "Link {} has {} costs but there are {nb_groups} groups",
                    link.id,
                    link.costs.len()
                );
            }
            check_link_roles(&link, &graph[from], &graph[to])?;
            graph.add_edge(from, to, link);
        }
        debug!(
            "Virtual network with {} nodes, {} links and {} centroids",
            graph.node_count(),
            graph.edge_count(),
            centroids.len()
        );
        Ok(VirtualNetwork {
            graph,
            groups: data.groups,
            centroids,
        })
    }

    pub fn graph(&self) -> &DiGraph<VirtualNode, VirtualLink> {
        &self.graph
    }

    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    /// Returns the position of the group in the cost vectors.
    pub fn group_index(&self, group: u32) -> Option<usize> {
        self.groups.iter().position(|&g| g == group)
    }

    pub fn node(&self, idx: NodeIndex) -> &VirtualNode {
        &self.graph[idx]
    }

    pub fn link(&self, idx: EdgeIndex) -> &VirtualLink {
        &self.graph[idx]
    }

    pub fn centroid(&self, node: RealNodeId) -> Option<&Centroid> {
        self.centroids.get(&node)
    }

    pub fn nb_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn nb_links(&self) -> usize {
        self.graph.edge_count()
    }

    /// Builds the search graph of a group.
    ///
    /// The weight of each edge is the group's cost of the link. Links with an invalid cost and
    /// transfers that are not permitted by the rules for the scenario and group are left out.
    pub fn group_network<'a>(
        &'a self,
        group: u32,
        rules: &RuleBook,
        scenario: u32,
    ) -> Result<GroupNetwork<'a>> {
        let group_index = self
            .group_index(group)
            .ok_or_else(|| anyhow!("Group {group} is not defined in the network"))?;
        let coordinates = self
            .graph
            .node_weights()
            .map(|n| Coordinates::new(n.longitude, n.latitude))
            .collect();
        let mut graph = AdjacencyGraph::with_coordinates(coordinates);
        graph.reserve_edges(self.graph.edge_count());
        let mut nb_invalid = 0;
        let mut nb_forbidden = 0;
        for edge in self.graph.edge_references() {
            let link = edge.weight();
            let cost = link.costs[group_index];
            if !cost.is_finite() || cost < 0.0 {
                nb_invalid += 1;
                send_warning_at_most_n_times(
                    WarningType::InvalidLinkCost,
                    &format!("Link {} has invalid cost {cost} for group {group}", link.id),
                    10,
                );
                continue;
            }
            if link.link_type != LinkType::Move {
                let from = &self.graph[edge.source()];
                let to = &self.graph[edge.target()];
                let t = Transition::new(from.mode, from.means, to.mode, to.means);
                if !rules.is_permitted(from.real_node, scenario, group, &t) {
                    nb_forbidden += 1;
                    continue;
                }
            }
            graph.add_edge(
                edge.source().index(),
                edge.target().index(),
                cost,
                edge.id().index(),
            );
        }
        debug!(
            "Group {group}: {} edges, {nb_invalid} links with invalid cost, \
            {nb_forbidden} forbidden transfers",
            graph.nb_edges()
        );
        Ok(GroupNetwork {
            network: self,
            group,
            graph,
        })
    }
}

fn check_link_roles(link: &VirtualLink, from: &VirtualNode, to: &VirtualNode) -> Result<()> {
    let expected = match link.link_type {
        LinkType::Load => (NodeRole::Loading, NodeRole::Network),
        LinkType::Unload => (NodeRole::Network, NodeRole::Unloading),
        _ => (NodeRole::Network, NodeRole::Network),
    };
    if (from.role, to.role) != expected {
        bail!(
            "{:?} link {} cannot go from a {:?} node to a {:?} node",
            link.link_type,
            link.id,
            from.role,
            to.role
        );
    }
    if link.link_type != LinkType::Move && from.real_node != to.real_node {
        bail!(
            "{:?} link {} must connect two virtual nodes of the same real node",
            link.link_type,
            link.id
        );
    }
    Ok(())
}

/// The search graph of one group, with the network it was built from.
#[derive(Clone, Debug)]
pub struct GroupNetwork<'a> {
    network: &'a VirtualNetwork,
    group: u32,
    graph: AdjacencyGraph,
}

impl<'a> GroupNetwork<'a> {
    pub fn network(&self) -> &'a VirtualNetwork {
        self.network
    }

    pub fn group(&self) -> u32 {
        self.group
    }

    pub fn graph(&self) -> &AdjacencyGraph {
        &self.graph
    }

    /// Returns the virtual node of a vertex.
    pub fn node(&self, vertex: VertexId) -> &'a VirtualNode {
        self.network.node(NodeIndex::new(vertex))
    }

    /// Returns the virtual link of an edge.
    pub fn link(&self, edge: EdgeId) -> &'a VirtualLink {
        self.network
            .link(EdgeIndex::new(self.graph.edge(edge).link))
    }

    /// Returns the source vertex of an edge.
    pub fn source(&self, edge: EdgeId) -> VertexId {
        self.network.graph.raw_edges()[self.graph.edge(edge).link]
            .source()
            .index()
    }

    pub fn loading_vertex(&self, node: RealNodeId) -> Option<VertexId> {
        self.network
            .centroid(node)
            .and_then(|c| c.loading)
            .map(|idx| idx.index())
    }

    pub fn unloading_vertex(&self, node: RealNodeId) -> Option<VertexId> {
        self.network
            .centroid(node)
            .and_then(|c| c.unloading)
            .map(|idx| idx.index())
    }

    /// Returns the sorted `(mode, means)` pairs that can be reached through a loading link from
    /// the vertex.
    pub fn available_mode_means(&self, loading_vertex: VertexId) -> Vec<(u32, u32)> {
        let mut pairs: Vec<(u32, u32)> = self
            .graph
            .edges_from(loading_vertex)
            .filter(|&(id, _)| self.link(id).link_type == LinkType::Load)
            .map(|(_, e)| {
                let node = self.node(e.target);
                (node.mode, node.means)
            })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Returns the sorted modes that can be reached through a loading link from the vertex.
    pub fn available_modes(&self, loading_vertex: VertexId) -> Vec<u32> {
        let mut modes: Vec<u32> = self
            .available_mode_means(loading_vertex)
            .into_iter()
            .map(|(mode, _)| mode)
            .collect();
        modes.dedup();
        modes
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::rules::{Filter, NodeRule, RuleKind};
    use super::*;

    fn node(id: u64, real_node: RealNodeId, mode: u32, role: NodeRole) -> VirtualNode {
        VirtualNode {
            id,
            real_node,
            mode,
            means: if mode == 0 { 0 } else { 1 },
            service: 0,
            longitude: real_node as f64,
            latitude: 0.0,
            role,
        }
    }

    fn link(id: u64, from: u64, to: u64, link_type: LinkType, cost: f64) -> VirtualLink {
        VirtualLink {
            id,
            from,
            to,
            link_type,
            costs: vec![cost, 2.0 * cost],
            duration: 3600.0,
            length: if link_type == LinkType::Move { 100.0 } else { 0.0 },
        }
    }

    /// Three real nodes (1, 2, 3) served by road (mode 1) and rail (mode 2), with a rail to road
    /// transhipment at node 2. Freight can be loaded at node 1 and unloaded at node 3.
    ///
    /// Costs for group 0: road 22, rail 16, rail then road 20. Costs are doubled for group 1.
    pub(crate) fn sample_data() -> NetworkData {
        use LinkType::*;
        use NodeRole::*;
        NetworkData {
            groups: vec![0, 1],
            nodes: vec![
                node(100, 1, 0, Loading),
                node(101, 1, 1, Network),
                node(102, 1, 2, Network),
                node(201, 2, 1, Network),
                node(202, 2, 2, Network),
                node(301, 3, 1, Network),
                node(302, 3, 2, Network),
                node(300, 3, 0, Unloading),
            ],
            links: vec![
                link(1, 100, 101, Load, 1.0),
                link(2, 100, 102, Load, 2.0),
                link(3, 101, 201, Move, 10.0),
                link(4, 201, 301, Move, 10.0),
                link(5, 102, 202, Move, 6.0),
                link(6, 202, 302, Move, 6.0),
                link(7, 301, 300, Unload, 1.0),
                link(8, 302, 300, Unload, 2.0),
                link(9, 202, 201, Tranship, 1.0),
            ],
        }
    }

    /// Sample network with a second road means (trucks of type 2) between nodes 1 and 3, which
    /// costs 26 for group 0.
    pub(crate) fn two_means_data() -> NetworkData {
        use LinkType::*;
        use NodeRole::*;
        let mut data = sample_data();
        for (id, real_node) in [(103, 1), (203, 2), (303, 3)] {
            let mut n = node(id, real_node, 1, Network);
            n.means = 2;
            data.nodes.push(n);
        }
        data.links.extend([
            link(10, 100, 103, Load, 1.0),
            link(11, 103, 203, Move, 12.0),
            link(12, 203, 303, Move, 12.0),
            link(13, 303, 300, Unload, 1.0),
        ]);
        data
    }

    pub(crate) fn sample_network() -> VirtualNetwork {
        VirtualNetwork::from_data(sample_data()).unwrap()
    }

    #[test]
    fn from_data_test() {
        let network = sample_network();
        assert_eq!(network.nb_nodes(), 8);
        assert_eq!(network.nb_links(), 9);
        assert_eq!(network.group_index(1), Some(1));
        assert_eq!(network.group_index(5), None);
        let centroid = network.centroid(1).unwrap();
        assert!(centroid.loading.is_some());
        assert!(centroid.unloading.is_none());
        assert!(network.centroid(2).is_none());
    }

    #[test]
    fn invalid_data_test() {
        let mut data = sample_data();
        data.links[0].costs.pop();
        assert!(VirtualNetwork::from_data(data).is_err());
        let mut data = sample_data();
        data.links[0].to = 999;
        assert!(VirtualNetwork::from_data(data).is_err());
        let mut data = sample_data();
        data.nodes[1].id = 100;
        assert!(VirtualNetwork::from_data(data).is_err());
        // Loading link in the wrong direction.
        let mut data = sample_data();
        data.links[0].from = 101;
        data.links[0].to = 100;
        assert!(VirtualNetwork::from_data(data).is_err());
        // Transhipment between two real nodes.
        let mut data = sample_data();
        data.links[8].to = 301;
        assert!(VirtualNetwork::from_data(data).is_err());
        let mut data = sample_data();
        data.groups = vec![0, 0];
        assert!(VirtualNetwork::from_data(data).is_err());
    }

    #[test]
    fn group_network_test() {
        let network = sample_network();
        let rules = RuleBook::new();
        let gn = network.group_network(1, &rules, 0).unwrap();
        assert_eq!(gn.graph().nb_edges(), 9);
        let origin = gn.loading_vertex(1).unwrap();
        assert_eq!(gn.node(origin).id, 100);
        assert_eq!(gn.available_modes(origin), vec![1, 2]);
        assert_eq!(gn.available_mode_means(origin), vec![(1, 1), (2, 1)]);
        assert_eq!(gn.unloading_vertex(1), None);
        let dest = gn.unloading_vertex(3).unwrap();
        let mut engine = dijkstra::DijkstraEngine::new();
        engine.compute(gn.graph(), origin, &[dest]);
        // Rail path, with costs doubled for group 1.
        assert_eq!(engine.weight(dest), 32.0);
        assert!(network.group_network(7, &rules, 0).is_err());
    }

    #[test]
    fn available_mode_means_test() {
        let network = VirtualNetwork::from_data(two_means_data()).unwrap();
        let gn = network.group_network(0, &RuleBook::new(), 0).unwrap();
        let origin = gn.loading_vertex(1).unwrap();
        assert_eq!(gn.available_mode_means(origin), vec![(1, 1), (1, 2), (2, 1)]);
        assert_eq!(gn.available_modes(origin), vec![1, 2]);
    }

    #[test]
    fn group_network_rules_test() {
        let network = sample_network();
        let mut rules = RuleBook::new();
        // No transhipment from rail to road at node 2, for scenario 1 only.
        rules.insert(
            2,
            NodeRule {
                scenario: Filter::Specific(1),
                mode1: Filter::Specific(2),
                mode2: Filter::Specific(1),
                ..NodeRule::any(RuleKind::Exclusion)
            },
        );
        // No loading on rail at node 1.
        rules.insert(
            1,
            NodeRule {
                mode2: Filter::Specific(2),
                ..NodeRule::any(RuleKind::Exclusion)
            },
        );
        let gn = network.group_network(0, &rules, 0).unwrap();
        assert_eq!(gn.graph().nb_edges(), 8);
        assert_eq!(gn.available_modes(gn.loading_vertex(1).unwrap()), vec![1]);
        let gn = network.group_network(0, &rules, 1).unwrap();
        assert_eq!(gn.graph().nb_edges(), 7);
    }

    #[test]
    fn invalid_cost_test() {
        let mut data = sample_data();
        data.links[2].costs[0] = f64::INFINITY;
        data.links[3].costs[0] = -1.0;
        let network = VirtualNetwork::from_data(data).unwrap();
        let gn = network.group_network(0, &RuleBook::new(), 0).unwrap();
        assert_eq!(gn.graph().nb_edges(), 7);
        let gn = network.group_network(1, &RuleBook::new(), 0).unwrap();
        assert_eq!(gn.graph().nb_edges(), 9);
    }
}

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

//! Results of an assignment.
use std::collections::BTreeMap;
use std::time::Duration;

use choice::ModePaths;
use serde_derive::{Deserialize, Serialize};

use super::paths::PathResult;
use crate::demand::DemandRecord;
use crate::network::RealNodeId;

/// A path with the share of the origin-destination quantity it carries.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PathShare {
    #[serde(flatten)]
    pub path: PathResult,
    pub share: f64,
    pub quantity: f64,
}

/// Results of one mode (or combination of modes) for an origin-destination pair.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ModeResult {
    pub mode_key: u32,
    /// Utility of the mode, when computed by the modal split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utility: Option<f64>,
    pub market_share: f64,
    pub paths: Vec<PathShare>,
}

impl ModeResult {
    /// Mode carrying the whole quantity on a single path.
    pub(crate) fn single_path(path: PathResult, quantity: f64) -> Self {
        ModeResult {
            mode_key: path.mode_key,
            utility: None,
            market_share: 1.0,
            paths: vec![PathShare {
                path,
                share: 1.0,
                quantity,
            }],
        }
    }

    /// Mode whose shares were computed by the modal split.
    pub(crate) fn from_mode_paths(mode: ModePaths<PathResult>, quantity: f64) -> Self {
        let mode_key = mode.mode();
        let utility = Some(mode.utility());
        let market_share = mode.market_share();
        let paths = mode
            .into_paths()
            .into_iter()
            .map(|(path, share)| PathShare {
                path,
                share,
                quantity: share * quantity,
            })
            .collect();
        ModeResult {
            mode_key,
            utility,
            market_share,
            paths,
        }
    }
}

/// Results of a demand record.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ODResult {
    pub origin: RealNodeId,
    pub destination: RealNodeId,
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub od_class: Option<u32>,
    /// Modes used, empty if no path was found.
    pub modes: Vec<ModeResult>,
}

impl ODResult {
    pub(crate) fn new(record: &DemandRecord, modes: Vec<ModeResult>) -> Self {
        ODResult {
            origin: record.origin,
            destination: record.destination,
            quantity: record.quantity,
            od_class: record.od_class,
            modes,
        }
    }

    /// Returns `true` if no path was found.
    pub fn is_lost(&self) -> bool {
        self.modes.is_empty()
    }

    /// Returns an iterator over all the paths, with their share.
    pub fn paths(&self) -> impl Iterator<Item = &PathShare> {
        self.modes.iter().flat_map(|m| m.paths.iter())
    }
}

/// Results of a commodity group.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GroupResults {
    pub group: u32,
    /// Quantity carried by each virtual link, by link id.
    pub link_flows: BTreeMap<u64, f64>,
    pub od_pairs: Vec<ODResult>,
    /// Number of demand records for which no path was found.
    pub nb_lost_paths: usize,
}

impl GroupResults {
    pub(crate) fn new(group: u32) -> Self {
        GroupResults {
            group,
            ..Default::default()
        }
    }

    /// Adds the results of a demand record, accumulating its flows on the links.
    ///
    /// The links of the paths are dropped when `save_paths` is `false`.
    pub(crate) fn push(&mut self, mut od: ODResult, save_paths: bool) {
        if od.is_lost() {
            self.nb_lost_paths += 1;
        }
        for mode in od.modes.iter_mut() {
            for path in mode.paths.iter_mut() {
                for &link in path.path.links.iter() {
                    *self.link_flows.entry(link).or_default() += path.quantity;
                }
                if !save_paths {
                    path.path.links = Vec::new();
                }
            }
        }
        self.od_pairs.push(od);
    }

    pub fn total_flow(&self, link: u64) -> f64 {
        self.link_flows.get(&link).copied().unwrap_or(0.0)
    }
}

/// Struct to store the running times of an assignment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct RunningTimes {
    /// Total running time of the assignment.
    pub total: Duration,
    /// Running time to build the search graphs of the groups.
    pub graph_building: Duration,
    /// Running time of the path computations and modal splits.
    pub path_computation: Duration,
}

/// Results of an assignment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AssignmentResults {
    pub groups: Vec<GroupResults>,
    /// Number of demand records for which no path was found, over all the groups.
    pub nb_lost_paths: usize,
    pub running_times: RunningTimes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_test() {
        let record = DemandRecord {
            group: 0,
            origin: 1,
            destination: 2,
            quantity: 10.0,
            od_class: Some(3),
        };
        let path = PathResult {
            mode_key: 1,
            links: vec![4, 5],
            ..Default::default()
        };
        let od = ODResult::new(&record, vec![ModeResult::single_path(path, 10.0)]);
        let mut results = GroupResults::new(0);
        results.push(od, false);
        results.push(ODResult::new(&record, Vec::new()), false);
        assert_eq!(results.total_flow(4), 10.0);
        assert_eq!(results.total_flow(5), 10.0);
        assert_eq!(results.total_flow(6), 0.0);
        assert_eq!(results.nb_lost_paths, 1);
        assert!(results.od_pairs[0].paths().all(|p| p.path.links.is_empty()));
        assert_eq!(results.od_pairs[0].od_class, Some(3));
    }
}

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

//! Assignment of the freight demand to the paths of the virtual network.
mod paths;
mod results;

pub use self::paths::{DetailedCosts, PathResult};
pub use self::results::{
    AssignmentResults, GroupResults, ModeResult, ODResult, PathShare, RunningTimes,
};

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use choice::{CoefficientTable, ModalSplit, ModePaths};
use dijkstra::{
    AStarEngine, AStarStatus, AdjacencyEntry, DijkstraEngine, EdgeId, SearchStatus, VertexId,
};
use log::{debug, info, warn};
use object_pool::Pool;
use rayon::prelude::*;

use crate::demand::{DemandRecord, DemandTable};
use crate::logging::{send_warning_at_most_n_times, WarningType};
use crate::network::rules::RuleBook;
use crate::network::{GroupNetwork, RealNodeId, VirtualNetwork};
use crate::parameters::{AssignmentMethod, AssignmentParameters, SearchAlgorithm};
use crate::progress_bar::FreightProgressBar;

const INTERRUPTED: &str = "The assignment was interrupted";

/// Assigns the demand of every group to the virtual network.
///
/// The feasibility rules of the given scenario are applied when building the search graph of
/// each group. The assignment stops with an error as soon as `interrupt` is set.
pub fn run_assignment(
    network: &VirtualNetwork,
    demand: &DemandTable,
    rules: &RuleBook,
    coefficients: &CoefficientTable,
    scenario: u32,
    params: &AssignmentParameters,
    interrupt: &AtomicBool,
) -> Result<AssignmentResults> {
    params.check()?;
    let now = Instant::now();
    let mut results = AssignmentResults::default();
    for group in demand.groups() {
        let Some(origins) = demand.origins(group) else {
            continue;
        };
        let t0 = Instant::now();
        let group_network = network
            .group_network(group, rules, scenario)
            .context("Failed to build the search graph")?;
        results.running_times.graph_building += t0.elapsed();
        let t1 = Instant::now();
        let split = match params.method {
            AssignmentMethod::AllOrNothing => None,
            AssignmentMethod::MultiFlow => Some(
                params
                    .modal_split
                    .initialize(group, coefficients)
                    .with_context(|| format!("Invalid modal split for group {group}"))?,
            ),
        };
        info!(
            "Assigning group {group}: {} origins, total quantity {}",
            origins.len(),
            demand.total_quantity(group)
        );
        let assignment = GroupAssignment {
            network: &group_network,
            split: split.as_ref(),
            params,
            interrupt,
        };
        let group_results = assignment.run(origins)?;
        results.running_times.path_computation += t1.elapsed();
        if group_results.nb_lost_paths > 0 {
            warn!(
                "No path found for {} demand records of group {group}",
                group_results.nb_lost_paths
            );
        }
        results.nb_lost_paths += group_results.nb_lost_paths;
        results.groups.push(group_results);
    }
    results.running_times.total = now.elapsed();
    info!("Assignment done in {:?}", results.running_times.total);
    Ok(results)
}

/// Search engines and scratch memory of one worker.
#[derive(Clone, Debug)]
struct Engines {
    dijkstra: DijkstraEngine,
    astar: AStarEngine,
    /// Edge weights modified by the multi-flow assignment.
    overlay: Vec<f64>,
}

impl Engines {
    fn new(heuristic_scale: f64) -> Self {
        Engines {
            dijkstra: DijkstraEngine::new(),
            astar: AStarEngine::new(heuristic_scale),
            overlay: Vec::new(),
        }
    }
}

/// Assignment of the demand of one group.
struct GroupAssignment<'a> {
    network: &'a GroupNetwork<'a>,
    /// Modal split for the multi-flow assignment, `None` for the all-or-nothing assignment.
    split: Option<&'a ModalSplit<'a>>,
    params: &'a AssignmentParameters,
    interrupt: &'a AtomicBool,
}

impl GroupAssignment<'_> {
    fn run(&self, origins: &BTreeMap<RealNodeId, Vec<DemandRecord>>) -> Result<GroupResults> {
        let group = self.network.group();
        let bp = FreightProgressBar::new(origins.len()).with_message(format!("Group {group}"));
        let scale = self.params.heuristic_scale;
        let pool: Pool<Engines> =
            Pool::new(rayon::current_num_threads(), || Engines::new(scale));
        let od_results = origins
            .par_iter()
            .panic_fuse()
            .map_init(
                || pool.pull(|| Engines::new(scale)),
                |engines, (&origin, records)| {
                    if self.interrupt.load(Ordering::Relaxed) {
                        return Err(anyhow!(INTERRUPTED));
                    }
                    let res = self.assign_origin(engines, origin, records);
                    bp.inc();
                    res
                },
            )
            .collect::<Result<Vec<_>>>()?;
        bp.finish();
        let mut results = GroupResults::new(group);
        for od in od_results.into_iter().flatten() {
            results.push(od, self.params.save_paths);
        }
        debug!(
            "Group {group}: {} links with a positive flow",
            results.link_flows.len()
        );
        Ok(results)
    }

    fn assign_origin(
        &self,
        engines: &mut Engines,
        origin: RealNodeId,
        records: &[DemandRecord],
    ) -> Result<Vec<ODResult>> {
        let modes = if let Some(source) = self.network.loading_vertex(origin) {
            let goals: Vec<Option<VertexId>> = records
                .iter()
                .map(|r| self.network.unloading_vertex(r.destination))
                .collect();
            if let Some(split) = self.split {
                self.multi_flow(engines, source, &goals, records, split)?
            } else {
                self.all_or_nothing(engines, source, &goals, records)?
            }
        } else {
            vec![Vec::new(); records.len()]
        };
        Ok(records
            .iter()
            .zip(modes)
            .map(|(record, modes)| {
                if modes.is_empty() {
                    send_warning_at_most_n_times(
                        WarningType::LostPath,
                        &format!(
                            "No path from {} to {} for group {}",
                            record.origin, record.destination, record.group
                        ),
                        10,
                    );
                }
                ODResult::new(record, modes)
            })
            .collect())
    }

    /// Assigns the whole quantity of each record to its cheapest path.
    fn all_or_nothing(
        &self,
        engines: &mut Engines,
        source: VertexId,
        goals: &[Option<VertexId>],
        records: &[DemandRecord],
    ) -> Result<Vec<Vec<ModeResult>>> {
        let paths = self.shortest_paths(
            &mut engines.dijkstra,
            &mut engines.astar,
            source,
            goals,
            |_, entry| entry.weight,
        )?;
        Ok(paths
            .into_iter()
            .zip(records)
            .map(|(edges, record)| {
                edges
                    .map(|edges| {
                        let path = PathResult::from_edges(self.network, &edges);
                        vec![ModeResult::single_path(path, record.quantity)]
                    })
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Finds alternative paths for each mode and means available at the origin and splits the
    /// quantity of each record between them.
    fn multi_flow(
        &self,
        engines: &mut Engines,
        source: VertexId,
        goals: &[Option<VertexId>],
        records: &[DemandRecord],
        split: &ModalSplit,
    ) -> Result<Vec<Vec<ModeResult>>> {
        let Engines {
            dijkstra,
            astar,
            overlay,
        } = engines;
        let graph = self.network.graph();
        let markup = 1.0 + self.params.cost_markup;
        let mut candidates: Vec<Vec<PathResult>> = vec![Vec::new(); goals.len()];
        let mut used_edges: Vec<EdgeId> = Vec::new();
        for (mode, means) in self.network.available_mode_means(source) {
            overlay.clear();
            overlay.extend(graph.edges().iter().map(|e| e.weight));
            // Only the loading links towards the current mode and means are open.
            for (edge, entry) in graph.edges_from(source) {
                let node = self.network.node(entry.target);
                if node.mode != mode || node.means != means {
                    overlay[edge] = f64::INFINITY;
                }
            }
            for iteration in 0..self.params.nb_alternatives {
                let weights = &overlay[..];
                let paths =
                    self.shortest_paths(dijkstra, astar, source, goals, |id, _| weights[id])?;
                used_edges.clear();
                for (edges, paths_found) in paths.iter().zip(candidates.iter_mut()) {
                    let Some(edges) = edges else {
                        continue;
                    };
                    let path = PathResult::from_edges(self.network, edges);
                    if !paths_found.iter().any(|p| p.links == path.links) {
                        paths_found.push(path);
                    }
                    used_edges.extend_from_slice(edges);
                }
                if iteration + 1 < self.params.nb_alternatives {
                    used_edges.sort_unstable();
                    used_edges.dedup();
                    for &edge in used_edges.iter() {
                        overlay[edge] *= markup;
                    }
                }
            }
        }
        candidates
            .into_iter()
            .zip(records)
            .map(|(paths, record)| self.split_record(paths, record, split))
            .collect()
    }

    fn split_record(
        &self,
        mut paths: Vec<PathResult>,
        record: &DemandRecord,
        split: &ModalSplit,
    ) -> Result<Vec<ModeResult>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        filter_paths(
            &mut paths,
            self.params.max_detour,
            self.params.keep_only_cheapest_intermodal,
        );
        let mut modes: BTreeMap<u32, ModePaths<PathResult>> = BTreeMap::new();
        for path in paths {
            let key = path.mode_key;
            match modes.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(ModePaths::new(key, path));
                }
                Entry::Occupied(mut entry) => entry.get_mut().add_path(path),
            }
        }
        let mut modes: Vec<_> = modes.into_values().collect();
        split.split(&mut modes).with_context(|| {
            format!(
                "Failed to split the demand from {} to {}",
                record.origin, record.destination
            )
        })?;
        Ok(modes
            .into_iter()
            .map(|m| ModeResult::from_mode_paths(m, record.quantity))
            .collect())
    }

    /// Computes the path from `source` to each goal, with the edge weights given by
    /// `edge_weight`. The path is `None` when the goal is unknown or unreachable.
    fn shortest_paths<F>(
        &self,
        dijkstra: &mut DijkstraEngine,
        astar: &mut AStarEngine,
        source: VertexId,
        goals: &[Option<VertexId>],
        edge_weight: F,
    ) -> Result<Vec<Option<Vec<EdgeId>>>>
    where
        F: Fn(EdgeId, &AdjacencyEntry) -> f64 + Copy,
    {
        let graph = self.network.graph();
        match self.params.algorithm {
            SearchAlgorithm::Dijkstra => {
                let targets: Vec<VertexId> = goals.iter().flatten().copied().collect();
                if targets.is_empty() {
                    return Ok(vec![None; goals.len()]);
                }
                let status = dijkstra.compute_with(
                    graph,
                    source,
                    &targets,
                    edge_weight,
                    Some(self.interrupt),
                );
                if status == SearchStatus::Interrupted {
                    bail!(INTERRUPTED);
                }
                goals
                    .iter()
                    .map(|goal| match goal {
                        Some(goal) => dijkstra.edge_path(*goal),
                        None => Ok(None),
                    })
                    .collect()
            }
            SearchAlgorithm::AStar => goals
                .iter()
                .map(|goal| {
                    let Some(goal) = *goal else {
                        return Ok(None);
                    };
                    if self.interrupt.load(Ordering::Relaxed) {
                        bail!(INTERRUPTED);
                    }
                    match astar.compute_with(graph, source, goal, edge_weight) {
                        AStarStatus::GoalReached(_) => astar.edge_path(goal),
                        AStarStatus::GoalUnreachable => Ok(None),
                    }
                })
                .collect(),
        }
    }
}

/// Removes the paths longer than `max_detour` times the length of the cheapest path (when
/// `max_detour` is positive) and, if `keep_only_cheapest_intermodal` is `true`, the intermodal
/// paths that are not the cheapest path. The cheapest path is always kept.
fn filter_paths(
    paths: &mut Vec<PathResult>,
    max_detour: f64,
    keep_only_cheapest_intermodal: bool,
) {
    let Some(cheapest) = paths
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cost.total_cmp(&b.cost))
        .map(|(i, _)| i)
    else {
        return;
    };
    let max_length = max_detour * paths[cheapest].length;
    let mut i = 0;
    paths.retain(|p| {
        let keep = i == cheapest
            || ((max_detour <= 0.0 || p.length <= max_length)
                && !(keep_only_cheapest_intermodal && p.is_intermodal()));
        i += 1;
        keep
    });
}

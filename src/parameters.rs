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

//! Parameters of an assignment run.
use std::path::PathBuf;

use anyhow::{bail, Result};
use choice::ModalSplitMethod;
use serde_derive::{Deserialize, Serialize};

/// Set of parameters.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Parameters {
    /// Paths to the input files.
    pub input_files: InputFiles,
    /// Directory where the output files are stored.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    /// Scenario used to select the applicable feasibility rules.
    #[serde(default)]
    pub scenario: u32,
    #[serde(default)]
    pub assignment: AssignmentParameters,
    /// Number of threads used to process the origins in parallel.
    ///
    /// Default (0) is to use all the threads of the CPU.
    #[serde(default)]
    pub nb_threads: usize,
}

/// Struct to store all the input file paths.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputFiles {
    /// Path to the file where the virtual network is stored.
    pub network: PathBuf,
    /// Path to the file where the demand records are stored.
    pub demand: PathBuf,
    /// Path to the file where the feasibility rules are stored.
    /// If not specified, all the transfers are allowed.
    #[serde(default)]
    pub rules: Option<PathBuf>,
    /// Path to the file where the modal-split coefficients are stored (JSON or properties
    /// file). If not specified, all the coefficients are 0.
    #[serde(default)]
    pub coefficients: Option<PathBuf>,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

/// How the demand of an origin-destination pair is spread over the network.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentMethod {
    /// The whole quantity is assigned to the cheapest path.
    AllOrNothing,
    /// The quantity is split between the modes and between alternative paths of each mode.
    #[default]
    MultiFlow,
}

/// Shortest-path algorithm.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchAlgorithm {
    /// One search per origin, for all the destinations.
    #[default]
    Dijkstra,
    /// One search per origin-destination pair, guided by the straight-line distance to the
    /// destination.
    AStar,
}

const fn default_nb_alternatives() -> usize {
    1
}

const fn default_cost_markup() -> f64 {
    0.1
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AssignmentParameters {
    #[serde(default)]
    pub method: AssignmentMethod,
    /// Method used to split the demand between the modes (multi-flow assignment only).
    #[serde(default)]
    pub modal_split: ModalSplitMethod,
    /// Number of shortest-path computations for each mode (multi-flow assignment only).
    #[serde(default = "default_nb_alternatives")]
    pub nb_alternatives: usize,
    /// Relative increase of the cost of the links used by the paths found, between two
    /// shortest-path computations (multi-flow assignment only).
    #[serde(default = "default_cost_markup")]
    pub cost_markup: f64,
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
    /// Multiplier of the straight-line distance used as heuristic by the A* algorithm.
    ///
    /// The paths are guaranteed to be the cheapest ones only if every link costs at least
    /// `heuristic_scale` times its straight-line length.
    #[serde(default)]
    pub heuristic_scale: f64,
    /// If `true`, the links of each path are stored in the results.
    #[serde(default)]
    pub save_paths: bool,
    /// Paths longer than `max_detour` times the length of the cheapest path of the
    /// origin-destination pair are discarded. Default (0) is to keep all the paths.
    #[serde(default)]
    pub max_detour: f64,
    /// If `true`, intermodal paths are discarded unless one of them is the cheapest path of the
    /// origin-destination pair.
    #[serde(default)]
    pub keep_only_cheapest_intermodal: bool,
}

impl Default for AssignmentParameters {
    fn default() -> Self {
        AssignmentParameters {
            method: AssignmentMethod::default(),
            modal_split: ModalSplitMethod::default(),
            nb_alternatives: default_nb_alternatives(),
            cost_markup: default_cost_markup(),
            algorithm: SearchAlgorithm::default(),
            heuristic_scale: 0.0,
            save_paths: false,
            max_detour: 0.0,
            keep_only_cheapest_intermodal: false,
        }
    }
}

impl AssignmentParameters {
    /// Returns an error if a parameter value is invalid.
    pub fn check(&self) -> Result<()> {
        if self.nb_alternatives == 0 {
            bail!("The number of alternatives must be at least 1");
        }
        if !self.cost_markup.is_finite() || self.cost_markup < 0.0 {
            bail!(
                "The cost markup must be a non-negative number, got {}",
                self.cost_markup
            );
        }
        if !self.heuristic_scale.is_finite() || self.heuristic_scale < 0.0 {
            bail!(
                "The heuristic scale must be a non-negative number, got {}",
                self.heuristic_scale
            );
        }
        if !self.max_detour.is_finite() || (self.max_detour != 0.0 && self.max_detour < 1.0) {
            bail!(
                "The maximum detour must be 0 or a number larger than 1, got {}",
                self.max_detour
            );
        }
        Ok(())
    }
}

impl Parameters {
    /// Returns an error if a parameter value is invalid.
    pub fn check(&self) -> Result<()> {
        self.assignment.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_test() {
        let json = r#"{"input_files": {"network": "network.json", "demand": "demand.json"}}"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.output_directory, PathBuf::from("output"));
        assert_eq!(params.input_files.rules, None);
        assert_eq!(params.assignment, AssignmentParameters::default());
        assert_eq!(params.nb_threads, 0);
        assert!(params.check().is_ok());
    }

    #[test]
    fn deserialize_test() {
        let json = r#"{
            "input_files": {"network": "n.json", "demand": "d.json", "rules": "r.json"},
            "scenario": 2,
            "assignment": {
                "method": "AllOrNothing",
                "algorithm": "AStar",
                "heuristic_scale": 0.5,
                "modal_split": {"type": "Abraham", "value": {"exponent": -4.0}}
            }
        }"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.scenario, 2);
        assert_eq!(params.assignment.method, AssignmentMethod::AllOrNothing);
        assert_eq!(params.assignment.algorithm, SearchAlgorithm::AStar);
        assert_eq!(
            params.assignment.modal_split,
            ModalSplitMethod::Abraham {
                exponent: Some(-4.0)
            }
        );
        assert_eq!(params.assignment.nb_alternatives, 1);
    }

    #[test]
    fn check_test() {
        let mut params = AssignmentParameters::default();
        params.nb_alternatives = 0;
        assert!(params.check().is_err());
        let mut params = AssignmentParameters::default();
        params.cost_markup = -0.5;
        assert!(params.check().is_err());
        let mut params = AssignmentParameters::default();
        params.max_detour = 0.5;
        assert!(params.check().is_err());
        params.max_detour = 1.5;
        assert!(params.check().is_ok());
        params.heuristic_scale = f64::NAN;
        assert!(params.check().is_err());
    }
}

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

//! Alternative paths of a mode.

/// A path that can be chosen by the modal split.
pub trait Alternative {
    /// Total cost of the path.
    fn cost(&self) -> f64;
    /// Total duration of the path, in seconds.
    fn duration(&self) -> f64;
    /// Mode of the vehicle on which the freight is loaded, used to select the calibrated
    /// coefficients. `None` means that the mode of the [ModePaths] is used.
    fn loading_mode(&self) -> Option<u32> {
        None
    }
}

/// Minimal [Alternative] with a cost, a duration and optionally a loading mode.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PathCost {
    pub cost: f64,
    pub duration: f64,
    pub loading_mode: Option<u32>,
}

impl PathCost {
    pub const fn new(cost: f64, duration: f64) -> Self {
        PathCost {
            cost,
            duration,
            loading_mode: None,
        }
    }

    pub const fn with_loading_mode(mut self, mode: u32) -> Self {
        self.loading_mode = Some(mode);
        self
    }
}

impl Alternative for PathCost {
    fn cost(&self) -> f64 {
        self.cost
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn loading_mode(&self) -> Option<u32> {
        self.loading_mode
    }
}

/// The alternative paths found for one mode and one origin-destination pair, with their market
/// shares.
#[derive(Clone, Debug)]
pub struct ModePaths<P> {
    mode: u32,
    paths: Vec<P>,
    path_shares: Vec<f64>,
    cheapest: usize,
    pub(crate) utility: f64,
    pub(crate) market_share: f64,
}

impl<P: Alternative> ModePaths<P> {
    /// Creates the set of paths of a mode from its first path.
    pub fn new(mode: u32, path: P) -> Self {
        ModePaths {
            mode,
            paths: vec![path],
            path_shares: vec![0.0],
            cheapest: 0,
            utility: 0.0,
            market_share: 0.0,
        }
    }

    /// Adds an alternative path, keeping track of the cheapest one.
    pub fn add_path(&mut self, path: P) {
        if path.cost() < self.paths[self.cheapest].cost() {
            self.cheapest = self.paths.len();
        }
        self.paths.push(path);
        self.path_shares.push(0.0);
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn paths(&self) -> &[P] {
        &self.paths
    }

    pub fn nb_paths(&self) -> usize {
        self.paths.len()
    }

    /// Returns the cheapest path of the mode.
    pub fn cheapest(&self) -> &P {
        &self.paths[self.cheapest]
    }

    /// Returns the share of the total demand assigned to each path.
    ///
    /// The path shares of a mode sum to the market share of the mode.
    pub fn path_shares(&self) -> &[f64] {
        &self.path_shares
    }

    /// Returns the utility of the mode computed by the last modal split.
    pub fn utility(&self) -> f64 {
        self.utility
    }

    /// Returns the market share of the mode computed by the last modal split.
    pub fn market_share(&self) -> f64 {
        self.market_share
    }

    /// Returns an iterator over the paths and their share.
    pub fn iter(&self) -> impl Iterator<Item = (&P, f64)> {
        self.paths.iter().zip(self.path_shares.iter().copied())
    }

    pub(crate) fn costs(&self) -> Vec<f64> {
        self.paths.iter().map(|p| p.cost()).collect()
    }

    /// Spreads the market share of the mode over the paths, given the relative share of each
    /// path within the mode.
    pub(crate) fn set_path_shares(&mut self, relative_shares: &[f64]) {
        debug_assert_eq!(relative_shares.len(), self.paths.len());
        for (share, relative) in self.path_shares.iter_mut().zip(relative_shares) {
            *share = relative * self.market_share;
        }
    }

    /// Consumes the set and returns the paths with their share.
    pub fn into_paths(self) -> Vec<(P, f64)> {
        self.paths.into_iter().zip(self.path_shares).collect()
    }
}

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

//! Modal split: market shares of the modes of an origin-destination pair and of their
//! alternative paths.
mod coefficients;
mod logit;
mod paths;

pub use self::coefficients::{CoefficientEntry, CoefficientKey, CoefficientTable};
pub use self::logit::{
    inverse_cost_shares, logit_shares, proportional_shares, UtilityCoefficients, INTERCEPT,
    LOG_COST, LOG_DURATION,
};
pub use self::paths::{Alternative, ModePaths, PathCost};

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde_derive::{Deserialize, Serialize};

/// Name of the Abraham exponent in the coefficient table.
pub const ABRAHAM: &str = "abraham";

/// Exponent used by the Abraham method when none is given.
pub const DEFAULT_ABRAHAM_EXPONENT: f64 = -10.0;

/// Number of seconds in an hour, durations are expressed in hours in utilities.
const SECONDS_PER_HOUR: f64 = 3600.0;

const fn default_is_true() -> bool {
    true
}

/// Method used to split the demand between the modes and the paths.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ModalSplitMethod {
    /// Logit model with calibrated utilities per mode and group:
    /// `intercept + c_cost * ln(cost) + c_duration * ln(duration)`.
    ///
    /// Within a mode, the share of each path is inversely proportional to its cost.
    CalibratedLogit {
        /// Whether the duration term is included in the utility.
        #[serde(default = "default_is_true")]
        use_duration: bool,
    },
    /// Logit model with utility `-cost`, for both the modes and the paths.
    MultinomialLogit,
    /// Shares proportional to `cost ^ exponent`, for both the modes and the paths.
    ///
    /// When no exponent is given, it is read from the coefficients (`abraham.<group>`, then
    /// `abraham`), with a default of -10.
    Abraham {
        #[serde(default)]
        exponent: Option<f64>,
    },
    /// Shares inversely proportional to the cost (Abraham with exponent -1).
    Proportional,
}

impl Default for ModalSplitMethod {
    fn default() -> Self {
        ModalSplitMethod::CalibratedLogit { use_duration: true }
    }
}

impl ModalSplitMethod {
    /// Prepares the modal split of a group.
    ///
    /// Returns an error if the Abraham exponent is not strictly negative.
    pub fn initialize<'a>(
        &self,
        group: u32,
        coefficients: &'a CoefficientTable,
    ) -> Result<ModalSplit<'a>> {
        let kind = match *self {
            Self::CalibratedLogit { use_duration } => SplitKind::CalibratedLogit { use_duration },
            Self::MultinomialLogit => SplitKind::MultinomialLogit,
            Self::Abraham { exponent } => {
                let exponent = exponent
                    .or_else(|| coefficients.get_for_group(ABRAHAM, group))
                    .unwrap_or(DEFAULT_ABRAHAM_EXPONENT);
                if exponent.is_nan() || exponent >= 0.0 {
                    return Err(anyhow!(
                        "The exponent for the Abraham method must be strictly negative, \
                        got {exponent}"
                    ));
                }
                debug!("Abraham exponent for group {group}: {exponent}");
                SplitKind::Power(exponent)
            }
            Self::Proportional => SplitKind::Power(-1.0),
        };
        Ok(ModalSplit {
            kind,
            group,
            coefficients,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SplitKind {
    CalibratedLogit { use_duration: bool },
    MultinomialLogit,
    /// Shares proportional to `cost ^ exponent`.
    Power(f64),
}

/// A [ModalSplitMethod] ready to be applied to the origin-destination pairs of a group.
#[derive(Clone, Debug)]
pub struct ModalSplit<'a> {
    kind: SplitKind,
    group: u32,
    coefficients: &'a CoefficientTable,
}

impl ModalSplit<'_> {
    pub fn group(&self) -> u32 {
        self.group
    }

    /// Computes the utility and the market share of each mode and the share of each path.
    ///
    /// Afterwards, the market shares of the modes sum to 1 and the path shares of each mode sum
    /// to the market share of the mode.
    ///
    /// Returns an error if there is no mode or if the costs yield invalid utilities (e.g., a
    /// non-positive cost when its logarithm is needed).
    ///
    /// # Example
    ///
    /// ```
    /// use choice::{CoefficientTable, ModalSplitMethod, ModePaths, PathCost};
    ///
    /// let table = CoefficientTable::new();
    /// let split = ModalSplitMethod::Proportional.initialize(0, &table).unwrap();
    /// let mut modes = vec![
    ///     ModePaths::new(1, PathCost::new(10., 3600.)),
    ///     ModePaths::new(2, PathCost::new(30., 7200.)),
    /// ];
    /// split.split(&mut modes).unwrap();
    /// assert!((modes[0].market_share() - 0.75).abs() < 1e-12);
    /// assert!((modes[1].market_share() - 0.25).abs() < 1e-12);
    /// ```
    pub fn split<P: Alternative>(&self, modes: &mut [ModePaths<P>]) -> Result<()> {
        if modes.is_empty() {
            return Err(anyhow!("Cannot split the demand between zero modes"));
        }
        let utilities: Vec<f64> = modes.iter().map(|m| self.mode_utility(m)).collect();
        let shares = logit_shares(&utilities)
            .with_context(|| format!("Invalid mode utilities for group {}", self.group))?;
        for ((m, utility), share) in modes.iter_mut().zip(utilities).zip(shares) {
            m.utility = utility;
            m.market_share = share;
            let costs = m.costs();
            let relative_shares = match self.kind {
                SplitKind::CalibratedLogit { .. } => inverse_cost_shares(&costs),
                SplitKind::MultinomialLogit => {
                    let path_utilities: Vec<f64> = costs.iter().map(|c| -c).collect();
                    logit_shares(&path_utilities)
                }
                SplitKind::Power(exponent) => {
                    let path_utilities: Vec<f64> =
                        costs.iter().map(|c| exponent * c.ln()).collect();
                    logit_shares(&path_utilities)
                }
            }
            .with_context(|| format!("Invalid path costs for mode {}", m.mode()))?;
            m.set_path_shares(&relative_shares);
        }
        Ok(())
    }

    /// Returns the utility of a mode, computed from its cheapest path.
    ///
    /// The calibrated coefficients are those of the loading mode of the cheapest path, so that
    /// an intermodal combination is valued with the coefficients of its first mode.
    ///
    /// For the power methods, the utility is the log of the weight of the mode so that the
    /// Logit formula yields shares proportional to the weights.
    fn mode_utility<P: Alternative>(&self, mode: &ModePaths<P>) -> f64 {
        let cheapest = mode.cheapest();
        match self.kind {
            SplitKind::CalibratedLogit { use_duration } => {
                let coef_mode = cheapest.loading_mode().unwrap_or(mode.mode());
                let coefs =
                    UtilityCoefficients::from_table(self.coefficients, coef_mode, self.group);
                let duration = use_duration.then(|| cheapest.duration() / SECONDS_PER_HOUR);
                coefs.utility(cheapest.cost(), duration)
            }
            SplitKind::MultinomialLogit => -cheapest.cost(),
            SplitKind::Power(exponent) => exponent * cheapest.cost().ln(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() < eps, "{a} != {b}");
    }

    fn check_sums<P: Alternative>(modes: &[ModePaths<P>]) {
        let total: f64 = modes.iter().map(|m| m.market_share()).sum();
        assert_close(total, 1.0, 1e-9);
        for m in modes {
            let total: f64 = m.path_shares().iter().sum();
            assert_close(total, m.market_share(), 1e-9);
        }
    }

    #[test]
    fn calibrated_logit_test() {
        let mut table = CoefficientTable::new();
        table.insert(INTERCEPT, Some(1), Some(0), -2.1);
        table.insert(INTERCEPT, Some(2), Some(0), -1.8);
        table.insert(INTERCEPT, Some(3), Some(0), -3.0);
        let method = ModalSplitMethod::default();
        let split = method.initialize(0, &table).unwrap();
        let mut modes = vec![
            ModePaths::new(1, PathCost::new(50., 3600.)),
            ModePaths::new(2, PathCost::new(20., 7200.)),
            ModePaths::new(3, PathCost::new(80., 1800.)),
        ];
        modes[1].add_path(PathCost::new(10., 9000.));
        split.split(&mut modes).unwrap();
        assert_close(modes[0].utility(), -2.1, 1e-12);
        assert_close(modes[0].market_share(), 0.36279, 1e-5);
        assert_close(modes[1].market_share(), 0.48971, 1e-5);
        assert_close(modes[2].market_share(), 0.14750, 1e-5);
        // Inverse-cost spreading within mode 2.
        let share = modes[1].market_share();
        assert_close(modes[1].path_shares()[0], share / 3., 1e-12);
        assert_close(modes[1].path_shares()[1], share * 2. / 3., 1e-12);
        check_sums(&modes);
    }

    #[test]
    fn calibrated_logit_cost_and_duration_test() {
        let mut table = CoefficientTable::new();
        table.insert(LOG_COST, Some(1), Some(4), -1.0);
        table.insert(LOG_COST, Some(2), Some(4), -1.0);
        table.insert(LOG_DURATION, Some(2), Some(4), -1.0);
        let mut modes = vec![
            ModePaths::new(1, PathCost::new(10., 3600.)),
            ModePaths::new(2, PathCost::new(10., 2. * 3600.)),
        ];
        // Utilities: -ln(10) and -ln(10) - ln(2), so shares are 2/3 and 1/3.
        let split = ModalSplitMethod::default().initialize(4, &table).unwrap();
        split.split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 2. / 3., 1e-12);
        // Without the duration term, both modes are equivalent.
        let method = ModalSplitMethod::CalibratedLogit {
            use_duration: false,
        };
        method.initialize(4, &table).unwrap().split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 0.5, 1e-12);
        check_sums(&modes);
    }

    #[test]
    fn calibrated_logit_loading_mode_test() {
        let mut table = CoefficientTable::new();
        for mode in [1, 2] {
            table.insert(INTERCEPT, Some(mode), Some(0), -3.0);
            table.insert(LOG_COST, Some(mode), Some(0), -1.0);
        }
        let split = ModalSplitMethod::CalibratedLogit {
            use_duration: false,
        }
        .initialize(0, &table)
        .unwrap();
        let mut modes = vec![
            ModePaths::new(1, PathCost::new(22., 3600.).with_loading_mode(1)),
            ModePaths::new(2, PathCost::new(16., 3600.).with_loading_mode(2)),
            // Loaded on mode 2, transhipped to mode 1.
            ModePaths::new(201, PathCost::new(20., 3600.).with_loading_mode(2)),
        ];
        split.split(&mut modes).unwrap();
        assert_close(modes[0].utility(), -3.0 - 22f64.ln(), 1e-12);
        assert_close(modes[1].utility(), -3.0 - 16f64.ln(), 1e-12);
        assert_close(modes[2].utility(), -3.0 - 20f64.ln(), 1e-12);
        // Shares are inversely proportional to the costs.
        let total = 1. / 22. + 1. / 16. + 1. / 20.;
        assert_close(modes[2].market_share(), (1. / 20.) / total, 1e-9);
        check_sums(&modes);
    }

    #[test]
    fn multinomial_logit_test() {
        let table = CoefficientTable::new();
        let split = ModalSplitMethod::MultinomialLogit
            .initialize(0, &table)
            .unwrap();
        let mut modes = vec![
            ModePaths::new(1, PathCost::new(1., 0.)),
            ModePaths::new(2, PathCost::new(2., 0.)),
        ];
        modes[0].add_path(PathCost::new(3., 0.));
        split.split(&mut modes).unwrap();
        let e1 = (-1.0f64).exp();
        let e2 = (-2.0f64).exp();
        assert_close(modes[0].market_share(), e1 / (e1 + e2), 1e-12);
        assert_close(modes[0].utility(), -1., 1e-12);
        let within = 1. / (1. + (-2.0f64).exp());
        assert_close(modes[0].path_shares()[0], within * modes[0].market_share(), 1e-12);
        check_sums(&modes);
        // Large costs do not underflow.
        let mut modes = vec![
            ModePaths::new(1, PathCost::new(5000., 0.)),
            ModePaths::new(2, PathCost::new(5000., 0.)),
        ];
        split.split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 0.5, 1e-12);
    }

    #[test]
    fn abraham_test() {
        let mut table = CoefficientTable::new();
        table.insert(ABRAHAM, None, Some(1), -2.0);
        table.insert(ABRAHAM, None, None, -3.0);
        let method = ModalSplitMethod::Abraham { exponent: None };
        let mut modes = vec![
            ModePaths::new(1, PathCost::new(1., 0.)),
            ModePaths::new(2, PathCost::new(2., 0.)),
        ];
        modes[1].add_path(PathCost::new(4., 0.));
        // Group-specific exponent: weights 1 and 1/4.
        method.initialize(1, &table).unwrap().split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 0.8, 1e-12);
        assert_close(modes[1].path_shares()[0], 0.2 * 0.8, 1e-12);
        check_sums(&modes);
        // Generic exponent: weights 1 and 1/8.
        method.initialize(2, &table).unwrap().split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 8. / 9., 1e-12);
        // Explicit exponent.
        let method = ModalSplitMethod::Abraham {
            exponent: Some(-1.0),
        };
        method.initialize(1, &table).unwrap().split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 2. / 3., 1e-12);
        // Default exponent.
        let empty = CoefficientTable::new();
        let split = ModalSplitMethod::Abraham { exponent: None }
            .initialize(0, &empty)
            .unwrap();
        assert_eq!(split.kind, SplitKind::Power(DEFAULT_ABRAHAM_EXPONENT));
    }

    #[test]
    fn invalid_abraham_test() {
        let mut table = CoefficientTable::new();
        table.insert(ABRAHAM, None, None, 2.0);
        let method = ModalSplitMethod::Abraham { exponent: None };
        assert!(method.initialize(0, &table).is_err());
        let method = ModalSplitMethod::Abraham {
            exponent: Some(0.0),
        };
        assert!(method.initialize(0, &table).is_err());
    }

    #[test]
    fn proportional_test() {
        let table = CoefficientTable::new();
        let split = ModalSplitMethod::Proportional.initialize(0, &table).unwrap();
        let mut modes = vec![ModePaths::new(1, PathCost::new(10., 0.))];
        modes[0].add_path(PathCost::new(20., 0.));
        split.split(&mut modes).unwrap();
        assert_close(modes[0].market_share(), 1.0, 1e-12);
        assert_close(modes[0].path_shares()[0], 2. / 3., 1e-12);
        // Zero cost: error.
        let mut modes = vec![ModePaths::new(1, PathCost::new(0., 0.))];
        assert!(split.split(&mut modes).is_err());
    }

    #[test]
    fn no_mode_test() {
        let table = CoefficientTable::new();
        let split = ModalSplitMethod::MultinomialLogit
            .initialize(0, &table)
            .unwrap();
        let mut modes: Vec<ModePaths<PathCost>> = Vec::new();
        assert!(split.split(&mut modes).is_err());
    }

    #[test]
    fn deserialize_test() {
        let method: ModalSplitMethod =
            serde_json::from_str(r#"{"type": "Abraham", "value": {"exponent": -5.0}}"#).unwrap();
        assert_eq!(
            method,
            ModalSplitMethod::Abraham {
                exponent: Some(-5.0)
            }
        );
        let method: ModalSplitMethod = serde_json::from_str(r#"{"type": "Proportional"}"#).unwrap();
        assert_eq!(method, ModalSplitMethod::Proportional);
        let method: ModalSplitMethod =
            serde_json::from_str(r#"{"type": "CalibratedLogit", "value": {}}"#).unwrap();
        assert_eq!(method, ModalSplitMethod::default());
    }
}

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

use anyhow::{anyhow, Result};

use crate::coefficients::CoefficientTable;

/// Name of the intercept coefficient.
pub const INTERCEPT: &str = "(Intercept)";
/// Name of the coefficient of the log of the cost.
pub const LOG_COST: &str = "log(cost)";
/// Name of the coefficient of the log of the duration (in hours).
pub const LOG_DURATION: &str = "log(duration)";

/// Returns the Logit probabilities of a slice of utilities.
///
/// Returns an Error if the slice is empty or if a utility is not finite.
///
/// # Example
///
/// ```
/// let shares = choice::logit_shares(&[-2.1, -1.8, -3.0]).unwrap();
/// assert!((shares[0] - 0.3628).abs() < 1e-4);
/// assert!((shares[1] - 0.4897).abs() < 1e-4);
/// assert!((shares[2] - 0.1475).abs() < 1e-4);
/// ```
pub fn logit_shares(utilities: &[f64]) -> Result<Vec<f64>> {
    if utilities.is_empty() {
        return Err(anyhow!("Cannot compute shares from an empty slice of utilities"));
    }
    if utilities.iter().any(|u| !u.is_finite()) {
        return Err(anyhow!("Found a non-finite utility: {:?}", utilities));
    }
    // The maximum utility is finite because all utilities are finite and there is at least one.
    let max_utility = utilities.iter().fold(f64::NEG_INFINITY, |m, &u| m.max(u));
    // (u - max_utility) is non-positive so the `exp` cannot overflow and all the values are
    // between 0.0 and 1.0.
    let exp_values: Vec<f64> = utilities.iter().map(|&u| (u - max_utility).exp()).collect();
    // Sigma is between 1.0 and utilities.len() because the alternative with the maximum utility
    // has an exp_value of 1.0.
    let sigma: f64 = exp_values.iter().sum();
    Ok(exp_values.into_iter().map(|e| e / sigma).collect())
}

/// Returns shares proportional to the given non-negative weights.
///
/// Returns an Error if a weight is negative or not finite, or if all the weights are zero.
pub fn proportional_shares(weights: &[f64]) -> Result<Vec<f64>> {
    if weights.iter().any(|&w| !w.is_finite() || w < 0.0) {
        return Err(anyhow!("Found an invalid weight: {:?}", weights));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(anyhow!("Cannot normalize weights {:?}", weights));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

/// Returns shares inversely proportional to the costs.
///
/// Returns an Error if a cost is not strictly positive and finite.
///
/// ```
/// let shares = choice::inverse_cost_shares(&[10., 20.]).unwrap();
/// assert!((shares[0] - 2. / 3.).abs() < 1e-12);
/// ```
pub fn inverse_cost_shares(costs: &[f64]) -> Result<Vec<f64>> {
    if costs.iter().any(|&c| !c.is_finite() || c <= 0.0) {
        return Err(anyhow!("Costs must be positive and finite: {:?}", costs));
    }
    let inverses: Vec<f64> = costs.iter().map(|c| 1.0 / c).collect();
    proportional_shares(&inverses)
}

/// Coefficients of the utility function of a mode.
///
/// The utility is `intercept + log_cost * ln(cost) + log_duration * ln(duration)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UtilityCoefficients {
    pub intercept: f64,
    pub log_cost: f64,
    pub log_duration: f64,
}

impl UtilityCoefficients {
    /// Reads the coefficients of a mode and a group, missing values being 0.
    pub fn from_table(table: &CoefficientTable, mode: u32, group: u32) -> Self {
        UtilityCoefficients {
            intercept: table.get(INTERCEPT, Some(mode), Some(group)),
            log_cost: table.get(LOG_COST, Some(mode), Some(group)),
            log_duration: table.get(LOG_DURATION, Some(mode), Some(group)),
        }
    }

    /// Returns the utility for a cost and, optionally, a duration in hours.
    ///
    /// The cost and the duration must be positive.
    pub fn utility(&self, cost: f64, duration: Option<f64>) -> f64 {
        let mut utility = self.intercept + self.log_cost * cost.ln();
        if let Some(duration) = duration {
            if self.log_duration != 0.0 {
                utility += self.log_duration * duration.ln();
            }
        }
        utility
    }
}

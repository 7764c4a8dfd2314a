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

//! Calibrated coefficients keyed by parameter name, mode and group.
use hashbrown::HashMap;
use log::warn;
use serde_derive::{Deserialize, Serialize};

/// Identifier of a coefficient: a parameter name, optionally specific to a mode and / or a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CoefficientKey {
    pub name: String,
    pub mode: Option<u32>,
    pub group: Option<u32>,
}

impl CoefficientKey {
    pub fn new(name: &str, mode: Option<u32>, group: Option<u32>) -> Self {
        CoefficientKey {
            name: name.to_owned(),
            mode,
            group,
        }
    }
}

/// One coefficient, as stored in JSON files.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CoefficientEntry {
    pub name: String,
    #[serde(default)]
    pub mode: Option<u32>,
    #[serde(default)]
    pub group: Option<u32>,
    pub value: f64,
}

/// Table of calibrated coefficients.
///
/// Missing coefficients are read as 0.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(from = "Vec<CoefficientEntry>", into = "Vec<CoefficientEntry>")]
pub struct CoefficientTable {
    values: HashMap<CoefficientKey, f64>,
}

impl CoefficientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a coefficient and return the previous value for the same key, if any.
    pub fn insert(
        &mut self,
        name: &str,
        mode: Option<u32>,
        group: Option<u32>,
        value: f64,
    ) -> Option<f64> {
        self.values
            .insert(CoefficientKey::new(name, mode, group), value)
    }

    /// Return the coefficient with exactly this key, if it exists.
    pub fn get_opt(&self, name: &str, mode: Option<u32>, group: Option<u32>) -> Option<f64> {
        self.values
            .get(&CoefficientKey::new(name, mode, group))
            .copied()
    }

    /// Return the coefficient with exactly this key, or 0 if it does not exist.
    pub fn get(&self, name: &str, mode: Option<u32>, group: Option<u32>) -> f64 {
        self.get_opt(name, mode, group).unwrap_or(0.0)
    }

    /// Return the group-specific value of a parameter, or its generic value.
    pub fn get_for_group(&self, name: &str, group: u32) -> Option<f64> {
        self.get_opt(name, None, Some(group))
            .or_else(|| self.get_opt(name, None, None))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a properties-style text.
    ///
    /// Each line is `key = value` (`:` is also accepted as separator), where the key is
    /// `name`, `name.group` or `name.mode.group`. Blank lines and lines starting with `#` or `!`
    /// are ignored. Malformed lines are skipped with a warning.
    ///
    /// ```
    /// use choice::CoefficientTable;
    ///
    /// let table = CoefficientTable::from_properties(
    ///     "# Calibrated for group 0\n(Intercept).1.0 = -0.5\nlog(cost).1.0 = -1.2\nabraham = -8",
    /// );
    /// assert_eq!(table.get("(Intercept)", Some(1), Some(0)), -0.5);
    /// assert_eq!(table.get("log(duration)", Some(1), Some(0)), 0.0);
    /// assert_eq!(table.get_for_group("abraham", 3), Some(-8.0));
    /// ```
    pub fn from_properties(text: &str) -> Self {
        let mut table = CoefficientTable::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match parse_property(line) {
                Some((key, value)) => {
                    table.values.insert(key, value);
                }
                None => warn!("Skipping invalid coefficient at line {}: `{line}`", i + 1),
            }
        }
        table
    }
}

fn parse_property(line: &str) -> Option<(CoefficientKey, f64)> {
    let (key, value) = line.split_once(['=', ':'])?;
    let value: f64 = value.trim().parse().ok()?;
    let key = key.trim();
    let parts: Vec<&str> = key.rsplitn(3, '.').collect();
    let numeric: Vec<Option<u32>> = parts.iter().map(|p| p.parse().ok()).collect();
    let key = match (parts.len(), numeric.as_slice()) {
        (3, [Some(group), Some(mode), None]) => {
            CoefficientKey::new(parts[2], Some(*mode), Some(*group))
        }
        (2, [Some(group), None]) => CoefficientKey::new(parts[1], None, Some(*group)),
        (3, [Some(group), None, _]) => {
            CoefficientKey::new(&format!("{}.{}", parts[2], parts[1]), None, Some(*group))
        }
        (_, [None, ..]) => CoefficientKey::new(key, None, None),
        _ => return None,
    };
    if key.name.is_empty() {
        return None;
    }
    Some((key, value))
}

impl From<Vec<CoefficientEntry>> for CoefficientTable {
    fn from(entries: Vec<CoefficientEntry>) -> Self {
        let values = entries
            .into_iter()
            .map(|e| {
                (
                    CoefficientKey {
                        name: e.name,
                        mode: e.mode,
                        group: e.group,
                    },
                    e.value,
                )
            })
            .collect();
        CoefficientTable { values }
    }
}

impl From<CoefficientTable> for Vec<CoefficientEntry> {
    fn from(table: CoefficientTable) -> Self {
        let mut entries: Vec<_> = table
            .values
            .into_iter()
            .map(|(k, value)| CoefficientEntry {
                name: k.name,
                mode: k.mode,
                group: k.group,
                value,
            })
            .collect();
        entries.sort_by(|a, b| (&a.name, a.mode, a.group).cmp(&(&b.name, b.mode, b.group)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_test() {
        let table = CoefficientTable::from_properties(
            "
            ! Comment
            (Intercept).2.1 = 0.75
            log(cost).2.1: -1.5
            abraham.1 = -4
            abraham = -10
            not a number = foo
            .1 = 3
            1.2.3.4 = 5
            ",
        );
        assert_eq!(table.get_opt("(Intercept)", Some(2), Some(1)), Some(0.75));
        assert_eq!(table.get_opt("log(cost)", Some(2), Some(1)), Some(-1.5));
        assert_eq!(table.get_for_group("abraham", 1), Some(-4.0));
        assert_eq!(table.get_for_group("abraham", 2), Some(-10.0));
        assert_eq!(table.get_opt("not a number", None, None), None);
        // Missing coefficients default to 0.
        assert_eq!(table.get("log(duration)", Some(2), Some(1)), 0.0);
        assert_eq!(table.get("(Intercept)", Some(2), Some(0)), 0.0);
        // "1.2.3.4" is read as name "1.2", mode 3, group 4.
        assert_eq!(table.get_opt("1.2", Some(3), Some(4)), Some(5.0));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn json_test() {
        let json = r#"[
            {"name": "(Intercept)", "mode": 1, "group": 0, "value": -0.5},
            {"name": "abraham", "value": -6.0}
        ]"#;
        let table: CoefficientTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.get("(Intercept)", Some(1), Some(0)), -0.5);
        assert_eq!(table.get_for_group("abraham", 7), Some(-6.0));
        let back = serde_json::to_value(&table).unwrap();
        assert_eq!(back.as_array().map(|a| a.len()), Some(2));
    }
}

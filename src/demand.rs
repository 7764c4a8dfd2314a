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

//! Freight demand between origin-destination pairs.
use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::logging::{send_warning_at_most_n_times, WarningType};
use crate::network::RealNodeId;

/// Quantity of a group of commodities to carry from an origin to a destination.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DemandRecord {
    pub group: u32,
    /// Real node where the freight is loaded.
    pub origin: RealNodeId,
    /// Real node where the freight is unloaded.
    pub destination: RealNodeId,
    pub quantity: f64,
    /// Optional class of the origin-destination pair, copied to the results.
    #[serde(default)]
    pub od_class: Option<u32>,
}

impl DemandRecord {
    pub fn is_intrazonal(&self) -> bool {
        self.origin == self.destination
    }
}

/// Demand records indexed by group and origin.
///
/// Groups and origins are stored in increasing order so that the assignment results do not
/// depend on the order of the input records.
#[derive(Clone, Debug, Default)]
pub struct DemandTable {
    groups: BTreeMap<u32, BTreeMap<RealNodeId, Vec<DemandRecord>>>,
    nb_records: usize,
}

impl DemandTable {
    /// Builds the table from raw records.
    ///
    /// Records with a non-positive or non-finite quantity and intrazonal records are skipped
    /// with a warning.
    pub fn from_records(records: Vec<DemandRecord>) -> Self {
        let mut table = DemandTable::default();
        for record in records {
            if !record.quantity.is_finite() || record.quantity <= 0.0 {
                send_warning_at_most_n_times(
                    WarningType::InvalidDemand,
                    &format!(
                        "Skipping demand from {} to {} with invalid quantity {}",
                        record.origin, record.destination, record.quantity
                    ),
                    10,
                );
                continue;
            }
            if record.is_intrazonal() {
                send_warning_at_most_n_times(
                    WarningType::IntrazonalDemand,
                    &format!("Skipping intrazonal demand at node {}", record.origin),
                    10,
                );
                continue;
            }
            table
                .groups
                .entry(record.group)
                .or_default()
                .entry(record.origin)
                .or_default()
                .push(record);
            table.nb_records += 1;
        }
        table
    }

    /// Returns an iterator over the groups with some demand, in increasing order.
    pub fn groups(&self) -> impl Iterator<Item = u32> + '_ {
        self.groups.keys().copied()
    }

    /// Returns the records of a group, by origin.
    pub fn origins(&self, group: u32) -> Option<&BTreeMap<RealNodeId, Vec<DemandRecord>>> {
        self.groups.get(&group)
    }

    /// Returns the number of records kept in the table.
    pub fn nb_records(&self) -> usize {
        self.nb_records
    }

    pub fn is_empty(&self) -> bool {
        self.nb_records == 0
    }

    /// Returns the total quantity of a group.
    pub fn total_quantity(&self, group: u32) -> f64 {
        self.origins(group)
            .map(|origins| origins.values().flatten().map(|r| r.quantity).sum())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(group: u32, origin: u64, destination: u64, quantity: f64) -> DemandRecord {
        DemandRecord {
            group,
            origin,
            destination,
            quantity,
            od_class: None,
        }
    }

    #[test]
    fn from_records_test() {
        let table = DemandTable::from_records(vec![
            record(2, 1, 3, 10.0),
            record(1, 1, 3, 5.0),
            record(1, 2, 3, 1.0),
            record(1, 1, 2, 4.0),
            record(1, 1, 1, 4.0),
            record(1, 1, 2, 0.0),
            record(1, 1, 2, f64::NAN),
            record(1, 1, 2, -1.0),
        ]);
        assert_eq!(table.nb_records(), 4);
        assert_eq!(table.groups().collect::<Vec<_>>(), vec![1, 2]);
        let origins = table.origins(1).unwrap();
        assert_eq!(origins.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(origins[&1].len(), 2);
        assert_eq!(table.total_quantity(1), 10.0);
        assert_eq!(table.total_quantity(3), 0.0);
    }

    #[test]
    fn deserialize_test() {
        let json = r#"[
            {"group": 1, "origin": 10, "destination": 20, "quantity": 2.5},
            {"group": 1, "origin": 10, "destination": 30, "quantity": 1.0, "od_class": 4}
        ]"#;
        let records: Vec<DemandRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].od_class, None);
        assert_eq!(records[1].od_class, Some(4));
        let table = DemandTable::from_records(records);
        assert!(!table.is_empty());
    }
}

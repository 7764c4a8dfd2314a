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


//! Imports / exports of the input and output files.
pub mod json;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use choice::CoefficientTable;
use log::info;

use self::json::{is_compressed, read_json};
use crate::demand::{DemandRecord, DemandTable};
use crate::network::rules::RuleBook;
use crate::network::{NetworkData, VirtualNetwork};
use crate::parameters::InputFiles;

/// All the inputs of an assignment.
#[derive(Clone, Debug)]
pub struct Inputs {
    pub network: VirtualNetwork,
    pub demand: DemandTable,
    pub rules: RuleBook,
    pub coefficients: CoefficientTable,
}

/// Reads all the input files.
pub fn read_inputs(input_files: &InputFiles) -> Result<Inputs> {
    info!("Reading input files");
    let network = read_network(&input_files.network)?;
    let demand = read_demand(&input_files.demand)?;
    let rules = input_files
        .rules
        .as_deref()
        .map(read_rules)
        .transpose()?
        .unwrap_or_default();
    let coefficients = input_files
        .coefficients
        .as_deref()
        .map(read_coefficients)
        .transpose()?
        .unwrap_or_default();
    info!(
        "Network: {} nodes, {} links. Demand: {} records. Rules: {} nodes. Coefficients: {}",
        network.nb_nodes(),
        network.nb_links(),
        demand.nb_records(),
        rules.nb_nodes(),
        coefficients.len()
    );
    Ok(Inputs {
        network,
        demand,
        rules,
        coefficients,
    })
}

/// Reads and validates a virtual network from a JSON file.
pub fn read_network(path: &Path) -> Result<VirtualNetwork> {
    let data: NetworkData = read_json(path)?;
    VirtualNetwork::from_data(data).with_context(|| format!("Invalid network in `{path:?}`"))
}

/// Reads the demand records from a JSON file.
pub fn read_demand(path: &Path) -> Result<DemandTable> {
    let records: Vec<DemandRecord> = read_json(path)?;
    Ok(DemandTable::from_records(records))
}

/// Reads the feasibility rules from a JSON file with one array of 7 integers per rule.
///
/// Values that are not integers make the rule invalid.
pub fn read_rules(path: &Path) -> Result<RuleBook> {
    let rows: Vec<serde_json::Value> = read_json(path)?;
    // Records that are not arrays become empty rows, skipped with a warning.
    let rows: Vec<Vec<Option<i64>>> = rows
        .iter()
        .map(|row| {
            row.as_array()
                .map(|values| values.iter().map(serde_json::Value::as_i64).collect())
                .unwrap_or_default()
        })
        .collect();
    Ok(RuleBook::from_rows(&rows))
}

/// Reads the modal-split coefficients.
///
/// JSON files (possibly zstd-compressed) contain a list of entries. Any other file is read as a
/// properties file, with one `name.mode.group = value` line per coefficient.
pub fn read_coefficients(path: &Path) -> Result<CoefficientTable> {
    let is_json = is_compressed(path) || path.extension().and_then(|s| s.to_str()) == Some("json");
    if is_json {
        read_json(path)
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Unable to read file `{path:?}`"))?;
        Ok(CoefficientTable::from_properties(&text))
    }
}

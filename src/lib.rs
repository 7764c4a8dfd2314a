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


//! Metropolis-Freight: multimodal freight assignment on a virtual network.
#![doc(html_no_source)]

pub mod assignment;
pub mod demand;
pub mod io;
pub mod logging;
pub mod network;
pub mod parameters;
pub mod progress_bar;

use std::env;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::{anyhow, Context, Result};
// Dependencies only used in the bins.
use clap as _;
use log::{error, info, log_enabled};

/// Deserializes the inputs of an assignment, runs it and stores the results to the output
/// directory.
///
/// This function takes as argument the path to the `parameters.json` file.
pub fn run_assignment(path: &Path) -> Result<()> {
    let res = run_assignment_imp(path, None::<std::io::Empty>);
    if let Err(err) = res {
        if log_enabled!(log::Level::Error) {
            // Use the `error` macro so that the error is logged to all the loggers.
            error!("{err:?}");
            Ok(())
        } else {
            // Return the error so that it is printed to console.
            Err(anyhow!(err))
        }
    } else {
        Ok(())
    }
}

/// Deserializes the inputs of an assignment, runs it and stores the results to the output
/// directory.
///
/// This function takes as argument the path to the `parameters.json` file and a writer for the
/// logs.
pub fn run_assignment_with_writer<W: std::io::Write + Send + 'static>(
    path: &Path,
    writer: W,
) -> Result<()> {
    let res = run_assignment_imp(path, Some(writer));
    if let Err(err) = res {
        if log_enabled!(log::Level::Error) {
            error!("{err:?}");
            Ok(())
        } else {
            Err(anyhow!(err))
        }
    } else {
        Ok(())
    }
}

fn run_assignment_imp<W: std::io::Write + Send + 'static>(
    path: &Path,
    writer: Option<W>,
) -> Result<()> {
    println!(
        "
        Metropolis-Freight v{}
        Copyright (C) 2025 André de Palma, Lucas Javaudin
        This program comes with ABSOLUTELY NO WARRANTY.
        This is free software, and you are welcome to redistribute it
        under certain conditions; see `https://www.gnu.org/licenses/' for details.
        ",
        env!("CARGO_PKG_VERSION")
    );
    let params = io::json::get_parameters_from_json(path)?;
    params.check().context("Invalid parameters")?;

    // Set the working directory to the directory of the `parameters.json` file so that the input
    // paths can be interpreted as being relative to this file.
    if let Some(parent_dir) = path.parent() {
        if parent_dir.to_str().map(|s| !s.is_empty()).unwrap_or(true) {
            env::set_current_dir(parent_dir)
                .with_context(|| format!("Failed to set working directory to `{parent_dir:?}`"))?;
        }
    }

    // Create output directory if it does not exists yet.
    std::fs::create_dir_all(&params.output_directory).with_context(|| {
        format!(
            "Failed to create output directory `{:?}`",
            params.output_directory
        )
    })?;

    logging::initialize_logging(&params.output_directory, writer)?;

    let inputs = io::read_inputs(&params.input_files)?;

    let thread_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.nb_threads)
        .build()
        .context("Failed to initialize the thread pool")?;
    let interrupt = AtomicBool::new(false);
    let results = thread_pool.install(|| {
        assignment::run_assignment(
            &inputs.network,
            &inputs.demand,
            &inputs.rules,
            &inputs.coefficients,
            params.scenario,
            &params.assignment,
            &interrupt,
        )
    })?;
    info!(
        "Assigned {} demand records, {} without path",
        inputs.demand.nb_records(),
        results.nb_lost_paths
    );

    info!("Writing results");
    io::json::write_json(
        &results,
        &params.output_directory,
        "assignment_results",
        false,
    )
}

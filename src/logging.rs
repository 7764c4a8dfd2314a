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

//! Everything related to logging.
use std::fs::File;
use std::path::Path;
use std::sync::{LazyLock, Mutex};

use anyhow::{Context, Result};
use hashbrown::HashMap;
use log::{warn, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

static SENT_WARNINGS: LazyLock<Mutex<HashMap<WarningType, usize>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Enum representing the various type of warning messages that can be sent.
pub(crate) enum WarningType {
    /// A feasibility rule row could not be read.
    InvalidRule,
    /// A demand record has an invalid quantity.
    InvalidDemand,
    /// A demand record has the same origin and destination.
    IntrazonalDemand,
    /// A virtual link has an invalid cost for a group.
    InvalidLinkCost,
    /// No path was found for a demand record.
    LostPath,
}

/// Sends a warning message if it was sent less than `n` times before.
pub(crate) fn send_warning_at_most_n_times(warn_type: WarningType, message: &str, n: usize) {
    let mut sent_warnings = SENT_WARNINGS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let count = sent_warnings.entry(warn_type).or_insert(0);
    if *count < n {
        warn!("{}", message);
        *count += 1;
        if *count == n {
            warn!("Further warnings of this type ({warn_type:?}) are silenced");
        }
    }
}

/// Initializes logging to a file and terminal.
///
/// The file `log.txt` is created in the output directory and receives the debug messages.
pub fn initialize_logging<W: std::io::Write + Send + 'static>(
    output: &Path,
    maybe_writer: Option<W>,
) -> Result<()> {
    let log_filename = output.join("log.txt");
    let log_file = File::create(&log_filename)
        .with_context(|| format!("Failed to create log file `{log_filename:?}`"))?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ];
    if let Some(writer) = maybe_writer {
        loggers.push(WriteLogger::new(
            LevelFilter::Info,
            Config::default(),
            writer,
        ));
    }
    CombinedLogger::init(loggers).context("Failed to initialize logging")
}

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

//! Progress bar shared by the assignment workers.
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::{log_enabled, Level};

/// Progress bars are refreshed each UPDATE increments.
const UPDATE: u64 = 50;

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// A progress bar over the origins of a group.
#[derive(Debug, Clone)]
pub struct FreightProgressBar {
    bp: ProgressBar,
    length: u64,
    current: Arc<AtomicU64>,
}

impl FreightProgressBar {
    /// Returns a [FreightProgressBar] of given length.
    ///
    /// The bar is hidden when the Info messages are not logged.
    pub fn new(length: usize) -> Self {
        let bp = if log_enabled!(Level::Info) {
            ProgressBar::new(length as u64)
        } else {
            ProgressBar::hidden()
        };
        bp.set_style(style("{bar:60} ETA: {eta}"));
        FreightProgressBar {
            bp,
            length: length as u64,
            current: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Adds a message to the [FreightProgressBar].
    pub fn with_message(self, msg: impl Into<Cow<'static, str>>) -> Self {
        let bp = self.bp.with_message(msg);
        bp.set_style(style("{bar:40} {msg} ({eta})"));
        Self { bp, ..self }
    }

    /// Increments the progress bar by one.
    ///
    /// The bar is refreshed only periodically.
    pub fn inc(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        if current % UPDATE == 0 {
            self.bp.inc(UPDATE);
        } else if current == self.length {
            self.bp.inc(current % UPDATE);
        }
    }

    /// Returns the number of increments so far.
    pub fn position(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Sets the progress bar to finished.
    pub fn finish(&self) {
        self.bp.finish_and_clear();
    }
}

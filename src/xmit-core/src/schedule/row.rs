// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::ModeError;

/// Default RF power in watts when the `Power (W)` column is empty or zero.
pub const DEFAULT_POWER_W: u32 = 5;
/// Default inter-file pause in seconds when the `Pause (sec)` column is empty or zero.
pub const DEFAULT_PAUSE_S: u32 = 60;

/// Modulation mode selected for an occurrence, as written by the operator.
///
/// Validity is not checked at parse time (§4.1 rule 5): any non-empty string
/// survives into the [`crate::schedule::Occurrence`] and is only resolved to
/// a wire value, or rejected with [`ModeError`], when the occurrence fires.
pub type ModeTag = String;

/// The fixed, allowed mode values and the wire value the transceiver adapter sends for each.
pub fn wire_mode(tag: &str) -> Result<&'static str, ModeError> {
    match tag {
        "USB" => Ok("packet-USB"),
        "LSB" => Ok("packet-LSB"),
        "FM" => Ok("FM"),
        "FMN" => Ok("narrow-FM"),
        "AM" => Ok("AM"),
        other => Err(ModeError(other.to_string())),
    }
}

/// A single dated instance of a schedule row, after date-range expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub set_folder: PathBuf,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub frequency_mhz: f64,
    pub mode: ModeTag,
    pub power_w: u32,
    pub pause_s: u32,
}

impl Occurrence {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// True if `now` falls inside `[start, end)`.
    pub fn is_active_at(&self, now: DateTime<Local>) -> bool {
        self.start <= now && now < self.end
    }
}

// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod index;
pub mod parser;
pub mod row;

pub use index::ScheduleIndex;
pub use parser::parse_schedule_file;
pub use row::{wire_mode, Occurrence};

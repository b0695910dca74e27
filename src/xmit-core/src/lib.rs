// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Schedule engine, transmission controller, and device-supervision policies
//! for an unattended scheduled-transmission daemon. Pure logic and adapter
//! traits only — no process, CLI, or concrete I/O backend lives here.

pub mod audio;
pub mod controller;
pub mod error;
pub mod rig;
pub mod schedule;
pub mod supervisor;

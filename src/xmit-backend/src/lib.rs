// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Concrete adapter implementations: a real transceiver over a `rigctld`-style
//! network protocol, an in-memory fake for tests and hardware-less operation,
//! a `cpal`/`symphonia`/`rubato` audio backend, and a `notify`-based
//! filesystem watcher feeding the supervisor's reload queue.

pub mod audio_cpal;
pub mod rig_fake;
pub mod rig_net;
pub mod watcher;

pub use audio_cpal::CpalAudio;
pub use rig_fake::FakeRig;
pub use rig_net::NetRig;
pub use watcher::LibraryWatcher;

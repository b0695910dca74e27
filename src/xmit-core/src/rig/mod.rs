// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::future::Future;
use std::pin::Pin;

use crate::error::RigResult;

/// Capability set for a transceiver control backend (§4.5, §9 "Adapter polymorphism").
///
/// Two concrete backends satisfy this trait: a real one speaking a network
/// text-line CAT protocol, and a fake in-memory one for tests and demos. No
/// inheritance hierarchy is required — callers hold `Box<dyn TransceiverAdapter>`.
pub trait TransceiverAdapter: Send {
    /// Connect and validate by reading frequency; `ERR_LINK` on timeout, protocol
    /// error, or a nonsense response (frequency below 100 kHz).
    fn open<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>>;

    /// Best-effort release; always safe on a partially-open handle.
    fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>>;

    fn set_frequency<'a>(
        &'a mut self,
        hz: u64,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>>;

    /// `mode` is the resolved wire value from [`crate::schedule::wire_mode`],
    /// not the raw CSV mode tag.
    fn set_mode<'a>(
        &'a mut self,
        mode: &'a str,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>>;

    /// `fraction` is RF power as a fraction of the rig's maximum, in `0.0..=1.0`.
    fn set_power<'a>(
        &'a mut self,
        fraction: f32,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>>;

    /// Must be idempotent: calling with the same value twice is not an error.
    fn set_ptt<'a>(
        &'a mut self,
        on: bool,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>>;

    /// Monotonic scale, lower = quieter; units are opaque and match the
    /// configured admission threshold.
    fn get_signal_strength<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = RigResult<i32>> + Send + 'a>>;
}

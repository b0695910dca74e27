// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-memory transceiver backend for tests and operation without hardware,
//! mirroring the reference deployment's own fake-radio driver: constant
//! frequency on open, a toggled PTT flag, and small pseudo-random
//! signal-strength fluctuation.

use std::future::Future;
use std::pin::Pin;

use rand::Rng;
use xmit_core::error::RigResult;
use xmit_core::rig::TransceiverAdapter;

/// Default frequency reported until `set_frequency` is called, matching the
/// reference driver's fixed startup value.
const DEFAULT_FREQUENCY_HZ: u64 = 14_074_000;

#[derive(Debug)]
pub struct FakeRig {
    frequency_hz: u64,
    mode: String,
    power_fraction: f32,
    ptt: bool,
}

impl Default for FakeRig {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            mode: "USB".to_string(),
            power_fraction: 1.0,
            ptt: false,
        }
    }
}

impl FakeRig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransceiverAdapter for FakeRig {
    fn open<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    fn set_frequency<'a>(
        &'a mut self,
        hz: u64,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        self.frequency_hz = hz;
        Box::pin(async { Ok(()) })
    }

    fn set_mode<'a>(
        &'a mut self,
        mode: &'a str,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        self.mode = mode.to_string();
        Box::pin(async { Ok(()) })
    }

    fn set_power<'a>(
        &'a mut self,
        fraction: f32,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        self.power_fraction = fraction;
        Box::pin(async { Ok(()) })
    }

    fn set_ptt<'a>(
        &'a mut self,
        on: bool,
    ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
        self.ptt = on;
        Box::pin(async { Ok(()) })
    }

    fn get_signal_strength<'a>(
        &'a mut self,
    ) -> Pin<Box<dyn Future<Output = RigResult<i32>> + Send + 'a>> {
        let strength = -90 + rand::thread_rng().gen_range(0..10);
        Box::pin(async move { Ok(strength) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ptt_is_idempotent_and_tracks_last_value() {
        let mut rig = FakeRig::new();
        rig.set_ptt(true).await.unwrap();
        rig.set_ptt(true).await.unwrap();
        assert!(rig.ptt);
        rig.set_ptt(false).await.unwrap();
        assert!(!rig.ptt);
    }

    #[tokio::test]
    async fn signal_strength_stays_in_the_documented_band() {
        let mut rig = FakeRig::new();
        for _ in 0..50 {
            let strength = rig.get_signal_strength().await.unwrap();
            assert!((-90..-80).contains(&strength));
        }
    }
}

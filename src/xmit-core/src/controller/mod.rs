// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The transmission controller (§4.6): the state machine that owns a
//! transceiver and an audio device for the lifetime of a single occurrence.

pub mod policies;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::audio::{AudioAdapter, AudioDeviceInfo};
use crate::rig::TransceiverAdapter;
use crate::schedule::{wire_mode, Occurrence};

/// Admission and supervision parameters that don't vary per occurrence.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionConfig {
    pub threshold: i32,
    pub max_waiting_time: Duration,
}

/// The terminal state of one call to [`execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every file played (or was skipped after a decode failure) and PTT is off.
    Done,
    /// Shutdown was requested; playback stopped and PTT is off.
    Aborted,
    /// A rig or mode error prevented the occurrence from running at all.
    Failed(String),
}

/// Cooperative shutdown signal, backed by a `tokio::sync::watch<bool>` (§5).
///
/// Cheap to clone; every suspension point in the controller races its sleep
/// against this handle so shutdown is observed within about one second.
#[derive(Clone)]
pub struct ShutdownHandle(tokio::sync::watch::Receiver<bool>);

impl ShutdownHandle {
    pub fn new(receiver: tokio::sync::watch::Receiver<bool>) -> Self {
        Self(receiver)
    }

    /// Current value without waiting.
    pub fn is_set(&self) -> bool {
        *self.0.borrow()
    }

    /// Sleep for `secs`, or return early (`true`) if shutdown fires first.
    pub async fn wait_secs(&mut self, secs: u64) -> bool {
        if self.is_set() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(secs)) => false,
            changed = self.0.changed() => changed.is_err() || self.is_set(),
        }
    }

    /// Resolves the next time the underlying flag changes (or the sender drops).
    pub async fn changed(&mut self) {
        let _ = self.0.changed().await;
    }
}

/// Scoped PTT release (§9 "Scoped PTT release").
///
/// [`PttGuard::acquire`] keys the transmitter; every call site is expected to
/// pair it with [`PttGuard::release`] on every exit path of the enclosing
/// block, including early returns. `Drop` cannot perform the async release
/// itself, so it only logs if a guard is ever dropped still armed — which
/// indicates a bug in the calling code, not a path this design relies on.
struct PttGuard<'a> {
    rig: &'a mut dyn TransceiverAdapter,
    armed: bool,
}

impl<'a> PttGuard<'a> {
    async fn acquire(rig: &'a mut dyn TransceiverAdapter) -> Result<PttGuard<'a>, String> {
        rig.set_ptt(true).await.map_err(|e| e.to_string())?;
        Ok(Self { rig, armed: true })
    }

    async fn release(mut self) {
        self.armed = false;
        if let Err(e) = self.rig.set_ptt(false).await {
            warn!("failed to release PTT: {}", e);
        }
    }
}

impl Drop for PttGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("PTT guard dropped without explicit release; transmitter may still be keyed");
        }
    }
}

/// Execute one occurrence to completion, per §4.6's state diagram.
pub async fn execute(
    occurrence: &Occurrence,
    rig: &mut dyn TransceiverAdapter,
    audio: &dyn AudioAdapter,
    audio_device: &AudioDeviceInfo,
    admission: &AdmissionConfig,
    shutdown: &mut ShutdownHandle,
) -> Outcome {
    // CONFIGURING
    let mode = match wire_mode(&occurrence.mode) {
        Ok(m) => m,
        Err(e) => {
            warn!("occurrence at {} has unsupported mode: {}", occurrence.start, e);
            return Outcome::Failed(e.to_string());
        }
    };

    if let Err(e) = rig.set_mode(mode).await {
        warn!("failed to set mode: {}", e);
        return Outcome::Failed(e.to_string());
    }
    let hz = (occurrence.frequency_mhz * 1_000_000.0).round() as u64;
    if let Err(e) = rig.set_frequency(hz).await {
        warn!("failed to set frequency: {}", e);
        return Outcome::Failed(e.to_string());
    }
    let power_fraction = (occurrence.power_w as f32 / 100.0).clamp(0.0, 1.0);
    if let Err(e) = rig.set_power(power_fraction).await {
        warn!("failed to set power: {}", e);
        return Outcome::Failed(e.to_string());
    }

    // ADMISSION
    if shutdown.is_set() {
        return Outcome::Aborted;
    }
    let admission_start = Instant::now();
    loop {
        match rig.get_signal_strength().await {
            Ok(level) if level < admission.threshold => break,
            Ok(_) => {}
            Err(e) => warn!("signal strength read failed during admission: {}", e),
        }
        if admission_start.elapsed() >= admission.max_waiting_time {
            warn!(
                "admission wait exceeded {:?}; transmitting despite channel activity",
                admission.max_waiting_time
            );
            break;
        }
        if shutdown.wait_secs(10).await {
            return Outcome::Aborted;
        }
    }

    // TRANSMITTING
    let files = list_audio_files(&occurrence.set_folder);
    for file in &files {
        if shutdown.is_set() {
            return Outcome::Aborted;
        }

        let guard = match PttGuard::acquire(rig).await {
            Ok(g) => g,
            Err(e) => {
                warn!("failed to key transmitter: {}", e);
                return Outcome::Failed(e);
            }
        };

        if shutdown.wait_secs(1).await {
            guard.release().await;
            return Outcome::Aborted;
        }

        let shutdown_during_play = play_with_shutdown(audio, file, audio_device, shutdown).await;
        guard.release().await;

        match shutdown_during_play {
            PlayResult::Finished(Ok(())) => {}
            PlayResult::Finished(Err(e)) => {
                warn!("failed to play '{}': {}", file.display(), e);
            }
            PlayResult::Stopped => return Outcome::Aborted,
        }

        let mut remaining = occurrence.pause_s;
        while remaining > 0 {
            if shutdown.wait_secs(1).await {
                return Outcome::Aborted;
            }
            remaining -= 1;
        }
    }

    info!(
        "occurrence at {} complete ({} file(s))",
        occurrence.start,
        files.len()
    );
    Outcome::Done
}

enum PlayResult {
    Finished(Result<(), crate::error::AudioError>),
    Stopped,
}

async fn play_with_shutdown(
    audio: &dyn AudioAdapter,
    file: &Path,
    device: &AudioDeviceInfo,
    shutdown: &mut ShutdownHandle,
) -> PlayResult {
    tokio::select! {
        result = audio.play(file, device) => PlayResult::Finished(result),
        _ = shutdown_poll(shutdown) => {
            audio.stop();
            PlayResult::Stopped
        }
    }
}

/// Polls the shutdown handle once a second until it fires; never returns otherwise.
async fn shutdown_poll(shutdown: &mut ShutdownHandle) {
    loop {
        if shutdown.wait_secs(1).await {
            return;
        }
    }
}

/// Files in `dir` with a recognized extension, ascending lexical on filename (§4.6).
fn list_audio_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("failed to list set {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("wav") || ext.eq_ignore_ascii_case("mp3"))
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}

// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The supervisor / main loop (§4.4): owns the schedule index and the two
//! device adapters, and runs the wait/evaluate/transmit cycle.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::{AudioAdapter, AudioDeviceInfo};
use crate::controller::{self, AdmissionConfig, ShutdownHandle};
use crate::error::OverlapError;
use crate::rig::TransceiverAdapter;
use crate::schedule::ScheduleIndex;

/// Reload signal sender handed to the filesystem watcher (§4.3); payload-free,
/// since a signal is a hint to reload, not a diff.
pub type ReloadSender = mpsc::UnboundedSender<()>;

pub fn reload_channel() -> (ReloadSender, mpsc::UnboundedReceiver<()>) {
    mpsc::unbounded_channel()
}

pub struct Supervisor {
    library_root: PathBuf,
    index: ScheduleIndex,
    rig: Box<dyn TransceiverAdapter>,
    audio: Box<dyn AudioAdapter>,
    audio_device: AudioDeviceInfo,
    admission: AdmissionConfig,
    reload_rx: mpsc::UnboundedReceiver<()>,
    reload_pending: bool,
    shutdown: ShutdownHandle,
}

impl Supervisor {
    /// Loads the initial schedule index; a library root that exists but has
    /// an overlap is a hard error — the caller should treat this as fatal at
    /// startup (§4.7 "If the library root does not exist, that is fatal").
    pub fn new(
        library_root: PathBuf,
        rig: Box<dyn TransceiverAdapter>,
        audio: Box<dyn AudioAdapter>,
        audio_device: AudioDeviceInfo,
        admission: AdmissionConfig,
        reload_rx: mpsc::UnboundedReceiver<()>,
        shutdown: ShutdownHandle,
    ) -> Result<Self, OverlapError> {
        let index = ScheduleIndex::load(&library_root, Local::now())?;
        info!(
            "schedule loaded: {} occurrence(s) under {}",
            index.occurrences().len(),
            library_root.display()
        );
        Ok(Self {
            library_root,
            index,
            rig,
            audio,
            audio_device,
            admission,
            reload_rx,
            reload_pending: false,
            shutdown,
        })
    }

    /// Runs the wait/evaluate/transmit cycle until shutdown is observed,
    /// then performs the cleanup order from §4.4: stop audio, release PTT,
    /// close the transceiver link. Stopping the watcher is the caller's
    /// responsibility, since the watcher outlives a single supervisor run.
    pub async fn run(mut self) {
        loop {
            if self.drain_reloads() {
                self.reload();
                continue;
            }

            let now = Local::now();
            if let Some(occurrence) = self.index.active_at(now).cloned() {
                let outcome = controller::execute(
                    &occurrence,
                    self.rig.as_mut(),
                    self.audio.as_ref(),
                    &self.audio_device,
                    &self.admission,
                    &mut self.shutdown,
                )
                .await;

                let aborted = matches!(outcome, controller::Outcome::Aborted);
                match outcome {
                    controller::Outcome::Done => {
                        info!("occurrence complete: {}", occurrence.set_folder.display())
                    }
                    controller::Outcome::Aborted => info!(
                        "occurrence aborted by shutdown: {}",
                        occurrence.set_folder.display()
                    ),
                    controller::Outcome::Failed(reason) => warn!(
                        "occurrence failed: {}: {}",
                        occurrence.set_folder.display(),
                        reason
                    ),
                }
                // An aborted occurrence's window is still open, so the next
                // iteration would find it active again and re-enter execute()
                // immediately; break instead and let shutdown_sequence run.
                if aborted {
                    break;
                }
                continue;
            }

            if self.shutdown.is_set() {
                break;
            }

            self.wait_for_next_event(now).await;

            if self.shutdown.is_set() {
                break;
            }
        }

        self.shutdown_sequence().await;
    }

    /// Drains all pending reload signals, coalescing bursts into one reload.
    fn drain_reloads(&mut self) -> bool {
        let mut any = std::mem::take(&mut self.reload_pending);
        while self.reload_rx.try_recv().is_ok() {
            any = true;
        }
        any
    }

    fn reload(&mut self) {
        match ScheduleIndex::load(&self.library_root, Local::now()) {
            Ok(index) => {
                info!("schedule reloaded: {} occurrence(s)", index.occurrences().len());
                self.index = index;
            }
            Err(e) => warn!("reload rejected, keeping previous schedule: {}", e),
        }
    }

    async fn wait_for_next_event(&mut self, now: chrono::DateTime<Local>) {
        match self.index.next_start_after(now) {
            Some(next) => {
                let wait = (next - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(1))
                    .max(Duration::from_secs(1));
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = self.reload_rx.recv() => { self.reload_pending = true; }
                    _ = self.shutdown.changed() => {}
                }
            }
            None => {
                tokio::select! {
                    _ = std::future::pending::<()>() => {}
                    _ = self.reload_rx.recv() => { self.reload_pending = true; }
                    _ = self.shutdown.changed() => {}
                }
            }
        }
    }

    async fn shutdown_sequence(&mut self) {
        self.audio.stop();
        if let Err(e) = self.rig.set_ptt(false).await {
            warn!("failed to release PTT during shutdown: {}", e);
        }
        if let Err(e) = self.rig.close().await {
            warn!("failed to close transceiver link during shutdown: {}", e);
        }
        info!("supervisor shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioDeviceInfo;
    use crate::error::{AudioError, RigResult};
    use std::future::Future;
    use std::path::Path;
    use std::pin::Pin;

    struct NullRig;

    impl TransceiverAdapter for NullRig {
        fn open<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn close<'a>(&'a mut self) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn set_frequency<'a>(
            &'a mut self,
            _hz: u64,
        ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn set_mode<'a>(
            &'a mut self,
            _mode: &'a str,
        ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn set_power<'a>(
            &'a mut self,
            _fraction: f32,
        ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn set_ptt<'a>(
            &'a mut self,
            _on: bool,
        ) -> Pin<Box<dyn Future<Output = RigResult<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn get_signal_strength<'a>(
            &'a mut self,
        ) -> Pin<Box<dyn Future<Output = RigResult<i32>> + Send + 'a>> {
            Box::pin(async { Ok(-100) })
        }
    }

    struct NullAudio;

    impl AudioAdapter for NullAudio {
        fn list_devices(&self) -> Result<Vec<AudioDeviceInfo>, AudioError> {
            Ok(Vec::new())
        }
        fn play<'a>(
            &'a self,
            _file: &'a Path,
            _device: &'a AudioDeviceInfo,
        ) -> Pin<Box<dyn Future<Output = Result<(), AudioError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
        fn stop(&self) {}
    }

    fn tempdir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "xmit-core-supervisor-test-{}-{}",
            label,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn build(root: PathBuf) -> (Supervisor, ReloadSender, tokio::sync::watch::Sender<bool>) {
        let (reload_tx, reload_rx) = reload_channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let device = AudioDeviceInfo {
            index: 0,
            name: "mock".into(),
            host_api: "mock".into(),
        };
        let admission = AdmissionConfig {
            threshold: -80,
            max_waiting_time: Duration::from_secs(1),
        };
        let supervisor = Supervisor::new(
            root,
            Box::new(NullRig),
            Box::new(NullAudio),
            device,
            admission,
            reload_rx,
            ShutdownHandle::new(shutdown_rx),
        )
        .unwrap();
        (supervisor, reload_tx, shutdown_tx)
    }

    #[tokio::test]
    async fn empty_library_waits_until_shutdown() {
        let root = tempdir("empty");
        let (supervisor, _reload_tx, shutdown_tx) = build(root);

        let handle = tokio::spawn(supervisor.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor should shut down promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn reload_signal_picks_up_new_occurrence() {
        let root = tempdir("reload");
        let (supervisor, reload_tx, shutdown_tx) = build(root.clone());

        let handle = tokio::spawn(supervisor.run());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let set_dir = root.join("new-set");
        std::fs::create_dir_all(&set_dir).unwrap();
        std::fs::write(
            set_dir.join("schedule.csv"),
            "Start Date;End Date;Start Time;Duration (minutes);Frequency (MHz);Mode;Power (W);Pause (sec)\n\
             01.01.2030;01.01.2030;10:00;15;14.074;USB;10;30\n",
        )
        .unwrap();
        reload_tx.send(()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor should shut down promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_during_active_occurrence_does_not_busy_loop() {
        let root = tempdir("active-shutdown");
        let set_dir = root.join("active-set");
        std::fs::create_dir_all(&set_dir).unwrap();
        std::fs::write(
            set_dir.join("schedule.csv"),
            "Start Date;End Date;Start Time;Duration (minutes);Frequency (MHz);Mode;Power (W);Pause (sec)\n\
             01.01.2000;01.01.2099;00:00;1440;14.074;USB;10;30\n",
        )
        .unwrap();
        let (supervisor, _reload_tx, shutdown_tx) = build(root);

        let handle = tokio::spawn(supervisor.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("supervisor should abort the active occurrence and shut down promptly, not busy-loop until its window ends")
            .unwrap();
    }
}

// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};

use xmit_app::{init_logging, ConfigFile};
use xmit_backend::{CpalAudio, FakeRig, LibraryWatcher, NetRig};
use xmit_core::audio::{AudioAdapter, AudioDeviceInfo};
use xmit_core::controller::policies::{FixedDelay, RetryPolicy};
use xmit_core::controller::{AdmissionConfig, ShutdownHandle};
use xmit_core::rig::TransceiverAdapter;
use xmit_core::supervisor::{reload_channel, Supervisor};

use config::DaemonConfig;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - unattended scheduled-transmission daemon");

/// Fatal configuration error; exits with the code from §6.
const FATAL_CONFIG_EXIT: u8 = 1;

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file, bypassing the default search order
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the config file's [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,

    /// Override the config file's [rig].address
    #[arg(long = "rig-address", value_name = "HOST:PORT")]
    rig_address: Option<String>,

    /// Override the config file's [daemon].audio_device_name
    #[arg(long = "audio-device", value_name = "NAME")]
    audio_device: Option<String>,

    /// Override the config file's [daemon].transmission_sets_path
    #[arg(long = "transmission-sets-path", value_name = "PATH")]
    transmission_sets_path: Option<PathBuf>,

    /// Use the in-memory fake transceiver backend instead of the network one
    #[arg(long = "fake-rig")]
    fake_rig: bool,
}

fn load_config(cli: &Cli) -> Result<DaemonConfig, ()> {
    let loaded = match &cli.config {
        Some(path) => DaemonConfig::load_from_file(path).map(|cfg| (cfg, Some(path.clone()))),
        None => DaemonConfig::load_from_default_paths(),
    };

    match loaded {
        Ok((mut cfg, path)) => {
            if let Some(path) = &path {
                info!("loaded configuration from {}", path.display());
            } else {
                info!("no configuration file found, using documented defaults");
            }

            if let Some(level) = &cli.log_level {
                cfg.logging.level = level.clone();
            }
            if let Some(address) = &cli.rig_address {
                cfg.rig.address = address.clone();
            }
            if let Some(device) = &cli.audio_device {
                cfg.daemon.audio_device_name = device.clone();
            }
            if let Some(path) = &cli.transmission_sets_path {
                cfg.daemon.transmission_sets_path = path.clone();
            }
            Ok(cfg)
        }
        Err(e) => {
            eprintln!("fatal: failed to load configuration: {e}");
            Err(())
        }
    }
}

/// Retry `rig.open()` at the device-supervision interval (§4.7), checking
/// shutdown at 1-second granularity between attempts. Returns `false` if
/// shutdown fires before a link is established.
async fn acquire_rig(
    rig: &mut dyn TransceiverAdapter,
    address: &str,
    mut shutdown_rx: watch::Receiver<bool>,
) -> bool {
    let policy = FixedDelay::default_device();
    loop {
        match rig.open().await {
            Ok(()) => return true,
            Err(e) => {
                if !policy.should_retry(&e) {
                    error!("failed to establish transceiver link at {}: {}", address, e);
                    return false;
                }
                error!(
                    "failed to establish transceiver link at {}: {} (retrying in {:?})",
                    address,
                    e,
                    policy.delay()
                );
            }
        }

        if *shutdown_rx.borrow() {
            return false;
        }
        let mut waited = Duration::ZERO;
        while waited < policy.delay() {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => waited += Duration::from_secs(1),
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return false;
                    }
                }
            }
        }
    }
}

/// Retry resolving the configured audio device name at the device-supervision
/// interval (§4.7), printing the available device list on each miss.
async fn acquire_audio_device(
    audio: &dyn AudioAdapter,
    needle: &str,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Option<AudioDeviceInfo> {
    let policy = FixedDelay::default_device();
    loop {
        match audio.open_by_name(needle) {
            Ok(device) => return Some(device),
            Err(e) => {
                error!("no audio output device matching '{}': {}", needle, e);
                match audio.list_devices() {
                    Ok(devices) => {
                        for d in &devices {
                            info!("available audio device: {} ({})", d.name, d.host_api);
                        }
                    }
                    Err(e) => error!("failed to enumerate audio devices: {}", e),
                }
            }
        }

        if *shutdown_rx.borrow() {
            return None;
        }
        let mut waited = Duration::ZERO;
        while waited < policy.delay() {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => waited += Duration::from_secs(1),
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        return None;
                    }
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging cannot be initialized before the config is loaded, since the
    // config supplies the default level; any config error before this point
    // is reported with eprintln! rather than tracing.
    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(()) => return ExitCode::from(FATAL_CONFIG_EXIT),
    };

    init_logging(Some(&cfg.logging.level));

    if !cfg.daemon.transmission_sets_path.is_dir() {
        error!(
            "transmission_sets_path '{}' does not exist or is not a directory",
            cfg.daemon.transmission_sets_path.display()
        );
        return ExitCode::from(FATAL_CONFIG_EXIT);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let audio = CpalAudio::new();
    let audio_device = match acquire_audio_device(&audio, &cfg.daemon.audio_device_name, shutdown_rx.clone()).await {
        Some(device) => device,
        None => return ExitCode::from(FATAL_CONFIG_EXIT),
    };

    let mut rig: Box<dyn TransceiverAdapter> = if cli.fake_rig {
        info!("using in-memory fake transceiver backend");
        Box::new(FakeRig::new())
    } else {
        Box::new(NetRig::new(cfg.rig.address.clone()))
    };

    if !acquire_rig(rig.as_mut(), &cfg.rig.address, shutdown_rx.clone()).await {
        return ExitCode::from(FATAL_CONFIG_EXIT);
    }

    let (reload_tx, reload_rx) = reload_channel();

    let watcher = match LibraryWatcher::start(&cfg.daemon.transmission_sets_path, reload_tx) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            error!(
                "failed to start filesystem watcher on {}: {} (falling back to legacy polling is not implemented; continuing without live reload)",
                cfg.daemon.transmission_sets_path.display(),
                e
            );
            None
        }
    };

    let admission = AdmissionConfig {
        threshold: cfg.rig.signal_power_threshold,
        max_waiting_time: Duration::from_secs(cfg.rig.max_waiting_time),
    };

    let supervisor = match Supervisor::new(
        cfg.daemon.transmission_sets_path.clone(),
        rig,
        Box::new(audio),
        audio_device,
        admission,
        reload_rx,
        ShutdownHandle::new(shutdown_rx),
    ) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            error!("overlapping occurrences in transmission library: {}", e);
            return ExitCode::from(FATAL_CONFIG_EXIT);
        }
    };

    let run_handle = tokio::spawn(supervisor.run());

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("failed to install SIGINT handler: {}", e);
                    }
                }
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!("failed to install SIGTERM handler: {} (relying on SIGINT only)", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to install SIGINT handler: {}", e);
            }
        }
    }
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    drop(watcher);
    let _ = run_handle.await;

    info!("xmitd stopped cleanly");
    ExitCode::SUCCESS
}

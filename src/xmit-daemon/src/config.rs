// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for xmitd (§4.8).
//!
//! Config is loaded from `xmitd.toml`, grouped into `[daemon]`, `[rig]`, and
//! `[logging]` tables. Default search order:
//! 1. Path given via `--config`
//! 2. `./xmitd.toml`
//! 3. `$XDG_CONFIG_HOME/xmitd/xmitd.toml`
//! 4. `/etc/xmitd/xmitd.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use xmit_app::ConfigFile;

fn default_transmission_sets_path() -> PathBuf {
    PathBuf::from("/var/lib/xmitd/sets")
}

fn default_check_interval() -> u64 {
    60
}

fn default_audio_device_name() -> String {
    "pulse".to_string()
}

/// `[daemon]`: library location and legacy polling fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub transmission_sets_path: PathBuf,
    pub check_interval: u64,
    pub audio_device_name: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            transmission_sets_path: default_transmission_sets_path(),
            check_interval: default_check_interval(),
            audio_device_name: default_audio_device_name(),
        }
    }
}

fn default_rig_address() -> String {
    "localhost:4532".to_string()
}

fn default_signal_power_threshold() -> i32 {
    -80
}

fn default_max_waiting_time() -> u64 {
    300
}

/// `[rig]`: transceiver endpoint and admission parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigSection {
    pub address: String,
    pub signal_power_threshold: i32,
    pub max_waiting_time: u64,
}

impl Default for RigSection {
    fn default() -> Self {
        Self {
            address: default_rig_address(),
            signal_power_threshold: default_signal_power_threshold(),
            max_waiting_time: default_max_waiting_time(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// `[logging]`: level only. The reference deployment's `file` key is accepted
/// for configuration compatibility but has no effect (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: None,
        }
    }
}

/// Top-level `xmitd.toml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub daemon: DaemonSection,
    pub rig: RigSection,
    pub logging: LoggingSection,
}

impl ConfigFile for DaemonConfig {
    fn config_filename() -> &'static str {
        "xmitd.toml"
    }
}

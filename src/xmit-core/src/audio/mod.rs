// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::error::AudioError;

/// One enumerated output device (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    pub index: usize,
    pub name: String,
    pub host_api: String,
}

/// Capability set for playing pre-recorded audio files to a named output device.
///
/// `play` and `stop` take `&self`: the concrete backend holds its mutable
/// stream state behind interior mutability so that a caller can race `play`
/// against a periodic shutdown check and call `stop` from the losing branch
/// without fighting the borrow checker (§5 "Suspension points").
pub trait AudioAdapter: Send + Sync {
    /// Enumerate output devices in host order.
    fn list_devices(&self) -> Result<Vec<AudioDeviceInfo>, AudioError>;

    /// First device whose name contains `needle`, case-insensitively.
    fn open_by_name(&self, needle: &str) -> Result<AudioDeviceInfo, AudioError> {
        let devices = self.list_devices()?;
        let needle_lower = needle.to_ascii_lowercase();
        devices
            .into_iter()
            .find(|d| d.name.to_ascii_lowercase().contains(&needle_lower))
            .ok_or_else(|| AudioError::DeviceNotFound(needle.to_string()))
    }

    /// Decode `file` and play it to completion on `device`, resampling to the
    /// device's native rate as needed. Returns early, without error, if
    /// [`AudioAdapter::stop`] is called mid-playback.
    fn play<'a>(
        &'a self,
        file: &'a Path,
        device: &'a AudioDeviceInfo,
    ) -> Pin<Box<dyn Future<Output = Result<(), AudioError>> + Send + 'a>>;

    /// Safe to call at any time, including when nothing is playing.
    fn stop(&self);
}

// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

/// Error returned by a transceiver adapter call (`ERR_LINK`).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RigError {
    pub message: String,
    pub kind: RigErrorKind,
}

/// Classification of rig errors for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigErrorKind {
    /// Temporary failure that may succeed on retry (timeout, link drop).
    Transient,
    /// Permanent failure that won't be fixed by retrying.
    Permanent,
}

pub type RigResult<T> = Result<T, RigError>;

impl RigError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: RigErrorKind::Transient,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: RigErrorKind::Permanent,
        }
    }

    pub fn link(message: impl Into<String>) -> Self {
        Self::transient(message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind == RigErrorKind::Transient
    }
}

/// Error returned by the audio adapter (`ERR_AUDIO_DEVICE`, `ERR_AUDIO_DECODE`).
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device matching '{0}'")]
    DeviceNotFound(String),

    #[error("failed to enumerate audio devices: {0}")]
    Enumeration(String),

    #[error("failed to open audio device '{device}': {source}")]
    OpenFailed {
        device: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to decode '{file}': {source}")]
    Decode {
        file: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Unknown mode string encountered at fire time (`ERR_MODE`).
#[derive(Debug, Error)]
#[error("unsupported mode: {0}")]
pub struct ModeError(pub String);

/// Overlap across two occurrences detected while building a schedule index (`ERR_OVERLAP`).
#[derive(Debug, Error)]
#[error("overlapping occurrences: {first} ({first_set}) and {second} ({second_set})")]
pub struct OverlapError {
    pub first: String,
    pub first_set: String,
    pub second: String,
    pub second_set: String,
}

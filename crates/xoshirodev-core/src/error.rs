//! Error types surfaced by the device and its configuration.
//!
//! Nothing here is retried internally: every failure goes straight back to the
//! caller that triggered it.

use thiserror::Error;

/// Errors returned from device entry points (open, read, write, shutdown).
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A session is already open; the device admits one reader at a time.
    #[error("device busy: a session is already open")]
    Busy,

    /// The destination of a read could not be written. The read is aborted and
    /// bytes handed out before the failing chunk stay consumed.
    #[error("read destination not writable")]
    Fault {
        #[source]
        source: std::io::Error,
    },

    /// The device is read-only.
    #[error("write operation on /dev/{name} not supported")]
    Unsupported { name: String },

    /// Shutdown was requested while sessions still hold the device.
    #[error("device still pinned by {pins} open session(s)")]
    Pinned { pins: usize },
}

impl DeviceError {
    /// Short, stable identifier, suitable for logs and exit messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Fault { .. } => "fault",
            Self::Unsupported { .. } => "unsupported",
            Self::Pinned { .. } => "pinned",
        }
    }
}

/// Errors raised while loading or validating a [`DeviceConfig`](crate::DeviceConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("buffer must hold at least one generator word")]
    ZeroCapacity,

    #[error("device name must be a non-empty path component, got {0:?}")]
    InvalidName(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Returned by [`fill_words`](crate::buffer::fill_words) when the target is not
/// a whole number of generator words.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("fill length {len} is not a multiple of {word} bytes")]
pub struct MisalignedFill {
    pub len: usize,
    pub word: usize,
}

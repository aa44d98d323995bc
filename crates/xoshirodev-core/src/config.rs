//! Device configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::generator::WORD_BYTES;

/// Default device name (the node is `/dev/<name>` or `<dir>/<name>`).
pub const DEFAULT_NAME: &str = "xoshiro256";

/// Default buffer size in generator words (1 KiB of bytes).
pub const DEFAULT_BUFFER_WORDS: usize = 128;

/// How each generator word is serialized into the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Host byte order; reproduces the stream of a native build bit-for-bit.
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    /// Serialize one word.
    #[inline]
    pub fn word_bytes(self, word: u64) -> [u8; WORD_BYTES] {
        match self {
            Self::Native => word.to_ne_bytes(),
            Self::Little => word.to_le_bytes(),
            Self::Big => word.to_be_bytes(),
        }
    }

    /// Parse a CLI-style name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "native" | "ne" => Some(Self::Native),
            "little" | "le" => Some(Self::Little),
            "big" | "be" => Some(Self::Big),
            _ => None,
        }
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Little => write!(f, "little"),
            Self::Big => write!(f, "big"),
        }
    }
}

/// Settings fixed at startup for the lifetime of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub buffer_words: usize,
    pub byte_order: ByteOrder,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            buffer_words: DEFAULT_BUFFER_WORDS,
            byte_order: ByteOrder::Native,
        }
    }
}

impl DeviceConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_words == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.name.is_empty() || self.name.contains('/') || self.name == "." || self.name == ".."
        {
            return Err(ConfigError::InvalidName(self.name.clone()));
        }
        Ok(())
    }

    /// Buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer_words * WORD_BYTES
    }
}

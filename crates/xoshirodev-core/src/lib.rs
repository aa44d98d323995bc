//! # xoshirodev-core
//!
//! **A read-only pseudo-random device backed by xoshiro256+.**
//!
//! One reader at a time opens the device and pulls an endless byte stream out
//! of it. The stream is the generator's 64-bit words serialized back to back,
//! so for a given seed it is fully reproducible.
//!
//! ## Quick Start
//!
//! ```
//! use xoshirodev_core::{DeviceConfig, RandomDevice};
//!
//! let device = RandomDevice::startup(DeviceConfig::default()).unwrap();
//!
//! let mut session = device.open().unwrap();
//! let bytes = session.read_bytes(4096);
//! assert_eq!(bytes.len(), 4096);
//!
//! // A second reader is turned away until the first closes.
//! assert!(device.open().is_err());
//! session.close();
//! assert!(device.open().is_ok());
//! ```
//!
//! ## Architecture
//!
//! Generator → Refill buffer → Session → Reader
//!
//! - [`Xoshiro256Plus`]: 256-bit state, one word per step. Not
//!   cryptographically secure.
//! - [`RandomBuffer`]: `N` words serialized into bytes, regenerated as a whole
//!   when the cursor reaches the end.
//! - [`SessionController`]: admits a single reader; a second open gets
//!   [`DeviceError::Busy`].
//! - [`RandomDevice`]: the context a host creates once and shares by `Arc`.
//!
//! Host entry points map onto the API as follows:
//!
//! | host call   | API                                   |
//! |-------------|---------------------------------------|
//! | startup     | [`RandomDevice::startup`]             |
//! | open        | [`RandomDevice::open`]                |
//! | read        | [`Session::read_to`] / [`Session::read_into`] |
//! | write       | [`RandomDevice::write`] (always fails) |
//! | close       | [`Session::close`] or drop            |
//! | shutdown    | [`RandomDevice::shutdown`]            |

pub mod buffer;
pub mod config;
pub mod device;
pub mod error;
pub mod generator;
pub mod session;

pub use buffer::{RandomBuffer, fill_words};
pub use config::{ByteOrder, DEFAULT_BUFFER_WORDS, DEFAULT_NAME, DeviceConfig};
pub use device::{DeviceStats, RandomDevice, Session};
pub use error::{ConfigError, DeviceError, MisalignedFill};
pub use generator::{DEFAULT_SEED, WORD_BYTES, Xoshiro256Plus};
pub use session::{SessionController, SessionState};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod device;
pub mod report;
pub mod stream;
pub mod words;

use std::sync::Arc;

use xoshirodev_core::{ByteOrder, ConfigError, DeviceConfig, RandomDevice};

use crate::DeviceArgs;

/// Build the effective config: file (if any), then command-line overrides.
pub fn resolve_config(args: &DeviceArgs) -> Result<DeviceConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => DeviceConfig::load(path)?,
        None => DeviceConfig::default(),
    };
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(words) = args.buffer_words {
        config.buffer_words = words;
    }
    if let Some(order) = &args.byte_order {
        config.byte_order = parse_byte_order(order);
    }
    config.validate()?;
    Ok(config)
}

/// [`resolve_config`], exiting with a message on failure.
pub fn load_config(args: &DeviceArgs) -> DeviceConfig {
    match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Start a device, exiting with a message on failure.
pub fn start_device(config: DeviceConfig) -> Arc<RandomDevice> {
    match RandomDevice::startup(config) {
        Ok(device) => device,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse a byte order name into the enum.
pub fn parse_byte_order(s: &str) -> ByteOrder {
    ByteOrder::parse(s).unwrap_or_else(|| {
        eprintln!("Unknown byte order '{s}', using native");
        ByteOrder::Native
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_byte_order() {
        assert_eq!(parse_byte_order("little"), ByteOrder::Little);
        assert_eq!(parse_byte_order("big"), ByteOrder::Big);
        assert_eq!(parse_byte_order("native"), ByteOrder::Native);
    }

    #[test]
    fn test_parse_unknown_defaults_native() {
        assert_eq!(parse_byte_order("middle"), ByteOrder::Native);
        assert_eq!(parse_byte_order("LITTLE"), ByteOrder::Native); // case-sensitive
    }

    #[test]
    fn test_resolve_defaults() {
        let config = resolve_config(&DeviceArgs::default()).unwrap();
        assert_eq!(config, DeviceConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"name": "fromfile", "buffer_words": 16}}"#).unwrap();
        let args = DeviceArgs {
            config: Some(f.path().to_string_lossy().into_owned()),
            buffer_words: Some(32),
            byte_order: Some("big".to_string()),
            ..DeviceArgs::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.name, "fromfile");
        assert_eq!(config.buffer_words, 32);
        assert_eq!(config.byte_order, ByteOrder::Big);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = DeviceArgs {
            buffer_words: Some(0),
            ..DeviceArgs::default()
        };
        assert!(matches!(
            resolve_config(&args),
            Err(ConfigError::ZeroCapacity)
        ));
    }
}

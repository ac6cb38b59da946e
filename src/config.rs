//! # Controller Configuration
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [device]
//! serial = "/dev/ttyUSB0"
//! baud = 250000
//!
//! [printer]
//! name = "Workshop MK3"
//! extruders = 2
//!
//! [preheat]
//! bed_temperature = 60.0
//! hotend_temperature = 210.0
//! duration_secs = 600
//!
//! [capabilities]
//! can_control_manually = false
//! ```
//!
//! Every field is optional. Without `device.serial` commands are only logged.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub printer: PrinterConfig,
    #[serde(default)]
    pub preheat: PreheatConfig,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

/// Serial link to the device.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: None,
            baud: default_baud(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrinterConfig {
    #[serde(default = "default_printer_name")]
    pub name: String,
    #[serde(default = "default_extruders")]
    pub extruders: usize,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: default_printer_name(),
            extruders: default_extruders(),
        }
    }
}

/// Values used when a pre-heat request leaves them out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreheatConfig {
    #[serde(default = "default_bed_temperature")]
    pub bed_temperature: f64,
    #[serde(default = "default_hotend_temperature")]
    pub hotend_temperature: f64,
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
}

impl Default for PreheatConfig {
    fn default() -> Self {
        Self {
            bed_temperature: default_bed_temperature(),
            hotend_temperature: default_hotend_temperature(),
            duration_secs: default_duration_secs(),
        }
    }
}

/// What the connected printer lets a user do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CapabilitiesConfig {
    #[serde(default = "enabled")]
    pub can_pause: bool,
    #[serde(default = "enabled")]
    pub can_abort: bool,
    #[serde(default = "enabled")]
    pub can_pre_heat_bed: bool,
    #[serde(default = "enabled")]
    pub can_pre_heat_hotends: bool,
    #[serde(default = "enabled")]
    pub can_control_manually: bool,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            can_pause: true,
            can_abort: true,
            can_pre_heat_bed: true,
            can_pre_heat_hotends: true,
            can_control_manually: true,
        }
    }
}

fn default_baud() -> u32 { 115200 }
fn default_printer_name() -> String { "printer".to_string() }
fn default_extruders() -> usize { 1 }
fn default_bed_temperature() -> f64 { 60.0 }
fn default_hotend_temperature() -> f64 { 200.0 }
fn default_duration_secs() -> u32 { 900 }
fn enabled() -> bool { true }

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.device.serial, None);
        assert_eq!(config.device.baud, 115200);
        assert_eq!(config.printer.extruders, 1);
        assert_eq!(config.preheat.duration_secs, 900);
        assert_eq!(config.capabilities, CapabilitiesConfig::default());
        assert!(config.capabilities.can_control_manually);
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "[printer]\nname = 'bench'\nextruders = 2\n\n[capabilities]\ncan_abort = false"
        )
        .unwrap();
        file.flush().unwrap();
        let config = load_config(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.printer.name, "bench");
        assert_eq!(config.printer.extruders, 2);
        assert!(!config.capabilities.can_abort);
        // Defaults for missing fields
        assert!(config.capabilities.can_pause);
        assert_eq!(config.preheat.bed_temperature, 60.0);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/printer-control.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_config_bad_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        std::fs::write(&file_path, "[printer\nname = ").unwrap();
        let err = load_config(file_path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}

//! Dispatcher configuration.
//!
//! # Example
//!
//! ```toml
//! chip = "gpiochip0"
//! max_units = 8
//! queue_depth = 100
//! consumer = "gpiodev"
//! ```

use serde::Deserialize;

use crate::error::{DeviceError, Result};

/// Configuration for a [`UnitTable`](crate::UnitTable).
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Name of the line chip to acquire on open (e.g., "gpiochip0").
    #[serde(default = "default_chip")]
    pub chip: String,

    /// Capacity of the unit table.
    #[serde(default = "default_max_units")]
    pub max_units: usize,

    /// Depth of each unit's bounded work queue.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Consumer label used when requesting lines from the backend.
    #[serde(default = "default_consumer")]
    pub consumer: String,
}

fn default_chip() -> String {
    "gpiochip0".to_string()
}

fn default_max_units() -> usize {
    8
}

fn default_queue_depth() -> usize {
    100
}

fn default_consumer() -> String {
    "gpiodev".to_string()
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            chip: default_chip(),
            max_units: default_max_units(),
            queue_depth: default_queue_depth(),
            consumer: default_consumer(),
        }
    }
}

impl DispatcherConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| DeviceError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints the deserializer cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chip.is_empty() {
            return Err(DeviceError::Config {
                message: "chip name cannot be empty".to_string(),
            });
        }
        if self.max_units == 0 {
            return Err(DeviceError::Config {
                message: "max_units must be at least 1".to_string(),
            });
        }
        if self.queue_depth == 0 {
            return Err(DeviceError::Config {
                message: "queue_depth must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

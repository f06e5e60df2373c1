//! Daemon configuration.
//!
//! Loaded from a single TOML file. Every section has defaults so the
//! daemon can also start without a config file.

use feeder_common::config::{ConfigError, SharedConfig};
use serde::Deserialize;

/// Monitor and sweep timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlSection {
    /// Store polling period [ms].
    pub poll_period_ms: u64,
    /// Fixed-angle hold debounce interval [ms].
    pub debounce_ms: u64,
    /// Sweep duty increment [tenths of a percent].
    pub duty_step_tenths: u32,
}

impl Default for ControlSection {
    fn default() -> Self {
        use feeder_common::consts::{DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_PERIOD_MS, DUTY_STEP_TENTHS};
        Self {
            poll_period_ms: DEFAULT_POLL_PERIOD_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            duty_step_tenths: DUTY_STEP_TENTHS,
        }
    }
}

/// HTTP listen address.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub host: String,
    pub port: u16,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Hardware PWM output (only meaningful with the `hardware` feature).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PwmSection {
    /// PWM channel number (0 = BCM GPIO 18, 1 = BCM GPIO 19).
    pub channel: u8,
}

impl Default for PwmSection {
    fn default() -> Self {
        Self { channel: 0 }
    }
}

/// Complete daemon configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "info"
/// service_name = "feederd"
///
/// [control]
/// poll_period_ms = 100
/// debounce_ms = 100
/// duty_step_tenths = 1
///
/// [gateway]
/// host = "0.0.0.0"
/// port = 8000
///
/// [pwm]
/// channel = 0
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FeederConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub control: ControlSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub pwm: PwmSection,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig {
                log_level: Default::default(),
                service_name: "feederd".to_string(),
            },
            control: ControlSection::default(),
            gateway: GatewaySection::default(),
            pwm: PwmSection::default(),
        }
    }
}

impl FeederConfig {
    /// Semantic validation beyond TOML parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.control.poll_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control.poll_period_ms must be non-zero".to_string(),
            ));
        }
        if self.control.debounce_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control.debounce_ms must be non-zero".to_string(),
            ));
        }
        if self.control.duty_step_tenths == 0 {
            return Err(ConfigError::ValidationError(
                "control.duty_step_tenths must be non-zero".to_string(),
            ));
        }
        if self.pwm.channel > 1 {
            return Err(ConfigError::ValidationError(format!(
                "pwm.channel must be 0 or 1, got {}",
                self.pwm.channel
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeder_common::config::ConfigLoader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_validate() {
        assert!(FeederConfig::default().validate().is_ok());
    }

    #[test]
    fn loads_full_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[shared]\nlog_level = \"debug\"\nservice_name = \"feederd-01\"\n\
             [control]\npoll_period_ms = 50\ndebounce_ms = 80\nduty_step_tenths = 5\n\
             [gateway]\nhost = \"127.0.0.1\"\nport = 9000\n\
             [pwm]\nchannel = 1"
        )
        .unwrap();

        let config = FeederConfig::load(file.path()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.control.poll_period_ms, 50);
        assert_eq!(config.control.duty_step_tenths, 5);
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.pwm.channel, 1);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[shared]\nservice_name = \"feederd\"").unwrap();

        let config = FeederConfig::load(file.path()).unwrap();
        assert_eq!(config.control.poll_period_ms, 100);
        assert_eq!(config.control.duty_step_tenths, 1);
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.pwm.channel, 0);
    }

    #[test]
    fn zero_poll_period_is_rejected() {
        let mut config = FeederConfig::default();
        config.control.poll_period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_duty_step_is_rejected() {
        let mut config = FeederConfig::default();
        config.control.duty_step_tenths = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_pwm_channel_is_rejected() {
        let mut config = FeederConfig::default();
        config.pwm.channel = 3;
        assert!(config.validate().is_err());
    }
}

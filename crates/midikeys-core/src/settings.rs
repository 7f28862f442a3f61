// Midikeys Settings Module
// Engine tuning loaded from a TOML file, overridable from the CLI

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::OverrideChannels;
use crate::combo::{DirectionalPair, KeyCombo};
use crate::rotary::RotaryParams;

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// One override-channel row: the channel number plus the descriptors its
/// pulses fire.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OverrideChannelConfig {
    pub channel: u8,
    pub positive: String,
    pub negative: String,
}

/// Engine settings with their built-in defaults.
///
/// Loaded from `~/.config/midikeys/settings.toml` (or a `--config` path);
/// every field is optional in the file.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Scheduler tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Rotary state eviction timeout in milliseconds.
    pub idle_timeout_ms: u64,
    /// Samples per direction for one threshold-counter pulse.
    pub pulse_threshold: u32,
    /// EMA smoothing factor (0..1]. Higher -> more responsive, less smooth.
    pub alpha: f32,
    /// Normalized threshold (0..1) below which movement is ignored.
    pub deadzone: f32,
    /// Exponent applied to magnitude for the nonlinear response curve.
    pub power: f32,
    /// Maximum pulses per second at full encoder deflection.
    pub max_rate: f32,
    /// Log resolved actions instead of injecting them.
    pub dry_run: bool,
    /// Channels that always classify as rotary; `None` means the stock
    /// jog-wheel layout.
    pub override_channels: Option<Vec<OverrideChannelConfig>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10,
            idle_timeout_ms: 350,
            pulse_threshold: 15,
            alpha: 0.25,
            deadzone: 0.1,
            power: 1.3,
            max_rate: 80.0,
            dry_run: false,
            override_channels: None,
        }
    }
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SettingsToml {
    #[serde(default)]
    scheduler: Option<SchedulerToml>,

    #[serde(default)]
    rotary: Option<RotaryToml>,

    #[serde(default)]
    output: Option<OutputToml>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SchedulerToml {
    #[serde(default)]
    tick_interval_ms: Option<u64>,

    #[serde(default)]
    idle_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct RotaryToml {
    #[serde(default)]
    pulse_threshold: Option<u32>,

    #[serde(default)]
    alpha: Option<f32>,

    #[serde(default)]
    deadzone: Option<f32>,

    #[serde(default)]
    power: Option<f32>,

    #[serde(default)]
    max_rate: Option<f32>,

    #[serde(default)]
    override_channels: Option<Vec<OverrideChannelConfig>>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct OutputToml {
    #[serde(default)]
    dry_run: Option<bool>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(scheduler) = toml_settings.scheduler {
            if let Some(tick) = scheduler.tick_interval_ms {
                settings.tick_interval_ms = tick;
            }
            if let Some(timeout) = scheduler.idle_timeout_ms {
                settings.idle_timeout_ms = timeout;
            }
        }

        if let Some(rotary) = toml_settings.rotary {
            if let Some(threshold) = rotary.pulse_threshold {
                settings.pulse_threshold = threshold;
            }
            if let Some(alpha) = rotary.alpha {
                settings.alpha = alpha;
            }
            if let Some(deadzone) = rotary.deadzone {
                settings.deadzone = deadzone;
            }
            if let Some(power) = rotary.power {
                settings.power = power;
            }
            if let Some(max_rate) = rotary.max_rate {
                settings.max_rate = max_rate;
            }
            settings.override_channels = rotary.override_channels;
        }

        if let Some(output) = toml_settings.output {
            if let Some(dry_run) = output.dry_run {
                settings.dry_run = dry_run;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("midikeys").join("settings.toml"))
    }

    /// Load from the default location, falling back to built-in defaults
    /// when no file exists.
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    /// Reject values the engine arithmetic cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.pulse_threshold == 0 {
            return Err(SettingsError::InvalidValue(
                "pulse_threshold must be positive".to_string(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SettingsError::InvalidValue(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(SettingsError::InvalidValue(format!(
                "deadzone must be in [0, 1), got {}",
                self.deadzone
            )));
        }
        if self.power <= 0.0 {
            return Err(SettingsError::InvalidValue(format!(
                "power must be positive, got {}",
                self.power
            )));
        }
        if self.max_rate <= 0.0 {
            return Err(SettingsError::InvalidValue(format!(
                "max_rate must be positive, got {}",
                self.max_rate
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Rotary tuning in the tracker's terms.
    pub fn rotary_params(&self) -> RotaryParams {
        RotaryParams {
            pulse_threshold: self.pulse_threshold,
            alpha: self.alpha,
            deadzone: self.deadzone,
            power: self.power,
            max_rate: self.max_rate,
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }

    /// Parse the override-channel descriptors into classifier form. An
    /// unparseable descriptor invalidates the whole section rather than
    /// silently dropping a channel.
    pub fn override_channels(&self) -> Result<OverrideChannels, SettingsError> {
        let Some(rows) = &self.override_channels else {
            return Ok(OverrideChannels::defaults());
        };

        let mut overrides = OverrideChannels::new();
        for row in rows {
            let positive = KeyCombo::parse(&row.positive).map_err(|e| {
                SettingsError::InvalidValue(format!("override channel {}: {}", row.channel, e))
            })?;
            let negative = KeyCombo::parse(&row.negative).map_err(|e| {
                SettingsError::InvalidValue(format!("override channel {}: {}", row.channel, e))
            })?;
            overrides.insert(row.channel, DirectionalPair { positive, negative });
        }
        Ok(overrides)
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Midikeys Settings
# Place this file at: ~/.config/midikeys/settings.toml

[scheduler]
# Pulse scheduler tick period in milliseconds
tick_interval_ms = 10
# Rotary state is dropped after this much silence (milliseconds)
idle_timeout_ms = 350

[rotary]
# Samples per direction before a jog-wheel pulse fires
pulse_threshold = 15
# EMA smoothing factor (0..1]; higher follows the encoder faster
alpha = 0.25
# Normalized deadzone (0..1) below which movement is ignored
deadzone = 0.1
# Nonlinear response curve exponent
power = 1.3
# Maximum pulses per second at full deflection
max_rate = 80.0

# Channels that are always treated as jog wheels, with the keystrokes
# fired for each rotation direction.
[[rotary.override_channels]]
channel = 1
positive = "Right"
negative = "Left"

[[rotary.override_channels]]
channel = 2
positive = "Ctrl+Right"
negative = "Ctrl+Left"

[output]
# Log resolved actions instead of injecting keystrokes
dry_run = false
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::new();
        assert_eq!(settings.tick_interval_ms, 10);
        assert_eq!(settings.pulse_threshold, 15);
        assert_eq!(settings.idle_timeout_ms, 350);
        assert!(!settings.dry_run);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_from_toml() {
        let toml = r#"
[scheduler]
tick_interval_ms = 20

[rotary]
pulse_threshold = 10
alpha = 0.5

[output]
dry_run = true
"#;
        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.tick_interval_ms, 20);
        assert_eq!(settings.idle_timeout_ms, 350);
        assert_eq!(settings.pulse_threshold, 10);
        assert_eq!(settings.alpha, 0.5);
        assert!(settings.dry_run);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::from_toml("[rotary]\nalpha = 0.0\n").is_err());
        assert!(Settings::from_toml("[rotary]\nalpha = 1.5\n").is_err());
        assert!(Settings::from_toml("[rotary]\ndeadzone = 1.0\n").is_err());
        assert!(Settings::from_toml("[rotary]\nmax_rate = -1.0\n").is_err());
        assert!(Settings::from_toml("[scheduler]\ntick_interval_ms = 0\n").is_err());
        assert!(Settings::from_toml("not toml at all [").is_err());
    }

    #[test]
    fn test_default_override_channels() {
        let settings = Settings::new();
        let overrides = settings.override_channels().unwrap();
        assert_eq!(overrides.pair(1).unwrap().positive.to_string(), "Right");
        assert_eq!(
            overrides.pair(2).unwrap().positive.to_string(),
            "Ctrl+Right"
        );
        assert!(overrides.pair(3).is_none());
    }

    #[test]
    fn test_override_channels_from_toml() {
        let toml = r#"
[[rotary.override_channels]]
channel = 4
positive = "PageDown"
negative = "PageUp"
"#;
        let settings = Settings::from_toml(toml).unwrap();
        let overrides = settings.override_channels().unwrap();
        assert!(overrides.pair(1).is_none());
        assert_eq!(overrides.pair(4).unwrap().positive.to_string(), "PageDown");
        assert_eq!(overrides.pair(4).unwrap().negative.to_string(), "PageUp");
    }

    #[test]
    fn test_bad_override_descriptor() {
        let toml = r#"
[[rotary.override_channels]]
channel = 4
positive = ""
negative = "Left"
"#;
        let settings = Settings::from_toml(toml).unwrap();
        assert!(matches!(
            settings.override_channels(),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_default_content_parses() {
        let settings = Settings::from_toml(default_settings_content()).unwrap();
        assert_eq!(settings.tick_interval_ms, 10);
        let overrides = settings.override_channels().unwrap();
        assert_eq!(overrides.pair(2).unwrap().negative.to_string(), "Ctrl+Left");
    }
}

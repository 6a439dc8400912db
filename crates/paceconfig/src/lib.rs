//! TOML configuration for the stormpace quality runtime.
//!
//! A document has four optional sections on top of the mandatory `version`:
//!
//! ```toml
//! version = 1
//!
//! [controller]          # hysteresis constants of the tier state machine
//! [lifecycle]           # run-loop gates and their thresholds
//! [device]              # overrides for device signals the host cannot report
//! [overrides.low]       # per-tier patches applied on top of the tier catalog
//! ```
//!
//! Every field has a default, so an empty document (`version = 1`) describes
//! the stock behaviour.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Tier names as they appear in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierName {
    Low,
    Medium,
    High,
}

impl TierName {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaceConfig {
    pub version: u32,
    #[serde(default)]
    pub controller: ControllerSection,
    #[serde(default)]
    pub lifecycle: LifecycleSection,
    #[serde(default)]
    pub device: DeviceSection,
    /// Keyed by tier name (`low`, `medium`, `high`).
    #[serde(default)]
    pub overrides: BTreeMap<String, SettingsPatch>,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            controller: ControllerSection::default(),
            lifecycle: LifecycleSection::default(),
            device: DeviceSection::default(),
            overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Samples per evaluation window.
    pub window: usize,
    /// Consecutive slow windows before dropping a tier.
    pub degrade_after: u32,
    /// Consecutive good frames before trying a higher tier.
    pub upgrade_after_frames: u32,
    /// A window is slow when its average exceeds `slow_factor * budget`.
    pub slow_factor: f32,
    /// Preferred starting tier; still clamped by the device ceiling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_tier: Option<TierName>,
    /// Replaces the probed device ceiling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<TierName>,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            window: 60,
            degrade_after: 3,
            upgrade_after_frames: 300,
            slow_factor: 1.5,
            initial_tier: None,
            ceiling: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleSection {
    pub respect_tab_visibility: bool,
    pub respect_reduced_motion: bool,
    pub respect_battery: bool,
    pub respect_device_memory: bool,
    pub respect_frame_time: bool,
    pub battery_stop_below: f32,
    pub battery_resume_above: f32,
    pub low_memory_gib: f32,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub memory_grace: Duration,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub max_frame_time: Duration,
    pub performance_warning_limit: u32,
    #[serde(
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub performance_recovery: Duration,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            respect_tab_visibility: true,
            respect_reduced_motion: true,
            respect_battery: true,
            respect_device_memory: true,
            respect_frame_time: true,
            battery_stop_below: 0.15,
            battery_resume_above: 0.25,
            low_memory_gib: 2.0,
            memory_grace: Duration::from_secs(2),
            max_frame_time: Duration::from_micros(33_330),
            performance_warning_limit: 5,
            performance_recovery: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gib: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_concurrency: Option<u32>,
    /// Effective connection type: `slow-2g`, `2g`, `3g`, or `4g`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atmosphere_layers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_layers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lightning_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glow_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_interval_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_interval_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breathing_amplitude: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blur_px: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breathing_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lightning_secs: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_secs: Option<f32>,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() || v.is_infinite() {
                return Err(E::custom("duration must be a finite non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

impl PaceConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PaceConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|err| ConfigError::Invalid(format!("failed to serialise configuration: {err}")))
    }

    /// Returns the patch configured for `tier`, if any.
    pub fn overrides_for(&self, tier: TierName) -> Option<&SettingsPatch> {
        self.overrides
            .iter()
            .find(|(name, _)| TierName::parse(name) == Some(tier))
            .map(|(_, patch)| patch)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        self.controller.validate()?;
        self.lifecycle.validate()?;
        self.device.validate()?;

        let mut seen: BTreeMap<TierName, &str> = BTreeMap::new();
        for (name, patch) in &self.overrides {
            let Some(tier) = TierName::parse(name) else {
                return Err(ConfigError::Invalid(format!(
                    "overrides.{name} is not a tier; expected low, medium, or high"
                )));
            };
            if let Some(first) = seen.insert(tier, name) {
                return Err(ConfigError::Invalid(format!(
                    "overrides.{first} and overrides.{name} both name the {} tier",
                    tier.as_str()
                )));
            }
            patch
                .validate()
                .map_err(|reason| ConfigError::Invalid(format!("overrides.{name}: {reason}")))?;
        }

        Ok(())
    }
}

impl ControllerSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::Invalid(
                "controller.window must be greater than zero".into(),
            ));
        }
        if self.degrade_after == 0 {
            return Err(ConfigError::Invalid(
                "controller.degrade_after must be greater than zero".into(),
            ));
        }
        if self.upgrade_after_frames == 0 {
            return Err(ConfigError::Invalid(
                "controller.upgrade_after_frames must be greater than zero".into(),
            ));
        }
        if !self.slow_factor.is_finite() || self.slow_factor < 1.0 {
            return Err(ConfigError::Invalid(
                "controller.slow_factor must be a finite number >= 1.0".into(),
            ));
        }
        Ok(())
    }
}

impl LifecycleSection {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("battery_stop_below", self.battery_stop_below),
            ("battery_resume_above", self.battery_resume_above),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "lifecycle.{name} must be between 0 and 1"
                )));
            }
        }
        if self.battery_stop_below > self.battery_resume_above {
            return Err(ConfigError::Invalid(
                "lifecycle.battery_stop_below must not exceed battery_resume_above".into(),
            ));
        }
        if !self.low_memory_gib.is_finite() || self.low_memory_gib < 0.0 {
            return Err(ConfigError::Invalid(
                "lifecycle.low_memory_gib must be >= 0".into(),
            ));
        }
        if self.max_frame_time.is_zero() {
            return Err(ConfigError::Invalid(
                "lifecycle.max_frame_time must be greater than zero".into(),
            ));
        }
        if self.performance_warning_limit == 0 {
            return Err(ConfigError::Invalid(
                "lifecycle.performance_warning_limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl DeviceSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(memory) = self.memory_gib {
            if !memory.is_finite() || memory <= 0.0 {
                return Err(ConfigError::Invalid("device.memory_gib must be > 0".into()));
            }
        }
        if self.hardware_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "device.hardware_concurrency must be > 0".into(),
            ));
        }
        if let Some(connection) = &self.connection {
            let normalized = connection.trim().to_ascii_lowercase();
            if !matches!(normalized.as_str(), "slow-2g" | "2g" | "3g" | "4g") {
                return Err(ConfigError::Invalid(format!(
                    "device.connection '{connection}' is invalid; expected slow-2g, 2g, 3g, or 4g"
                )));
            }
        }
        Ok(())
    }
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn validate(&self) -> Result<(), String> {
        if self.target_fps == Some(0) {
            return Err("target_fps must be greater than zero".into());
        }
        if let Some(opacity) = self.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err("opacity must be between 0 and 1".into());
            }
        }
        for (name, value) in [
            ("breathing_amplitude", self.breathing_amplitude),
            ("blur_px", self.blur_px),
            ("breathing_secs", self.breathing_secs),
            ("lightning_secs", self.lightning_secs),
            ("blink_secs", self.blink_secs),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(format!("{name} must be a finite number >= 0"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[controller]
window = 30
degrade_after = 2
initial_tier = "medium"

[lifecycle]
respect_battery = false
memory_grace = "1500ms"
performance_recovery = 3

[device]
memory_gib = 4
connection = "3g"

[overrides.low]
blur_px = 24
particles_enabled = false

[overrides.high]
atmosphere_layers = 4
"#;

    #[test]
    fn parses_sample_config() {
        let config = PaceConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.version, 1);
        assert_eq!(config.controller.window, 30);
        assert_eq!(config.controller.degrade_after, 2);
        assert_eq!(config.controller.upgrade_after_frames, 300);
        assert_eq!(config.controller.initial_tier, Some(TierName::Medium));
        assert!(!config.lifecycle.respect_battery);
        assert!(config.lifecycle.respect_tab_visibility);
        assert_eq!(config.lifecycle.memory_grace, Duration::from_millis(1500));
        assert_eq!(config.lifecycle.performance_recovery, Duration::from_secs(3));
        assert_eq!(config.device.memory_gib, Some(4.0));
        assert_eq!(
            config.overrides_for(TierName::Low).and_then(|p| p.blur_px),
            Some(24.0)
        );
        assert_eq!(
            config
                .overrides_for(TierName::High)
                .and_then(|p| p.atmosphere_layers),
            Some(4)
        );
        assert!(config.overrides_for(TierName::Medium).is_none());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = PaceConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.controller, ControllerSection::default());
        assert_eq!(config.lifecycle, LifecycleSection::default());
        assert_eq!(config.lifecycle.memory_grace, Duration::from_secs(2));
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn rejects_unknown_version() {
        let err = PaceConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_override_tier() {
        let err = PaceConfig::from_toml_str(
            r#"
version = 1

[overrides.ultra]
blur_px = 100
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_two_spellings_of_one_tier() {
        let err = PaceConfig::from_toml_str(
            r#"
version = 1

[overrides.med]
blur_px = 2.0

[overrides.medium]
blur_px = 4.0
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::Invalid(message) => assert!(message.contains("medium tier"), "{message}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_inverted_battery_thresholds() {
        let err = PaceConfig::from_toml_str(
            r#"
version = 1

[lifecycle]
battery_stop_below = 0.5
battery_resume_above = 0.2
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_slow_factor_below_one() {
        let err = PaceConfig::from_toml_str(
            r#"
version = 1

[controller]
slow_factor = 0.5
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_patch_field() {
        let err = PaceConfig::from_toml_str(
            r#"
version = 1

[overrides.low]
shimmer = true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn serialised_config_parses_back() {
        let config = PaceConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = PaceConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.lifecycle, config.lifecycle);
        assert_eq!(reparsed.controller, config.controller);
    }
}

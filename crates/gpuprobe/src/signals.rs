//! Best-effort host signals that complement the GPU probe.
//!
//! Every field is optional: `None` means the host does not report it, and an
//! unknown signal never counts against the device.

use std::fmt;

use serde::Serialize;

/// Effective network connection class reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionHint {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    Unknown,
}

impl ConnectionHint {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Self::Slow2g,
            "2g" => Self::TwoG,
            "3g" => Self::ThreeG,
            "4g" => Self::FourG,
            _ => Self::Unknown,
        }
    }

    pub fn is_slow(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

impl fmt::Display for ConnectionHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionHint::Slow2g => "slow-2g",
            ConnectionHint::TwoG => "2g",
            ConnectionHint::ThreeG => "3g",
            ConnectionHint::FourG => "4g",
            ConnectionHint::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatteryStatus {
    /// Charge level in `0.0..=1.0`.
    pub level: f32,
    pub charging: bool,
}

impl BatteryStatus {
    pub fn new(level: f32, charging: bool) -> Self {
        Self {
            level: level.clamp(0.0, 1.0),
            charging,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeviceSignals {
    pub hardware_concurrency: Option<u32>,
    pub device_memory_gib: Option<f32>,
    pub connection: ConnectionHint,
    pub mobile: Option<bool>,
    pub battery: Option<BatteryStatus>,
}

impl DeviceSignals {
    /// Reads whatever the native host exposes without extra privileges.
    ///
    /// Only the CPU count is available portably; memory, connection and
    /// battery stay unknown unless a caller fills them in.
    pub fn detect() -> Self {
        let hardware_concurrency = std::thread::available_parallelism()
            .ok()
            .and_then(|count| u32::try_from(count.get()).ok());
        tracing::debug!(?hardware_concurrency, "detected device signals");
        Self {
            hardware_concurrency,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connection_hints() {
        assert_eq!(ConnectionHint::parse("slow-2g"), ConnectionHint::Slow2g);
        assert_eq!(ConnectionHint::parse(" 4G "), ConnectionHint::FourG);
        assert_eq!(ConnectionHint::parse("wifi"), ConnectionHint::Unknown);
        assert!(ConnectionHint::TwoG.is_slow());
        assert!(!ConnectionHint::ThreeG.is_slow());
        assert!(!ConnectionHint::Unknown.is_slow());
    }

    #[test]
    fn battery_level_is_clamped() {
        assert_eq!(BatteryStatus::new(1.4, false).level, 1.0);
        assert_eq!(BatteryStatus::new(-0.2, true).level, 0.0);
    }

    #[test]
    fn detect_reports_cpu_count() {
        let signals = DeviceSignals::detect();
        assert!(signals.hardware_concurrency.unwrap_or(1) >= 1);
        assert!(signals.device_memory_gib.is_none());
        assert!(signals.battery.is_none());
    }
}

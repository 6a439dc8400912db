//! Device ceiling: the highest tier the controller may ever upgrade to.

use gpuprobe::{ConnectionHint, DeviceSignals, GpuCapabilities, PerformanceProfile};
use paceconfig::DeviceSection;

use crate::tier::QualityTier;

const LOW_BATTERY_LEVEL: f32 = 0.15;
const LOW_MEMORY_GIB: f32 = 4.0;
const HIGH_MEMORY_GIB: f32 = 8.0;
const LOW_CORES: u32 = 2;
const HIGH_CORES: u32 = 8;

pub fn tier_for_profile(profile: PerformanceProfile) -> QualityTier {
    match profile {
        PerformanceProfile::Low => QualityTier::Low,
        PerformanceProfile::Medium => QualityTier::Medium,
        PerformanceProfile::High => QualityTier::High,
    }
}

/// Classifies the device from host signals alone.
///
/// Any known low-class signal yields `Low`. `High` needs every known signal to
/// be high-class; unknown signals have no opinion either way.
pub fn device_class_tier(signals: &DeviceSignals) -> QualityTier {
    let battery_low = signals
        .battery
        .is_some_and(|battery| battery.level < LOW_BATTERY_LEVEL && !battery.charging);
    let memory_low = signals
        .device_memory_gib
        .is_some_and(|memory| memory <= LOW_MEMORY_GIB);
    let cores_low = signals
        .hardware_concurrency
        .is_some_and(|cores| cores <= LOW_CORES);
    let mobile = signals.mobile == Some(true);

    if battery_low || memory_low || cores_low || signals.connection.is_slow() || mobile {
        return QualityTier::Low;
    }

    let memory_high = signals
        .device_memory_gib
        .map_or(true, |memory| memory >= HIGH_MEMORY_GIB);
    let cores_high = signals
        .hardware_concurrency
        .map_or(true, |cores| cores >= HIGH_CORES);
    let connection_fast = matches!(
        signals.connection,
        ConnectionHint::FourG | ConnectionHint::Unknown
    );

    if memory_high && cores_high && connection_fast {
        QualityTier::High
    } else {
        QualityTier::Medium
    }
}

/// `min(profile tier, device class)`.
pub fn ceiling_tier(caps: &GpuCapabilities, signals: &DeviceSignals) -> QualityTier {
    let from_profile = tier_for_profile(caps.performance_profile);
    let from_device = device_class_tier(signals);
    let ceiling = from_profile.min(from_device);
    tracing::debug!(
        profile = %caps.performance_profile,
        device_class = %from_device,
        %ceiling,
        "derived quality ceiling"
    );
    ceiling
}

/// Fills in signals the host cannot report from the `[device]` config section.
/// Configured values win over detected ones.
pub fn signals_with_overrides(mut signals: DeviceSignals, section: &DeviceSection) -> DeviceSignals {
    if let Some(memory) = section.memory_gib {
        signals.device_memory_gib = Some(memory);
    }
    if let Some(cores) = section.hardware_concurrency {
        signals.hardware_concurrency = Some(cores);
    }
    if let Some(connection) = &section.connection {
        signals.connection = ConnectionHint::parse(connection);
    }
    if let Some(mobile) = section.mobile {
        signals.mobile = Some(mobile);
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpuprobe::{BatteryStatus, GpuBackend, GpuFeatures, GpuLimits};

    fn capabilities(profile: PerformanceProfile) -> GpuCapabilities {
        GpuCapabilities {
            performance_profile: profile,
            ..GpuCapabilities::none()
        }
    }

    fn strong_desktop() -> DeviceSignals {
        DeviceSignals {
            hardware_concurrency: Some(16),
            device_memory_gib: Some(16.0),
            connection: ConnectionHint::FourG,
            mobile: Some(false),
            battery: None,
        }
    }

    #[test]
    fn unknown_signals_are_neutral() {
        assert_eq!(device_class_tier(&DeviceSignals::default()), QualityTier::High);
    }

    #[test]
    fn any_weak_signal_means_low() {
        let weak = [
            DeviceSignals {
                hardware_concurrency: Some(2),
                ..strong_desktop()
            },
            DeviceSignals {
                device_memory_gib: Some(4.0),
                ..strong_desktop()
            },
            DeviceSignals {
                connection: ConnectionHint::TwoG,
                ..strong_desktop()
            },
            DeviceSignals {
                mobile: Some(true),
                ..strong_desktop()
            },
            DeviceSignals {
                battery: Some(BatteryStatus::new(0.1, false)),
                ..strong_desktop()
            },
        ];
        for signals in weak {
            assert_eq!(device_class_tier(&signals), QualityTier::Low, "{signals:?}");
        }
    }

    #[test]
    fn charging_battery_is_not_low() {
        let signals = DeviceSignals {
            battery: Some(BatteryStatus::new(0.05, true)),
            ..strong_desktop()
        };
        assert_eq!(device_class_tier(&signals), QualityTier::High);
    }

    #[test]
    fn middling_device_is_medium() {
        let signals = DeviceSignals {
            hardware_concurrency: Some(4),
            device_memory_gib: Some(8.0),
            ..strong_desktop()
        };
        assert_eq!(device_class_tier(&signals), QualityTier::Medium);
        let three_g = DeviceSignals {
            connection: ConnectionHint::ThreeG,
            ..strong_desktop()
        };
        assert_eq!(device_class_tier(&three_g), QualityTier::Medium);
    }

    #[test]
    fn ceiling_is_the_lower_of_both() {
        let signals = strong_desktop();
        assert_eq!(
            ceiling_tier(&capabilities(PerformanceProfile::Medium), &signals),
            QualityTier::Medium
        );
        assert_eq!(
            ceiling_tier(&capabilities(PerformanceProfile::High), &signals),
            QualityTier::High
        );
        let phone = DeviceSignals {
            mobile: Some(true),
            ..signals
        };
        assert_eq!(
            ceiling_tier(&capabilities(PerformanceProfile::High), &phone),
            QualityTier::Low
        );
    }

    #[test]
    fn no_gpu_means_low_ceiling() {
        assert_eq!(
            ceiling_tier(&GpuCapabilities::none(), &strong_desktop()),
            QualityTier::Low
        );
        let caps = GpuCapabilities {
            backend: GpuBackend::CompatibilityRaster,
            features: GpuFeatures::default(),
            limits: GpuLimits::fallback(),
            ..GpuCapabilities::none()
        };
        assert_eq!(ceiling_tier(&caps, &strong_desktop()), QualityTier::Low);
    }

    #[test]
    fn config_overrides_detected_signals() {
        let detected = DeviceSignals {
            hardware_concurrency: Some(12),
            ..DeviceSignals::default()
        };
        let section = DeviceSection {
            memory_gib: Some(3.0),
            hardware_concurrency: None,
            connection: Some("3g".into()),
            mobile: Some(false),
        };
        let merged = signals_with_overrides(detected, &section);
        assert_eq!(merged.hardware_concurrency, Some(12));
        assert_eq!(merged.device_memory_gib, Some(3.0));
        assert_eq!(merged.connection, ConnectionHint::ThreeG);
        assert_eq!(merged.mobile, Some(false));
        assert_eq!(device_class_tier(&merged), QualityTier::Low);
    }
}

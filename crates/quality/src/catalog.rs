//! Static tier catalog.
//!
//! Every tier maps to one fixed [`QualitySettings`] record. Cost never drops
//! when the tier goes up: layer counts, effect toggles, target rate, update
//! rate and blur are all non-decreasing from `Low` to `High`.

use paceconfig::{PaceConfig, SettingsPatch};
use serde::Serialize;

use crate::tier::QualityTier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationDurations {
    pub breathing_secs: f32,
    /// Zero while lightning is disabled.
    pub lightning_secs: f32,
    pub blink_secs: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualitySettings {
    pub tier: QualityTier,
    pub atmosphere_layers: u32,
    pub rain_layers: u32,
    pub lightning_enabled: bool,
    pub particles_enabled: bool,
    pub glow_enabled: bool,
    pub target_fps: u32,
    pub frame_budget_ms: f32,
    pub update_interval_ms: u32,
    pub blink_interval_ms: u32,
    pub breathing_amplitude: f32,
    pub opacity: f32,
    pub blur_px: f32,
    pub durations: AnimationDurations,
}

/// Partial settings applied on top of a tier's base record.
pub type SettingsOverrides = SettingsPatch;

const LOW: QualitySettings = QualitySettings {
    tier: QualityTier::Low,
    atmosphere_layers: 1,
    rain_layers: 1,
    lightning_enabled: false,
    particles_enabled: false,
    glow_enabled: false,
    target_fps: 30,
    frame_budget_ms: 33.33,
    update_interval_ms: 66,
    blink_interval_ms: 4000,
    breathing_amplitude: 0.02,
    opacity: 0.08,
    blur_px: 40.0,
    durations: AnimationDurations {
        breathing_secs: 22.0,
        lightning_secs: 0.0,
        blink_secs: 1.5,
    },
};

const MEDIUM: QualitySettings = QualitySettings {
    tier: QualityTier::Medium,
    atmosphere_layers: 2,
    rain_layers: 2,
    lightning_enabled: true,
    particles_enabled: false,
    glow_enabled: true,
    target_fps: 60,
    frame_budget_ms: 16.67,
    update_interval_ms: 33,
    blink_interval_ms: 3000,
    breathing_amplitude: 0.03,
    opacity: 0.12,
    blur_px: 60.0,
    durations: AnimationDurations {
        breathing_secs: 18.0,
        lightning_secs: 24.0,
        blink_secs: 2.0,
    },
};

const HIGH: QualitySettings = QualitySettings {
    tier: QualityTier::High,
    atmosphere_layers: 3,
    rain_layers: 3,
    lightning_enabled: true,
    particles_enabled: true,
    glow_enabled: true,
    target_fps: 60,
    frame_budget_ms: 16.67,
    update_interval_ms: 16,
    blink_interval_ms: 2500,
    breathing_amplitude: 0.04,
    opacity: 0.16,
    blur_px: 80.0,
    durations: AnimationDurations {
        breathing_secs: 14.0,
        lightning_secs: 18.0,
        blink_secs: 2.5,
    },
};

/// Settings for `tier`, with `overrides` layered on top when given.
pub fn settings_for(tier: QualityTier, overrides: Option<&SettingsOverrides>) -> QualitySettings {
    let base = match tier {
        QualityTier::Low => LOW,
        QualityTier::Medium => MEDIUM,
        QualityTier::High => HIGH,
    };
    match overrides {
        Some(patch) => apply(base, patch),
        None => base,
    }
}

fn apply(mut settings: QualitySettings, patch: &SettingsOverrides) -> QualitySettings {
    if let Some(value) = patch.atmosphere_layers {
        settings.atmosphere_layers = value;
    }
    if let Some(value) = patch.rain_layers {
        settings.rain_layers = value;
    }
    if let Some(value) = patch.lightning_enabled {
        settings.lightning_enabled = value;
    }
    if let Some(value) = patch.particles_enabled {
        settings.particles_enabled = value;
    }
    if let Some(value) = patch.glow_enabled {
        settings.glow_enabled = value;
    }
    if let Some(fps) = patch.target_fps.filter(|fps| *fps > 0) {
        settings.target_fps = fps;
        settings.frame_budget_ms = 1000.0 / fps as f32;
    }
    if let Some(value) = patch.update_interval_ms {
        settings.update_interval_ms = value;
    }
    if let Some(value) = patch.blink_interval_ms {
        settings.blink_interval_ms = value;
    }
    if let Some(value) = patch.breathing_amplitude {
        settings.breathing_amplitude = value;
    }
    if let Some(value) = patch.opacity {
        settings.opacity = value.clamp(0.0, 1.0);
    }
    if let Some(value) = patch.blur_px {
        settings.blur_px = value;
    }
    if let Some(value) = patch.breathing_secs {
        settings.durations.breathing_secs = value;
    }
    if let Some(value) = patch.lightning_secs {
        settings.durations.lightning_secs = value;
    }
    if let Some(value) = patch.blink_secs {
        settings.durations.blink_secs = value;
    }
    settings
}

/// Per-tier overrides taken from the configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    low: Option<SettingsOverrides>,
    medium: Option<SettingsOverrides>,
    high: Option<SettingsOverrides>,
}

impl OverrideSet {
    pub fn from_config(config: &PaceConfig) -> Self {
        let pick = |tier: QualityTier| {
            config
                .overrides_for(tier.into())
                .filter(|patch| !patch.is_empty())
                .cloned()
        };
        Self {
            low: pick(QualityTier::Low),
            medium: pick(QualityTier::Medium),
            high: pick(QualityTier::High),
        }
    }

    pub fn for_tier(&self, tier: QualityTier) -> Option<&SettingsOverrides> {
        match tier {
            QualityTier::Low => self.low.as_ref(),
            QualityTier::Medium => self.medium.as_ref(),
            QualityTier::High => self.high.as_ref(),
        }
    }

    pub fn settings(&self, tier: QualityTier) -> QualitySettings {
        settings_for(tier, self.for_tier(tier))
    }
}

//! Adaptive quality tiers.
//!
//! * [`catalog`] maps a [`QualityTier`] to its static [`QualitySettings`].
//! * [`telemetry`] keeps the last window of frame intervals.
//! * [`controller`] moves the tier up and down from that telemetry, never
//!   above the device ceiling computed by [`ceiling`].

pub mod catalog;
pub mod ceiling;
pub mod controller;
pub mod telemetry;
mod tier;

pub use catalog::{settings_for, AnimationDurations, OverrideSet, QualitySettings, SettingsOverrides};
pub use ceiling::{ceiling_tier, device_class_tier, signals_with_overrides, tier_for_profile};
pub use controller::{ChangeCause, ControllerPolicy, Counters, QualityController, TierChange};
pub use telemetry::FrameTelemetry;
pub use tier::{ParseTierError, QualityTier, LOW_FRAME_BUDGET_MS, SMOOTH_FRAME_BUDGET_MS};

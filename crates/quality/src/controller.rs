//! Hysteresis-gated tier state machine.
//!
//! Samples are evaluated in full windows (60 by default). A window is slow when
//! its average exceeds `slow_factor` times the current tier's budget:
//!
//! ```text
//!   slow window ─▶ bad += 1, good = 0 ─▶ bad == 3   ─▶ degrade, bad = 0
//!   good window ─▶ bad -= 1, good += n ─▶ good >= 300 ─▶ upgrade (≤ ceiling), good = 0
//! ```
//!
//! Recovering a tier takes five good windows; losing one takes three slow ones.

use std::time::Instant;

use paceconfig::ControllerSection;

use crate::catalog::{settings_for, QualitySettings, SettingsOverrides};
use crate::telemetry::FrameTelemetry;
use crate::tier::QualityTier;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerPolicy {
    pub window: usize,
    pub degrade_after: u32,
    pub upgrade_after_frames: u32,
    pub slow_factor: f32,
}

impl ControllerPolicy {
    pub fn from_config(section: &ControllerSection) -> Self {
        Self {
            window: section.window.max(1),
            degrade_after: section.degrade_after.max(1),
            upgrade_after_frames: section.upgrade_after_frames.max(1),
            slow_factor: section.slow_factor,
        }
    }
}

impl Default for ControllerPolicy {
    fn default() -> Self {
        Self::from_config(&ControllerSection::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Degraded,
    Upgraded,
}

/// An automatic tier transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierChange {
    pub from: QualityTier,
    pub to: QualityTier,
    pub cause: ChangeCause,
    /// Average frame time of the window that triggered the change.
    pub average_ms: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Consecutive slow windows.
    pub bad_windows: u32,
    /// Frames in consecutive good windows.
    pub good_frames: u32,
}

#[derive(Debug, Clone)]
pub struct QualityController {
    policy: ControllerPolicy,
    preferred: QualityTier,
    ceiling: QualityTier,
    current: QualityTier,
    counters: Counters,
    pending: usize,
    telemetry: FrameTelemetry,
}

impl QualityController {
    /// Controller with the stock policy, starting as high as `ceiling` allows.
    pub fn new(ceiling: QualityTier) -> Self {
        Self::with_policy(ceiling, ControllerPolicy::default(), QualityTier::High)
    }

    /// `preferred` is the tier to start from when the ceiling permits it.
    pub fn with_policy(
        ceiling: QualityTier,
        policy: ControllerPolicy,
        preferred: QualityTier,
    ) -> Self {
        let current = preferred.min(ceiling);
        tracing::debug!(%ceiling, %current, window = policy.window, "quality controller ready");
        Self {
            policy,
            preferred,
            ceiling,
            current,
            counters: Counters::default(),
            pending: 0,
            telemetry: FrameTelemetry::with_capacity(policy.window),
        }
    }

    pub fn record_frame(&mut self) -> Option<TierChange> {
        self.record_frame_at(Instant::now())
    }

    pub fn record_frame_at(&mut self, now: Instant) -> Option<TierChange> {
        self.telemetry.record_frame_at(now)?;
        self.after_sample()
    }

    pub fn record_interval(&mut self, interval_ms: f32) -> Option<TierChange> {
        self.telemetry.record_interval(interval_ms)?;
        self.after_sample()
    }

    fn after_sample(&mut self) -> Option<TierChange> {
        self.pending += 1;
        if self.pending < self.policy.window {
            return None;
        }
        self.pending = 0;
        self.evaluate()
    }

    fn evaluate(&mut self) -> Option<TierChange> {
        let average_ms = self.telemetry.average_frame_time();
        let budget = self.current.frame_budget_ms();
        let slow = average_ms > budget * self.policy.slow_factor;
        tracing::trace!(
            tier = %self.current,
            average_ms,
            budget,
            slow,
            "evaluated frame window"
        );

        if slow {
            self.counters.good_frames = 0;
            self.counters.bad_windows += 1;
            if self.counters.bad_windows < self.policy.degrade_after {
                return None;
            }
            self.counters.bad_windows = 0;
            let target = self.current.lower();
            self.transition(target, ChangeCause::Degraded, average_ms)
        } else {
            self.counters.bad_windows = self.counters.bad_windows.saturating_sub(1);
            let window = u32::try_from(self.telemetry.len()).unwrap_or(u32::MAX);
            self.counters.good_frames = self.counters.good_frames.saturating_add(window);
            if self.counters.good_frames < self.policy.upgrade_after_frames {
                return None;
            }
            self.counters.good_frames = 0;
            // A forced tier above the ceiling stays put; upgrades never lower it.
            let target = self.current.higher().min(self.ceiling).max(self.current);
            self.transition(target, ChangeCause::Upgraded, average_ms)
        }
    }

    fn transition(
        &mut self,
        target: QualityTier,
        cause: ChangeCause,
        average_ms: f32,
    ) -> Option<TierChange> {
        if target == self.current {
            tracing::debug!(tier = %self.current, ?cause, "tier already at its bound");
            return None;
        }
        let change = TierChange {
            from: self.current,
            to: target,
            cause,
            average_ms,
        };
        match cause {
            ChangeCause::Degraded => {
                tracing::info!(from = %change.from, to = %change.to, average_ms, "quality degraded")
            }
            ChangeCause::Upgraded => {
                tracing::info!(from = %change.from, to = %change.to, average_ms, "quality upgraded")
            }
        }
        self.current = target;
        Some(change)
    }

    pub fn current_tier(&self) -> QualityTier {
        self.current
    }

    pub fn current_settings(&self, overrides: Option<&SettingsOverrides>) -> QualitySettings {
        settings_for(self.current, overrides)
    }

    pub fn ceiling(&self) -> QualityTier {
        self.ceiling
    }

    /// Tier the controller starts from and returns to on [`reset`](Self::reset).
    pub fn initial_tier(&self) -> QualityTier {
        self.preferred.min(self.ceiling)
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn policy(&self) -> &ControllerPolicy {
        &self.policy
    }

    pub fn telemetry(&self) -> &FrameTelemetry {
        &self.telemetry
    }

    /// Forgets the last frame boundary; used when frame production stops.
    pub fn mark_gap(&mut self) {
        self.telemetry.clear_baseline();
    }

    /// Forces a tier, bypassing hysteresis and the ceiling. Diagnostic use only.
    pub fn set_tier(&mut self, tier: QualityTier) {
        tracing::info!(from = %self.current, to = %tier, "quality forced");
        self.current = tier;
        self.counters = Counters::default();
    }

    /// Back to the initial tier with empty counters and telemetry.
    pub fn reset(&mut self) {
        self.current = self.initial_tier();
        self.counters = Counters::default();
        self.pending = 0;
        self.telemetry.reset();
    }

    /// Installs a new ceiling (after a re-probe) and restarts from it.
    pub fn reseed(&mut self, ceiling: QualityTier) {
        tracing::debug!(from = %self.ceiling, to = %ceiling, "quality ceiling reseeded");
        self.ceiling = ceiling;
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn feed(controller: &mut QualityController, frames: usize, ms: f32) -> Vec<TierChange> {
        (0..frames)
            .filter_map(|_| controller.record_interval(ms))
            .collect()
    }

    #[test]
    fn starts_at_ceiling() {
        assert_eq!(
            QualityController::new(QualityTier::Medium).current_tier(),
            QualityTier::Medium
        );
        assert_eq!(
            QualityController::new(QualityTier::High).current_tier(),
            QualityTier::High
        );
        let preferred_low = QualityController::with_policy(
            QualityTier::High,
            ControllerPolicy::default(),
            QualityTier::Low,
        );
        assert_eq!(preferred_low.current_tier(), QualityTier::Low);
    }

    #[test]
    fn three_slow_windows_degrade_once() {
        let mut controller = QualityController::new(QualityTier::High);
        let changes = feed(&mut controller, 180, 30.0);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].from, QualityTier::High);
        assert_eq!(changes[0].to, QualityTier::Medium);
        assert_eq!(changes[0].cause, ChangeCause::Degraded);
        assert_eq!(controller.current_tier(), QualityTier::Medium);
        assert_eq!(controller.counters().bad_windows, 0);
    }

    #[test]
    fn two_slow_windows_are_not_enough() {
        let mut controller = QualityController::new(QualityTier::High);
        assert!(feed(&mut controller, 120, 30.0).is_empty());
        assert_eq!(controller.current_tier(), QualityTier::High);
        assert_eq!(controller.counters().bad_windows, 2);
    }

    #[test]
    fn partial_windows_are_never_evaluated() {
        let mut controller = QualityController::new(QualityTier::High);
        assert!(feed(&mut controller, 179, 100.0).is_empty());
        assert_eq!(controller.counters().bad_windows, 2);
        assert_eq!(controller.current_tier(), QualityTier::High);
    }

    #[test]
    fn good_frames_upgrade_once_within_ceiling() {
        let mut controller = QualityController::new(QualityTier::High);
        controller.set_tier(QualityTier::Medium);
        let changes = feed(&mut controller, 300, 10.0);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to, QualityTier::High);
        assert_eq!(changes[0].cause, ChangeCause::Upgraded);
        assert_eq!(controller.counters().good_frames, 0);
    }

    #[test]
    fn upgrade_is_bounded_by_ceiling() {
        let mut controller = QualityController::new(QualityTier::Medium);
        let changes = feed(&mut controller, 600, 5.0);
        assert!(changes.is_empty());
        assert_eq!(controller.current_tier(), QualityTier::Medium);
    }

    #[test]
    fn degrade_saturates_at_low() {
        let mut controller = QualityController::new(QualityTier::Low);
        let changes = feed(&mut controller, 600, 200.0);
        assert!(changes.is_empty());
        assert_eq!(controller.current_tier(), QualityTier::Low);
    }

    #[test]
    fn low_tier_uses_thirty_fps_budget() {
        let mut controller = QualityController::new(QualityTier::Low);
        // 40 ms is slow at 60 fps but within 1.5x of the 33.33 ms budget.
        assert!(feed(&mut controller, 240, 40.0).is_empty());
        assert_eq!(controller.counters().bad_windows, 0);
        assert_eq!(controller.counters().good_frames, 240);
    }

    #[test]
    fn alternating_windows_never_flap() {
        let mut controller = QualityController::new(QualityTier::High);
        controller.set_tier(QualityTier::Medium);
        for _ in 0..50 {
            assert!(feed(&mut controller, 60, 40.0).is_empty());
            assert_eq!(controller.counters().good_frames, 0);
            assert_eq!(controller.counters().bad_windows, 1);
            assert!(feed(&mut controller, 60, 10.0).is_empty());
            assert_eq!(controller.counters().bad_windows, 0);
            assert_eq!(controller.counters().good_frames, 60);
        }
        assert_eq!(controller.current_tier(), QualityTier::Medium);
    }

    #[test]
    fn good_window_decrements_bad_count() {
        let mut controller = QualityController::new(QualityTier::High);
        feed(&mut controller, 120, 40.0);
        assert_eq!(controller.counters().bad_windows, 2);
        feed(&mut controller, 60, 10.0);
        assert_eq!(controller.counters().bad_windows, 1);
        feed(&mut controller, 60, 40.0);
        assert_eq!(controller.counters().bad_windows, 2);
        assert_eq!(controller.current_tier(), QualityTier::High);
    }

    #[test]
    fn ceiling_holds_for_arbitrary_sequences() {
        let mut controller = QualityController::new(QualityTier::Medium);
        let pattern = [5.0, 50.0, 12.0, 90.0, 16.0, 8.0, 33.0];
        for step in 0..5000 {
            controller.record_interval(pattern[step % pattern.len()] * ((step / 700) as f32 + 0.5));
            assert!(controller.current_tier() <= controller.ceiling());
        }
    }

    #[test]
    fn degrade_then_recover_cycle() {
        let mut controller = QualityController::new(QualityTier::High);
        assert_eq!(controller.current_tier(), QualityTier::High);
        let degraded = feed(&mut controller, 180, 40.0);
        assert_eq!(degraded.len(), 1);
        assert_eq!(controller.current_tier(), QualityTier::Medium);
        let recovered = feed(&mut controller, 300, 10.0);
        assert_eq!(recovered.len(), 1);
        assert_eq!(controller.current_tier(), QualityTier::High);
    }

    #[test]
    fn set_tier_resets_counters() {
        let mut controller = QualityController::new(QualityTier::Medium);
        feed(&mut controller, 120, 40.0);
        controller.set_tier(QualityTier::High);
        assert_eq!(controller.current_tier(), QualityTier::High);
        assert_eq!(controller.counters(), Counters::default());
    }

    #[test]
    fn upgrade_never_lowers_a_forced_tier() {
        let mut controller = QualityController::new(QualityTier::Medium);
        controller.set_tier(QualityTier::High);
        assert!(feed(&mut controller, 300, 10.0).is_empty());
        assert_eq!(controller.current_tier(), QualityTier::High);
        assert_eq!(controller.counters().good_frames, 0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut controller = QualityController::new(QualityTier::High);
        feed(&mut controller, 180, 40.0);
        feed(&mut controller, 30, 10.0);
        controller.reset();
        assert_eq!(controller.current_tier(), QualityTier::High);
        assert_eq!(controller.counters(), Counters::default());
        assert!(controller.telemetry().is_empty());
        // A fresh window is needed before anything is evaluated again.
        assert!(feed(&mut controller, 59, 40.0).is_empty());
        assert_eq!(controller.counters().bad_windows, 0);
    }

    #[test]
    fn reseed_applies_new_ceiling() {
        let mut controller = QualityController::new(QualityTier::High);
        controller.reseed(QualityTier::Low);
        assert_eq!(controller.ceiling(), QualityTier::Low);
        assert_eq!(controller.current_tier(), QualityTier::Low);
        controller.reseed(QualityTier::Medium);
        assert_eq!(controller.current_tier(), QualityTier::Medium);
    }

    #[test]
    fn instant_driven_frames_feed_the_window() {
        let mut controller = QualityController::new(QualityTier::High);
        let mut now = Instant::now();
        assert!(controller.record_frame_at(now).is_none());
        let mut changes = Vec::new();
        for _ in 0..180 {
            now += Duration::from_millis(40);
            changes.extend(controller.record_frame_at(now));
        }
        assert_eq!(changes.len(), 1);
        assert_eq!(controller.current_tier(), QualityTier::Medium);
    }
}

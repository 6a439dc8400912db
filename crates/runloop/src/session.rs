//! One quality session: controller, lifecycle guard and overrides, wired to a
//! single frame source.

use std::time::Instant;

use paceconfig::PaceConfig;
use quality::{
    ControllerPolicy, OverrideSet, QualityController, QualitySettings, QualityTier, TierChange,
};

use crate::guard::{GuardStatus, LifecycleGuard, RunloopCallbacks, SignalHost};
use crate::lifecycle::{LifecycleConfig, LifecycleEvent, Reason};
use crate::ticker::{FrameTick, Ticker};

/// Tag for an outstanding capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTicket {
    generation: u64,
}

/// What the renderer needs after a frame has been recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub frame_index: u64,
    pub interval_ms: Option<f32>,
    pub tier: QualityTier,
    pub change: Option<TierChange>,
    pub settings: QualitySettings,
}

pub struct Session<C> {
    controller: QualityController,
    guard: LifecycleGuard<C>,
    overrides: OverrideSet,
    ceiling_override: Option<QualityTier>,
    generation: u64,
    torn_down: bool,
}

impl<C: RunloopCallbacks> Session<C> {
    /// Builds a session whose ceiling is `initial_ceiling` until a probe
    /// completes. A ceiling in the config replaces both.
    pub fn new(config: &PaceConfig, initial_ceiling: QualityTier, callbacks: C) -> Self {
        let ceiling_override = config.controller.ceiling.map(QualityTier::from);
        let preferred = config
            .controller
            .initial_tier
            .map(QualityTier::from)
            .unwrap_or(QualityTier::High);
        let controller = QualityController::with_policy(
            ceiling_override.unwrap_or(initial_ceiling),
            ControllerPolicy::from_config(&config.controller),
            preferred,
        );
        let guard = LifecycleGuard::new(
            callbacks,
            LifecycleConfig::from_section(&config.lifecycle),
        );
        Self {
            controller,
            guard,
            overrides: OverrideSet::from_config(config),
            ceiling_override,
            generation: 0,
            torn_down: false,
        }
    }

    pub fn mount<H: SignalHost>(&mut self, host: &mut H, now: Instant) {
        if self.torn_down {
            tracing::warn!("session already torn down; not mounting");
            return;
        }
        self.guard.mount(host, now);
    }

    /// Starts a new probe generation. Results for older tickets are dropped.
    pub fn issue_probe(&mut self) -> ProbeTicket {
        self.generation += 1;
        ProbeTicket {
            generation: self.generation,
        }
    }

    /// Applies a probe result. Returns `false` when the ticket is stale or the
    /// session has been torn down.
    pub fn complete_probe(&mut self, ticket: ProbeTicket, ceiling: QualityTier) -> bool {
        if self.torn_down || ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                torn_down = self.torn_down,
                "discarding stale probe result"
            );
            return false;
        }
        let ceiling = self.ceiling_override.unwrap_or(ceiling);
        self.controller.reseed(ceiling);
        tracing::info!(%ceiling, tier = %self.controller.current_tier(), "quality ceiling applied");
        true
    }

    /// Records one frame with both the controller and the guard.
    pub fn on_tick(&mut self, tick: FrameTick) -> FrameOutcome {
        let interval_ms = tick.interval_ms();
        let change = match interval_ms {
            Some(ms) => {
                let change = self.controller.record_interval(ms);
                self.guard.record_frame_time(ms, tick.now);
                change
            }
            None => {
                self.controller.mark_gap();
                None
            }
        };
        let tier = self.controller.current_tier();
        FrameOutcome {
            frame_index: tick.frame_index,
            interval_ms,
            tier,
            change,
            settings: self.overrides.settings(tier),
        }
    }

    /// Forwards an environment signal to the guard.
    pub fn handle(&mut self, event: LifecycleEvent, now: Instant) {
        self.guard.handle(event, now);
    }

    pub fn poll(&mut self, now: Instant) -> usize {
        self.guard.poll(now)
    }

    /// Invalidates outstanding probes, unregisters listeners and stops the
    /// loop. Nothing here can fail.
    pub fn teardown<H: SignalHost>(&mut self, host: &mut H) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.generation += 1;
        self.guard.teardown(host);
        self.controller.reset();
        tracing::debug!("session torn down");
    }

    pub fn current_tier(&self) -> QualityTier {
        self.controller.current_tier()
    }

    pub fn current_settings(&self) -> QualitySettings {
        self.overrides.settings(self.controller.current_tier())
    }

    /// Forces a tier regardless of ceiling and hysteresis.
    pub fn set_tier(&mut self, tier: QualityTier) {
        self.controller.set_tier(tier);
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn status(&self) -> GuardStatus {
        self.guard.status()
    }

    pub fn start(&mut self, reason: Reason) {
        self.guard.start(reason);
    }

    pub fn stop(&mut self, reason: Reason) {
        self.guard.stop(reason);
    }

    pub fn pause(&mut self, reason: Reason) {
        self.guard.pause(reason);
    }

    pub fn resume(&mut self, reason: Reason) {
        self.guard.resume(reason);
    }

    pub fn controller(&self) -> &QualityController {
        &self.controller
    }

    pub fn guard(&self) -> &LifecycleGuard<C> {
        &self.guard
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        self.guard.callbacks_mut()
    }
}

impl<F: FnMut(&FrameTick)> Session<Ticker<F>> {
    /// Fires due timers, then ticks the owned ticker. `None` while the loop is
    /// stopped or paused.
    pub fn advance(&mut self, now: Instant) -> Option<FrameOutcome> {
        self.guard.poll(now);
        let tick = self.guard.callbacks_mut().tick(now)?;
        Some(self.on_tick(tick))
    }
}

//! Pure lifecycle state machine.
//!
//! [`reduce`] folds one [`LifecycleEvent`] into a [`LifecycleState`] and
//! returns the [`Effect`]s the guard has to execute. Whether the loop runs is
//! derived, never toggled directly: it runs while mounted, not held by the
//! caller, and no enabled gate objects.
//!
//! ```text
//!   gates:  tab hidden | reduced motion | battery low   ─▶ stop / start
//!   pauses: low device memory (grace) | slow frames     ─▶ pause, timer, resume
//! ```

use std::time::Duration;

use gpuprobe::BatteryStatus;
use paceconfig::LifecycleSection;
use quality::telemetry::DEFAULT_FRAME_TIME_MS;

/// Why a callback was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    Caller,
    Mount,
    Visibility,
    ReducedMotion,
    Battery,
    DeviceMemory,
    FrameTime,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    MemoryGrace,
    PerformanceRecovery,
}

impl TimerKind {
    fn reason(self) -> Reason {
        match self {
            TimerKind::MemoryGrace => Reason::DeviceMemory,
            TimerKind::PerformanceRecovery => Reason::FrameTime,
        }
    }
}

/// Environment as observed when the guard mounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSnapshot {
    pub tab_visible: bool,
    pub reduced_motion: bool,
    pub battery: Option<BatteryStatus>,
    pub device_memory_gib: Option<f32>,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            tab_visible: true,
            reduced_motion: false,
            battery: None,
            device_memory_gib: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleEvent {
    Mounted(EnvironmentSnapshot),
    VisibilityChanged(bool),
    ReducedMotionChanged(bool),
    BatteryChanged(BatteryStatus),
    /// Duration of the last frame in milliseconds.
    FrameTimed(f32),
    TimerFired(TimerKind),
    Start(Reason),
    Stop(Reason),
    Pause(Reason),
    Resume(Reason),
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Start { reason: Reason },
    Stop { reason: Reason },
    Pause { reason: Reason },
    Resume { reason: Reason },
    Schedule { timer: TimerKind, after: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    pub respect_tab_visibility: bool,
    pub respect_reduced_motion: bool,
    pub respect_battery: bool,
    pub respect_device_memory: bool,
    pub respect_frame_time: bool,
    pub battery_stop_below: f32,
    pub battery_resume_above: f32,
    pub low_memory_gib: f32,
    pub memory_grace: Duration,
    pub max_frame_time_ms: f32,
    pub performance_warning_limit: u32,
    pub performance_recovery: Duration,
}

impl LifecycleConfig {
    pub fn from_section(section: &LifecycleSection) -> Self {
        Self {
            respect_tab_visibility: section.respect_tab_visibility,
            respect_reduced_motion: section.respect_reduced_motion,
            respect_battery: section.respect_battery,
            respect_device_memory: section.respect_device_memory,
            respect_frame_time: section.respect_frame_time,
            battery_stop_below: section.battery_stop_below,
            battery_resume_above: section.battery_resume_above,
            low_memory_gib: section.low_memory_gib,
            memory_grace: section.memory_grace,
            max_frame_time_ms: section.max_frame_time.as_secs_f32() * 1000.0,
            performance_warning_limit: section.performance_warning_limit.max(1),
            performance_recovery: section.performance_recovery,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::from_section(&LifecycleSection::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleState {
    pub mounted: bool,
    pub running: bool,
    pub paused: bool,
    /// Origin of the active pause; timers only lift their own pause.
    pub paused_by: Option<Reason>,
    /// Set by an explicit stop; cleared by an explicit start.
    pub held: bool,
    pub tab_visible: bool,
    pub reduced_motion: bool,
    pub battery: Option<BatteryStatus>,
    pub battery_low: bool,
    pub device_memory_gib: Option<f32>,
    pub frame_time_ms: f32,
    pub performance_warnings: u32,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            mounted: false,
            running: false,
            paused: false,
            paused_by: None,
            held: false,
            tab_visible: true,
            reduced_motion: false,
            battery: None,
            battery_low: false,
            device_memory_gib: None,
            frame_time_ms: DEFAULT_FRAME_TIME_MS,
            performance_warnings: 0,
        }
    }
}

impl LifecycleState {
    /// Gate that currently keeps the loop from running, if any.
    pub fn blocking_gate(&self, config: &LifecycleConfig) -> Option<Reason> {
        if config.respect_tab_visibility && !self.tab_visible {
            Some(Reason::Visibility)
        } else if config.respect_reduced_motion && self.reduced_motion {
            Some(Reason::ReducedMotion)
        } else if config.respect_battery && self.battery_low {
            Some(Reason::Battery)
        } else {
            None
        }
    }

    fn should_run(&self, config: &LifecycleConfig) -> bool {
        self.mounted && !self.held && self.blocking_gate(config).is_none()
    }
}

/// Low while below the stop threshold; recovered above the resume threshold
/// or when charging. In between the previous opinion stands.
fn battery_low(previous: bool, status: BatteryStatus, config: &LifecycleConfig) -> bool {
    if status.charging || status.level > config.battery_resume_above {
        false
    } else if status.level < config.battery_stop_below {
        true
    } else {
        previous
    }
}

fn pause(state: &mut LifecycleState, reason: Reason, effects: &mut Vec<Effect>) -> bool {
    if state.paused {
        return false;
    }
    state.paused = true;
    state.paused_by = Some(reason);
    effects.push(Effect::Pause { reason });
    true
}

fn resume(state: &mut LifecycleState, reason: Reason, effects: &mut Vec<Effect>) {
    if !state.paused {
        return;
    }
    state.paused = false;
    state.paused_by = None;
    effects.push(Effect::Resume { reason });
}

pub fn reduce(
    state: &LifecycleState,
    event: LifecycleEvent,
    config: &LifecycleConfig,
) -> (LifecycleState, Vec<Effect>) {
    let mut next = *state;
    let mut effects = Vec::new();
    // Timed pause requested by this event; applied after start/stop.
    let mut timed_pause = None;

    let reason = match event {
        LifecycleEvent::Mounted(snapshot) => {
            next.mounted = true;
            next.held = false;
            next.tab_visible = snapshot.tab_visible;
            next.reduced_motion = snapshot.reduced_motion;
            next.battery = snapshot.battery;
            next.battery_low = snapshot
                .battery
                .is_some_and(|status| battery_low(false, status, config));
            next.device_memory_gib = snapshot.device_memory_gib;
            let low_memory = snapshot
                .device_memory_gib
                .is_some_and(|memory| memory <= config.low_memory_gib);
            if config.respect_device_memory && low_memory {
                timed_pause = Some(TimerKind::MemoryGrace);
            }
            Reason::Mount
        }
        LifecycleEvent::VisibilityChanged(visible) => {
            next.tab_visible = visible;
            Reason::Visibility
        }
        LifecycleEvent::ReducedMotionChanged(reduced) => {
            next.reduced_motion = reduced;
            Reason::ReducedMotion
        }
        LifecycleEvent::BatteryChanged(status) => {
            next.battery = Some(status);
            next.battery_low = battery_low(next.battery_low, status, config);
            Reason::Battery
        }
        LifecycleEvent::FrameTimed(ms) => {
            if ms.is_finite() && ms >= 0.0 {
                next.frame_time_ms = ms;
                if config.respect_frame_time && next.running && !next.paused {
                    if ms > config.max_frame_time_ms {
                        next.performance_warnings += 1;
                    } else {
                        next.performance_warnings = next.performance_warnings.saturating_sub(1);
                    }
                    if next.performance_warnings >= config.performance_warning_limit {
                        next.performance_warnings = 0;
                        timed_pause = Some(TimerKind::PerformanceRecovery);
                    }
                }
            }
            Reason::FrameTime
        }
        LifecycleEvent::TimerFired(kind) => {
            if next.paused_by == Some(kind.reason()) {
                resume(&mut next, kind.reason(), &mut effects);
            }
            kind.reason()
        }
        LifecycleEvent::Start(reason) => {
            next.held = false;
            reason
        }
        LifecycleEvent::Stop(reason) => {
            next.held = true;
            reason
        }
        LifecycleEvent::Pause(reason) => {
            pause(&mut next, reason, &mut effects);
            reason
        }
        LifecycleEvent::Resume(reason) => {
            resume(&mut next, reason, &mut effects);
            reason
        }
        LifecycleEvent::Teardown => {
            next.mounted = false;
            next.held = true;
            resume(&mut next, Reason::Teardown, &mut effects);
            next.performance_warnings = 0;
            Reason::Teardown
        }
    };

    let should_run = next.should_run(config);
    if should_run != next.running {
        next.running = should_run;
        let reason = if should_run {
            reason
        } else {
            next.blocking_gate(config).unwrap_or(reason)
        };
        effects.push(if should_run {
            Effect::Start { reason }
        } else {
            Effect::Stop { reason }
        });
    }

    if let Some(timer) = timed_pause {
        let after = match timer {
            TimerKind::MemoryGrace => config.memory_grace,
            TimerKind::PerformanceRecovery => config.performance_recovery,
        };
        if pause(&mut next, timer.reason(), &mut effects) {
            effects.push(Effect::Schedule { timer, after });
        }
    }

    (next, effects)
}

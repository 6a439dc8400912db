use std::time::Instant;

use crate::lifecycle::{
    reduce, Effect, EnvironmentSnapshot, LifecycleConfig, LifecycleEvent, LifecycleState, Reason,
    TimerKind,
};

/// Control surface of the render loop the guard drives.
pub trait RunloopCallbacks {
    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalChannel {
    Visibility,
    ReducedMotion,
    Battery,
}

impl SignalChannel {
    pub const ALL: [SignalChannel; 3] = [
        SignalChannel::Visibility,
        SignalChannel::ReducedMotion,
        SignalChannel::Battery,
    ];

    fn of(event: &LifecycleEvent) -> Option<Self> {
        match event {
            LifecycleEvent::VisibilityChanged(_) => Some(SignalChannel::Visibility),
            LifecycleEvent::ReducedMotionChanged(_) => Some(SignalChannel::ReducedMotion),
            LifecycleEvent::BatteryChanged(_) => Some(SignalChannel::Battery),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("{0:?} signals are not supported by this host")]
    Unsupported(SignalChannel),
    #[error("failed to listen for {channel:?} signals: {reason}")]
    Failed {
        channel: SignalChannel,
        reason: String,
    },
}

/// Source of environment signals.
///
/// Changes are delivered by the owner through [`LifecycleGuard::handle`]; the
/// host only tracks subscriptions.
pub trait SignalHost {
    fn snapshot(&self) -> EnvironmentSnapshot;
    fn listen(&mut self, channel: SignalChannel) -> Result<(), ListenError>;
    fn unlisten(&mut self, channel: SignalChannel);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuardStatus {
    pub running: bool,
    pub paused: bool,
    pub frame_time_ms: f32,
    pub battery_level: Option<f32>,
    pub performance_warnings: u32,
    pub tab_visible: bool,
    pub reduced_motion: bool,
}

/// Executes lifecycle effects against a set of callbacks.
pub struct LifecycleGuard<C> {
    callbacks: C,
    requested: LifecycleConfig,
    effective: LifecycleConfig,
    state: LifecycleState,
    listening: Vec<SignalChannel>,
    timers: Vec<(TimerKind, Instant)>,
}

impl<C: RunloopCallbacks> LifecycleGuard<C> {
    pub fn new(callbacks: C, config: LifecycleConfig) -> Self {
        Self {
            callbacks,
            effective: config.clone(),
            requested: config,
            state: LifecycleState::default(),
            listening: Vec::new(),
            timers: Vec::new(),
        }
    }

    /// Registers listeners for every enabled gate and applies the initial
    /// snapshot. A channel that cannot be listened to disables its gate.
    pub fn mount<H: SignalHost>(&mut self, host: &mut H, now: Instant) {
        if self.state.mounted {
            tracing::warn!("lifecycle guard already mounted; ignoring");
            return;
        }
        self.effective = self.requested.clone();
        for channel in SignalChannel::ALL {
            if !self.gate_enabled(channel) {
                continue;
            }
            match host.listen(channel) {
                Ok(()) => self.listening.push(channel),
                Err(err) => {
                    tracing::warn!(?channel, error = %err, "signal unavailable; gate disabled");
                    self.disable_gate(channel);
                }
            }
        }
        let snapshot = host.snapshot();
        tracing::debug!(?snapshot, listening = ?self.listening, "lifecycle guard mounted");
        self.dispatch(LifecycleEvent::Mounted(snapshot), now);
    }

    /// Feeds an event from the host. Signals on channels that are not
    /// registered are dropped.
    pub fn handle(&mut self, event: LifecycleEvent, now: Instant) {
        match event {
            LifecycleEvent::Mounted(_) | LifecycleEvent::Teardown => {
                tracing::debug!(?event, "mount and teardown go through the guard methods");
                return;
            }
            _ => {}
        }
        if let Some(channel) = SignalChannel::of(&event) {
            if !self.listening.contains(&channel) {
                tracing::trace!(?channel, "ignoring signal from unregistered channel");
                return;
            }
        }
        self.dispatch(event, now);
    }

    pub fn record_frame_time(&mut self, frame_ms: f32, now: Instant) {
        self.dispatch(LifecycleEvent::FrameTimed(frame_ms), now);
    }

    /// Fires every timer due at `now`, earliest first. Returns how many fired.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut due: Vec<(TimerKind, Instant)> = Vec::new();
        self.timers.retain(|&(kind, deadline)| {
            if deadline <= now {
                due.push((kind, deadline));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(_, deadline)| deadline);
        for &(kind, _) in &due {
            self.dispatch(LifecycleEvent::TimerFired(kind), now);
        }
        due.len()
    }

    pub fn start(&mut self, reason: Reason) {
        self.dispatch(LifecycleEvent::Start(reason), Instant::now());
    }

    pub fn stop(&mut self, reason: Reason) {
        self.dispatch(LifecycleEvent::Stop(reason), Instant::now());
    }

    pub fn pause(&mut self, reason: Reason) {
        self.dispatch(LifecycleEvent::Pause(reason), Instant::now());
    }

    pub fn resume(&mut self, reason: Reason) {
        self.dispatch(LifecycleEvent::Resume(reason), Instant::now());
    }

    /// Stops the loop and unregisters every listener. Safe to call twice.
    pub fn teardown<H: SignalHost>(&mut self, host: &mut H) {
        for channel in self.listening.drain(..) {
            host.unlisten(channel);
        }
        self.timers.clear();
        if self.state.mounted {
            self.dispatch(LifecycleEvent::Teardown, Instant::now());
            tracing::debug!("lifecycle guard torn down");
        }
    }

    pub fn status(&self) -> GuardStatus {
        GuardStatus {
            running: self.state.running,
            paused: self.state.paused,
            frame_time_ms: self.state.frame_time_ms,
            battery_level: self.state.battery.map(|battery| battery.level),
            performance_warnings: self.state.performance_warnings,
            tab_visible: self.state.tab_visible,
            reduced_motion: self.state.reduced_motion,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn listening(&self) -> &[SignalChannel] {
        &self.listening
    }

    pub fn pending_timers(&self) -> impl Iterator<Item = (TimerKind, Instant)> + '_ {
        self.timers.iter().copied()
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    fn gate_enabled(&self, channel: SignalChannel) -> bool {
        match channel {
            SignalChannel::Visibility => self.effective.respect_tab_visibility,
            SignalChannel::ReducedMotion => self.effective.respect_reduced_motion,
            SignalChannel::Battery => self.effective.respect_battery,
        }
    }

    fn disable_gate(&mut self, channel: SignalChannel) {
        match channel {
            SignalChannel::Visibility => self.effective.respect_tab_visibility = false,
            SignalChannel::ReducedMotion => self.effective.respect_reduced_motion = false,
            SignalChannel::Battery => self.effective.respect_battery = false,
        }
    }

    fn dispatch(&mut self, event: LifecycleEvent, now: Instant) {
        let (state, effects) = reduce(&self.state, event, &self.effective);
        self.state = state;
        for effect in effects {
            self.apply(effect, now);
        }
    }

    fn apply(&mut self, effect: Effect, now: Instant) {
        match effect {
            Effect::Start { reason } => {
                tracing::info!(?reason, "render loop started");
                self.callbacks.start();
            }
            Effect::Stop { reason } => {
                tracing::info!(?reason, "render loop stopped");
                self.callbacks.stop();
            }
            Effect::Pause { reason } => {
                tracing::info!(?reason, "render loop paused");
                self.callbacks.pause();
            }
            Effect::Resume { reason } => {
                tracing::info!(?reason, "render loop resumed");
                self.callbacks.resume();
            }
            Effect::Schedule { timer, after } => {
                tracing::debug!(?timer, after_ms = after.as_millis() as u64, "timer scheduled");
                self.timers.retain(|&(kind, _)| kind != timer);
                self.timers.push((timer, now + after));
            }
        }
    }
}

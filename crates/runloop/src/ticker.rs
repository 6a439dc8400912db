use std::time::{Duration, Instant};

use crate::guard::RunloopCallbacks;

/// One frame handed to the ticker callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    pub now: Instant,
    /// Time since the previous tick; `None` on the first tick after a start or
    /// resume.
    pub interval: Option<Duration>,
    pub frame_index: u64,
}

impl FrameTick {
    pub fn interval_ms(&self) -> Option<f32> {
        self.interval.map(|interval| interval.as_secs_f32() * 1000.0)
    }
}

/// Per-frame driver with a single callback.
///
/// The host calls [`tick`](Ticker::tick) from its frame source; the callback
/// only runs while the ticker is started and not paused. Pausing is orthogonal
/// to start/stop: a pause survives a stop and the following start.
pub struct Ticker<F> {
    callback: F,
    running: bool,
    paused: bool,
    last_tick: Option<Instant>,
    frame_index: u64,
}

impl<F: FnMut(&FrameTick)> Ticker<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            running: false,
            paused: false,
            last_tick: None,
            frame_index: 0,
        }
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_tick = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.last_tick = None;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.last_tick = None;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a tick at this point would reach the callback.
    pub fn is_active(&self) -> bool {
        self.running && !self.paused
    }

    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    pub fn tick(&mut self, now: Instant) -> Option<FrameTick> {
        if !self.is_active() {
            return None;
        }
        let interval = self
            .last_tick
            .replace(now)
            .map(|last| now.saturating_duration_since(last));
        let tick = FrameTick {
            now,
            interval,
            frame_index: self.frame_index,
        };
        self.frame_index += 1;
        (self.callback)(&tick);
        Some(tick)
    }
}

impl<F: FnMut(&FrameTick)> RunloopCallbacks for Ticker<F> {
    fn start(&mut self) {
        Ticker::start(self);
    }

    fn stop(&mut self) {
        Ticker::stop(self);
    }

    fn pause(&mut self) {
        Ticker::pause(self);
    }

    fn resume(&mut self) {
        Ticker::resume(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_ticker_never_calls_back() {
        let mut calls = 0;
        let mut ticker = Ticker::new(|_: &FrameTick| calls += 1);
        assert!(ticker.tick(Instant::now()).is_none());
        drop(ticker);
        assert_eq!(calls, 0);
    }

    #[test]
    fn first_tick_after_start_has_no_interval() {
        let start = Instant::now();
        let mut seen = Vec::new();
        let mut ticker = Ticker::new(|tick: &FrameTick| seen.push(tick.interval));
        ticker.start();
        ticker.tick(start);
        ticker.tick(start + Duration::from_millis(16));
        ticker.tick(start + Duration::from_millis(40));
        drop(ticker);
        assert_eq!(
            seen,
            vec![
                None,
                Some(Duration::from_millis(16)),
                Some(Duration::from_millis(24))
            ]
        );
    }

    #[test]
    fn pause_skips_ticks_and_resets_interval() {
        let start = Instant::now();
        let mut ticker = Ticker::new(|_: &FrameTick| {});
        ticker.start();
        ticker.tick(start);
        ticker.pause();
        assert!(ticker.tick(start + Duration::from_secs(1)).is_none());
        ticker.resume();
        let tick = ticker.tick(start + Duration::from_secs(2)).expect("tick");
        assert_eq!(tick.interval, None);
        assert_eq!(tick.frame_index, 1);
        assert_eq!(ticker.frames(), 2);
    }

    #[test]
    fn stop_halts_ticks() {
        let mut ticker = Ticker::new(|_: &FrameTick| {});
        ticker.start();
        assert!(ticker.is_running());
        ticker.stop();
        assert!(!ticker.is_running());
        assert!(ticker.tick(Instant::now()).is_none());
    }

    #[test]
    fn pause_outlives_stop_and_start() {
        let start = Instant::now();
        let mut ticker = Ticker::new(|_: &FrameTick| {});
        ticker.start();
        ticker.pause();
        ticker.stop();
        ticker.start();
        assert!(ticker.is_paused());
        assert!(ticker.tick(start).is_none());
        ticker.resume();
        assert!(ticker.tick(start + Duration::from_millis(16)).is_some());
    }
}

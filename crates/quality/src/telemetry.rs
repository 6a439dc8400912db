use std::collections::VecDeque;
use std::time::Instant;

/// Samples kept by default (one second at 60 fps).
pub const DEFAULT_CAPACITY: usize = 60;
/// Reported when no sample has been recorded yet.
pub const DEFAULT_FRAME_TIME_MS: f32 = 16.67;
/// Intervals above this (under 50 fps) count as dropped frames.
pub const DROPPED_FRAME_MS: f32 = 20.0;

/// Fixed-capacity ring of recent inter-frame intervals, in milliseconds.
#[derive(Debug, Clone)]
pub struct FrameTelemetry {
    samples: VecDeque<f32>,
    capacity: usize,
    last_frame: Option<Instant>,
    dropped: u64,
    total: u64,
}

impl FrameTelemetry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            last_frame: None,
            dropped: 0,
            total: 0,
        }
    }

    /// Records a frame boundary at the current instant.
    pub fn record_frame(&mut self) -> Option<f32> {
        self.record_frame_at(Instant::now())
    }

    /// Records a frame boundary at `now`. The first call only sets the
    /// baseline and returns `None`; later calls return the recorded interval.
    pub fn record_frame_at(&mut self, now: Instant) -> Option<f32> {
        let previous = self.last_frame.replace(now);
        let last = previous?;
        let interval_ms = now.saturating_duration_since(last).as_secs_f32() * 1000.0;
        self.record_interval(interval_ms)
    }

    /// Appends an interval directly. Non-finite or negative values are ignored.
    pub fn record_interval(&mut self, interval_ms: f32) -> Option<f32> {
        if !interval_ms.is_finite() || interval_ms < 0.0 {
            tracing::trace!(interval_ms, "ignoring invalid frame interval");
            return None;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(interval_ms);
        self.total = self.total.saturating_add(1);
        if interval_ms > DROPPED_FRAME_MS {
            self.dropped = self.dropped.saturating_add(1);
        }
        Some(interval_ms)
    }

    /// Forgets the previous frame boundary so that a pause in production does
    /// not show up as one enormous interval.
    pub fn clear_baseline(&mut self) {
        self.last_frame = None;
    }

    pub fn average_frame_time(&self) -> f32 {
        if self.samples.is_empty() {
            return DEFAULT_FRAME_TIME_MS;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    pub fn average_fps(&self) -> f32 {
        let average = self.average_frame_time();
        if average <= f32::EPSILON {
            return 1000.0 / DEFAULT_FRAME_TIME_MS;
        }
        1000.0 / average
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    pub fn total_frames(&self) -> u64 {
        self.total
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_frame = None;
        self.dropped = 0;
        self.total = 0;
    }
}

impl Default for FrameTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

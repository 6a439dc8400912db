use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use paceconfig::PaceConfig;
use quality::{ChangeCause, QualityTier, TierChange};
use rand::prelude::*;
use runloop::{
    EnvironmentSnapshot, FrameTick, ListenError, Session, SignalChannel, SignalHost, Ticker,
};

use crate::cli::SimulateArgs;

/// Signal host for offline runs: a fixed snapshot and no live signals.
struct HeadlessHost {
    snapshot: EnvironmentSnapshot,
}

impl SignalHost for HeadlessHost {
    fn snapshot(&self) -> EnvironmentSnapshot {
        self.snapshot
    }

    fn listen(&mut self, _channel: SignalChannel) -> Result<(), ListenError> {
        Ok(())
    }

    fn unlisten(&mut self, _channel: SignalChannel) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TraceEvent {
    Tier { frame: usize, change: TierChange },
    Paused { frame: usize },
    Resumed { frame: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub frames: usize,
    pub rendered: usize,
    pub skipped: usize,
    pub dropped: u64,
    pub final_tier: QualityTier,
    pub events: Vec<TraceEvent>,
}

/// Seeded synthetic trace: baseline plus uniform jitter, with spikes replacing
/// the baseline for the frames they cover. Later spikes win on overlap.
pub fn synthetic_trace(args: &SimulateArgs) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let jitter = if args.jitter_ms.is_finite() && args.jitter_ms > 0.0 {
        Some(args.jitter_ms)
    } else {
        None
    };
    (0..args.frames)
        .map(|frame| {
            let base = args
                .spikes
                .iter()
                .rev()
                .find(|spike| spike.covers(frame))
                .map_or(args.base_ms, |spike| spike.ms);
            let noise = jitter.map_or(0.0, |jitter| rng.gen_range(0.0..jitter));
            (base + noise).max(0.0)
        })
        .collect()
}

/// Longest single frame interval a trace may contain (one hour).
pub const MAX_TRACE_INTERVAL_MS: f32 = 3_600_000.0;

/// Parses a trace file: one interval in milliseconds per line. Blank lines and
/// `#` comments are skipped.
pub fn parse_trace(raw: &str) -> Result<Vec<f32>> {
    let mut intervals = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let value: f32 = line
            .parse()
            .with_context(|| format!("line {}: '{line}' is not a number", index + 1))?;
        if !value.is_finite() || value < 0.0 {
            bail!("line {}: frame interval must be a non-negative number", index + 1);
        }
        if value > MAX_TRACE_INTERVAL_MS {
            bail!(
                "line {}: frame interval {value} ms exceeds {MAX_TRACE_INTERVAL_MS} ms",
                index + 1
            );
        }
        intervals.push(value);
    }
    Ok(intervals)
}

pub fn load_trace(path: &Path) -> Result<Vec<f32>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&raw).with_context(|| format!("invalid trace {}", path.display()))
}

/// Feeds `intervals` through a headless session on a synthetic clock.
pub fn run_trace(config: &PaceConfig, ceiling: QualityTier, intervals: &[f32]) -> TraceSummary {
    let mut host = HeadlessHost {
        snapshot: EnvironmentSnapshot {
            device_memory_gib: config.device.memory_gib,
            ..EnvironmentSnapshot::default()
        },
    };
    let start = Instant::now();
    let mut session = Session::new(config, ceiling, Ticker::new(|_: &FrameTick| {}));
    session.mount(&mut host, start);
    // Baseline frame.
    session.advance(start);

    let mut now = start;
    let mut rendered = 0;
    let mut skipped = 0;
    let mut events = Vec::new();
    for (frame, ms) in intervals.iter().enumerate() {
        now += Duration::from_secs_f64(f64::from(*ms) / 1000.0);
        let was_paused = session.status().paused;
        match session.advance(now) {
            Some(outcome) => {
                rendered += 1;
                if let Some(change) = outcome.change {
                    events.push(TraceEvent::Tier { frame, change });
                }
            }
            None => skipped += 1,
        }
        let paused = session.status().paused;
        if paused != was_paused {
            events.push(if paused {
                TraceEvent::Paused { frame }
            } else {
                TraceEvent::Resumed { frame }
            });
        }
    }

    let summary = TraceSummary {
        frames: intervals.len(),
        rendered,
        skipped,
        dropped: session.controller().telemetry().dropped_frames(),
        final_tier: session.current_tier(),
        events,
    };
    session.teardown(&mut host);
    summary
}

pub fn print_summary(summary: &TraceSummary) {
    for event in &summary.events {
        match event {
            TraceEvent::Tier { frame, change } => {
                let cause = match change.cause {
                    ChangeCause::Degraded => "degraded",
                    ChangeCause::Upgraded => "upgraded",
                };
                println!(
                    "frame {frame:>6}  {} -> {}  ({cause}, window avg {:.2} ms)",
                    change.from, change.to, change.average_ms
                );
            }
            TraceEvent::Paused { frame } => println!("frame {frame:>6}  paused"),
            TraceEvent::Resumed { frame } => println!("frame {frame:>6}  resumed"),
        }
    }
    println!(
        "summary: {} frames, {} rendered, {} skipped, {} dropped, final tier {}",
        summary.frames, summary.rendered, summary.skipped, summary.dropped, summary.final_tier
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Spike;

    fn args(frames: u32, seed: u64, spikes: Vec<Spike>) -> SimulateArgs {
        SimulateArgs {
            frames,
            seed,
            base_ms: 12.0,
            jitter_ms: 2.0,
            spikes,
            ceiling: QualityTier::High,
        }
    }

    fn steady(config: &mut PaceConfig) {
        config.lifecycle.respect_frame_time = false;
    }

    #[test]
    fn synthetic_trace_is_seeded() {
        let first = synthetic_trace(&args(200, 7, Vec::new()));
        let second = synthetic_trace(&args(200, 7, Vec::new()));
        let other = synthetic_trace(&args(200, 8, Vec::new()));
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.iter().all(|ms| (12.0..14.0).contains(ms)));
    }

    #[test]
    fn spikes_replace_baseline() {
        let spike = Spike {
            at: 10,
            count: 5,
            ms: 80.0,
        };
        let trace = synthetic_trace(&args(20, 1, vec![spike]));
        assert!(trace[9] < 20.0);
        assert!(trace[10..15].iter().all(|ms| *ms >= 80.0));
        assert!(trace[15] < 20.0);
    }

    #[test]
    fn parses_trace_files() {
        let trace = parse_trace("# recorded\n16.6\n\n 33.4 \n").unwrap();
        assert_eq!(trace, vec![16.6, 33.4]);
        let err = parse_trace("16\nfast\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(parse_trace("-4\n").is_err());
    }

    #[test]
    fn rejects_absurd_intervals() {
        let err = parse_trace("16\n1e30\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(parse_trace("3600000\n").is_ok());
    }

    #[test]
    fn trace_degrades_then_recovers() {
        let mut config = PaceConfig::default();
        steady(&mut config);
        let mut trace = vec![40.0; 180];
        trace.extend(std::iter::repeat(10.0).take(300));
        let summary = run_trace(&config, QualityTier::High, &trace);
        let tiers: Vec<_> = summary
            .events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::Tier { change, .. } => Some(change.to),
                _ => None,
            })
            .collect();
        assert_eq!(tiers, vec![QualityTier::Medium, QualityTier::High]);
        assert_eq!(summary.final_tier, QualityTier::High);
        assert_eq!(summary.rendered, 480);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn sustained_spike_pauses_the_loop() {
        let config = PaceConfig::default();
        let mut trace = vec![16.0; 10];
        trace.extend(vec![60.0; 5]);
        // Enough quiet frames to cover the recovery timer.
        trace.extend(vec![16.0; 400]);
        let summary = run_trace(&config, QualityTier::High, &trace);
        assert!(summary
            .events
            .iter()
            .any(|event| matches!(event, TraceEvent::Paused { frame: 14 })));
        assert!(summary
            .events
            .iter()
            .any(|event| matches!(event, TraceEvent::Resumed { .. })));
        assert!(summary.skipped > 0);
        assert_eq!(summary.rendered + summary.skipped, summary.frames);
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quality::QualityTier;

#[derive(Parser, Debug)]
#[command(
    name = "stormpace",
    author,
    version,
    about = "Adaptive quality diagnostics",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file; defaults to `stormpace.toml` in the config directory.
    #[arg(long, global = true, value_name = "FILE", env = "STORMPACE_CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe the GPU and print capabilities, device signals, and the ceiling.
    Probe(ProbeArgs),
    /// Print the catalog settings for one or every tier.
    Settings(SettingsArgs),
    /// Drive a session with a seeded synthetic frame trace.
    Simulate(SimulateArgs),
    /// Replay frame intervals (one millisecond value per line) through a session.
    Replay(ReplayArgs),
    /// Inspect the configuration file.
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Tier to print (`low`, `medium`, `high`); all tiers when omitted.
    #[arg(value_name = "TIER", value_parser = parse_tier)]
    pub tier: Option<QualityTier>,
    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of frames to generate.
    #[arg(long, value_name = "N", default_value_t = 1200)]
    pub frames: u32,
    /// Seed for the jitter generator.
    #[arg(long, value_name = "SEED", default_value_t = 0)]
    pub seed: u64,
    /// Baseline frame time in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 12.0)]
    pub base_ms: f32,
    /// Uniform jitter added to every frame, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 2.0)]
    pub jitter_ms: f32,
    /// Slow stretch as `FRAME:COUNT:MS`; may be repeated.
    #[arg(long = "spike-at", value_name = "FRAME:COUNT:MS", value_parser = parse_spike)]
    pub spikes: Vec<Spike>,
    /// Ceiling to run under instead of probing the GPU.
    #[arg(long, value_name = "TIER", value_parser = parse_tier, default_value = "high")]
    pub ceiling: QualityTier,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Trace file with one frame interval in milliseconds per line.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Ceiling to run under.
    #[arg(long, value_name = "TIER", value_parser = parse_tier, default_value = "high")]
    pub ceiling: QualityTier,
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration path.
    Where,
    /// Parse and validate the configuration, then print it normalised.
    Check,
}

/// A run of slow frames injected into a synthetic trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spike {
    pub at: u32,
    pub count: u32,
    pub ms: f32,
}

impl Spike {
    pub fn covers(&self, frame: u32) -> bool {
        frame >= self.at && frame - self.at < self.count
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_tier(value: &str) -> Result<QualityTier, String> {
    value.parse::<QualityTier>().map_err(|err| err.to_string())
}

pub fn parse_spike(value: &str) -> Result<Spike, String> {
    let mut parts = value.trim().split(':');
    let (Some(at), Some(count), Some(ms), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("spike '{value}' must look like FRAME:COUNT:MS"));
    };
    let at = at
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid spike frame '{at}'"))?;
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid spike length '{count}'"))?;
    let ms = ms
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid spike duration '{ms}'"))?;
    if !ms.is_finite() || ms <= 0.0 {
        return Err("spike duration must be a positive number of milliseconds".to_string());
    }
    Ok(Spike { at, count, ms })
}

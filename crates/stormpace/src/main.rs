mod cli;
mod paths;
mod report;
mod run;
mod simulate;

use std::path::Path;

use anyhow::{Context, Result};
use cli::{Command, ConfigAction};
use paceconfig::PaceConfig;
use quality::{OverrideSet, QualityTier};

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let config_path = paths::resolve_config_file(cli.config.as_deref())?;
    match cli.command {
        Command::Config(command) => handle_config_command(&command.action, &config_path),
        Command::Probe(args) => {
            let config = run::load_config(&config_path)?;
            let outcome = run::probe_host(&config);
            report::print_probe(&outcome, args.json)
        }
        Command::Settings(args) => {
            let config = run::load_config(&config_path)?;
            let tiers = match args.tier {
                Some(tier) => vec![tier],
                None => QualityTier::ALL.to_vec(),
            };
            report::print_settings(&tiers, &OverrideSet::from_config(&config), args.json)
        }
        Command::Simulate(args) => {
            let config = run::load_config(&config_path)?;
            let trace = simulate::synthetic_trace(&args);
            tracing::info!(
                frames = trace.len(),
                seed = args.seed,
                ceiling = %args.ceiling,
                "simulating synthetic trace"
            );
            replay(&config, args.ceiling, &trace);
            Ok(())
        }
        Command::Replay(args) => {
            let config = run::load_config(&config_path)?;
            let trace = simulate::load_trace(&args.file)?;
            tracing::info!(frames = trace.len(), file = %args.file.display(), "replaying trace");
            replay(&config, args.ceiling, &trace);
            Ok(())
        }
    }
}

fn replay(config: &PaceConfig, ceiling: QualityTier, trace: &[f32]) {
    let summary = simulate::run_trace(config, ceiling, trace);
    simulate::print_summary(&summary);
}

fn handle_config_command(action: &ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Where => {
            let state = if path.exists() { "present" } else { "missing; defaults apply" };
            println!("{} ({state})", path.display());
            Ok(())
        }
        ConfigAction::Check => {
            let config = run::load_config(path)?;
            let rendered = config
                .to_toml_string()
                .context("failed to render configuration")?;
            println!("# {}: ok", path.display());
            print!("{rendered}");
            Ok(())
        }
    }
}

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use gpuprobe::{DeviceSignals, GpuCapabilities, WgpuHost};
use paceconfig::PaceConfig;
use quality::{ceiling_tier, signals_with_overrides, QualityTier};
use tracing_subscriber::EnvFilter;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<PaceConfig> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no configuration file; using defaults");
            return Ok(PaceConfig::default());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read configuration {}", path.display()))
        }
    };
    let config = PaceConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

pub struct ProbeOutcome {
    pub capabilities: GpuCapabilities,
    pub signals: DeviceSignals,
    pub ceiling: QualityTier,
}

/// Probes the real GPU and folds in device signals from the host and config.
pub fn probe_host(config: &PaceConfig) -> ProbeOutcome {
    let host = WgpuHost::new();
    let capabilities = pollster::block_on(gpuprobe::probe(&host));
    let signals = signals_with_overrides(DeviceSignals::detect(), &config.device);
    let probed = ceiling_tier(&capabilities, &signals);
    let ceiling = config
        .controller
        .ceiling
        .map(QualityTier::from)
        .unwrap_or(probed);
    tracing::debug!(
        backend = %capabilities.backend,
        profile = %capabilities.performance_profile,
        %probed,
        %ceiling,
        "probe complete"
    );
    ProbeOutcome {
        capabilities,
        signals,
        ceiling,
    }
}

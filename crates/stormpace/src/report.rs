use anyhow::{Context, Result};
use gpuprobe::{DeviceSignals, GpuCapabilities};
use quality::{OverrideSet, QualitySettings, QualityTier};
use serde::Serialize;

use crate::run::ProbeOutcome;

#[derive(Serialize)]
struct ProbeReport<'a> {
    capabilities: &'a GpuCapabilities,
    signals: &'a DeviceSignals,
    ceiling: QualityTier,
}

pub fn print_probe(outcome: &ProbeOutcome, json: bool) -> Result<()> {
    if json {
        let report = ProbeReport {
            capabilities: &outcome.capabilities,
            signals: &outcome.signals,
            ceiling: outcome.ceiling,
        };
        let text =
            serde_json::to_string_pretty(&report).context("failed to serialise probe report")?;
        println!("{text}");
        return Ok(());
    }

    let caps = &outcome.capabilities;
    println!("GPU:");
    println!("  backend:            {}", caps.backend);
    if let Some(adapter) = &caps.adapter {
        println!(
            "  adapter:            {} ({}, {})",
            adapter.name, adapter.device_type, adapter.api
        );
        if !adapter.driver.is_empty() {
            println!("  driver:             {}", adapter.driver);
        }
        if adapter.is_software {
            println!("  software renderer:  yes");
        }
    }
    println!("  compatibility mode: {}", caps.compatibility_mode);
    println!("  profile:            {}", caps.performance_profile);
    println!("Features:");
    println!("  compute:            {}", caps.features.compute);
    println!("  multisampling:      {}", caps.features.multisampling);
    println!("  timestamp queries:  {}", caps.features.timestamp);
    println!("  storage textures:   {}", caps.features.storage_textures);
    println!("  depth clamping:     {}", caps.features.depth_clamping);
    println!("Limits:");
    println!("  max texture:        {}", caps.limits.max_texture_dimension);
    println!("  max buffer:         {}", caps.limits.max_buffer_size);
    println!("  max workgroup:      {}", caps.limits.max_workgroup_size);
    println!("  max invocations:    {}", caps.limits.max_compute_invocations);

    let signals = &outcome.signals;
    println!("Device:");
    println!("  cores:              {}", display_option(signals.hardware_concurrency));
    println!("  memory (GiB):       {}", display_option(signals.device_memory_gib));
    println!("  connection:         {}", signals.connection);
    println!("  mobile:             {}", display_option(signals.mobile));
    match signals.battery {
        Some(battery) => println!(
            "  battery:            {:.0}%{}",
            battery.level * 100.0,
            if battery.charging { " (charging)" } else { "" }
        ),
        None => println!("  battery:            unknown"),
    }
    println!("Quality ceiling: {}", outcome.ceiling);
    Ok(())
}

pub fn print_settings(tiers: &[QualityTier], overrides: &OverrideSet, json: bool) -> Result<()> {
    let settings: Vec<QualitySettings> = tiers.iter().map(|tier| overrides.settings(*tier)).collect();
    if json {
        let text = match settings.as_slice() {
            [single] => serde_json::to_string_pretty(single),
            many => serde_json::to_string_pretty(many),
        }
        .context("failed to serialise settings")?;
        println!("{text}");
        return Ok(());
    }

    for (index, entry) in settings.iter().enumerate() {
        if index > 0 {
            println!();
        }
        let overridden = overrides.for_tier(entry.tier).is_some();
        println!(
            "{}{}:",
            entry.tier,
            if overridden { " (overridden)" } else { "" }
        );
        println!("  atmosphere layers:  {}", entry.atmosphere_layers);
        println!("  rain layers:        {}", entry.rain_layers);
        println!("  lightning:          {}", on_off(entry.lightning_enabled));
        println!("  particles:          {}", on_off(entry.particles_enabled));
        println!("  glow:               {}", on_off(entry.glow_enabled));
        println!(
            "  target fps:         {} ({:.2} ms budget)",
            entry.target_fps, entry.frame_budget_ms
        );
        println!("  update interval:    {} ms", entry.update_interval_ms);
        println!("  blink interval:     {} ms", entry.blink_interval_ms);
        println!("  breathing:          {}", entry.breathing_amplitude);
        println!("  opacity:            {}", entry.opacity);
        println!("  blur:               {} px", entry.blur_px);
        println!(
            "  durations:          breathing {}s, lightning {}s, blink {}s",
            entry.durations.breathing_secs,
            entry.durations.lightning_secs,
            entry.durations.blink_secs
        );
    }
    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn display_option<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

//! Graphics capability probe.
//!
//! `probe` walks the backend ladder once:
//!
//! ```text
//!   primary (compute) ──fail──▶ compatibility (raster) ──fail──▶ none
//! ```
//!
//! Each rung is independently fallible and a failure only moves the probe one
//! rung down, so the future always resolves to a usable [`GpuCapabilities`].
//! The host is abstracted behind [`GpuHost`]; [`WgpuHost`] is the real one.

mod caps;
mod host;
mod signals;
mod wgpu_host;

pub use caps::{
    AdapterSummary, GpuBackend, GpuCapabilities, GpuFeatures, GpuLimits, PerformanceProfile,
    FALLBACK_MAX_TEXTURE, HIGH_BUFFER_THRESHOLD, HIGH_TEXTURE_THRESHOLD,
    HIGH_WORKGROUP_THRESHOLD, LOW_TEXTURE_THRESHOLD,
};
pub use host::{AdapterReport, GpuHost, ProbeError};
pub use signals::{BatteryStatus, ConnectionHint, DeviceSignals};
pub use wgpu_host::WgpuHost;

/// Probes the host and never fails; the worst case is [`GpuBackend::None`].
pub async fn probe<H: GpuHost>(host: &H) -> GpuCapabilities {
    match host.request_primary().await {
        Ok(report) => {
            let caps = report.into_capabilities(GpuBackend::PrimaryCompute);
            tracing::debug!(
                profile = %caps.performance_profile,
                compatibility = caps.compatibility_mode,
                "primary GPU backend available"
            );
            return caps;
        }
        Err(err) => {
            tracing::warn!(error = %err, "primary GPU backend unavailable; trying compatibility backend");
        }
    }

    match host.request_compatibility().await {
        Ok(report) => {
            let caps = report.into_capabilities(GpuBackend::CompatibilityRaster);
            tracing::debug!(profile = %caps.performance_profile, "compatibility GPU backend available");
            caps
        }
        Err(err) => {
            tracing::warn!(error = %err, "no GPU backend available; using conservative limits");
            GpuCapabilities::none()
        }
    }
}

use crate::caps::{AdapterSummary, GpuBackend, GpuCapabilities, GpuFeatures, GpuLimits, PerformanceProfile};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("backend is not available on this host")]
    Unsupported,
    #[error("no suitable adapter: {0}")]
    NoAdapter(String),
    #[error("trial device creation failed: {0}")]
    Device(String),
}

/// Raw answer of a single backend query.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterReport {
    pub summary: Option<AdapterSummary>,
    pub features: GpuFeatures,
    pub limits: GpuLimits,
    /// Device reported reduced (downlevel) limits.
    pub compatibility_mode: bool,
}

impl AdapterReport {
    pub(crate) fn into_capabilities(self, backend: GpuBackend) -> GpuCapabilities {
        let mut features = self.features;
        let mut limits = self.limits;
        if backend == GpuBackend::CompatibilityRaster {
            // Raster-only: nothing compute-shaped survives.
            features.compute = false;
            features.storage_textures = false;
            limits.max_workgroup_size = 0;
            limits.max_compute_invocations = 0;
        }
        let performance_profile =
            PerformanceProfile::derive(backend, &limits, self.compatibility_mode);
        GpuCapabilities {
            backend,
            features,
            limits,
            compatibility_mode: self.compatibility_mode,
            performance_profile,
            adapter: self.summary,
        }
    }
}

/// Graphics facilities of the host.
///
/// Implementations must release any trial device before their future
/// resolves; the probe only keeps the numbers.
#[allow(async_fn_in_trait)]
pub trait GpuHost {
    /// Acquire the compute-capable backend with a high-performance preference.
    async fn request_primary(&self) -> Result<AdapterReport, ProbeError>;
    /// Acquire the raster-only fallback backend.
    async fn request_compatibility(&self) -> Result<AdapterReport, ProbeError>;
}

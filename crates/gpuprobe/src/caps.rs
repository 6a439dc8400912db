use std::fmt;

use serde::Serialize;

/// Largest texture a host without any usable GPU is assumed to handle.
pub const FALLBACK_MAX_TEXTURE: u32 = 512;

/// Texture dimension below which a backend is treated as low end.
pub const LOW_TEXTURE_THRESHOLD: u32 = 4096;
/// Thresholds that all have to be met for a `High` profile.
pub const HIGH_TEXTURE_THRESHOLD: u32 = 8192;
pub const HIGH_BUFFER_THRESHOLD: u64 = 256 * 1024 * 1024;
pub const HIGH_WORKGROUP_THRESHOLD: u32 = 256;

/// Graphics backend exposed by the host, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuBackend {
    /// Compute-capable backend (Vulkan, Metal, DX12, WebGPU).
    PrimaryCompute,
    /// Raster-only fallback (GL / WebGL2).
    CompatibilityRaster,
    None,
}

impl fmt::Display for GpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuBackend::PrimaryCompute => f.write_str("primary-compute"),
            GpuBackend::CompatibilityRaster => f.write_str("compatibility-raster"),
            GpuBackend::None => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GpuFeatures {
    pub compute: bool,
    pub multisampling: bool,
    pub timestamp: bool,
    pub storage_textures: bool,
    pub depth_clamping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpuLimits {
    pub max_texture_dimension: u32,
    pub max_buffer_size: u64,
    pub max_workgroup_size: u32,
    pub max_compute_invocations: u32,
}

impl GpuLimits {
    /// Conservative limits reported when no backend could be acquired.
    pub const fn fallback() -> Self {
        Self {
            max_texture_dimension: FALLBACK_MAX_TEXTURE,
            max_buffer_size: 0,
            max_workgroup_size: 0,
            max_compute_invocations: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceProfile {
    Low,
    Medium,
    High,
}

impl PerformanceProfile {
    /// Derives the profile from the probed limits table.
    ///
    /// * no backend, or a max texture below 4096 px, is `Low`;
    /// * compatibility mode caps the result at `Medium`;
    /// * texture >= 8192, buffer >= 256 MiB and workgroup >= 256 is `High`;
    /// * anything else is `Medium`.
    pub fn derive(backend: GpuBackend, limits: &GpuLimits, compatibility_mode: bool) -> Self {
        if backend == GpuBackend::None || limits.max_texture_dimension < LOW_TEXTURE_THRESHOLD {
            return Self::Low;
        }
        if compatibility_mode {
            return Self::Medium;
        }
        let high = limits.max_texture_dimension >= HIGH_TEXTURE_THRESHOLD
            && limits.max_buffer_size >= HIGH_BUFFER_THRESHOLD
            && limits.max_workgroup_size >= HIGH_WORKGROUP_THRESHOLD;
        if high {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for PerformanceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceProfile::Low => f.write_str("low"),
            PerformanceProfile::Medium => f.write_str("medium"),
            PerformanceProfile::High => f.write_str("high"),
        }
    }
}

/// Descriptive adapter details, only used for diagnostics output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterSummary {
    pub name: String,
    pub driver: String,
    pub device_type: String,
    pub api: String,
    pub is_software: bool,
}

/// Result of a capability probe. Read-only once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuCapabilities {
    pub backend: GpuBackend,
    pub features: GpuFeatures,
    pub limits: GpuLimits,
    pub compatibility_mode: bool,
    pub performance_profile: PerformanceProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<AdapterSummary>,
}

impl GpuCapabilities {
    /// Capabilities of a host with no usable graphics backend.
    pub fn none() -> Self {
        let limits = GpuLimits::fallback();
        Self {
            backend: GpuBackend::None,
            features: GpuFeatures::default(),
            limits,
            compatibility_mode: true,
            performance_profile: PerformanceProfile::derive(GpuBackend::None, &limits, true),
            adapter: None,
        }
    }

    pub fn has_gpu(&self) -> bool {
        self.backend != GpuBackend::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(texture: u32, buffer: u64, workgroup: u32) -> GpuLimits {
        GpuLimits {
            max_texture_dimension: texture,
            max_buffer_size: buffer,
            max_workgroup_size: workgroup,
            max_compute_invocations: workgroup,
        }
    }

    #[test]
    fn high_profile_requires_every_threshold() {
        let backend = GpuBackend::PrimaryCompute;
        assert_eq!(
            PerformanceProfile::derive(backend, &limits(8192, HIGH_BUFFER_THRESHOLD, 256), false),
            PerformanceProfile::High
        );
        assert_eq!(
            PerformanceProfile::derive(backend, &limits(8192, HIGH_BUFFER_THRESHOLD, 128), false),
            PerformanceProfile::Medium
        );
        assert_eq!(
            PerformanceProfile::derive(backend, &limits(8192, 64 * 1024 * 1024, 256), false),
            PerformanceProfile::Medium
        );
        assert_eq!(
            PerformanceProfile::derive(backend, &limits(4096, HIGH_BUFFER_THRESHOLD, 256), false),
            PerformanceProfile::Medium
        );
    }

    #[test]
    fn compatibility_mode_caps_at_medium() {
        let generous = limits(16384, 2 * HIGH_BUFFER_THRESHOLD, 1024);
        assert_eq!(
            PerformanceProfile::derive(GpuBackend::PrimaryCompute, &generous, true),
            PerformanceProfile::Medium
        );
    }

    #[test]
    fn small_textures_and_missing_backend_are_low() {
        assert_eq!(
            PerformanceProfile::derive(
                GpuBackend::CompatibilityRaster,
                &limits(2048, 0, 0),
                false
            ),
            PerformanceProfile::Low
        );
        assert_eq!(
            PerformanceProfile::derive(GpuBackend::None, &limits(16384, u64::MAX, 1024), false),
            PerformanceProfile::Low
        );
    }

    #[test]
    fn fallback_capabilities_are_conservative() {
        let caps = GpuCapabilities::none();
        assert_eq!(caps.backend, GpuBackend::None);
        assert_eq!(caps.performance_profile, PerformanceProfile::Low);
        assert_eq!(caps.limits.max_texture_dimension, 512);
        assert!(caps.compatibility_mode);
        assert!(!caps.has_gpu());
        assert_eq!(caps.features, GpuFeatures::default());
    }
}

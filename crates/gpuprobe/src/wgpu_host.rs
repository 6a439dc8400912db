use crate::caps::{AdapterSummary, GpuFeatures, GpuLimits};
use crate::host::{AdapterReport, GpuHost, ProbeError};

/// [`GpuHost`] backed by wgpu.
///
/// The primary query enumerates Vulkan/Metal/DX12/WebGPU, the compatibility
/// query only GL. Each query builds its own instance and drops it again.
#[derive(Debug, Clone, Copy)]
pub struct WgpuHost {
    power_preference: wgpu::PowerPreference,
}

impl WgpuHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_power_preference(power_preference: wgpu::PowerPreference) -> Self {
        Self { power_preference }
    }

    async fn query(
        &self,
        backends: wgpu::Backends,
        label: &'static str,
    ) -> Result<AdapterReport, ProbeError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| ProbeError::NoAdapter(err.to_string()))?;

        let info = adapter.get_info();
        let limits = adapter.limits();
        let adapter_features = adapter.features();
        let downlevel = adapter.get_downlevel_capabilities();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            label,
            "probing GPU adapter"
        );

        // A trial device proves the adapter is usable; it is destroyed at once.
        let (device, _queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: limits.clone(),
                ..Default::default()
            })
            .await
            .map_err(|err| ProbeError::Device(err.to_string()))?;
        device.destroy();
        drop(device);

        let sample_counts = adapter
            .get_texture_format_features(wgpu::TextureFormat::Rgba8Unorm)
            .flags
            .supported_sample_counts();

        let features = GpuFeatures {
            compute: downlevel
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            multisampling: sample_counts.iter().any(|&count| count > 1),
            timestamp: adapter_features.contains(wgpu::Features::TIMESTAMP_QUERY),
            storage_textures: limits.max_storage_textures_per_shader_stage > 0,
            depth_clamping: adapter_features.contains(wgpu::Features::DEPTH_CLIP_CONTROL),
        };

        Ok(AdapterReport {
            summary: Some(summarise(&info)),
            features,
            limits: GpuLimits {
                max_texture_dimension: limits.max_texture_dimension_2d,
                max_buffer_size: limits.max_buffer_size,
                max_workgroup_size: limits.max_compute_workgroup_size_x,
                max_compute_invocations: limits.max_compute_invocations_per_workgroup,
            },
            compatibility_mode: !downlevel.is_webgpu_compliant(),
        })
    }
}

impl Default for WgpuHost {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

impl GpuHost for WgpuHost {
    async fn request_primary(&self) -> Result<AdapterReport, ProbeError> {
        self.query(wgpu::Backends::PRIMARY, "stormpace primary probe")
            .await
    }

    async fn request_compatibility(&self) -> Result<AdapterReport, ProbeError> {
        let mut report = self
            .query(wgpu::Backends::GL, "stormpace compatibility probe")
            .await?;
        // The raster rung is profiled on its own terms, not as a fallback.
        report.compatibility_mode = false;
        Ok(report)
    }
}

fn summarise(info: &wgpu::AdapterInfo) -> AdapterSummary {
    let name = info.name.to_ascii_lowercase();
    let driver = info.driver.to_ascii_lowercase();
    let is_software = matches!(info.device_type, wgpu::DeviceType::Cpu)
        || name.contains("llvmpipe")
        || name.contains("softpipe")
        || driver.contains("llvmpipe")
        || driver.contains("softpipe");
    AdapterSummary {
        name: info.name.clone(),
        driver: info.driver.clone(),
        device_type: format!("{:?}", info.device_type),
        api: format!("{:?}", info.backend),
        is_software,
    }
}

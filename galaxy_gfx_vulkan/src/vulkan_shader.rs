/// Shader - Vulkan implementation of RawShader

use galaxy_gfx::gfx::{check_spirv_header, RawShader, Result, ShaderCreateInfo};
use galaxy_gfx::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// What reflection found in a SPIR-V module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ShaderReflection {
    pub entry_points: Vec<String>,
    /// Largest push-constant block over every entry point (0 if none)
    pub push_constant_size: u32,
}

/// Parse SPIR-V and extract entry points and the push-constant block size using spirq
pub(crate) fn reflect_shader(code: &[u32]) -> Result<ShaderReflection> {
    // spirq indexes the header unchecked
    check_spirv_header(code)
        .map_err(|reason| engine_err!("gfx::vulkan", "Invalid SPIR-V module: {}", reason))?;

    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("gfx::vulkan", "SPIR-V reflection failed: {:?}", e))?;

    let mut reflection = ShaderReflection::default();
    for entry_point in &entry_points {
        reflection.entry_points.push(entry_point.name.clone());
        for var in entry_point.vars.iter() {
            if let spirq::var::Variable::PushConstant { ty, .. } = var {
                let size = ty.nbyte().unwrap_or(0) as u32;
                reflection.push_constant_size = reflection.push_constant_size.max(size);
            }
        }
    }
    Ok(reflection)
}

/// Vulkan shader implementation
pub struct VulkanShader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    reflection: ShaderReflection,
}

impl VulkanShader {
    pub(crate) fn new(ctx: Arc<GpuContext>, info: &ShaderCreateInfo) -> Result<Self> {
        let reflection = reflect_shader(&info.code)?;
        if !reflection.entry_points.iter().any(|name| name == &info.entry_point) {
            return Err(engine_err!(
                "gfx::vulkan",
                "Entry point '{}' not found in shader (available: {:?})",
                info.entry_point,
                reflection.entry_points
            ));
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(&info.code);
        let module = unsafe {
            ctx.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create shader module: {:?}", e))?
        };

        Ok(Self {
            ctx,
            module,
            reflection,
        })
    }

    /// Native module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl RawShader for VulkanShader {
    fn push_constant_size(&self) -> u32 {
        self.reflection.push_constant_size
    }

    fn entry_points(&self) -> Vec<String> {
        self.reflection.entry_points.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanShader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}

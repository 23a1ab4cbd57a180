/// Shader modules (SPIR-V hand-off only, no source compilation)

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::flags::ShaderStages;
use crate::graphics_device::{ContextShared, PendingDeletion};

/// SPIR-V magic number (first word of every module)
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Words in a SPIR-V header (magic, version, generator, bound, schema)
pub const SPIRV_HEADER_WORDS: usize = 5;

/// Pipeline stage a shader module is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStages::VERTEX,
            ShaderStage::Fragment => ShaderStages::FRAGMENT,
            ShaderStage::Compute => ShaderStages::COMPUTE,
        }
    }
}

/// Descriptor for creating a shader module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCreateInfo {
    /// SPIR-V words
    pub code: Vec<u32>,
    pub stage: ShaderStage,
    /// Entry point name (usually "main")
    pub entry_point: String,
}

impl ShaderCreateInfo {
    pub fn new(code: Vec<u32>, stage: ShaderStage) -> Self {
        Self {
            code,
            stage,
            entry_point: "main".to_string(),
        }
    }
}

/// Read a `.spv` file into SPIR-V words
///
/// Errors: `FileNotFound` when the path does not exist, `FileNotReadable`
/// when it cannot be read, `InvalidResource` when the bytes are not a
/// little-endian SPIR-V module.
pub fn read_spirv_file(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| Error::FileNotReadable(format!("{}: {}", path.display(), e)))?;
    spirv_words(&bytes).map_err(|reason| {
        Error::InvalidResource(format!("{}: {}", path.display(), reason))
    })
}

/// Convert raw bytes to SPIR-V words, checking size and magic number
pub fn spirv_words(bytes: &[u8]) -> std::result::Result<Vec<u32>, String> {
    if bytes.len() % 4 != 0 {
        return Err(format!("size {} is not a multiple of 4", bytes.len()));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    check_spirv_header(&words)?;
    Ok(words)
}

/// Check that `words` starts with a complete SPIR-V header
pub fn check_spirv_header(words: &[u32]) -> std::result::Result<(), String> {
    match words.first() {
        None => Err("empty module".to_string()),
        Some(&SPIRV_MAGIC) if words.len() < SPIRV_HEADER_WORDS => Err(format!(
            "truncated module: {} words, header needs {}",
            words.len(),
            SPIRV_HEADER_WORDS
        )),
        Some(&SPIRV_MAGIC) => Ok(()),
        Some(word) => Err(format!("bad magic number {:#010x}", word)),
    }
}

/// Backend shader module
pub trait RawShader: Send + Sync {
    /// Push-constant block size found by reflection (0 if none)
    fn push_constant_size(&self) -> u32;

    /// Entry points declared by the module
    fn entry_points(&self) -> Vec<String>;

    fn as_any(&self) -> &dyn Any;
}

/// Compiled shader module
pub struct Shader {
    shared: Arc<ContextShared>,
    raw: Option<Box<dyn RawShader>>,
    stage: ShaderStage,
    entry_point: String,
}

impl Shader {
    pub(crate) fn new(
        shared: Arc<ContextShared>,
        raw: Box<dyn RawShader>,
        stage: ShaderStage,
        entry_point: String,
    ) -> Self {
        Self {
            shared,
            raw: Some(raw),
            stage,
            entry_point,
        }
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn push_constant_size(&self) -> u32 {
        self.raw().push_constant_size()
    }

    pub fn raw(&self) -> &dyn RawShader {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("shader backend object taken before drop"),
        }
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("stage", &self.stage)
            .field("entry_point", &self.entry_point)
            .finish()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.shared.defer(PendingDeletion::Shader(raw));
        }
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;

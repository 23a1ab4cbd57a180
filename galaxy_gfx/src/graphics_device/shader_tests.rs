use super::*;
use crate::graphics_device::mock_graphics_device::*;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("galaxy_gfx_{}_{}", std::process::id(), name))
}

// ============================================================================
// SPIR-V parsing
// ============================================================================

fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

#[test]
fn test_spirv_words_little_endian() {
    let header = [SPIRV_MAGIC, 0x0001_0500, 0, 8, 0];
    assert_eq!(spirv_words(&to_bytes(&header)).unwrap(), header.to_vec());
}

#[test]
fn test_spirv_words_rejects_truncated_header() {
    let err = spirv_words(&to_bytes(&[SPIRV_MAGIC, 0x0001_0500])).unwrap_err();
    assert!(err.contains("truncated"));
}

#[test]
fn test_spirv_header_lengths() {
    assert!(check_spirv_header(&[SPIRV_MAGIC]).is_err());
    assert!(check_spirv_header(&[SPIRV_MAGIC, 0, 0, 0]).is_err());
    assert!(check_spirv_header(&[SPIRV_MAGIC, 0, 0, 0, 0]).is_ok());
    assert!(check_spirv_header(&[0xDEAD_BEEF, 0, 0, 0, 0]).is_err());
}

#[test]
fn test_spirv_words_rejects_partial_word() {
    let bytes = [0x03, 0x02, 0x23, 0x07, 0x00];
    assert!(spirv_words(&bytes).is_err());
}

#[test]
fn test_spirv_words_rejects_bad_magic() {
    let bytes = 0xDEAD_BEEFu32.to_le_bytes();
    let err = spirv_words(&bytes).unwrap_err();
    assert!(err.contains("magic"));
}

#[test]
fn test_spirv_words_rejects_empty() {
    assert!(spirv_words(&[]).is_err());
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_read_missing_file() {
    let result = read_spirv_file(temp_path("does_not_exist.spv"));
    assert!(matches!(result, Err(Error::FileNotFound(_))));
}

#[test]
fn test_read_spirv_file() {
    let path = temp_path("valid.spv");
    std::fs::write(&path, to_bytes(&spirv_stub(16))).unwrap();

    let words = read_spirv_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(words, spirv_stub(16));
}

#[test]
fn test_read_non_spirv_file() {
    let path = temp_path("text.spv");
    std::fs::write(&path, b"not a shader").unwrap();
    let result = read_spirv_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_read_truncated_spirv_file() {
    let path = temp_path("truncated.spv");
    std::fs::write(&path, to_bytes(&[SPIRV_MAGIC])).unwrap();
    let result = read_spirv_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_read_directory_is_not_readable() {
    let result = read_spirv_file(std::env::temp_dir());
    assert!(matches!(result, Err(Error::FileNotReadable(_))));
}

// ============================================================================
// Context factory
// ============================================================================

#[test]
fn test_create_shader_reflects_push_constants() {
    let (context, _calls) = mock_context();
    let shader = context
        .create_shader(&ShaderCreateInfo::new(spirv_stub(64), ShaderStage::Vertex))
        .unwrap();
    assert_eq!(shader.stage(), ShaderStage::Vertex);
    assert_eq!(shader.entry_point(), "main");
    assert_eq!(shader.push_constant_size(), 64);
}

#[test]
fn test_create_shader_rejects_non_spirv() {
    let (context, calls) = mock_context();
    let result = context.create_shader(&ShaderCreateInfo::new(vec![1, 2, 3], ShaderStage::Fragment));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(calls.matching("create_shader").is_empty());
}

#[test]
fn test_create_shader_rejects_truncated_module() {
    let (context, calls) = mock_context();
    let result = context.create_shader(&ShaderCreateInfo::new(vec![SPIRV_MAGIC, 0x0001_0500], ShaderStage::Vertex));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(calls.matching("create_shader").is_empty());
}

#[test]
fn test_load_truncated_shader_file() {
    let path = temp_path("truncated_compute.spv");
    std::fs::write(&path, to_bytes(&[SPIRV_MAGIC, 0x0001_0500, 0])).unwrap();

    let (context, calls) = mock_context();
    let result = context.load_shader(&path, ShaderStage::Compute);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert!(calls.matching("create_shader").is_empty());
}

#[test]
fn test_load_shader_from_file() {
    let path = temp_path("compute.spv");
    std::fs::write(&path, to_bytes(&spirv_stub(0))).unwrap();

    let (context, _calls) = mock_context();
    let shader = context.load_shader(&path, ShaderStage::Compute);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(shader.unwrap().stage(), ShaderStage::Compute);
}

#[test]
fn test_stage_to_stage_flags() {
    use crate::flags::ShaderStages;
    assert_eq!(ShaderStages::from(ShaderStage::Vertex), ShaderStages::VERTEX);
    assert_eq!(ShaderStages::from(ShaderStage::Compute), ShaderStages::COMPUTE);
}

//! 光线追踪着色器库
//!
//! 光线生成、最近命中和未命中着色器放在同一个 DXIL 库里，目标配置为 `lib_6_3`。
//! 库可以在启动时由 DXC 从 HLSL 编译，也可以直接读取预编译好的 `.cso`。
//!
//! # 着色器源码
//!
//! 默认路径为 `shaders/raytracing.hlsl`，导出名见 `pipeline` 模块的常量。

use std::path::{Path, PathBuf};

use crate::core::config::RaytracingConfig;
use crate::core::error::{GraphicsError, Result};

/// DXIL 库的目标配置
pub const SHADER_LIBRARY_PROFILE: &str = "lib_6_3";

/// DXBC/DXIL 容器头部的四字符码
const CONTAINER_FOURCC: &[u8; 4] = b"DXBC";

/// 容器头部：fourcc + 16 字节摘要 + 版本 + 总大小 + 分段数
const CONTAINER_HEADER_SIZE: usize = 32;

/// 总大小字段在头部中的偏移
const CONTAINER_SIZE_OFFSET: usize = 24;

/// 着色器库来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    /// 运行时用 DXC 编译的 HLSL
    Hlsl(PathBuf),
    /// 预编译的 DXIL 库
    Precompiled(PathBuf),
}

impl ShaderSource {
    /// 配置了预编译库时优先使用
    pub fn from_config(config: &RaytracingConfig) -> Self {
        match &config.precompiled_library {
            Some(path) => ShaderSource::Precompiled(PathBuf::from(path)),
            None => ShaderSource::Hlsl(PathBuf::from(&config.shader_path)),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ShaderSource::Hlsl(path) | ShaderSource::Precompiled(path) => path,
        }
    }
}

/// DXC 编译参数
///
/// 调试构建嵌入调试信息并关闭优化。
pub fn compile_arguments(debug: bool) -> Vec<&'static str> {
    let mut args = vec!["-all_resources_bound"];
    if debug {
        args.extend(["-Zi", "-Qembed_debug", "-Od"]);
    } else {
        args.push("-O3");
    }
    args
}

/// 读取 HLSL 源码
pub fn read_hlsl(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        GraphicsError::ShaderCompilation(format!("failed to read {}: {}", path.display(), e)).into()
    })
}

/// 编译好的 DXIL 库
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    bytecode: Vec<u8>,
    origin: String,
}

impl ShaderLibrary {
    /// 检查容器头部后接收字节码
    pub fn from_dxil(bytecode: Vec<u8>, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        check_container(&bytecode).map_err(|reason| {
            GraphicsError::ShaderCompilation(format!("{} is not a valid DXIL library: {}", origin, reason))
        })?;
        Ok(Self { bytecode, origin })
    }

    /// 读取预编译库
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            GraphicsError::ShaderCompilation(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_dxil(bytes, path.display().to_string())
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// 源文件名，用于日志
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

fn check_container(bytes: &[u8]) -> std::result::Result<(), String> {
    if bytes.len() < CONTAINER_HEADER_SIZE {
        return Err(format!("{} bytes is smaller than the container header", bytes.len()));
    }
    if &bytes[..4] != CONTAINER_FOURCC {
        return Err("missing DXBC fourcc".to_string());
    }

    let mut size = [0u8; 4];
    size.copy_from_slice(&bytes[CONTAINER_SIZE_OFFSET..CONTAINER_SIZE_OFFSET + 4]);
    let declared = u32::from_le_bytes(size) as usize;
    if declared != bytes.len() {
        return Err(format!("header declares {} bytes, file has {}", declared, bytes.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_container(total: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; total];
        bytes[..4].copy_from_slice(CONTAINER_FOURCC);
        bytes[CONTAINER_SIZE_OFFSET..CONTAINER_SIZE_OFFSET + 4].copy_from_slice(&(total as u32).to_le_bytes());
        bytes
    }

    #[test]
    fn test_source_prefers_precompiled() {
        let mut config = crate::core::Config::default().raytracing;
        assert_eq!(
            ShaderSource::from_config(&config),
            ShaderSource::Hlsl(PathBuf::from("shaders/raytracing.hlsl"))
        );

        config.precompiled_library = Some("build/raytracing.cso".to_string());
        let source = ShaderSource::from_config(&config);
        assert_eq!(source, ShaderSource::Precompiled(PathBuf::from("build/raytracing.cso")));
        assert_eq!(source.path(), Path::new("build/raytracing.cso"));
    }

    #[test]
    fn test_compile_arguments() {
        let debug = compile_arguments(true);
        assert!(debug.contains(&"-Zi"));
        assert!(debug.contains(&"-Od"));

        let release = compile_arguments(false);
        assert!(release.contains(&"-O3"));
        assert!(!release.contains(&"-Zi"));
    }

    #[test]
    fn test_container_check() {
        assert!(ShaderLibrary::from_dxil(fake_container(64), "ok").is_ok());

        assert!(ShaderLibrary::from_dxil(vec![0u8; 8], "short").is_err());

        let mut wrong_magic = fake_container(64);
        wrong_magic[0] = b'X';
        assert!(ShaderLibrary::from_dxil(wrong_magic, "magic").is_err());

        let mut truncated = fake_container(64);
        truncated.truncate(48);
        assert!(ShaderLibrary::from_dxil(truncated, "truncated").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ShaderLibrary::load(Path::new("does/not/exist.cso")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.cso"));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join("rt_engine_test_library.cso");
        std::fs::write(&path, fake_container(40)).unwrap();
        let library = ShaderLibrary::load(&path).unwrap();
        assert_eq!(library.bytecode().len(), 40);
        assert!(library.origin().ends_with("rt_engine_test_library.cso"));
        let _ = std::fs::remove_file(&path);
    }
}

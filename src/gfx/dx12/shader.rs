//! DXC 着色器库编译

use std::ffi::c_void;

use tracing::{debug, info};
use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Graphics::Direct3D::Dxc::*;

use super::util::HResultExt;
use crate::core::error::{GraphicsError, Result};
use crate::renderer::shaders::{compile_arguments, read_hlsl, ShaderLibrary, ShaderSource, SHADER_LIBRARY_PROFILE};

/// 按来源得到 DXIL 库
pub fn load_library(source: &ShaderSource, debug: bool) -> Result<ShaderLibrary> {
    let library = match source {
        ShaderSource::Precompiled(path) => ShaderLibrary::load(path)?,
        ShaderSource::Hlsl(path) => {
            let hlsl = read_hlsl(path)?;
            compile_library(&hlsl, &path.display().to_string(), debug)?
        }
    };

    info!(
        origin = library.origin(),
        bytes = library.bytecode().len(),
        "Shader library ready"
    );
    Ok(library)
}

/// 用 DXC 把 HLSL 编译为 `lib_6_3` 库
pub fn compile_library(hlsl: &str, name: &str, debug: bool) -> Result<ShaderLibrary> {
    unsafe {
        let compiler: IDxcCompiler = DxcCreateInstance(&CLSID_DxcCompiler)
            .graphics(GraphicsError::ShaderCompilation, "DxcCreateInstance(DxcCompiler)")?;
        let library: IDxcLibrary = DxcCreateInstance(&CLSID_DxcLibrary)
            .graphics(GraphicsError::ShaderCompilation, "DxcCreateInstance(DxcLibrary)")?;

        let source = library
            .CreateBlobWithEncodingFromPinned(hlsl.as_ptr() as *const c_void, hlsl.len() as u32, DXC_CP_UTF8)
            .graphics(GraphicsError::ShaderCompilation, "CreateBlobWithEncodingFromPinned")?;

        let argument_strings: Vec<HSTRING> = compile_arguments(debug).into_iter().map(HSTRING::from).collect();
        let arguments: Vec<PCWSTR> = argument_strings.iter().map(|s| PCWSTR(s.as_ptr())).collect();
        let source_name = HSTRING::from(name);
        let profile = HSTRING::from(SHADER_LIBRARY_PROFILE);

        debug!(name, profile = SHADER_LIBRARY_PROFILE, ?debug, "Compiling shader library");

        // 库目标没有入口点
        let result = compiler
            .Compile(
                &source,
                PCWSTR(source_name.as_ptr()),
                PCWSTR::null(),
                PCWSTR(profile.as_ptr()),
                Some(&arguments),
                &[],
                None::<&IDxcIncludeHandler>,
            )
            .graphics(GraphicsError::ShaderCompilation, "IDxcCompiler::Compile")?;

        let status = result
            .GetStatus()
            .graphics(GraphicsError::ShaderCompilation, "IDxcOperationResult::GetStatus")?;
        if status.is_err() {
            let message = result
                .GetErrorBuffer()
                .ok()
                .map(|errors| blob_text(errors.GetBufferPointer(), errors.GetBufferSize()))
                .unwrap_or_else(|| format!("HRESULT 0x{:08X}", status.0 as u32));
            return Err(GraphicsError::ShaderCompilation(format!("{}: {}", name, message)).into());
        }

        let blob = result
            .GetResult()
            .graphics(GraphicsError::ShaderCompilation, "IDxcOperationResult::GetResult")?;
        let bytecode = std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()).to_vec();
        ShaderLibrary::from_dxil(bytecode, name)
    }
}

unsafe fn blob_text(pointer: *mut c_void, size: usize) -> String {
    if pointer.is_null() || size == 0 {
        return String::new();
    }
    let bytes = std::slice::from_raw_parts(pointer as *const u8, size);
    String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string()
}

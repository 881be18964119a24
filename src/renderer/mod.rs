//! 渲染器模块
//!
//! 对外提供统一的 `Renderer`，内部在 Windows 上包装 DX12 光线追踪渲染器。
//! 其余子模块是与 API 无关的部分：资源布局、状态转换、帧同步、
//! 根签名与着色器表布局等，均可在任何平台上单元测试。
//!
//! # 架构设计
//!
//! - `Renderer`：应用层唯一接触的类型
//! - 底层实现在 `gfx::dx12` 中

#[cfg(target_os = "windows")]
use tracing::info;
use winit::window::Window;

use crate::core::error::Result;
use crate::core::Config;
use crate::scene::Scene;

pub mod acceleration;
pub mod adapter;
pub mod barrier;
pub mod descriptor;
pub mod generation;
pub mod pipeline;
pub mod resource;
pub mod shader_table;
pub mod shaders;
pub mod swapchain;
pub mod sync;

#[cfg(target_os = "windows")]
type Backend = crate::gfx::RaytracingRenderer;

/// 非 Windows 平台无法构造
#[cfg(not(target_os = "windows"))]
type Backend = std::convert::Infallible;

pub struct Renderer {
    backend: Backend,
}

#[cfg(target_os = "windows")]
impl Renderer {
    pub fn new(window: &Window, config: &Config) -> Result<Self> {
        info!("Initializing DX12 raytracing backend");
        let backend = Backend::new(window, config)?;
        Ok(Self { backend })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.backend.resize(width, height)
    }

    pub fn render(&mut self, scene: &Scene) -> Result<()> {
        self.backend.render(scene)
    }

    pub fn adapter_description(&self) -> Option<&str> {
        self.backend.adapter_description()
    }

    /// 为 false 时每帧只清屏
    pub fn raytracing_active(&self) -> bool {
        self.backend.raytracing_active()
    }
}

#[cfg(not(target_os = "windows"))]
impl Renderer {
    pub fn new(_window: &Window, _config: &Config) -> Result<Self> {
        Err(crate::core::error::GraphicsError::Unsupported(
            "DirectX 12 raytracing is only available on Windows".to_string(),
        )
        .into())
    }

    pub fn resize(&mut self, _width: u32, _height: u32) -> Result<()> {
        match self.backend {}
    }

    pub fn render(&mut self, _scene: &Scene) -> Result<()> {
        match self.backend {}
    }

    pub fn adapter_description(&self) -> Option<&str> {
        match self.backend {}
    }

    pub fn raytracing_active(&self) -> bool {
        match self.backend {}
    }
}

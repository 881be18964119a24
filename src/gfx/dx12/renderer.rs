//! DX12 光线追踪渲染器
//!
//! 持有设备资源和光线追踪资源，每帧录制：
//!
//! ```text
//! prepare → update_constants → dispatch → copy_output_to_back_buffer → present
//! ```
//!
//! 硬件不支持 DXR 或配置关闭时退化为清屏。设备丢失后设备资源会自行重建，
//! 光线追踪资源在下一帧按新的设备代数重新构建。

use std::ffi::c_void;

use tracing::{debug, info, trace, warn};
use windows::Win32::Foundation::HWND;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;

use super::device_resources::{DeviceResources, FrameOutcome};
use super::raytracing::RaytracingResources;
use super::shader::load_library;
use crate::core::config::RaytracingConfig;
use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::renderer::barrier::ResourceState;
use crate::renderer::generation::BuiltGeneration;
use crate::renderer::shaders::{ShaderLibrary, ShaderSource};
use crate::scene::Scene;

pub struct RaytracingRenderer {
    resources: DeviceResources,
    raytracing: Option<RaytracingResources>,
    /// 为 None 时走清屏路径
    library: Option<ShaderLibrary>,
    /// `raytracing` 所基于的设备代数
    generation: BuiltGeneration,
    raytracing_config: RaytracingConfig,
    clear_colour: [f32; 4],
}

impl RaytracingRenderer {
    pub fn new(window: &Window, config: &Config) -> Result<Self> {
        let hwnd = window_handle(window)?;
        let size = window.inner_size();

        let mut resources = DeviceResources::from_config(config)?;
        resources.initialise_adapter()?;
        resources.create_device_resources()?;
        resources.set_window(hwnd, size.width, size.height);
        resources.create_window_size_dependent_resources()?;

        let library = if !config.raytracing.enabled {
            info!("Raytracing disabled in config, clearing back buffer only");
            None
        } else if !resources.check_raytracing_support() {
            warn!("DirectX Raytracing is not supported on this adapter, clearing back buffer only");
            None
        } else {
            let debug = cfg!(debug_assertions) || config.graphics.debug_layer;
            Some(load_library(&ShaderSource::from_config(&config.raytracing), debug)?)
        };

        Ok(Self {
            resources,
            raytracing: None,
            library,
            generation: BuiltGeneration::new(),
            raytracing_config: config.raytracing.clone(),
            clear_colour: config.graphics.clear_colour,
        })
    }

    /// 窗口尺寸变化
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if !self.resources.window_size_changed(width, height)? {
            return Ok(());
        }

        if self.generation.is_current(self.resources.device_generation()) {
            if let Some(raytracing) = &mut self.raytracing {
                raytracing.resize_output(self.resources.device()?, self.resources.output_size())?;
            }
        }
        Ok(())
    }

    /// 录制并呈现一帧
    pub fn render(&mut self, scene: &Scene) -> Result<()> {
        self.ensure_raytracing(scene)?;

        let frame_index = self.resources.back_buffer_index();
        trace!(frame_index, "Recording frame");
        self.resources.prepare(ResourceState::Present)?;

        let outcome = match &mut self.raytracing {
            Some(raytracing) => {
                raytracing.update_constants(frame_index, scene)?;
                let command_list = self.resources.command_list()?;
                raytracing.dispatch(command_list, frame_index)?;
                raytracing.copy_output_to_back_buffer(command_list, self.resources.render_target()?);
                self.resources.present(ResourceState::Present)?
            }
            None => {
                clear_back_buffer(&self.resources, &self.clear_colour)?;
                self.resources.present(ResourceState::RenderTarget)?
            }
        };

        if outcome == FrameOutcome::DeviceLost {
            warn!("Device lost, raytracing resources will be rebuilt");
            self.raytracing = None;
            self.generation.invalidate();
        }
        Ok(())
    }

    pub fn adapter_description(&self) -> Option<&str> {
        self.resources.adapter_description()
    }

    pub fn raytracing_active(&self) -> bool {
        self.library.is_some()
    }

    /// 首帧或设备重建后创建光线追踪资源
    fn ensure_raytracing(&mut self, scene: &Scene) -> Result<()> {
        let generation = self.resources.device_generation();
        if !self.generation.needs_build(self.library.is_some(), generation) {
            return Ok(());
        }
        let Some(library) = self.library.as_ref() else {
            return Ok(());
        };

        self.raytracing = None;
        self.generation.invalidate();
        let raytracing = RaytracingResources::new(
            &mut self.resources,
            library,
            scene,
            self.raytracing_config.max_recursion_depth,
        )?;
        self.raytracing = Some(raytracing);
        self.generation.mark_built(generation);
        debug!(generation, "Raytracing resources ready");
        Ok(())
    }
}

impl Drop for RaytracingRenderer {
    fn drop(&mut self) {
        // GPU 空闲后才能释放光线追踪资源
        if let Err(e) = self.resources.wait_for_gpu() {
            warn!(error = %e, "Failed to wait for GPU before releasing raytracing resources");
        }
        self.raytracing = None;
    }
}

/// 清屏路径：视口、裁剪矩形和清屏颜色
fn clear_back_buffer(resources: &DeviceResources, colour: &[f32; 4]) -> Result<()> {
    let command_list = resources.command_list()?;
    let rtv = resources.render_target_view()?;
    let viewport = resources.viewport();
    let scissor = resources.scissor_rect();

    unsafe {
        command_list.OMSetRenderTargets(1, Some(&rtv), false, None);
        command_list.ClearRenderTargetView(rtv, colour, None);
        command_list.RSSetViewports(&[viewport]);
        command_list.RSSetScissorRects(&[scissor]);
    }
    Ok(())
}

/// winit 0.29 通过 raw-window-handle 暴露 HWND
fn window_handle(window: &Window) -> Result<HWND> {
    let handle = window
        .window_handle()
        .map_err(|e| GraphicsError::DeviceCreation(format!("window handle unavailable: {}", e)))?;

    match handle.as_raw() {
        RawWindowHandle::Win32(win32) => Ok(HWND(win32.hwnd.get() as *mut c_void)),
        _ => Err(GraphicsError::Unsupported("window is not a Win32 window".to_string()).into()),
    }
}

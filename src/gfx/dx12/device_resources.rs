//! DirectX 12 设备资源
//!
//! 管理设备、命令队列、交换链与后台缓冲的完整生命周期，以及跨 N 个后台缓冲的
//! Fence 同步。参考 DirectX-Graphics-Samples 的 DeviceResources。
//!
//! # 初始化流程
//!
//! 1. `initialise_adapter`：调试层、DXGI 工厂、撕裂支持、适配器选择
//! 2. `create_device_resources`：设备、命令队列、RTV 堆、命令分配器、Fence
//! 3. `set_window` + `create_window_size_dependent_resources`：交换链与 RTV
//!
//! # 每帧
//!
//! `prepare` → 录制命令 → `present`。`present` 内部执行命令列表、呈现并切换到下一帧。
//! 设备被移除时返回 `FrameOutcome::DeviceLost`，此时设备资源已经重建完毕，
//! 调用方需要重建自己持有的 GPU 对象。

use std::ffi::c_void;

use tracing::{debug, info, warn};
use windows::core::Interface;
use windows::Win32::Foundation::{CloseHandle, HANDLE, HWND};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObjectEx, INFINITE};

use super::descriptor::Dx12DescriptorHeap;
use super::util::{d3d12_state, is_device_removed, record_barriers, set_name, transition_barrier, HResultExt};
use crate::core::error::{GraphicsError, Result};
use crate::core::Config;
use crate::renderer::adapter::{description_from_utf16, select_adapter, AdapterChoice, AdapterInfo, FeatureLevel};
use crate::renderer::barrier::{prepare_transitions, present_transitions, ResourceState};
use crate::renderer::descriptor::DescriptorType;
use crate::renderer::swapchain::{
    render_target_name, DeviceOptions, OutputSize, PresentMode, ScissorRect, SwapChainSettings, Viewport,
};
use crate::renderer::sync::{FenceValue, FrameSync, GpuTimeline};

/// 一帧呈现的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// 设备已重建，调用方需要重建自己的 GPU 资源
    DeviceLost,
}

/// `ID3D12Fence` + 命令队列 + 事件组成的 GPU 时间线
pub(crate) struct Dx12Timeline<'a> {
    queue: &'a ID3D12CommandQueue,
    fence: &'a ID3D12Fence,
    event: HANDLE,
}

impl GpuTimeline for Dx12Timeline<'_> {
    fn signal(&self, value: FenceValue) -> Result<()> {
        unsafe {
            self.queue
                .Signal(self.fence, value.value())
                .graphics(GraphicsError::CommandExecution, "ID3D12CommandQueue::Signal")
        }
    }

    fn completed_value(&self) -> FenceValue {
        FenceValue::new(unsafe { self.fence.GetCompletedValue() })
    }

    fn wait_until(&self, value: FenceValue) -> Result<()> {
        unsafe {
            self.fence
                .SetEventOnCompletion(value.value(), self.event)
                .graphics(GraphicsError::CommandExecution, "ID3D12Fence::SetEventOnCompletion")?;
            WaitForSingleObjectEx(self.event, INFINITE, false);
        }
        Ok(())
    }
}

/// 随设备一起创建和销毁的对象
struct DeviceCore {
    device: ID3D12Device,
    command_queue: ID3D12CommandQueue,
    command_allocators: Vec<ID3D12CommandAllocator>,
    command_list: ID3D12GraphicsCommandList4,
    rtv_heap: Dx12DescriptorHeap,
    fence: ID3D12Fence,
    fence_event: HANDLE,
    feature_level: FeatureLevel,
}

impl DeviceCore {
    fn timeline(&self) -> Dx12Timeline<'_> {
        Dx12Timeline {
            queue: &self.command_queue,
            fence: &self.fence,
            event: self.fence_event,
        }
    }
}

impl Drop for DeviceCore {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.fence_event);
        }
    }
}

/// 设备资源
pub struct DeviceResources {
    settings: SwapChainSettings,
    use_warp: bool,
    debug_layer: bool,
    vsync: bool,

    factory: Option<IDXGIFactory4>,
    adapter: Option<IDXGIAdapter1>,
    adapter_info: Option<AdapterInfo>,
    core: Option<DeviceCore>,
    /// 每次创建设备加一，持有 GPU 对象的一方据此判断是否需要重建
    device_generation: u64,

    swap_chain: Option<IDXGISwapChain3>,
    render_targets: Vec<ID3D12Resource>,
    sync: FrameSync,

    window: Option<HWND>,
    output_size: OutputSize,
    viewport: Viewport,
    scissor: ScissorRect,
}

impl DeviceResources {
    /// 创建设备资源（尚未创建任何 GPU 对象）
    pub fn new(settings: SwapChainSettings, use_warp: bool, debug_layer: bool, vsync: bool) -> Result<Self> {
        let sync = FrameSync::new(settings.back_buffer_count)?;
        let output_size = OutputSize::from_window(1, 1);

        Ok(Self {
            settings,
            use_warp,
            debug_layer,
            vsync,
            factory: None,
            adapter: None,
            adapter_info: None,
            core: None,
            device_generation: 0,
            swap_chain: None,
            render_targets: Vec::new(),
            sync,
            window: None,
            output_size,
            viewport: output_size.viewport(),
            scissor: output_size.scissor(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            SwapChainSettings::from_config(config)?,
            config.graphics.use_warp,
            config.graphics.debug_layer,
            config.graphics.vsync,
        )
    }

    /// 创建 DXGI 工厂并选择适配器
    pub fn initialise_adapter(&mut self) -> Result<()> {
        unsafe {
            let mut factory_flags = DXGI_CREATE_FACTORY_FLAGS(0);

            if self.debug_layer {
                let mut debug: Option<ID3D12Debug> = None;
                match D3D12GetDebugInterface(&mut debug) {
                    Ok(()) => {
                        if let Some(debug) = debug {
                            debug.EnableDebugLayer();
                            factory_flags = DXGI_CREATE_FACTORY_DEBUG;
                            debug!("D3D12 debug layer enabled");
                        }
                    }
                    Err(e) => warn!(error = %e, "Direct3D Debug Device is not available"),
                }
            }

            let factory: IDXGIFactory4 =
                CreateDXGIFactory2(factory_flags).graphics(GraphicsError::DeviceCreation, "CreateDXGIFactory2")?;

            if self.settings.options.contains(DeviceOptions::ALLOW_TEARING) {
                let supported = tearing_supported(&factory);
                if !supported {
                    self.settings.options.remove(DeviceOptions::ALLOW_TEARING);
                    warn!("Variable refresh rate displays not supported, presenting with vsync");
                }
                info!(supported, "Tearing support");
            }

            let factory6: IDXGIFactory6 = factory
                .cast()
                .graphics(GraphicsError::Unsupported, "IDXGIFactory6 (DXGI 1.6)")?;

            let mut adapters = Vec::new();
            let mut candidates = Vec::new();
            let mut index = 0u32;
            while let Ok(adapter) =
                factory6.EnumAdapterByGpuPreference::<IDXGIAdapter1>(index, DXGI_GPU_PREFERENCE_HIGH_PERFORMANCE)
            {
                let desc = adapter.GetDesc1().graphics(GraphicsError::DeviceCreation, "IDXGIAdapter1::GetDesc1")?;
                candidates.push(adapter_info(index, &desc));
                adapters.push(adapter);
                index += 1;
            }

            let min_level = D3D_FEATURE_LEVEL(self.settings.min_feature_level.raw());
            let choice = select_adapter(&candidates, self.use_warp, |info| {
                adapters
                    .get(info.index as usize)
                    .map(|adapter| {
                        D3D12CreateDevice(adapter, min_level, std::ptr::null_mut::<Option<ID3D12Device>>()).is_ok()
                    })
                    .unwrap_or(false)
            });

            let (adapter, info) = match choice {
                AdapterChoice::Hardware(info) => {
                    let adapter = adapters[info.index as usize].clone();
                    (adapter, info)
                }
                AdapterChoice::Warp => {
                    if !self.use_warp {
                        warn!("No Direct3D 12 hardware adapter found, falling back to WARP");
                    }
                    let adapter: IDXGIAdapter1 = factory
                        .EnumWarpAdapter()
                        .graphics(GraphicsError::DeviceCreation, "EnumWarpAdapter")?;
                    let desc = adapter.GetDesc1().graphics(GraphicsError::DeviceCreation, "IDXGIAdapter1::GetDesc1")?;
                    (adapter, adapter_info(0, &desc))
                }
            };

            info!(
                index = info.index,
                vendor_id = format_args!("0x{:04X}", info.vendor_id).to_string(),
                device_id = format_args!("0x{:04X}", info.device_id).to_string(),
                vendor = info.vendor_name().unwrap_or("Unknown"),
                description = %info.description,
                dedicated_mb = info.dedicated_video_memory / (1024 * 1024),
                "Direct3D adapter selected"
            );

            self.factory = Some(factory);
            self.adapter = Some(adapter);
            self.adapter_info = Some(info);
        }
        Ok(())
    }

    /// 创建与窗口尺寸无关的设备对象
    pub fn create_device_resources(&mut self) -> Result<()> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("adapter not initialised".to_string()))?;
        let count = self.settings.back_buffer_count;
        let min_level = self.settings.min_feature_level;

        unsafe {
            let mut device: Option<ID3D12Device> = None;
            D3D12CreateDevice(adapter, D3D_FEATURE_LEVEL(min_level.raw()), &mut device)
                .graphics(GraphicsError::DeviceCreation, "D3D12CreateDevice")?;
            let device = device.ok_or_else(|| GraphicsError::DeviceCreation("D3D12CreateDevice returned null".to_string()))?;
            set_name(&device, "DeviceResources");

            if self.debug_layer {
                configure_info_queue(&device);
            }

            let feature_level = max_feature_level(&device, min_level);
            info!(%feature_level, "Feature level");

            let queue_desc = D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                ..Default::default()
            };
            let command_queue: ID3D12CommandQueue = device
                .CreateCommandQueue(&queue_desc)
                .graphics(GraphicsError::DeviceCreation, "CreateCommandQueue")?;
            set_name(&command_queue, "DeviceResources");

            let rtv_heap = Dx12DescriptorHeap::new(&device, DescriptorType::RenderTargetView, count, "DeviceResources")?;

            let mut command_allocators = Vec::with_capacity(count as usize);
            for n in 0..count {
                let allocator: ID3D12CommandAllocator = device
                    .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
                    .graphics(GraphicsError::DeviceCreation, "CreateCommandAllocator")?;
                set_name(&allocator, &render_target_name(n));
                command_allocators.push(allocator);
            }

            let command_list: ID3D12GraphicsCommandList4 = device
                .CreateCommandList(
                    0,
                    D3D12_COMMAND_LIST_TYPE_DIRECT,
                    &command_allocators[0],
                    None::<&ID3D12PipelineState>,
                )
                .graphics(GraphicsError::DeviceCreation, "CreateCommandList")?;
            command_list
                .Close()
                .graphics(GraphicsError::CommandExecution, "ID3D12GraphicsCommandList::Close")?;
            set_name(&command_list, "DeviceResources");

            let initial = self.sync.initial_fence_value();
            let fence: ID3D12Fence = device
                .CreateFence(initial.value(), D3D12_FENCE_FLAG_NONE)
                .graphics(GraphicsError::DeviceCreation, "CreateFence")?;
            set_name(&fence, "DeviceResources");

            let fence_event = CreateEventA(None, false, false, None)
                .map_err(|e| GraphicsError::DeviceCreation(format!("CreateEvent failed: {}", e)))?;

            self.core = Some(DeviceCore {
                device,
                command_queue,
                command_allocators,
                command_list,
                rtv_heap,
                fence,
                fence_event,
                feature_level,
            });
        }

        self.device_generation += 1;
        debug!(generation = self.device_generation, "Device resources created");
        Ok(())
    }

    /// 记录窗口句柄与初始尺寸
    pub fn set_window(&mut self, window: HWND, width: u32, height: u32) {
        self.window = Some(window);
        self.output_size = OutputSize::from_window(width, height);
    }

    /// 创建或重建交换链与后台缓冲
    pub fn create_window_size_dependent_resources(&mut self) -> Result<()> {
        let hwnd = self
            .window
            .ok_or_else(|| GraphicsError::InvalidState("call set_window before creating the swap chain".to_string()))?;

        self.wait_for_gpu()?;

        self.render_targets.clear();
        self.sync.reset_after_resize();

        let count = self.settings.back_buffer_count;
        let size = self.output_size;
        let format = DXGI_FORMAT(self.settings.back_buffer_format.dxgi_value());
        let flags = self.settings.swap_chain_flags();

        unsafe {
            if let Some(swap_chain) = &self.swap_chain {
                let result = swap_chain.ResizeBuffers(count, size.width, size.height, format, DXGI_SWAP_CHAIN_FLAG(flags as i32));
                match result {
                    Err(e) if is_device_removed(e.code()) => {
                        warn!(reason = format_args!("0x{:08X}", e.code().0 as u32).to_string(), "Device lost on ResizeBuffers");
                        // handle_device_lost 会重新调用本方法
                        return self.handle_device_lost();
                    }
                    result => result.graphics(GraphicsError::SwapchainError, "IDXGISwapChain::ResizeBuffers")?,
                }
                info!(width = size.width, height = size.height, buffers = count, "Swap chain resized");
            } else {
                let core = self.core.as_ref().ok_or_else(|| GraphicsError::InvalidState("device not created".to_string()))?;
                let factory = self
                    .factory
                    .as_ref()
                    .ok_or_else(|| GraphicsError::InvalidState("factory not created".to_string()))?;

                let desc = DXGI_SWAP_CHAIN_DESC1 {
                    Width: size.width,
                    Height: size.height,
                    Format: format,
                    SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
                    BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
                    BufferCount: count,
                    Scaling: DXGI_SCALING_STRETCH,
                    SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
                    AlphaMode: DXGI_ALPHA_MODE_IGNORE,
                    Flags: flags,
                    ..Default::default()
                };
                let fullscreen = DXGI_SWAP_CHAIN_FULLSCREEN_DESC {
                    Windowed: true.into(),
                    ..Default::default()
                };

                let swap_chain: IDXGISwapChain1 = factory
                    .CreateSwapChainForHwnd(&core.command_queue, hwnd, &desc, Some(&fullscreen), None)
                    .graphics(GraphicsError::SwapchainError, "CreateSwapChainForHwnd")?;

                // 全屏切换由应用自己处理
                factory
                    .MakeWindowAssociation(hwnd, DXGI_MWA_NO_ALT_ENTER)
                    .graphics(GraphicsError::SwapchainError, "MakeWindowAssociation")?;

                self.swap_chain = Some(
                    swap_chain
                        .cast()
                        .graphics(GraphicsError::SwapchainError, "IDXGISwapChain3")?,
                );
                info!(width = size.width, height = size.height, buffers = count, "Swap chain created");
            }

            let swap_chain = self
                .swap_chain
                .as_ref()
                .ok_or_else(|| GraphicsError::InvalidState("swap chain missing".to_string()))?;
            let core = self
                .core
                .as_mut()
                .ok_or_else(|| GraphicsError::InvalidState("device not created".to_string()))?;

            for n in 0..count {
                let render_target: ID3D12Resource = swap_chain
                    .GetBuffer(n)
                    .graphics(GraphicsError::SwapchainError, "IDXGISwapChain::GetBuffer")?;
                set_name(&render_target, &render_target_name(n));

                let handle = core.rtv_heap.allocate(Some(n))?;
                core.device.CreateRenderTargetView(
                    &render_target,
                    None,
                    super::descriptor::to_cpu_handle(&handle),
                );
                self.render_targets.push(render_target);
            }

            self.sync.set_back_buffer_index(swap_chain.GetCurrentBackBufferIndex() as usize)?;
        }

        self.viewport = size.viewport();
        self.scissor = size.scissor();
        Ok(())
    }

    /// 窗口尺寸变化；尺寸未变时返回 false
    pub fn window_size_changed(&mut self, width: u32, height: u32) -> Result<bool> {
        let new_size = OutputSize::from_window(width, height);
        if new_size == self.output_size {
            return Ok(false);
        }

        self.output_size = new_size;
        self.create_window_size_dependent_resources()?;
        Ok(true)
    }

    /// 重置当前帧的命令分配器与命令列表，后台缓冲转到 RenderTarget
    pub fn prepare(&mut self, before_state: ResourceState) -> Result<()> {
        self.reset_command_list()?;

        if let Some(t) = prepare_transitions(before_state) {
            let barrier = transition_barrier(self.render_target()?, d3d12_state(t.before), d3d12_state(t.after));
            record_barriers(self.command_list()?, vec![barrier]);
        }
        Ok(())
    }

    /// 用当前帧的分配器重置命令列表
    pub fn reset_command_list(&self) -> Result<()> {
        let core = self.core()?;
        let allocator = &core.command_allocators[self.sync.back_buffer_index()];

        unsafe {
            allocator
                .Reset()
                .graphics(GraphicsError::CommandExecution, "ID3D12CommandAllocator::Reset")?;
            core.command_list
                .Reset(allocator, None::<&ID3D12PipelineState>)
                .graphics(GraphicsError::CommandExecution, "ID3D12GraphicsCommandList::Reset")
        }
    }

    /// 后台缓冲转到 Present，提交命令并呈现
    pub fn present(&mut self, before_state: ResourceState) -> Result<FrameOutcome> {
        if let Some(t) = present_transitions(before_state) {
            let core = self.core()?;
            let barrier = transition_barrier(self.render_target()?, d3d12_state(t.before), d3d12_state(t.after));
            record_barriers(&core.command_list, vec![barrier]);
        }

        self.execute_command_list()?;

        let mode = PresentMode::choose(self.tearing_supported(), self.vsync);
        let flags = if mode.allow_tearing {
            DXGI_PRESENT_ALLOW_TEARING
        } else {
            DXGI_PRESENT(0)
        };

        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("swap chain missing".to_string()))?;
        let hr = unsafe { swap_chain.Present(mode.sync_interval, flags) };

        if is_device_removed(hr) {
            let reason = if hr == DXGI_ERROR_DEVICE_REMOVED {
                self.core()
                    .ok()
                    .and_then(|core| unsafe { core.device.GetDeviceRemovedReason() }.err())
                    .map(|e| e.code())
                    .unwrap_or(hr)
            } else {
                hr
            };
            warn!(reason = format_args!("0x{:08X}", reason.0 as u32).to_string(), "Device lost on Present");
            self.handle_device_lost()?;
            return Ok(FrameOutcome::DeviceLost);
        }

        hr.ok().graphics(GraphicsError::SwapchainError, "IDXGISwapChain::Present")?;
        self.move_to_next_frame()?;
        Ok(FrameOutcome::Presented)
    }

    /// 关闭并提交命令列表
    pub fn execute_command_list(&self) -> Result<()> {
        let core = self.core()?;
        unsafe {
            core.command_list
                .Close()
                .graphics(GraphicsError::CommandExecution, "ID3D12GraphicsCommandList::Close")?;
            let command_lists = [Some(core.command_list.clone().into())];
            core.command_queue.ExecuteCommandLists(&command_lists);
        }
        Ok(())
    }

    /// 等待所有已提交的工作完成；设备未创建时直接返回
    pub fn wait_for_gpu(&mut self) -> Result<()> {
        let Some(core) = self.core.as_ref() else {
            return Ok(());
        };
        self.sync.wait_for_gpu(&core.timeline())
    }

    /// 切换到交换链当前的后台缓冲
    pub fn move_to_next_frame(&mut self) -> Result<()> {
        let core = self
            .core
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("device not created".to_string()))?;
        let swap_chain = self
            .swap_chain
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("swap chain missing".to_string()))?;

        let next_index = unsafe { swap_chain.GetCurrentBackBufferIndex() } as usize;
        self.sync.move_to_next_frame(&core.timeline(), next_index)
    }

    /// 释放全部设备对象后重建
    pub fn handle_device_lost(&mut self) -> Result<()> {
        warn!(generation = self.device_generation, "Recreating device resources after device loss");

        self.render_targets.clear();
        self.swap_chain = None;
        self.core = None;
        self.adapter = None;
        self.factory = None;
        self.sync = FrameSync::new(self.settings.back_buffer_count)?;

        self.initialise_adapter()?;
        self.create_device_resources()?;
        self.create_window_size_dependent_resources()?;

        info!(generation = self.device_generation, "Device resources restored");
        Ok(())
    }

    fn core(&self) -> Result<&DeviceCore> {
        self.core
            .as_ref()
            .ok_or_else(|| GraphicsError::InvalidState("device not created".to_string()).into())
    }

    pub fn device(&self) -> Result<&ID3D12Device> {
        Ok(&self.core()?.device)
    }

    pub fn command_queue(&self) -> Result<&ID3D12CommandQueue> {
        Ok(&self.core()?.command_queue)
    }

    pub fn command_list(&self) -> Result<&ID3D12GraphicsCommandList4> {
        Ok(&self.core()?.command_list)
    }

    /// 当前后台缓冲
    pub fn render_target(&self) -> Result<&ID3D12Resource> {
        self.render_targets
            .get(self.sync.back_buffer_index())
            .ok_or_else(|| GraphicsError::InvalidState("back buffers not created".to_string()).into())
    }

    /// 当前后台缓冲的 RTV：堆起始 + 索引 × 增量
    pub fn render_target_view(&self) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        Ok(self.core()?.rtv_heap.cpu_handle(self.sync.back_buffer_index() as u32))
    }

    pub fn back_buffer_index(&self) -> usize {
        self.sync.back_buffer_index()
    }

    pub fn back_buffer_count(&self) -> u32 {
        self.settings.back_buffer_count
    }

    pub fn back_buffer_format(&self) -> DXGI_FORMAT {
        DXGI_FORMAT(self.settings.back_buffer_format.dxgi_value())
    }

    pub fn output_size(&self) -> OutputSize {
        self.output_size
    }

    pub fn viewport(&self) -> D3D12_VIEWPORT {
        D3D12_VIEWPORT {
            TopLeftX: self.viewport.top_left_x,
            TopLeftY: self.viewport.top_left_y,
            Width: self.viewport.width,
            Height: self.viewport.height,
            MinDepth: self.viewport.min_depth,
            MaxDepth: self.viewport.max_depth,
        }
    }

    pub fn scissor_rect(&self) -> windows::Win32::Foundation::RECT {
        windows::Win32::Foundation::RECT {
            left: self.scissor.left,
            top: self.scissor.top,
            right: self.scissor.right,
            bottom: self.scissor.bottom,
        }
    }

    pub fn tearing_supported(&self) -> bool {
        self.settings.options.contains(DeviceOptions::ALLOW_TEARING)
    }

    pub fn feature_level(&self) -> Option<FeatureLevel> {
        self.core.as_ref().map(|core| core.feature_level)
    }

    pub fn device_generation(&self) -> u64 {
        self.device_generation
    }

    pub fn adapter_description(&self) -> Option<&str> {
        self.adapter_info.as_ref().map(|info| info.description.as_str())
    }

    /// 设备是否支持 DXR Tier 1.0
    pub fn check_raytracing_support(&self) -> bool {
        let Ok(core) = self.core() else {
            return false;
        };

        let mut options = D3D12_FEATURE_DATA_D3D12_OPTIONS5::default();
        let queried = unsafe {
            core.device.CheckFeatureSupport(
                D3D12_FEATURE_D3D12_OPTIONS5,
                &mut options as *mut _ as *mut c_void,
                std::mem::size_of::<D3D12_FEATURE_DATA_D3D12_OPTIONS5>() as u32,
            )
        };

        let supported = queried.is_ok() && options.RaytracingTier.0 >= D3D12_RAYTRACING_TIER_1_0.0;
        info!(tier = options.RaytracingTier.0, supported, "DirectX Raytracing support");
        supported
    }
}

impl Drop for DeviceResources {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_gpu() {
            warn!(error = %e, "Failed to wait for GPU during shutdown");
        }
    }
}

fn adapter_info(index: u32, desc: &DXGI_ADAPTER_DESC1) -> AdapterInfo {
    AdapterInfo {
        index,
        vendor_id: desc.VendorId,
        device_id: desc.DeviceId,
        description: description_from_utf16(&desc.Description),
        dedicated_video_memory: desc.DedicatedVideoMemory as u64,
        is_software: desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32 != 0,
    }
}

/// 通过 IDXGIFactory5 查询撕裂支持
fn tearing_supported(factory: &IDXGIFactory4) -> bool {
    let Ok(factory5) = factory.cast::<IDXGIFactory5>() else {
        return false;
    };
    let mut allow_tearing: i32 = 0;
    let result = unsafe {
        factory5.CheckFeatureSupport(
            DXGI_FEATURE_PRESENT_ALLOW_TEARING,
            &mut allow_tearing as *mut _ as *mut c_void,
            std::mem::size_of::<i32>() as u32,
        )
    };
    result.is_ok() && allow_tearing != 0
}

/// 调试构建下出错即中断，并屏蔽空范围 Map/Unmap 警告
fn configure_info_queue(device: &ID3D12Device) {
    let Ok(info_queue) = device.cast::<ID3D12InfoQueue>() else {
        return;
    };

    unsafe {
        let _ = info_queue.SetBreakOnSeverity(D3D12_MESSAGE_SEVERITY_CORRUPTION, true);
        let _ = info_queue.SetBreakOnSeverity(D3D12_MESSAGE_SEVERITY_ERROR, true);

        let mut hide = [D3D12_MESSAGE_ID_MAP_INVALID_NULLRANGE, D3D12_MESSAGE_ID_UNMAP_INVALID_NULLRANGE];
        let filter = D3D12_INFO_QUEUE_FILTER {
            DenyList: D3D12_INFO_QUEUE_FILTER_DESC {
                NumIDs: hide.len() as u32,
                pIDList: hide.as_mut_ptr(),
                ..Default::default()
            },
            ..Default::default()
        };
        if let Err(e) = info_queue.AddStorageFilterEntries(&filter) {
            warn!(error = %e, "Failed to install info queue filter");
        }
    }
}

/// 查询设备支持的最高特性等级，失败时沿用最低要求
fn max_feature_level(device: &ID3D12Device, min: FeatureLevel) -> FeatureLevel {
    let requested: Vec<D3D_FEATURE_LEVEL> = FeatureLevel::requested_levels(min)
        .into_iter()
        .map(|level| D3D_FEATURE_LEVEL(level.raw()))
        .collect();

    let mut data = D3D12_FEATURE_DATA_FEATURE_LEVELS {
        NumFeatureLevels: requested.len() as u32,
        pFeatureLevelsRequested: requested.as_ptr(),
        MaxSupportedFeatureLevel: D3D_FEATURE_LEVEL(0),
    };

    let result = unsafe {
        device.CheckFeatureSupport(
            D3D12_FEATURE_FEATURE_LEVELS,
            &mut data as *mut _ as *mut c_void,
            std::mem::size_of::<D3D12_FEATURE_DATA_FEATURE_LEVELS>() as u32,
        )
    };

    let max = result
        .ok()
        .and_then(|_| FeatureLevel::from_raw(data.MaxSupportedFeatureLevel.0));
    FeatureLevel::resolve(max, min)
}

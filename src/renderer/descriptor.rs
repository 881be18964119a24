//! 描述符管理模块
//!
//! 描述符堆中的句柄算术与线性分配策略，与具体 API 无关。
//! DX12 层在创建堆后把起始句柄和增量大小交给 `DescriptorAllocator`。
//!
//! # DirectX 12 描述符类型
//!
//! - **RTV** (Render Target View)：渲染目标视图，每个后台缓冲一个
//! - **CBV/SRV/UAV**：着色器可见堆，光线追踪输出、几何缓冲都放在这里

use crate::core::error::{GraphicsError, Result};

/// 描述符堆类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// 渲染目标视图 (RTV)
    RenderTargetView,
    /// 常量缓冲 / 着色资源 / 无序访问视图
    CbvSrvUav,
}

impl DescriptorType {
    /// 描述符类型是否需要着色器可见
    pub fn is_shader_visible(&self) -> bool {
        matches!(self, DescriptorType::CbvSrvUav)
    }

    /// 获取描述符类型名称
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorType::RenderTargetView => "RTV",
            DescriptorType::CbvSrvUav => "CBV/SRV/UAV",
        }
    }
}

/// 描述符句柄（CPU 可见）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuDescriptorHandle {
    /// 句柄指针值
    pub ptr: usize,
    /// 描述符索引
    pub index: u32,
}

impl CpuDescriptorHandle {
    /// 偏移句柄
    pub fn offset(&self, count: u32, increment_size: u32) -> Self {
        Self {
            ptr: self.ptr + count as usize * increment_size as usize,
            index: self.index + count,
        }
    }
}

/// 描述符句柄（GPU 可见）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDescriptorHandle {
    /// 句柄指针值
    pub ptr: u64,
    /// 描述符索引
    pub index: u32,
}

impl GpuDescriptorHandle {
    /// 偏移句柄
    pub fn offset(&self, count: u32, increment_size: u32) -> Self {
        Self {
            ptr: self.ptr + count as u64 * increment_size as u64,
            index: self.index + count,
        }
    }
}

/// 描述符句柄对（CPU + GPU）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHandle {
    /// CPU 可见句柄
    pub cpu: CpuDescriptorHandle,
    /// GPU 可见句柄（仅对着色器可见的堆有效）
    pub gpu: Option<GpuDescriptorHandle>,
}

/// 描述符分配器
///
/// 线性分配；调用方可以指定希望复用的索引，例如设备重建时让输出 UAV
/// 仍然落在第 0 个槽位。
#[derive(Debug, Clone)]
pub struct DescriptorAllocator {
    descriptor_type: DescriptorType,
    capacity: u32,
    allocated: u32,
    increment_size: u32,
    cpu_start: usize,
    gpu_start: Option<u64>,
}

impl DescriptorAllocator {
    pub fn new(
        descriptor_type: DescriptorType,
        capacity: u32,
        increment_size: u32,
        cpu_start: usize,
        gpu_start: Option<u64>,
    ) -> Self {
        Self {
            descriptor_type,
            capacity,
            allocated: 0,
            increment_size,
            cpu_start,
            gpu_start,
        }
    }

    /// 分配一个描述符
    ///
    /// `preferred` 指定固定槽位（可重复写入同一槽位），`None` 取下一个空闲槽位。
    pub fn allocate(&mut self, preferred: Option<u32>) -> Result<DescriptorHandle> {
        let index = preferred.unwrap_or(self.allocated);
        if index >= self.capacity {
            return Err(GraphicsError::ResourceCreation(format!(
                "{} descriptor heap exhausted ({}/{})",
                self.descriptor_type.name(),
                index,
                self.capacity
            ))
            .into());
        }
        self.allocated = self.allocated.max(index + 1);
        Ok(self.handle(index))
    }

    /// 指定索引的句柄
    pub fn handle(&self, index: u32) -> DescriptorHandle {
        let cpu = CpuDescriptorHandle { ptr: self.cpu_start, index: 0 }.offset(index, self.increment_size);
        let gpu = self
            .gpu_start
            .map(|ptr| GpuDescriptorHandle { ptr, index: 0 }.offset(index, self.increment_size));
        DescriptorHandle { cpu, gpu }
    }

    /// 清空分配状态
    pub fn reset(&mut self) {
        self.allocated = 0;
    }

    pub fn allocated_count(&self) -> u32 {
        self.allocated
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn increment_size(&self) -> u32 {
        self.increment_size
    }
}

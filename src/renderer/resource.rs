//! 资源管理模块
//!
//! 缓冲区的用途、所在堆、初始状态和对齐规则。DX12 层据此填写
//! `D3D12_RESOURCE_DESC` 和 `D3D12_HEAP_PROPERTIES`。
//!
//! # 对齐要求
//!
//! - 常量缓冲区：256 字节
//! - 加速结构（结果与暂存缓冲）：256 字节
//! - 着色器表：见 `shader_table` 模块

use bytemuck::Pod;
use std::marker::PhantomData;

use crate::core::error::{GraphicsError, Result};
use crate::renderer::barrier::ResourceState;

/// 常量缓冲区对齐
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// `D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BYTE_ALIGNMENT`
pub const ACCELERATION_STRUCTURE_ALIGNMENT: u64 = 256;

/// 向上对齐到 `alignment`（必须是 2 的幂）
pub fn align_to(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// 缓冲区使用类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsageType {
    /// 顶点缓冲区（光线追踪中作为结构化缓冲读取）
    Vertex,
    /// 索引缓冲区
    Index,
    /// 常量缓冲区
    Constant,
    /// TLAS 的实例描述
    InstanceDescs,
    /// 加速结构结果
    AccelerationStructure,
    /// 加速结构构建用的暂存空间
    Scratch,
    /// 着色器表
    ShaderTable,
}

/// 资源所在堆
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    /// GPU 本地内存
    Default,
    /// CPU 可写、GPU 可读
    Upload,
}

/// 缓冲区描述信息
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// 缓冲区大小（字节）
    pub size: u64,
    /// 使用类型
    pub usage: BufferUsageType,
    /// 调试名称（可选）
    pub name: Option<String>,
}

impl BufferDescriptor {
    /// 创建新的缓冲区描述符
    pub fn new(size: u64, usage: BufferUsageType) -> Self {
        Self { size, usage, name: None }
    }

    /// 设置调试名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 对齐后的大小
    pub fn aligned_size(&self) -> u64 {
        match self.usage {
            BufferUsageType::Constant => align_to(self.size, CONSTANT_BUFFER_ALIGNMENT),
            BufferUsageType::AccelerationStructure | BufferUsageType::Scratch => {
                align_to(self.size, ACCELERATION_STRUCTURE_ALIGNMENT)
            }
            _ => self.size,
        }
    }

    /// 加速结构与暂存缓冲放在默认堆，其余由 CPU 直接写入
    pub fn heap(&self) -> HeapKind {
        match self.usage {
            BufferUsageType::AccelerationStructure | BufferUsageType::Scratch => HeapKind::Default,
            _ => HeapKind::Upload,
        }
    }

    /// 是否需要 `ALLOW_UNORDERED_ACCESS`
    pub fn allow_unordered_access(&self) -> bool {
        matches!(
            self.usage,
            BufferUsageType::AccelerationStructure | BufferUsageType::Scratch
        )
    }

    /// 创建时的初始状态
    pub fn initial_state(&self) -> InitialState {
        match self.usage {
            BufferUsageType::AccelerationStructure => InitialState::AccelerationStructure,
            BufferUsageType::Scratch => InitialState::Tracked(ResourceState::UnorderedAccess),
            // 上传堆资源必须处于 GENERIC_READ
            _ => InitialState::GenericRead,
        }
    }
}

/// 缓冲区的初始资源状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    GenericRead,
    AccelerationStructure,
    Tracked(ResourceState),
}

/// 上传缓冲区布局
///
/// 按元素组织的上传缓冲；常量缓冲的每个元素对齐到 256 字节，
/// 用于每个后台缓冲一份的场景常量。
#[derive(Debug)]
pub struct UploadBuffer<T> {
    /// 元素数量
    element_count: usize,
    /// 每个元素的大小（对齐后）
    element_size: u64,
    /// 使用类型
    usage: BufferUsageType,
    _phantom: PhantomData<T>,
}

impl<T: Pod> UploadBuffer<T> {
    /// 创建新的上传缓冲区布局
    pub fn new(element_count: usize, usage: BufferUsageType) -> Self {
        let element_size = std::mem::size_of::<T>() as u64;

        let element_size = if usage == BufferUsageType::Constant {
            align_to(element_size, CONSTANT_BUFFER_ALIGNMENT)
        } else {
            element_size
        };

        Self {
            element_count,
            element_size,
            usage,
            _phantom: PhantomData,
        }
    }

    /// 获取元素数量
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// 获取每个元素的大小（对齐后）
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    /// 获取总大小
    pub fn total_size(&self) -> u64 {
        self.element_size * self.element_count as u64
    }

    /// 计算元素在缓冲区中的偏移量
    pub fn element_offset(&self, index: usize) -> Result<u64> {
        if index >= self.element_count {
            return Err(GraphicsError::InvalidState(format!(
                "upload buffer index {} out of range ({} elements)",
                index, self.element_count
            ))
            .into());
        }
        Ok(self.element_size * index as u64)
    }

    /// 把 `value` 写入已映射内存的第 `index` 个元素
    pub fn write(&self, mapped: &mut [u8], index: usize, value: &T) -> Result<()> {
        let offset = self.element_offset(index)? as usize;
        let bytes = bytemuck::bytes_of(value);
        let end = offset + bytes.len();
        if end > mapped.len() {
            return Err(GraphicsError::InvalidState(format!(
                "mapped range too small: need {} bytes, have {}",
                end,
                mapped.len()
            ))
            .into());
        }
        mapped[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// 缓冲区描述符
    pub fn descriptor(&self, name: impl Into<String>) -> BufferDescriptor {
        BufferDescriptor::new(self.total_size(), self.usage).with_name(name)
    }
}

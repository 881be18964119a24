//! DirectX 12 描述符堆
//!
//! 封装 `ID3D12DescriptorHeap`，句柄计算与分配交给 `renderer::descriptor::DescriptorAllocator`。

use windows::Win32::Graphics::Direct3D12::*;

use super::util::{set_name, HResultExt};
use crate::core::error::{GraphicsError, Result};
use crate::renderer::descriptor::{DescriptorAllocator, DescriptorHandle, DescriptorType};

/// DX12 描述符堆
pub struct Dx12DescriptorHeap {
    /// 底层 DX12 描述符堆
    heap: ID3D12DescriptorHeap,
    /// 线性分配器
    allocator: DescriptorAllocator,
}

impl Dx12DescriptorHeap {
    /// 创建描述符堆
    ///
    /// CBV/SRV/UAV 堆创建为着色器可见，RTV 堆不可见。
    pub fn new(device: &ID3D12Device, descriptor_type: DescriptorType, capacity: u32, name: &str) -> Result<Self> {
        let heap_type = match descriptor_type {
            DescriptorType::RenderTargetView => D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
            DescriptorType::CbvSrvUav => D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
        };
        let flags = if descriptor_type.is_shader_visible() {
            D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
        } else {
            D3D12_DESCRIPTOR_HEAP_FLAG_NONE
        };

        let heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: heap_type,
            NumDescriptors: capacity,
            Flags: flags,
            NodeMask: 0,
        };

        unsafe {
            let heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&heap_desc)
                .graphics(GraphicsError::ResourceCreation, "CreateDescriptorHeap")?;
            set_name(&heap, name);

            let increment_size = device.GetDescriptorHandleIncrementSize(heap_type);
            let cpu_start = heap.GetCPUDescriptorHandleForHeapStart().ptr;
            let gpu_start = descriptor_type
                .is_shader_visible()
                .then(|| heap.GetGPUDescriptorHandleForHeapStart().ptr);

            Ok(Self {
                heap,
                allocator: DescriptorAllocator::new(descriptor_type, capacity, increment_size, cpu_start, gpu_start),
            })
        }
    }

    /// 获取底层 DX12 描述符堆
    pub fn heap(&self) -> &ID3D12DescriptorHeap {
        &self.heap
    }

    /// 分配描述符，`preferred` 见 `DescriptorAllocator::allocate`
    pub fn allocate(&mut self, preferred: Option<u32>) -> Result<DescriptorHandle> {
        self.allocator.allocate(preferred)
    }

    pub fn cpu_handle(&self, index: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        D3D12_CPU_DESCRIPTOR_HANDLE {
            ptr: self.allocator.handle(index).cpu.ptr,
        }
    }

    /// 着色器不可见的堆返回 None
    pub fn gpu_handle(&self, index: u32) -> Option<D3D12_GPU_DESCRIPTOR_HANDLE> {
        self.allocator
            .handle(index)
            .gpu
            .map(|h| D3D12_GPU_DESCRIPTOR_HANDLE { ptr: h.ptr })
    }

    pub fn capacity(&self) -> u32 {
        self.allocator.capacity()
    }
}

pub(crate) fn to_cpu_handle(handle: &DescriptorHandle) -> D3D12_CPU_DESCRIPTOR_HANDLE {
    D3D12_CPU_DESCRIPTOR_HANDLE { ptr: handle.cpu.ptr }
}

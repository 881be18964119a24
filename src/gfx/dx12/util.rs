//! DX12 辅助函数
//!
//! HRESULT 到 `GraphicsError` 的转换、资源屏障构造和缓冲区创建。

use std::mem::ManuallyDrop;

use windows::core::{Interface, HRESULT, HSTRING};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::{DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET};

use crate::core::error::{GraphicsError, Result};
use crate::renderer::barrier::ResourceState;
use crate::renderer::resource::{BufferDescriptor, HeapKind, InitialState};

/// 把 `windows::core::Result` 转成引擎错误，并带上失败的调用名
pub(crate) trait HResultExt<T> {
    fn graphics(self, kind: fn(String) -> GraphicsError, call: &str) -> Result<T>;
}

impl<T> HResultExt<T> for windows::core::Result<T> {
    fn graphics(self, kind: fn(String) -> GraphicsError, call: &str) -> Result<T> {
        self.map_err(|e| {
            if is_device_removed(e.code()) {
                GraphicsError::DeviceLost { reason: e.code().0 }.into()
            } else {
                kind(format!("{} failed: {} (HRESULT 0x{:08X})", call, e.message(), e.code().0 as u32)).into()
            }
        })
    }
}

/// 设备被移除或重置
pub(crate) fn is_device_removed(hr: HRESULT) -> bool {
    hr == DXGI_ERROR_DEVICE_REMOVED || hr == DXGI_ERROR_DEVICE_RESET
}

/// 设置调试名称，失败时忽略
pub(crate) fn set_name<T: Interface>(object: &T, name: &str) {
    if let Ok(object) = object.cast::<ID3D12Object>() {
        unsafe {
            let _ = object.SetName(&HSTRING::from(name));
        }
    }
}

pub(crate) fn d3d12_state(state: ResourceState) -> D3D12_RESOURCE_STATES {
    D3D12_RESOURCE_STATES(state.raw())
}

/// 状态转换屏障
pub(crate) fn transition_barrier(
    resource: &ID3D12Resource,
    before: D3D12_RESOURCE_STATES,
    after: D3D12_RESOURCE_STATES,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: ManuallyDrop::new(Some(resource.clone())),
                Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                StateBefore: before,
                StateAfter: after,
            }),
        },
    }
}

/// UAV 屏障，用于 BLAS 构建完成后再构建 TLAS
pub(crate) fn uav_barrier(resource: &ID3D12Resource) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_UAV,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            UAV: ManuallyDrop::new(D3D12_RESOURCE_UAV_BARRIER {
                pResource: ManuallyDrop::new(Some(resource.clone())),
            }),
        },
    }
}

/// 录制屏障并释放其中持有的资源引用
pub(crate) fn record_barriers(command_list: &ID3D12GraphicsCommandList4, barriers: Vec<D3D12_RESOURCE_BARRIER>) {
    unsafe {
        command_list.ResourceBarrier(&barriers);
    }
    for barrier in barriers {
        unsafe {
            if barrier.Type == D3D12_RESOURCE_BARRIER_TYPE_TRANSITION {
                let transition = ManuallyDrop::into_inner(barrier.Anonymous.Transition);
                drop(ManuallyDrop::into_inner(transition.pResource));
            } else if barrier.Type == D3D12_RESOURCE_BARRIER_TYPE_UAV {
                let uav = ManuallyDrop::into_inner(barrier.Anonymous.UAV);
                drop(ManuallyDrop::into_inner(uav.pResource));
            }
        }
    }
}

fn buffer_resource_desc(width: u64, flags: D3D12_RESOURCE_FLAGS) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Alignment: 0,
        Width: width,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: DXGI_FORMAT_UNKNOWN,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        Flags: flags,
    }
}

/// 按描述创建提交资源
pub(crate) fn create_buffer(device: &ID3D12Device, desc: &BufferDescriptor) -> Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: match desc.heap() {
            HeapKind::Default => D3D12_HEAP_TYPE_DEFAULT,
            HeapKind::Upload => D3D12_HEAP_TYPE_UPLOAD,
        },
        ..Default::default()
    };
    let flags = if desc.allow_unordered_access() {
        D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS
    } else {
        D3D12_RESOURCE_FLAG_NONE
    };
    let state = match desc.initial_state() {
        InitialState::GenericRead => D3D12_RESOURCE_STATE_GENERIC_READ,
        InitialState::AccelerationStructure => D3D12_RESOURCE_STATE_RAYTRACING_ACCELERATION_STRUCTURE,
        InitialState::Tracked(state) => d3d12_state(state),
    };
    let resource_desc = buffer_resource_desc(desc.aligned_size().max(1), flags);

    let mut resource: Option<ID3D12Resource> = None;
    unsafe {
        device
            .CreateCommittedResource(&heap_props, D3D12_HEAP_FLAG_NONE, &resource_desc, state, None, &mut resource)
            .graphics(GraphicsError::ResourceCreation, "CreateCommittedResource")?;
    }
    let resource = resource.ok_or_else(|| GraphicsError::ResourceCreation("CreateCommittedResource returned null".to_string()))?;

    if let Some(name) = &desc.name {
        set_name(&resource, name);
    }
    Ok(resource)
}

/// 创建上传堆缓冲并写入数据
pub(crate) fn create_upload_buffer(device: &ID3D12Device, desc: &BufferDescriptor, data: &[u8]) -> Result<ID3D12Resource> {
    debug_assert_eq!(desc.heap(), HeapKind::Upload);
    let resource = create_buffer(device, desc)?;
    unsafe {
        let mapped = map(&resource)?;
        std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, data.len());
        resource.Unmap(0, None);
    }
    Ok(resource)
}

/// 映射整个缓冲，返回 CPU 指针
pub(crate) unsafe fn map(resource: &ID3D12Resource) -> Result<*mut u8> {
    let mut data = std::ptr::null_mut();
    // 读取范围为空，CPU 不读回
    let read_range = D3D12_RANGE { Begin: 0, End: 0 };
    resource
        .Map(0, Some(&read_range), Some(&mut data))
        .graphics(GraphicsError::ResourceCreation, "ID3D12Resource::Map")?;
    Ok(data as *mut u8)
}

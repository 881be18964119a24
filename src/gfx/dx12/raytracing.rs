//! DXR 光线追踪资源
//!
//! 按固定顺序构建管线：根签名 → 光线追踪管线状态对象 → 描述符堆 →
//! 几何缓冲 → 加速结构 → 着色器表 → 输出纹理。
//!
//! 每帧 `update_constants` 写入当前后台缓冲对应的常量槽位，`dispatch` 发射光线，
//! `copy_output_to_back_buffer` 把输出纹理拷贝到后台缓冲。

use std::ffi::c_void;
use std::mem::{size_of, size_of_val, transmute_copy};

use tracing::{debug, info};
use windows::core::{Interface, HSTRING, PCWSTR};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;

use super::descriptor::{to_cpu_handle, Dx12DescriptorHeap};
use super::device_resources::DeviceResources;
use super::util::{create_buffer, create_upload_buffer, d3d12_state, map, record_barriers, set_name, transition_barrier, uav_barrier, HResultExt};
use crate::core::error::{GraphicsError, Result};
use crate::renderer::acceleration::{BuildFlags, Instance, PrebuildSizes, TriangleGeometryDesc};
use crate::renderer::barrier::{copy_output_transitions, ResourceSlot, ResourceState, Transition};
use crate::renderer::descriptor::DescriptorType;
use crate::renderer::pipeline::{
    global_slot, heap_slot, DescriptorRangeKind, LocalRootSignatureKind, PipelineDesc, RootParameter,
    RootSignatureLayout, RootSignatureScope, Subobject, CLOSEST_HIT_SHADER_NAME, HIT_GROUP_NAME, MISS_SHADER_NAME,
    RAYGEN_SHADER_NAME,
};
use crate::renderer::resource::{BufferDescriptor, BufferUsageType, UploadBuffer};
use crate::renderer::shader_table::{ShaderRecord, ShaderTable, ShaderTableSet, SHADER_IDENTIFIER_SIZE};
use crate::renderer::shaders::ShaderLibrary;
use crate::renderer::swapchain::OutputSize;
use crate::scene::{triangle_geometry, ObjectConstantBuffer, RayGenConstantBuffer, Scene, SceneConstantBuffer, Vertex};

/// 持久映射的上传缓冲
struct MappedBuffer {
    resource: ID3D12Resource,
    data: *mut u8,
    len: usize,
}

impl MappedBuffer {
    fn new(device: &ID3D12Device, desc: &BufferDescriptor) -> Result<Self> {
        let resource = create_buffer(device, desc)?;
        let data = unsafe { map(&resource)? };
        Ok(Self {
            resource,
            data,
            len: desc.aligned_size() as usize,
        })
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        // 映射在 Drop 之前一直有效
        unsafe { std::slice::from_raw_parts_mut(self.data, self.len) }
    }

    fn gpu_address(&self) -> u64 {
        unsafe { self.resource.GetGPUVirtualAddress() }
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        unsafe {
            self.resource.Unmap(0, None);
        }
    }
}

/// 状态对象导出的着色器标识符
struct ShaderIdentifiers {
    ray_gen: [u8; SHADER_IDENTIFIER_SIZE],
    miss: [u8; SHADER_IDENTIFIER_SIZE],
    hit_group: [u8; SHADER_IDENTIFIER_SIZE],
}

/// 底层与顶层加速结构
struct AccelerationStructures {
    _bottom_level: ID3D12Resource,
    top_level: ID3D12Resource,
}

/// 光线追踪所需的全部 GPU 对象
pub struct RaytracingResources {
    global_root_signature: ID3D12RootSignature,
    _ray_gen_root_signature: ID3D12RootSignature,
    _hit_group_root_signature: ID3D12RootSignature,
    state_object: ID3D12StateObject,
    descriptor_heap: Dx12DescriptorHeap,

    _index_buffer: ID3D12Resource,
    _vertex_buffer: ID3D12Resource,
    acceleration: AccelerationStructures,

    identifiers: ShaderIdentifiers,
    shader_tables: ShaderTableSet,
    ray_gen_table: MappedBuffer,
    miss_table: MappedBuffer,
    /// 每个后台缓冲一段，物体颜色每帧变化
    hit_group_tables: MappedBuffer,

    scene_constants: MappedBuffer,
    scene_layout: UploadBuffer<SceneConstantBuffer>,

    output: ID3D12Resource,
    output_size: OutputSize,
    output_format: DXGI_FORMAT,
}

impl RaytracingResources {
    pub fn new(
        resources: &mut DeviceResources,
        library: &ShaderLibrary,
        scene: &Scene,
        max_recursion_depth: u32,
    ) -> Result<Self> {
        let device = resources.device()?.clone();
        let device5: ID3D12Device5 = device
            .cast()
            .graphics(GraphicsError::Unsupported, "ID3D12Device5")?;
        let frame_count = resources.back_buffer_count() as usize;
        let output_size = resources.output_size();
        let output_format = resources.back_buffer_format();

        // 1. 根签名
        let global_root_signature = create_root_signature(&device, &RootSignatureLayout::global())?;
        let ray_gen_root_signature =
            create_root_signature(&device, &RootSignatureLayout::ray_gen_local(size_of::<RayGenConstantBuffer>()))?;
        let hit_group_root_signature = create_root_signature(
            &device,
            &RootSignatureLayout::hit_group_local(size_of::<ObjectConstantBuffer>()),
        )?;

        // 2. 管线状态对象
        let pipeline = PipelineDesc::new(max_recursion_depth)?;
        let state_object = create_state_object(
            &device5,
            &pipeline,
            library,
            &global_root_signature,
            &ray_gen_root_signature,
            &hit_group_root_signature,
        )?;
        let identifiers = shader_identifiers(&state_object)?;

        // 3. 描述符堆
        let mut descriptor_heap = Dx12DescriptorHeap::new(
            &device,
            DescriptorType::CbvSrvUav,
            heap_slot::HEAP_SIZE,
            "RaytracingDescriptorHeap",
        )?;

        // 4. 几何
        let geometry = triangle_geometry();
        let geometry_desc = TriangleGeometryDesc::from_slices(&geometry.vertices, &geometry.indices)?;
        let index_buffer = create_upload_buffer(
            &device,
            &BufferDescriptor::new(
                (geometry.indices.len() * size_of::<u32>()) as u64,
                BufferUsageType::Index,
            )
            .with_name("IndexBuffer"),
            bytemuck::cast_slice(&geometry.indices),
        )?;
        let vertex_buffer = create_upload_buffer(
            &device,
            &BufferDescriptor::new(
                (geometry.vertices.len() * size_of::<Vertex>()) as u64,
                BufferUsageType::Vertex,
            )
            .with_name("VertexBuffer"),
            bytemuck::cast_slice(&geometry.vertices),
        )?;
        create_structured_srv(
            &device,
            &mut descriptor_heap,
            &index_buffer,
            heap_slot::INDEX_SRV,
            geometry_desc.index_count,
            size_of::<u32>() as u32,
        )?;
        create_structured_srv(
            &device,
            &mut descriptor_heap,
            &vertex_buffer,
            heap_slot::VERTEX_SRV,
            geometry_desc.vertex_count,
            geometry_desc.vertex_stride as u32,
        )?;

        // 5. 加速结构
        let acceleration = build_acceleration_structures(resources, &device5, &geometry_desc, &index_buffer, &vertex_buffer)?;

        // 6. 着色器表
        let shader_tables = ShaderTableSet {
            ray_gen: ray_gen_table(&identifiers, output_size)?,
            miss: ShaderTable::new("MissShaderTable", vec![ShaderRecord::new(identifiers.miss)])?,
            hit_group: hit_group_table(&identifiers, &scene.object_constants())?,
        };

        let mut ray_gen_buffer = MappedBuffer::new(
            &device,
            &BufferDescriptor::new(shader_tables.ray_gen.size_in_bytes(), BufferUsageType::ShaderTable)
                .with_name(shader_tables.ray_gen.name()),
        )?;
        shader_tables.ray_gen.write_into(ray_gen_buffer.bytes_mut())?;

        let mut miss_buffer = MappedBuffer::new(
            &device,
            &BufferDescriptor::new(shader_tables.miss.size_in_bytes(), BufferUsageType::ShaderTable)
                .with_name(shader_tables.miss.name()),
        )?;
        shader_tables.miss.write_into(miss_buffer.bytes_mut())?;

        let hit_group_size = shader_tables.hit_group.size_in_bytes();
        let mut hit_group_buffer = MappedBuffer::new(
            &device,
            &BufferDescriptor::new(hit_group_size * frame_count as u64, BufferUsageType::ShaderTable)
                .with_name(shader_tables.hit_group.name()),
        )?;
        for chunk in hit_group_buffer.bytes_mut().chunks_mut(hit_group_size as usize) {
            shader_tables.hit_group.write_into(chunk)?;
        }

        // 场景常量，每个后台缓冲一个 256 字节对齐的槽位
        let scene_layout = UploadBuffer::<SceneConstantBuffer>::new(frame_count, BufferUsageType::Constant);
        let scene_constants = MappedBuffer::new(&device, &scene_layout.descriptor("SceneConstantBuffer"))?;

        // 7. 输出纹理
        let output = create_output(&device, &mut descriptor_heap, output_format, output_size)?;

        info!(
            width = output_size.width,
            height = output_size.height,
            frames = frame_count,
            max_recursion_depth,
            "Raytracing pipeline created"
        );

        Ok(Self {
            global_root_signature,
            _ray_gen_root_signature: ray_gen_root_signature,
            _hit_group_root_signature: hit_group_root_signature,
            state_object,
            descriptor_heap,
            _index_buffer: index_buffer,
            _vertex_buffer: vertex_buffer,
            acceleration,
            identifiers,
            shader_tables,
            ray_gen_table: ray_gen_buffer,
            miss_table: miss_buffer,
            hit_group_tables: hit_group_buffer,
            scene_constants,
            scene_layout,
            output,
            output_size,
            output_format,
        })
    }

    /// 写入第 `frame_index` 帧的场景常量与物体颜色
    pub fn update_constants(&mut self, frame_index: usize, scene: &Scene) -> Result<()> {
        let constants = scene.scene_constants(self.output_size.aspect_ratio());
        self.scene_layout
            .write(self.scene_constants.bytes_mut(), frame_index, &constants)?;

        self.shader_tables.hit_group = hit_group_table(&self.identifiers, &scene.object_constants())?;
        let size = self.shader_tables.hit_group.size_in_bytes() as usize;
        let offset = frame_index * size;
        let region = self
            .hit_group_tables
            .bytes_mut()
            .get_mut(offset..offset + size)
            .ok_or_else(|| GraphicsError::InvalidState(format!("frame index {} has no hit group table", frame_index)))?;
        self.shader_tables.hit_group.write_into(region)
    }

    /// 绑定根参数并发射光线
    pub fn dispatch(&self, command_list: &ID3D12GraphicsCommandList4, frame_index: usize) -> Result<()> {
        let output_table = self.heap_gpu_handle(heap_slot::OUTPUT_UAV)?;
        let geometry_table = self.heap_gpu_handle(heap_slot::INDEX_SRV)?;
        let constants_address = self.scene_constants.gpu_address() + self.scene_layout.element_offset(frame_index)?;
        let hit_group_address =
            self.hit_group_tables.gpu_address() + frame_index as u64 * self.shader_tables.hit_group.size_in_bytes();

        let regions = self.shader_tables.dispatch_regions(
            self.ray_gen_table.gpu_address(),
            self.miss_table.gpu_address(),
            hit_group_address,
        );

        let dispatch_desc = D3D12_DISPATCH_RAYS_DESC {
            RayGenerationShaderRecord: D3D12_GPU_VIRTUAL_ADDRESS_RANGE {
                StartAddress: regions.ray_generation.start_address,
                SizeInBytes: regions.ray_generation.size_in_bytes,
            },
            MissShaderTable: D3D12_GPU_VIRTUAL_ADDRESS_RANGE_AND_STRIDE {
                StartAddress: regions.miss.start_address,
                SizeInBytes: regions.miss.size_in_bytes,
                StrideInBytes: regions.miss.stride_in_bytes,
            },
            HitGroupTable: D3D12_GPU_VIRTUAL_ADDRESS_RANGE_AND_STRIDE {
                StartAddress: regions.hit_group.start_address,
                SizeInBytes: regions.hit_group.size_in_bytes,
                StrideInBytes: regions.hit_group.stride_in_bytes,
            },
            Width: self.output_size.width,
            Height: self.output_size.height,
            Depth: 1,
            ..Default::default()
        };

        unsafe {
            command_list.SetComputeRootSignature(&self.global_root_signature);
            command_list.SetDescriptorHeaps(&[Some(self.descriptor_heap.heap().clone())]);
            command_list.SetComputeRootDescriptorTable(global_slot::OUTPUT_VIEW, output_table);
            command_list.SetComputeRootShaderResourceView(
                global_slot::ACCELERATION_STRUCTURE,
                self.acceleration.top_level.GetGPUVirtualAddress(),
            );
            command_list.SetComputeRootConstantBufferView(global_slot::SCENE_CONSTANTS, constants_address);
            command_list.SetComputeRootDescriptorTable(global_slot::GEOMETRY_BUFFERS, geometry_table);
            command_list.SetPipelineState1(&self.state_object);
            command_list.DispatchRays(&dispatch_desc);
        }
        Ok(())
    }

    /// 把输出纹理拷贝到后台缓冲，结束时后台缓冲处于 Present
    pub fn copy_output_to_back_buffer(&self, command_list: &ID3D12GraphicsCommandList4, render_target: &ID3D12Resource) {
        let plan = copy_output_transitions(ResourceState::RenderTarget, ResourceState::Present);
        let barriers = |transitions: &[Transition]| {
            transitions
                .iter()
                .map(|t| {
                    let resource = match t.resource {
                        ResourceSlot::BackBuffer => render_target,
                        ResourceSlot::RaytracingOutput => &self.output,
                    };
                    transition_barrier(resource, d3d12_state(t.before), d3d12_state(t.after))
                })
                .collect::<Vec<_>>()
        };

        record_barriers(command_list, barriers(&plan.before_copy));
        unsafe {
            command_list.CopyResource(render_target, &self.output);
        }
        record_barriers(command_list, barriers(&plan.after_copy));
    }

    /// 窗口尺寸变化后重建输出纹理并更新光线生成常量；调用前 GPU 必须空闲
    pub fn resize_output(&mut self, device: &ID3D12Device, size: OutputSize) -> Result<()> {
        if size == self.output_size {
            return Ok(());
        }

        self.output = create_output(device, &mut self.descriptor_heap, self.output_format, size)?;
        self.output_size = size;

        self.shader_tables.ray_gen = ray_gen_table(&self.identifiers, size)?;
        self.shader_tables.ray_gen.write_into(self.ray_gen_table.bytes_mut())?;

        debug!(width = size.width, height = size.height, "Raytracing output resized");
        Ok(())
    }

    fn heap_gpu_handle(&self, slot: u32) -> Result<D3D12_GPU_DESCRIPTOR_HANDLE> {
        self.descriptor_heap
            .gpu_handle(slot)
            .ok_or_else(|| GraphicsError::InvalidState("descriptor heap is not shader visible".to_string()).into())
    }
}

fn ray_gen_table(identifiers: &ShaderIdentifiers, size: OutputSize) -> Result<ShaderTable> {
    let constants = RayGenConstantBuffer::for_output(size.width, size.height);
    ShaderTable::new(
        "RayGenShaderTable",
        vec![ShaderRecord::new(identifiers.ray_gen).with_arguments(bytemuck::bytes_of(&constants))],
    )
}

fn hit_group_table(identifiers: &ShaderIdentifiers, object: &ObjectConstantBuffer) -> Result<ShaderTable> {
    ShaderTable::new(
        "HitGroupShaderTable",
        vec![ShaderRecord::new(identifiers.hit_group).with_arguments(bytemuck::bytes_of(object))],
    )
}

/// 按布局序列化并创建根签名
fn create_root_signature(device: &ID3D12Device, layout: &RootSignatureLayout) -> Result<ID3D12RootSignature> {
    layout.validate()?;

    // 描述符范围必须在序列化期间保持有效
    let ranges: Vec<Option<D3D12_DESCRIPTOR_RANGE>> = layout
        .parameters
        .iter()
        .map(|parameter| match *parameter {
            RootParameter::DescriptorTable { kind, base_register, count } => Some(D3D12_DESCRIPTOR_RANGE {
                RangeType: match kind {
                    DescriptorRangeKind::Srv => D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
                    DescriptorRangeKind::Uav => D3D12_DESCRIPTOR_RANGE_TYPE_UAV,
                    DescriptorRangeKind::Cbv => D3D12_DESCRIPTOR_RANGE_TYPE_CBV,
                },
                NumDescriptors: count,
                BaseShaderRegister: base_register,
                RegisterSpace: 0,
                OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
            }),
            _ => None,
        })
        .collect();

    let parameters: Vec<D3D12_ROOT_PARAMETER> = layout
        .parameters
        .iter()
        .zip(&ranges)
        .map(|(parameter, range)| match *parameter {
            RootParameter::DescriptorTable { .. } => D3D12_ROOT_PARAMETER {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
                Anonymous: D3D12_ROOT_PARAMETER_0 {
                    DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                        NumDescriptorRanges: 1,
                        pDescriptorRanges: range.as_ref().map_or(std::ptr::null(), |r| r as *const _),
                    },
                },
                ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
            },
            RootParameter::ShaderResourceView { register } => root_descriptor(D3D12_ROOT_PARAMETER_TYPE_SRV, register),
            RootParameter::ConstantBufferView { register } => root_descriptor(D3D12_ROOT_PARAMETER_TYPE_CBV, register),
            RootParameter::Constants { register, num_values } => D3D12_ROOT_PARAMETER {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS,
                Anonymous: D3D12_ROOT_PARAMETER_0 {
                    Constants: D3D12_ROOT_CONSTANTS {
                        ShaderRegister: register,
                        RegisterSpace: 0,
                        Num32BitValues: num_values,
                    },
                },
                ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
            },
        })
        .collect();

    let desc = D3D12_ROOT_SIGNATURE_DESC {
        NumParameters: parameters.len() as u32,
        pParameters: parameters.as_ptr(),
        NumStaticSamplers: 0,
        pStaticSamplers: std::ptr::null(),
        Flags: match layout.scope {
            RootSignatureScope::Global => D3D12_ROOT_SIGNATURE_FLAG_NONE,
            RootSignatureScope::Local => D3D12_ROOT_SIGNATURE_FLAG_LOCAL_ROOT_SIGNATURE,
        },
    };

    unsafe {
        let mut signature: Option<ID3DBlob> = None;
        let mut error: Option<ID3DBlob> = None;
        if let Err(e) = D3D12SerializeRootSignature(&desc, D3D_ROOT_SIGNATURE_VERSION_1, &mut signature, Some(&mut error)) {
            let detail = error
                .map(|blob| {
                    let bytes = std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize());
                    String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()
                })
                .unwrap_or_else(|| e.message().to_string());
            return Err(GraphicsError::ResourceCreation(format!("{}: {}", layout.name, detail)).into());
        }
        let signature = signature
            .ok_or_else(|| GraphicsError::ResourceCreation(format!("{}: serializer returned no blob", layout.name)))?;

        let root_signature: ID3D12RootSignature = device
            .CreateRootSignature(
                0,
                std::slice::from_raw_parts(signature.GetBufferPointer() as *const u8, signature.GetBufferSize()),
            )
            .graphics(GraphicsError::ResourceCreation, "CreateRootSignature")?;
        set_name(&root_signature, layout.name);
        Ok(root_signature)
    }
}

fn root_descriptor(kind: D3D12_ROOT_PARAMETER_TYPE, register: u32) -> D3D12_ROOT_PARAMETER {
    D3D12_ROOT_PARAMETER {
        ParameterType: kind,
        Anonymous: D3D12_ROOT_PARAMETER_0 {
            Descriptor: D3D12_ROOT_DESCRIPTOR {
                ShaderRegister: register,
                RegisterSpace: 0,
            },
        },
        ShaderVisibility: D3D12_SHADER_VISIBILITY_ALL,
    }
}

/// 按 `PipelineDesc::subobjects` 的顺序组装并创建状态对象
fn create_state_object(
    device: &ID3D12Device5,
    pipeline: &PipelineDesc,
    library: &ShaderLibrary,
    global: &ID3D12RootSignature,
    ray_gen_local: &ID3D12RootSignature,
    hit_group_local: &ID3D12RootSignature,
) -> Result<ID3D12StateObject> {
    pipeline.validate()?;

    let export_names: Vec<HSTRING> = pipeline.library_exports().iter().map(|name| HSTRING::from(*name)).collect();
    let mut exports: Vec<D3D12_EXPORT_DESC> = export_names
        .iter()
        .map(|name| D3D12_EXPORT_DESC {
            Name: PCWSTR(name.as_ptr()),
            ExportToRename: PCWSTR::null(),
            Flags: D3D12_EXPORT_FLAG_NONE,
        })
        .collect();
    let bytecode = library.bytecode();
    let library_desc = D3D12_DXIL_LIBRARY_DESC {
        DXILLibrary: D3D12_SHADER_BYTECODE {
            pShaderBytecode: bytecode.as_ptr() as *const c_void,
            BytecodeLength: bytecode.len(),
        },
        NumExports: exports.len() as u32,
        pExports: exports.as_mut_ptr(),
    };

    let hit_group_name = HSTRING::from(HIT_GROUP_NAME);
    let closest_hit_name = HSTRING::from(CLOSEST_HIT_SHADER_NAME);
    let ray_gen_name = HSTRING::from(RAYGEN_SHADER_NAME);
    let hit_group_desc = D3D12_HIT_GROUP_DESC {
        HitGroupExport: PCWSTR(hit_group_name.as_ptr()),
        Type: D3D12_HIT_GROUP_TYPE_TRIANGLES,
        AnyHitShaderImport: PCWSTR::null(),
        ClosestHitShaderImport: PCWSTR(closest_hit_name.as_ptr()),
        IntersectionShaderImport: PCWSTR::null(),
    };

    let shader_config = D3D12_RAYTRACING_SHADER_CONFIG {
        MaxPayloadSizeInBytes: pipeline.shader_config.max_payload_bytes,
        MaxAttributeSizeInBytes: pipeline.shader_config.max_attribute_bytes,
    };

    // 借用根签名指针，不增加引用计数
    let ray_gen_root = D3D12_LOCAL_ROOT_SIGNATURE {
        pLocalRootSignature: unsafe { transmute_copy(ray_gen_local) },
    };
    let hit_group_root = D3D12_LOCAL_ROOT_SIGNATURE {
        pLocalRootSignature: unsafe { transmute_copy(hit_group_local) },
    };
    let global_root = D3D12_GLOBAL_ROOT_SIGNATURE {
        pGlobalRootSignature: unsafe { transmute_copy(global) },
    };
    let pipeline_config = D3D12_RAYTRACING_PIPELINE_CONFIG {
        MaxTraceRecursionDepth: pipeline.max_recursion_depth,
    };

    let ray_gen_exports = [PCWSTR(ray_gen_name.as_ptr())];
    let hit_group_exports = [PCWSTR(hit_group_name.as_ptr())];

    let kinds = pipeline.subobjects();
    // 预留容量，关联子对象保存的指针不会因扩容失效
    let mut subobjects: Vec<D3D12_STATE_SUBOBJECT> = Vec::with_capacity(kinds.len());
    let mut associations: Vec<Box<D3D12_SUBOBJECT_TO_EXPORTS_ASSOCIATION>> = Vec::new();

    for kind in kinds {
        let (subobject_type, desc): (D3D12_STATE_SUBOBJECT_TYPE, *const c_void) = match kind {
            Subobject::DxilLibrary => (D3D12_STATE_SUBOBJECT_TYPE_DXIL_LIBRARY, &library_desc as *const _ as _),
            Subobject::HitGroup => (D3D12_STATE_SUBOBJECT_TYPE_HIT_GROUP, &hit_group_desc as *const _ as _),
            Subobject::ShaderConfig => (
                D3D12_STATE_SUBOBJECT_TYPE_RAYTRACING_SHADER_CONFIG,
                &shader_config as *const _ as _,
            ),
            Subobject::LocalRootSignature(LocalRootSignatureKind::RayGen) => {
                (D3D12_STATE_SUBOBJECT_TYPE_LOCAL_ROOT_SIGNATURE, &ray_gen_root as *const _ as _)
            }
            Subobject::LocalRootSignature(LocalRootSignatureKind::HitGroup) => {
                (D3D12_STATE_SUBOBJECT_TYPE_LOCAL_ROOT_SIGNATURE, &hit_group_root as *const _ as _)
            }
            Subobject::ExportsAssociation(target) => {
                // 关联紧邻的前一个局部根签名
                let previous = subobjects
                    .len()
                    .checked_sub(1)
                    .ok_or_else(|| GraphicsError::InvalidState("association without a subobject".to_string()))?;
                let exports = match target {
                    LocalRootSignatureKind::RayGen => &ray_gen_exports,
                    LocalRootSignatureKind::HitGroup => &hit_group_exports,
                };
                let association = Box::new(D3D12_SUBOBJECT_TO_EXPORTS_ASSOCIATION {
                    pSubobjectToAssociate: unsafe { subobjects.as_ptr().add(previous) },
                    NumExports: exports.len() as u32,
                    pExports: exports.as_ptr() as *mut PCWSTR,
                });
                let desc = &*association as *const _ as *const c_void;
                associations.push(association);
                (D3D12_STATE_SUBOBJECT_TYPE_SUBOBJECT_TO_EXPORTS_ASSOCIATION, desc)
            }
            Subobject::GlobalRootSignature => {
                (D3D12_STATE_SUBOBJECT_TYPE_GLOBAL_ROOT_SIGNATURE, &global_root as *const _ as _)
            }
            Subobject::PipelineConfig => (
                D3D12_STATE_SUBOBJECT_TYPE_RAYTRACING_PIPELINE_CONFIG,
                &pipeline_config as *const _ as _,
            ),
        };
        subobjects.push(D3D12_STATE_SUBOBJECT {
            Type: subobject_type,
            pDesc: desc,
        });
    }

    let desc = D3D12_STATE_OBJECT_DESC {
        Type: D3D12_STATE_OBJECT_TYPE_RAYTRACING_PIPELINE,
        NumSubobjects: subobjects.len() as u32,
        pSubobjects: subobjects.as_ptr(),
    };

    let state_object: ID3D12StateObject = unsafe {
        device
            .CreateStateObject(&desc)
            .graphics(GraphicsError::ResourceCreation, "CreateStateObject")?
    };
    set_name(&state_object, "RaytracingPipeline");
    debug!(subobjects = subobjects.len(), "Raytracing state object created");
    Ok(state_object)
}

fn shader_identifiers(state_object: &ID3D12StateObject) -> Result<ShaderIdentifiers> {
    let properties: ID3D12StateObjectProperties = state_object
        .cast()
        .graphics(GraphicsError::ResourceCreation, "ID3D12StateObjectProperties")?;

    let lookup = |name: &str| -> Result<[u8; SHADER_IDENTIFIER_SIZE]> {
        let identifier = unsafe { properties.GetShaderIdentifier(&HSTRING::from(name)) };
        if identifier.is_null() {
            return Err(GraphicsError::ResourceCreation(format!("shader identifier for '{}' not found", name)).into());
        }
        let bytes = unsafe { std::slice::from_raw_parts(identifier as *const u8, SHADER_IDENTIFIER_SIZE) };
        ShaderRecord::identifier_from_slice(bytes)
    };

    Ok(ShaderIdentifiers {
        ray_gen: lookup(RAYGEN_SHADER_NAME)?,
        miss: lookup(MISS_SHADER_NAME)?,
        hit_group: lookup(HIT_GROUP_NAME)?,
    })
}

fn create_structured_srv(
    device: &ID3D12Device,
    heap: &mut Dx12DescriptorHeap,
    buffer: &ID3D12Resource,
    slot: u32,
    element_count: u32,
    stride: u32,
) -> Result<()> {
    let handle = heap.allocate(Some(slot))?;
    let desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
        Format: DXGI_FORMAT_UNKNOWN,
        ViewDimension: D3D12_SRV_DIMENSION_BUFFER,
        Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
        Anonymous: D3D12_SHADER_RESOURCE_VIEW_DESC_0 {
            Buffer: D3D12_BUFFER_SRV {
                FirstElement: 0,
                NumElements: element_count,
                StructureByteStride: stride,
                Flags: D3D12_BUFFER_SRV_FLAG_NONE,
            },
        },
    };
    unsafe {
        device.CreateShaderResourceView(buffer, Some(&desc), to_cpu_handle(&handle));
    }
    Ok(())
}

/// 创建输出 UAV 纹理，描述符写入第 0 个槽位
fn create_output(
    device: &ID3D12Device,
    heap: &mut Dx12DescriptorHeap,
    format: DXGI_FORMAT,
    size: OutputSize,
) -> Result<ID3D12Resource> {
    let heap_props = D3D12_HEAP_PROPERTIES {
        Type: D3D12_HEAP_TYPE_DEFAULT,
        ..Default::default()
    };
    let desc = D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
        Alignment: 0,
        Width: size.width as u64,
        Height: size.height,
        DepthOrArraySize: 1,
        MipLevels: 1,
        Format: format,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
        Flags: D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS,
    };

    let mut output: Option<ID3D12Resource> = None;
    unsafe {
        device
            .CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                &desc,
                d3d12_state(ResourceState::UnorderedAccess),
                None,
                &mut output,
            )
            .graphics(GraphicsError::ResourceCreation, "CreateCommittedResource (raytracing output)")?;
    }
    let output = output.ok_or_else(|| GraphicsError::ResourceCreation("raytracing output is null".to_string()))?;
    set_name(&output, "RaytracingOutput");

    let handle = heap.allocate(Some(heap_slot::OUTPUT_UAV))?;
    let uav_desc = D3D12_UNORDERED_ACCESS_VIEW_DESC {
        ViewDimension: D3D12_UAV_DIMENSION_TEXTURE2D,
        ..Default::default()
    };
    unsafe {
        device.CreateUnorderedAccessView(&output, None::<&ID3D12Resource>, Some(&uav_desc), to_cpu_handle(&handle));
    }
    Ok(output)
}

fn prebuild_sizes(device: &ID3D12Device5, inputs: &D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS) -> PrebuildSizes {
    let mut info = D3D12_RAYTRACING_ACCELERATION_STRUCTURE_PREBUILD_INFO::default();
    unsafe {
        device.GetRaytracingAccelerationStructurePrebuildInfo(inputs, &mut info);
    }
    PrebuildSizes {
        result_data_max_size: info.ResultDataMaxSizeInBytes,
        scratch_data_size: info.ScratchDataSizeInBytes,
        update_scratch_data_size: info.UpdateScratchDataSizeInBytes,
    }
}

/// 构建 BLAS 和 TLAS，提交后等待 GPU 完成
fn build_acceleration_structures(
    resources: &mut DeviceResources,
    device: &ID3D12Device5,
    geometry: &TriangleGeometryDesc,
    index_buffer: &ID3D12Resource,
    vertex_buffer: &ID3D12Resource,
) -> Result<AccelerationStructures> {
    let base_device = resources.device()?.clone();
    let build_flags = D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAGS(BuildFlags::PREFER_FAST_TRACE.bits() as i32);

    let geometry_desc = unsafe {
        D3D12_RAYTRACING_GEOMETRY_DESC {
            Type: D3D12_RAYTRACING_GEOMETRY_TYPE_TRIANGLES,
            Flags: if geometry.opaque {
                D3D12_RAYTRACING_GEOMETRY_FLAG_OPAQUE
            } else {
                D3D12_RAYTRACING_GEOMETRY_FLAG_NONE
            },
            Anonymous: D3D12_RAYTRACING_GEOMETRY_DESC_0 {
                Triangles: D3D12_RAYTRACING_GEOMETRY_TRIANGLES_DESC {
                    Transform3x4: 0,
                    IndexFormat: DXGI_FORMAT(geometry.index_format),
                    VertexFormat: DXGI_FORMAT(geometry.vertex_format),
                    IndexCount: geometry.index_count,
                    VertexCount: geometry.vertex_count,
                    IndexBuffer: index_buffer.GetGPUVirtualAddress(),
                    VertexBuffer: D3D12_GPU_VIRTUAL_ADDRESS_AND_STRIDE {
                        StartAddress: vertex_buffer.GetGPUVirtualAddress(),
                        StrideInBytes: geometry.vertex_stride,
                    },
                },
            },
        }
    };

    let bottom_inputs = D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS {
        Type: D3D12_RAYTRACING_ACCELERATION_STRUCTURE_TYPE_BOTTOM_LEVEL,
        Flags: build_flags,
        NumDescs: 1,
        DescsLayout: D3D12_ELEMENTS_LAYOUT_ARRAY,
        Anonymous: D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS_0 {
            pGeometryDescs: &geometry_desc,
        },
    };
    let bottom_sizes = prebuild_sizes(device, &bottom_inputs).aligned();
    bottom_sizes.validate("bottom level")?;

    let mut top_inputs = D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS {
        Type: D3D12_RAYTRACING_ACCELERATION_STRUCTURE_TYPE_TOP_LEVEL,
        Flags: build_flags,
        NumDescs: 1,
        DescsLayout: D3D12_ELEMENTS_LAYOUT_ARRAY,
        Anonymous: D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_INPUTS_0 { InstanceDescs: 0 },
    };
    let top_sizes = prebuild_sizes(device, &top_inputs).aligned();
    top_sizes.validate("top level")?;

    debug!(
        blas_bytes = bottom_sizes.result_data_max_size,
        tlas_bytes = top_sizes.result_data_max_size,
        "Acceleration structure prebuild info"
    );

    let scratch = create_buffer(
        &base_device,
        &BufferDescriptor::new(
            bottom_sizes.scratch_data_size.max(top_sizes.scratch_data_size),
            BufferUsageType::Scratch,
        )
        .with_name("ScratchResource"),
    )?;
    let bottom_level = create_buffer(
        &base_device,
        &BufferDescriptor::new(bottom_sizes.result_data_max_size, BufferUsageType::AccelerationStructure)
            .with_name("BottomLevelAccelerationStructure"),
    )?;
    let top_level = create_buffer(
        &base_device,
        &BufferDescriptor::new(top_sizes.result_data_max_size, BufferUsageType::AccelerationStructure)
            .with_name("TopLevelAccelerationStructure"),
    )?;

    let instance = Instance::new(unsafe { bottom_level.GetGPUVirtualAddress() }).pack()?;
    let instance_buffer = create_upload_buffer(
        &base_device,
        &BufferDescriptor::new(size_of_val(&instance) as u64, BufferUsageType::InstanceDescs).with_name("InstanceDescs"),
        bytemuck::bytes_of(&instance),
    )?;
    top_inputs.Anonymous.InstanceDescs = unsafe { instance_buffer.GetGPUVirtualAddress() };

    let bottom_desc = D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_DESC {
        DestAccelerationStructureData: unsafe { bottom_level.GetGPUVirtualAddress() },
        Inputs: bottom_inputs,
        SourceAccelerationStructureData: 0,
        ScratchAccelerationStructureData: unsafe { scratch.GetGPUVirtualAddress() },
    };
    let top_desc = D3D12_BUILD_RAYTRACING_ACCELERATION_STRUCTURE_DESC {
        DestAccelerationStructureData: unsafe { top_level.GetGPUVirtualAddress() },
        Inputs: top_inputs,
        SourceAccelerationStructureData: 0,
        ScratchAccelerationStructureData: unsafe { scratch.GetGPUVirtualAddress() },
    };

    resources.reset_command_list()?;
    let command_list = resources.command_list()?;
    unsafe {
        command_list.BuildRaytracingAccelerationStructure(&bottom_desc, None);
    }
    // 共用暂存缓冲，TLAS 必须等 BLAS 写完
    record_barriers(command_list, vec![uav_barrier(&bottom_level)]);
    unsafe {
        command_list.BuildRaytracingAccelerationStructure(&top_desc, None);
    }

    resources.execute_command_list()?;
    resources.wait_for_gpu()?;

    info!("Acceleration structures built");
    // scratch 与实例缓冲在 GPU 完成后释放
    drop(instance_buffer);
    drop(scratch);

    Ok(AccelerationStructures {
        _bottom_level: bottom_level,
        top_level,
    })
}

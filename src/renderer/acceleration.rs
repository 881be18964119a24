//! 加速结构描述
//!
//! 底层加速结构（BLAS）描述三角形几何，顶层加速结构（TLAS）由实例组成。
//! `InstanceDesc` 与 `D3D12_RAYTRACING_INSTANCE_DESC` 内存布局一致，可以直接写入上传缓冲。

use bytemuck::{Pod, Zeroable};

use crate::core::error::{GraphicsError, Result};
use crate::math::Matrix4;
use crate::renderer::resource::{align_to, ACCELERATION_STRUCTURE_ALIGNMENT};

/// `DXGI_FORMAT_R32G32B32_FLOAT`
pub const VERTEX_FORMAT_R32G32B32_FLOAT: i32 = 6;

/// `DXGI_FORMAT_R32_UINT`
pub const INDEX_FORMAT_R32_UINT: i32 = 42;

/// InstanceID 与 ContributionToHitGroupIndex 只有 24 位
pub const MAX_INSTANCE_ID: u32 = (1 << 24) - 1;

/// 构建标志，对应 `D3D12_RAYTRACING_ACCELERATION_STRUCTURE_BUILD_FLAGS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildFlags(u32);

impl BuildFlags {
    pub const NONE: BuildFlags = BuildFlags(0);
    pub const ALLOW_UPDATE: BuildFlags = BuildFlags(0x1);
    pub const ALLOW_COMPACTION: BuildFlags = BuildFlags(0x2);
    pub const PREFER_FAST_TRACE: BuildFlags = BuildFlags(0x4);
    pub const PREFER_FAST_BUILD: BuildFlags = BuildFlags(0x8);
    pub const MINIMIZE_MEMORY: BuildFlags = BuildFlags(0x10);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: BuildFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for BuildFlags {
    type Output = BuildFlags;

    fn bitor(self, rhs: BuildFlags) -> BuildFlags {
        BuildFlags(self.0 | rhs.0)
    }
}

/// 实例标志，对应 `D3D12_RAYTRACING_INSTANCE_FLAGS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstanceFlags(u8);

impl InstanceFlags {
    pub const NONE: InstanceFlags = InstanceFlags(0);
    pub const TRIANGLE_CULL_DISABLE: InstanceFlags = InstanceFlags(0x1);
    pub const TRIANGLE_FRONT_COUNTERCLOCKWISE: InstanceFlags = InstanceFlags(0x2);
    pub const FORCE_OPAQUE: InstanceFlags = InstanceFlags(0x4);
    pub const FORCE_NON_OPAQUE: InstanceFlags = InstanceFlags(0x8);

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// 三角形几何描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleGeometryDesc {
    pub vertex_count: u32,
    pub vertex_stride: u64,
    pub vertex_format: i32,
    pub index_count: u32,
    pub index_format: i32,
    /// 不透明几何不会调用 any-hit 着色器
    pub opaque: bool,
}

impl TriangleGeometryDesc {
    /// 由顶点切片和 32 位索引构建；顶点的前 12 字节必须是位置
    pub fn from_slices<V: Pod>(vertices: &[V], indices: &[u32]) -> Result<Self> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(GraphicsError::InvalidState("triangle geometry needs vertices and indices".to_string()).into());
        }
        if indices.len() % 3 != 0 {
            return Err(GraphicsError::InvalidState(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            ))
            .into());
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(GraphicsError::InvalidState(format!(
                "index {} out of range ({} vertices)",
                bad,
                vertices.len()
            ))
            .into());
        }

        Ok(Self {
            vertex_count: vertices.len() as u32,
            vertex_stride: std::mem::size_of::<V>() as u64,
            vertex_format: VERTEX_FORMAT_R32G32B32_FLOAT,
            index_count: indices.len() as u32,
            index_format: INDEX_FORMAT_R32_UINT,
            opaque: true,
        })
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

/// 与 `D3D12_RAYTRACING_INSTANCE_DESC` 布局一致的实例描述（64 字节）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceDesc {
    /// 3x4 行主序变换
    pub transform: [f32; 12],
    /// InstanceID:24 | InstanceMask:8
    pub id_and_mask: u32,
    /// InstanceContributionToHitGroupIndex:24 | Flags:8
    pub contribution_and_flags: u32,
    /// BLAS 的 GPU 虚拟地址
    pub acceleration_structure: u64,
}

/// 解包后的实例字段
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    pub transform: Matrix4,
    pub instance_id: u32,
    pub mask: u8,
    pub hit_group_index: u32,
    pub flags: InstanceFlags,
    pub blas_address: u64,
}

impl Instance {
    /// 单位变换、掩码 1、命中组 0 的实例
    pub fn new(blas_address: u64) -> Self {
        Self {
            transform: Matrix4::IDENTITY,
            instance_id: 0,
            mask: 1,
            hit_group_index: 0,
            flags: InstanceFlags::NONE,
            blas_address,
        }
    }

    pub fn pack(&self) -> Result<InstanceDesc> {
        for (field, value) in [("InstanceID", self.instance_id), ("hit group index", self.hit_group_index)] {
            if value > MAX_INSTANCE_ID {
                return Err(GraphicsError::InvalidState(format!(
                    "{} {} does not fit in 24 bits",
                    field, value
                ))
                .into());
            }
        }

        Ok(InstanceDesc {
            transform: self.transform.to_3x4_row_major(),
            id_and_mask: self.instance_id | (self.mask as u32) << 24,
            contribution_and_flags: self.hit_group_index | (self.flags.bits() as u32) << 24,
            acceleration_structure: self.blas_address,
        })
    }
}

impl InstanceDesc {
    pub fn instance_id(&self) -> u32 {
        self.id_and_mask & MAX_INSTANCE_ID
    }

    pub fn mask(&self) -> u8 {
        (self.id_and_mask >> 24) as u8
    }

    pub fn hit_group_index(&self) -> u32 {
        self.contribution_and_flags & MAX_INSTANCE_ID
    }

    pub fn flags(&self) -> InstanceFlags {
        InstanceFlags((self.contribution_and_flags >> 24) as u8)
    }

    pub fn unpack(&self) -> Instance {
        let t = &self.transform;
        let transform = Matrix4::new(
            t[0], t[1], t[2], t[3], //
            t[4], t[5], t[6], t[7], //
            t[8], t[9], t[10], t[11], //
            0.0, 0.0, 0.0, 1.0,
        );
        Instance {
            transform,
            instance_id: self.instance_id(),
            mask: self.mask(),
            hit_group_index: self.hit_group_index(),
            flags: self.flags(),
            blas_address: self.acceleration_structure,
        }
    }
}

/// 预构建信息给出的缓冲大小
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrebuildSizes {
    pub result_data_max_size: u64,
    pub scratch_data_size: u64,
    pub update_scratch_data_size: u64,
}

impl PrebuildSizes {
    /// 按加速结构对齐要求向上取整
    pub fn aligned(&self) -> Self {
        Self {
            result_data_max_size: align_to(self.result_data_max_size, ACCELERATION_STRUCTURE_ALIGNMENT),
            scratch_data_size: align_to(self.scratch_data_size, ACCELERATION_STRUCTURE_ALIGNMENT),
            update_scratch_data_size: align_to(self.update_scratch_data_size, ACCELERATION_STRUCTURE_ALIGNMENT),
        }
    }

    pub fn validate(&self, level: &str) -> Result<()> {
        if self.result_data_max_size == 0 {
            return Err(GraphicsError::ResourceCreation(format!(
                "{} prebuild info reports zero result size",
                level
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    struct TestVertex {
        position: [f32; 3],
        normal: [f32; 3],
    }

    #[test]
    fn test_instance_desc_layout() {
        assert_eq!(std::mem::size_of::<InstanceDesc>(), 64);
    }

    #[test]
    fn test_pack_bitfields() {
        let mut instance = Instance::new(0xDEAD_0000);
        instance.instance_id = 5;
        instance.mask = 0xFF;
        instance.hit_group_index = 2;
        instance.flags = InstanceFlags::FORCE_OPAQUE;

        let desc = instance.pack().unwrap();
        assert_eq!(desc.id_and_mask, 0xFF00_0005);
        assert_eq!(desc.contribution_and_flags, 0x0400_0002);
        assert_eq!(desc.acceleration_structure, 0xDEAD_0000);
        assert_eq!(desc.transform, Matrix4::IDENTITY.to_3x4_row_major());

        let back = desc.unpack();
        assert_eq!(back.instance_id, 5);
        assert_eq!(back.mask, 0xFF);
        assert_eq!(back.hit_group_index, 2);
        assert_eq!(back.flags, InstanceFlags::FORCE_OPAQUE);
        assert_eq!(back.transform, Matrix4::IDENTITY);
    }

    #[test]
    fn test_pack_rejects_wide_ids() {
        let mut instance = Instance::new(0);
        instance.instance_id = MAX_INSTANCE_ID;
        assert!(instance.pack().is_ok());

        instance.instance_id = MAX_INSTANCE_ID + 1;
        assert!(instance.pack().is_err());

        let mut instance = Instance::new(0);
        instance.hit_group_index = 1 << 24;
        assert!(instance.pack().is_err());
    }

    #[test]
    fn test_translation_lands_in_last_column() {
        let mut instance = Instance::new(0);
        instance.transform = Matrix4::translation(1.0, 2.0, 3.0);
        let desc = instance.pack().unwrap();
        assert_eq!(desc.transform[3], 1.0);
        assert_eq!(desc.transform[7], 2.0);
        assert_eq!(desc.transform[11], 3.0);
    }

    #[test]
    fn test_triangle_geometry_desc() {
        let vertices = [TestVertex { position: [0.0; 3], normal: [0.0; 3] }; 3];
        let desc = TriangleGeometryDesc::from_slices(&vertices, &[0, 1, 2]).unwrap();
        assert_eq!(desc.vertex_count, 3);
        assert_eq!(desc.vertex_stride, 24);
        assert_eq!(desc.vertex_format, VERTEX_FORMAT_R32G32B32_FLOAT);
        assert_eq!(desc.index_format, INDEX_FORMAT_R32_UINT);
        assert_eq!(desc.triangle_count(), 1);
        assert!(desc.opaque);

        assert!(TriangleGeometryDesc::from_slices(&vertices, &[0, 1]).is_err());
        assert!(TriangleGeometryDesc::from_slices(&vertices, &[0, 1, 3]).is_err());
        assert!(TriangleGeometryDesc::from_slices::<TestVertex>(&[], &[0, 1, 2]).is_err());
    }

    #[test]
    fn test_prebuild_alignment() {
        let sizes = PrebuildSizes {
            result_data_max_size: 1000,
            scratch_data_size: 256,
            update_scratch_data_size: 0,
        };
        let aligned = sizes.aligned();
        assert_eq!(aligned.result_data_max_size, 1024);
        assert_eq!(aligned.scratch_data_size, 256);
        assert_eq!(aligned.update_scratch_data_size, 0);
        assert!(sizes.validate("BLAS").is_ok());
        assert!(PrebuildSizes::default().validate("TLAS").is_err());
    }

    #[test]
    fn test_build_flags() {
        let flags = BuildFlags::PREFER_FAST_TRACE | BuildFlags::ALLOW_UPDATE;
        assert!(flags.contains(BuildFlags::PREFER_FAST_TRACE));
        assert!(!flags.contains(BuildFlags::MINIMIZE_MEMORY));
        assert_eq!(BuildFlags::PREFER_FAST_TRACE.bits(), 4);
    }
}

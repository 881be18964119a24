//! 着色器表布局
//!
//! 每条记录由 32 字节的着色器标识符加局部根参数组成。记录步长按 32 字节对齐，
//! 整张表的大小按 64 字节对齐（表起始地址要求 64 字节对齐）。

use crate::core::error::{GraphicsError, Result};
use crate::renderer::resource::align_to;

/// `D3D12_SHADER_IDENTIFIER_SIZE_IN_BYTES`
pub const SHADER_IDENTIFIER_SIZE: usize = 32;

/// `D3D12_RAYTRACING_SHADER_RECORD_BYTE_ALIGNMENT`
pub const SHADER_RECORD_ALIGNMENT: u64 = 32;

/// `D3D12_RAYTRACING_SHADER_TABLE_BYTE_ALIGNMENT`
pub const SHADER_TABLE_ALIGNMENT: u64 = 64;

/// 一条着色器记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderRecord {
    pub identifier: [u8; SHADER_IDENTIFIER_SIZE],
    pub local_root_arguments: Vec<u8>,
}

impl ShaderRecord {
    pub fn new(identifier: [u8; SHADER_IDENTIFIER_SIZE]) -> Self {
        Self {
            identifier,
            local_root_arguments: Vec::new(),
        }
    }

    /// 附带局部根参数（通常是 Pod 常量的字节）
    pub fn with_arguments(mut self, arguments: &[u8]) -> Self {
        self.local_root_arguments = arguments.to_vec();
        self
    }

    /// 从 `GetShaderIdentifier` 返回的内存拷贝标识符
    pub fn identifier_from_slice(bytes: &[u8]) -> Result<[u8; SHADER_IDENTIFIER_SIZE]> {
        bytes
            .get(..SHADER_IDENTIFIER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                GraphicsError::InvalidState(format!(
                    "shader identifier needs {} bytes, got {}",
                    SHADER_IDENTIFIER_SIZE,
                    bytes.len()
                ))
                .into()
            })
    }

    fn unaligned_size(&self) -> usize {
        SHADER_IDENTIFIER_SIZE + self.local_root_arguments.len()
    }
}

/// 着色器表
#[derive(Debug, Clone)]
pub struct ShaderTable {
    name: String,
    records: Vec<ShaderRecord>,
    stride: u64,
}

impl ShaderTable {
    /// 所有记录使用同一步长：最大记录大小按 32 字节对齐
    pub fn new(name: impl Into<String>, records: Vec<ShaderRecord>) -> Result<Self> {
        let name = name.into();
        if records.is_empty() {
            return Err(GraphicsError::InvalidState(format!("shader table '{}' has no records", name)).into());
        }

        let largest = records.iter().map(ShaderRecord::unaligned_size).max().unwrap_or(SHADER_IDENTIFIER_SIZE);
        let stride = align_to(largest as u64, SHADER_RECORD_ALIGNMENT);

        Ok(Self { name, records, stride })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// 分配 GPU 缓冲时使用的大小
    pub fn size_in_bytes(&self) -> u64 {
        align_to(self.stride * self.records.len() as u64, SHADER_TABLE_ALIGNMENT)
    }

    /// 写入已映射的上传缓冲，空隙填零
    pub fn write_into(&self, dst: &mut [u8]) -> Result<()> {
        let size = self.size_in_bytes() as usize;
        if dst.len() < size {
            return Err(GraphicsError::InvalidState(format!(
                "shader table '{}' needs {} bytes, buffer has {}",
                self.name,
                size,
                dst.len()
            ))
            .into());
        }

        dst[..size].fill(0);
        for (i, record) in self.records.iter().enumerate() {
            let offset = i * self.stride as usize;
            dst[offset..offset + SHADER_IDENTIFIER_SIZE].copy_from_slice(&record.identifier);
            let args = offset + SHADER_IDENTIFIER_SIZE;
            dst[args..args + record.local_root_arguments.len()].copy_from_slice(&record.local_root_arguments);
        }
        Ok(())
    }
}

/// 一段 GPU 地址范围，对应 `D3D12_GPU_VIRTUAL_ADDRESS_RANGE(_AND_STRIDE)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    pub start_address: u64,
    pub size_in_bytes: u64,
    pub stride_in_bytes: u64,
}

/// `DispatchRays` 使用的三段范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRegions {
    /// 光线生成表只取第一条记录，没有步长
    pub ray_generation: AddressRange,
    pub miss: AddressRange,
    pub hit_group: AddressRange,
}

/// 光线生成、未命中、命中组三张表
#[derive(Debug, Clone)]
pub struct ShaderTableSet {
    pub ray_gen: ShaderTable,
    pub miss: ShaderTable,
    pub hit_group: ShaderTable,
}

impl ShaderTableSet {
    /// 按 (光线生成, 未命中, 命中组) 的缓冲起始地址计算分派范围
    pub fn dispatch_regions(&self, ray_gen_address: u64, miss_address: u64, hit_group_address: u64) -> DispatchRegions {
        DispatchRegions {
            ray_generation: AddressRange {
                start_address: ray_gen_address,
                size_in_bytes: self.ray_gen.stride(),
                stride_in_bytes: 0,
            },
            miss: AddressRange {
                start_address: miss_address,
                size_in_bytes: self.miss.size_in_bytes(),
                stride_in_bytes: self.miss.stride(),
            },
            hit_group: AddressRange {
                start_address: hit_group_address,
                size_in_bytes: self.hit_group.size_in_bytes(),
                stride_in_bytes: self.hit_group.stride(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(fill: u8) -> [u8; SHADER_IDENTIFIER_SIZE] {
        [fill; SHADER_IDENTIFIER_SIZE]
    }

    #[test]
    fn test_stride_and_size() {
        let plain = ShaderTable::new("MissShaderTable", vec![ShaderRecord::new(id(1))]).unwrap();
        assert_eq!(plain.stride(), 32);
        assert_eq!(plain.size_in_bytes(), 64);

        let with_args = ShaderTable::new(
            "HitGroupShaderTable",
            vec![ShaderRecord::new(id(2)).with_arguments(&[0u8; 16])],
        )
        .unwrap();
        assert_eq!(with_args.stride(), 64);
        assert_eq!(with_args.size_in_bytes(), 64);

        let mixed = ShaderTable::new(
            "Mixed",
            vec![
                ShaderRecord::new(id(1)),
                ShaderRecord::new(id(2)).with_arguments(&[0u8; 4]),
                ShaderRecord::new(id(3)),
            ],
        )
        .unwrap();
        assert_eq!(mixed.stride(), 64);
        assert_eq!(mixed.size_in_bytes(), 192);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(ShaderTable::new("Empty", Vec::new()).is_err());
    }

    #[test]
    fn test_write_into_pads_with_zero() {
        let table = ShaderTable::new(
            "RayGenShaderTable",
            vec![ShaderRecord::new(id(0xAB)).with_arguments(&[1, 2, 3, 4])],
        )
        .unwrap();

        let mut buffer = vec![0xFFu8; table.size_in_bytes() as usize];
        table.write_into(&mut buffer).unwrap();

        assert!(buffer[..32].iter().all(|b| *b == 0xAB));
        assert_eq!(&buffer[32..36], &[1, 2, 3, 4]);
        assert!(buffer[36..].iter().all(|b| *b == 0));

        let mut short = vec![0u8; 10];
        assert!(table.write_into(&mut short).is_err());
    }

    #[test]
    fn test_identifier_from_slice() {
        let raw = [7u8; 40];
        assert_eq!(ShaderRecord::identifier_from_slice(&raw).unwrap(), id(7));
        assert!(ShaderRecord::identifier_from_slice(&raw[..16]).is_err());
    }

    #[test]
    fn test_dispatch_regions() {
        let set = ShaderTableSet {
            ray_gen: ShaderTable::new("RayGen", vec![ShaderRecord::new(id(1)).with_arguments(&[0u8; 32])]).unwrap(),
            miss: ShaderTable::new("Miss", vec![ShaderRecord::new(id(2))]).unwrap(),
            hit_group: ShaderTable::new("HitGroup", vec![ShaderRecord::new(id(3)).with_arguments(&[0u8; 16])]).unwrap(),
        };

        let regions = set.dispatch_regions(0x1000, 0x2000, 0x3000);
        assert_eq!(regions.ray_generation.start_address, 0x1000);
        assert_eq!(regions.ray_generation.size_in_bytes, 64);
        assert_eq!(regions.ray_generation.stride_in_bytes, 0);
        assert_eq!(regions.miss.size_in_bytes, 64);
        assert_eq!(regions.miss.stride_in_bytes, 32);
        assert_eq!(regions.hit_group.start_address, 0x3000);
        assert_eq!(regions.hit_group.stride_in_bytes, 64);

        for region in [regions.ray_generation, regions.miss, regions.hit_group] {
            assert_eq!(region.start_address % SHADER_TABLE_ALIGNMENT, 0);
        }
    }
}

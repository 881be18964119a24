//! 光线追踪管线描述
//!
//! 根签名布局、着色器导出名和状态对象的子对象顺序都以数据形式给出。
//! DX12 层按这里的描述序列化根签名并组装 `D3D12_STATE_OBJECT_DESC`，
//! 着色器中的寄存器绑定必须与这里保持一致。
//!
//! # 绑定
//!
//! | 作用域 | 寄存器 | 内容 |
//! |--------|--------|------|
//! | 全局 | u0 | 输出纹理 |
//! | 全局 | t0 | 顶层加速结构 |
//! | 全局 | b0 | 场景常量 |
//! | 全局 | t1, t2 | 索引 / 顶点缓冲 |
//! | 光线生成局部 | b2 | 视口与模板区域 |
//! | 命中组局部 | b1 | 物体颜色 |

use crate::core::error::{GraphicsError, Result};

/// `D3D12_RAYTRACING_MAX_DECLARABLE_TRACE_RECURSION_DEPTH`
pub const MAX_TRACE_RECURSION_DEPTH: u32 = 31;

pub const RAYGEN_SHADER_NAME: &str = "MyRaygenShader";
pub const CLOSEST_HIT_SHADER_NAME: &str = "MyClosestHitShader";
pub const MISS_SHADER_NAME: &str = "MyMissShader";
pub const HIT_GROUP_NAME: &str = "MyHitGroup";

/// 全局根签名参数槽位
pub mod global_slot {
    pub const OUTPUT_VIEW: u32 = 0;
    pub const ACCELERATION_STRUCTURE: u32 = 1;
    pub const SCENE_CONSTANTS: u32 = 2;
    pub const GEOMETRY_BUFFERS: u32 = 3;
    pub const COUNT: u32 = 4;
}

/// 着色器可见描述符堆中的槽位
pub mod heap_slot {
    pub const OUTPUT_UAV: u32 = 0;
    /// 索引与顶点 SRV 必须相邻，描述符表从这里开始
    pub const INDEX_SRV: u32 = 1;
    pub const VERTEX_SRV: u32 = 2;
    pub const HEAP_SIZE: u32 = 3;
}

/// 描述符范围类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorRangeKind {
    Srv,
    Uav,
    Cbv,
}

/// 根参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootParameter {
    /// 单个描述符范围组成的描述符表
    DescriptorTable {
        kind: DescriptorRangeKind,
        base_register: u32,
        count: u32,
    },
    /// 根 SRV（加速结构通过 GPU 虚拟地址绑定）
    ShaderResourceView { register: u32 },
    /// 根 CBV
    ConstantBufferView { register: u32 },
    /// 32 位根常量
    Constants { register: u32, num_values: u32 },
}

impl RootParameter {
    /// 在根签名中占用的 DWORD 数
    pub fn cost_in_dwords(&self) -> u32 {
        match self {
            RootParameter::DescriptorTable { .. } => 1,
            RootParameter::ShaderResourceView { .. } | RootParameter::ConstantBufferView { .. } => 2,
            RootParameter::Constants { num_values, .. } => *num_values,
        }
    }
}

/// 根签名作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSignatureScope {
    Global,
    /// 带 `D3D12_ROOT_SIGNATURE_FLAG_LOCAL_ROOT_SIGNATURE`
    Local,
}

/// 根签名布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSignatureLayout {
    pub name: &'static str,
    pub scope: RootSignatureScope,
    pub parameters: Vec<RootParameter>,
}

impl RootSignatureLayout {
    /// 根签名最多 64 个 DWORD
    pub const MAX_DWORDS: u32 = 64;

    /// 所有光线追踪着色器共享的全局根签名
    pub fn global() -> Self {
        // 顺序与 global_slot 一致
        let parameters = vec![
            RootParameter::DescriptorTable {
                kind: DescriptorRangeKind::Uav,
                base_register: 0,
                count: 1,
            },
            RootParameter::ShaderResourceView { register: 0 },
            RootParameter::ConstantBufferView { register: 0 },
            RootParameter::DescriptorTable {
                kind: DescriptorRangeKind::Srv,
                base_register: 1,
                count: 2,
            },
        ];

        Self {
            name: "GlobalRootSignature",
            scope: RootSignatureScope::Global,
            parameters,
        }
    }

    /// 光线生成着色器的局部根签名，`constant_bytes` 为 `RayGenConstantBuffer` 的大小
    pub fn ray_gen_local(constant_bytes: usize) -> Self {
        Self {
            name: "RayGenLocalRootSignature",
            scope: RootSignatureScope::Local,
            parameters: vec![RootParameter::Constants {
                register: 2,
                num_values: dwords(constant_bytes),
            }],
        }
    }

    /// 命中组的局部根签名，`constant_bytes` 为 `ObjectConstantBuffer` 的大小
    pub fn hit_group_local(constant_bytes: usize) -> Self {
        Self {
            name: "HitGroupLocalRootSignature",
            scope: RootSignatureScope::Local,
            parameters: vec![RootParameter::Constants {
                register: 1,
                num_values: dwords(constant_bytes),
            }],
        }
    }

    pub fn cost_in_dwords(&self) -> u32 {
        self.parameters.iter().map(RootParameter::cost_in_dwords).sum()
    }

    pub fn validate(&self) -> Result<()> {
        let cost = self.cost_in_dwords();
        if cost > Self::MAX_DWORDS {
            return Err(GraphicsError::InvalidState(format!(
                "{} uses {} DWORDs (limit {})",
                self.name,
                cost,
                Self::MAX_DWORDS
            ))
            .into());
        }
        Ok(())
    }
}

fn dwords(bytes: usize) -> u32 {
    bytes.div_ceil(4) as u32
}

/// 着色器负载与属性大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderConfig {
    pub max_payload_bytes: u32,
    pub max_attribute_bytes: u32,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            // float4 颜色
            max_payload_bytes: 16,
            // float2 重心坐标
            max_attribute_bytes: 8,
        }
    }
}

/// 状态对象子对象类型，顺序即创建顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subobject {
    DxilLibrary,
    HitGroup,
    ShaderConfig,
    /// 局部根签名，附带关联的导出名
    LocalRootSignature(LocalRootSignatureKind),
    /// 把前一个局部根签名关联到导出
    ExportsAssociation(LocalRootSignatureKind),
    GlobalRootSignature,
    PipelineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalRootSignatureKind {
    RayGen,
    HitGroup,
}

impl LocalRootSignatureKind {
    /// 关联的导出名
    pub fn export(self) -> &'static str {
        match self {
            LocalRootSignatureKind::RayGen => RAYGEN_SHADER_NAME,
            LocalRootSignatureKind::HitGroup => HIT_GROUP_NAME,
        }
    }
}

/// 光线追踪管线状态对象描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    pub shader_config: ShaderConfig,
    pub max_recursion_depth: u32,
}

impl PipelineDesc {
    pub fn new(max_recursion_depth: u32) -> Result<Self> {
        let desc = Self {
            shader_config: ShaderConfig::default(),
            max_recursion_depth,
        };
        desc.validate()?;
        Ok(desc)
    }

    /// DXIL 库导出的着色器
    pub fn library_exports(&self) -> [&'static str; 3] {
        [RAYGEN_SHADER_NAME, CLOSEST_HIT_SHADER_NAME, MISS_SHADER_NAME]
    }

    /// 子对象列表
    pub fn subobjects(&self) -> Vec<Subobject> {
        vec![
            Subobject::DxilLibrary,
            Subobject::HitGroup,
            Subobject::ShaderConfig,
            Subobject::LocalRootSignature(LocalRootSignatureKind::RayGen),
            Subobject::ExportsAssociation(LocalRootSignatureKind::RayGen),
            Subobject::LocalRootSignature(LocalRootSignatureKind::HitGroup),
            Subobject::ExportsAssociation(LocalRootSignatureKind::HitGroup),
            Subobject::GlobalRootSignature,
            Subobject::PipelineConfig,
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TRACE_RECURSION_DEPTH).contains(&self.max_recursion_depth) {
            return Err(GraphicsError::InvalidState(format!(
                "max recursion depth {} outside 1..={}",
                self.max_recursion_depth, MAX_TRACE_RECURSION_DEPTH
            ))
            .into());
        }
        if self.shader_config.max_payload_bytes == 0 {
            return Err(GraphicsError::InvalidState("ray payload size must be non-zero".to_string()).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_root_signature_layout() {
        let layout = RootSignatureLayout::global();
        assert_eq!(layout.scope, RootSignatureScope::Global);
        assert_eq!(layout.parameters.len(), global_slot::COUNT as usize);
        assert_eq!(
            layout.parameters[global_slot::OUTPUT_VIEW as usize],
            RootParameter::DescriptorTable { kind: DescriptorRangeKind::Uav, base_register: 0, count: 1 }
        );
        assert_eq!(
            layout.parameters[global_slot::ACCELERATION_STRUCTURE as usize],
            RootParameter::ShaderResourceView { register: 0 }
        );
        assert_eq!(
            layout.parameters[global_slot::GEOMETRY_BUFFERS as usize],
            RootParameter::DescriptorTable { kind: DescriptorRangeKind::Srv, base_register: 1, count: 2 }
        );
        // 1 + 2 + 2 + 1
        assert_eq!(layout.cost_in_dwords(), 6);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn test_local_root_signatures() {
        let hit = RootSignatureLayout::hit_group_local(16);
        assert_eq!(hit.scope, RootSignatureScope::Local);
        assert_eq!(hit.parameters, vec![RootParameter::Constants { register: 1, num_values: 4 }]);

        let ray_gen = RootSignatureLayout::ray_gen_local(32);
        assert_eq!(ray_gen.cost_in_dwords(), 8);

        let oversized = RootSignatureLayout::hit_group_local(65 * 4);
        assert!(oversized.validate().is_err());
    }

    #[test]
    fn test_heap_slots_are_contiguous() {
        assert_eq!(heap_slot::VERTEX_SRV, heap_slot::INDEX_SRV + 1);
        assert_eq!(heap_slot::HEAP_SIZE, 3);
    }

    #[test]
    fn test_subobject_order() {
        let desc = PipelineDesc::new(1).unwrap();
        let subobjects = desc.subobjects();
        assert_eq!(subobjects.len(), 9);
        assert_eq!(subobjects.first(), Some(&Subobject::DxilLibrary));
        assert_eq!(subobjects.last(), Some(&Subobject::PipelineConfig));

        // 每个关联紧跟在对应的局部根签名之后
        for (i, sub) in subobjects.iter().enumerate() {
            if let Subobject::ExportsAssociation(kind) = sub {
                assert_eq!(subobjects[i - 1], Subobject::LocalRootSignature(*kind));
            }
        }
        assert_eq!(LocalRootSignatureKind::HitGroup.export(), "MyHitGroup");
        assert_eq!(desc.library_exports(), ["MyRaygenShader", "MyClosestHitShader", "MyMissShader"]);
    }

    #[test]
    fn test_recursion_depth_validation() {
        assert!(PipelineDesc::new(0).is_err());
        assert!(PipelineDesc::new(MAX_TRACE_RECURSION_DEPTH).is_ok());
        assert!(PipelineDesc::new(MAX_TRACE_RECURSION_DEPTH + 1).is_err());

        let mut desc = PipelineDesc::new(1).unwrap();
        desc.shader_config.max_payload_bytes = 0;
        assert!(desc.validate().is_err());
    }
}

//! GPU 常量与顶点布局
//!
//! 这些结构体按字节拷贝进上传缓冲区或作为局部根参数，字段顺序必须与
//! `shaders/raytracing.hlsl` 中的声明一致。

use bytemuck::{Pod, Zeroable};

use crate::math::{Matrix4, Vector3, Vector4};

/// 顶点（位置 + 法线）
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vector3,
    pub normal: Vector3,
}

impl Vertex {
    pub const fn new(position: Vector3, normal: Vector3) -> Self {
        Self { position, normal }
    }
}

/// 场景常量（b0）
///
/// `projection_to_world` 以转置形式存放，匹配 HLSL 默认的列主序打包。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct SceneConstantBuffer {
    pub projection_to_world: Matrix4,
    pub camera_position: Vector4,
    pub light_position: Vector4,
    pub light_ambient_colour: Vector4,
    pub light_diffuse_colour: Vector4,
}

/// 物体常量（命中组局部根参数，b1）
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ObjectConstantBuffer {
    pub colour: Vector4,
}

/// 归一化设备坐标中的矩形
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ViewportRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ViewportRect {
    pub const FULL: ViewportRect = ViewportRect {
        left: -1.0,
        top: -1.0,
        right: 1.0,
        bottom: 1.0,
    };

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// 光线生成常量（光线生成局部根参数，b2）
///
/// 模板区域之外的像素不发射光线，直接写背景色。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct RayGenConstantBuffer {
    pub viewport: ViewportRect,
    pub stencil: ViewportRect,
}

impl RayGenConstantBuffer {
    /// 模板边框宽度（NDC）
    pub const BORDER: f32 = 0.1;

    /// 边框按宽高比修正，保持四边在屏幕上等宽
    pub fn for_output(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let aspect = width as f32 / height as f32;
        let border = Self::BORDER;

        let stencil = if width <= height {
            ViewportRect {
                left: -1.0 + border,
                top: -1.0 + border * aspect,
                right: 1.0 - border,
                bottom: 1.0 - border * aspect,
            }
        } else {
            ViewportRect {
                left: -1.0 + border / aspect,
                top: -1.0 + border,
                right: 1.0 - border / aspect,
                bottom: 1.0 - border,
            }
        };

        Self {
            viewport: ViewportRect::FULL,
            stencil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::approx_eq;

    #[test]
    fn test_layouts() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
        assert_eq!(std::mem::size_of::<SceneConstantBuffer>(), 128);
        assert_eq!(std::mem::size_of::<ObjectConstantBuffer>(), 16);
        assert_eq!(std::mem::size_of::<RayGenConstantBuffer>(), 32);
    }

    #[test]
    fn test_stencil_wide_output() {
        let cb = RayGenConstantBuffer::for_output(1280, 720);
        let aspect = 1280.0 / 720.0;
        assert_eq!(cb.viewport, ViewportRect::FULL);
        assert!(approx_eq(cb.stencil.left, -1.0 + 0.1 / aspect, 1e-6));
        assert!(approx_eq(cb.stencil.top, -0.9, 1e-6));
        assert!(approx_eq(cb.stencil.right, 1.0 - 0.1 / aspect, 1e-6));
        assert!(approx_eq(cb.stencil.bottom, 0.9, 1e-6));
    }

    #[test]
    fn test_stencil_tall_output() {
        let cb = RayGenConstantBuffer::for_output(400, 800);
        assert!(approx_eq(cb.stencil.left, -0.9, 1e-6));
        assert!(approx_eq(cb.stencil.top, -1.0 + 0.1 * 0.5, 1e-6));
        assert!(approx_eq(cb.stencil.bottom, 1.0 - 0.05, 1e-6));
    }

    #[test]
    fn test_stencil_contains() {
        let cb = RayGenConstantBuffer::for_output(100, 100);
        assert!(cb.stencil.contains(0.0, 0.0));
        assert!(!cb.stencil.contains(-0.95, 0.0));
        assert!(cb.viewport.contains(-0.95, 0.0));
    }
}

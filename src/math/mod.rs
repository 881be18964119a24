//! 手写的三维数学库
//!
//! 为场景数据和 GPU 常量缓冲提供最小的数学类型集合，不依赖外部线性代数库。
//! 所有类型都是 `#[repr(C)]` 并实现 `bytemuck::Pod`，可以直接拷贝进上传缓冲区。
//!
//! # 模块组织
//!
//! - **向量**：Vector2 / Vector3 / Vector4
//! - **点**：Point2 / Point3（点与向量在运算上区分开）
//! - **法线**：Normal3
//! - **矩阵**：Matrix3 / Matrix4（行主序存储，列向量约定 `M * v`）
//! - **射线**：Ray
//! - **颜色**：Color
//!
//! # 约定
//!
//! 矩阵按行存储，`m[row][col]`，变换写作 `M * v`。
//! 投影与视图矩阵遵循 Direct3D 左手坐标系，深度范围 0..1。

mod matrix3;
mod matrix4;
mod normal;
mod point;
mod ray;
mod vector;

pub use matrix3::Matrix3;
pub use matrix4::Matrix4;
pub use normal::Normal3;
pub use point::{Point2, Point3};
pub use ray::Ray;
pub use vector::{Vector2, Vector3, Vector4};

use bytemuck::{Pod, Zeroable};

/// 颜色类型（RGBA，范围 0.0-1.0）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 创建 RGB 颜色（alpha = 1.0）
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// 转换为 Vector4
    pub fn to_vec4(self) -> Vector4 {
        Vector4::new(self.r, self.g, self.b, self.a)
    }

    /// 转换为 `[f32; 4]`，用于 ClearRenderTargetView
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
}

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 2π
    pub const TAU: f32 = std::f32::consts::TAU;

    /// π/2
    pub const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

    /// π/4
    pub const QUARTER_PI: f32 = std::f32::consts::FRAC_PI_4;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 弧度转角度的系数
    pub const RAD_TO_DEG: f32 = 180.0 / PI;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    use super::constants;

    /// 限制值在范围内
    pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// 饱和函数（限制在 0.0-1.0）
    pub fn saturate(value: f32) -> f32 {
        clamp(value, 0.0, 1.0)
    }

    /// 线性插值
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utils() {
        assert_eq!(utils::clamp(5, 0, 3), 3);
        assert_eq!(utils::saturate(-0.5), 0.0);
        assert!(utils::approx_eq(utils::lerp(2.0, 4.0, 0.25), 2.5, constants::EPSILON));
        assert!(utils::approx_eq(utils::deg_to_rad(180.0), constants::PI, constants::EPSILON));
    }

    #[test]
    fn test_color_layout() {
        let c = Color::rgb(0.0, 0.4, 0.4);
        assert_eq!(c.to_array(), [0.0, 0.4, 0.4, 1.0]);
        assert_eq!(bytemuck::bytes_of(&c).len(), 16);
        assert_eq!(c.to_vec4(), Vector4::new(0.0, 0.4, 0.4, 1.0));
    }
}

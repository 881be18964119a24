//! 表面法线

use bytemuck::{Pod, Zeroable};
use std::ops::{Add, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub};

use super::vector::impl_scalar_ops;
use super::Vector3;

/// 三维法线
///
/// 与 Vector3 分开建模：法线在非均匀缩放下的变换方式不同。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Normal3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl_scalar_ops!(Normal3, 3, { x, y, z });

impl Normal3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// 单位化；零长度法线原样返回
    pub fn normalize(&self) -> Normal3 {
        let len = self.length();
        if len == 0.0 {
            *self
        } else {
            *self / len
        }
    }

    pub fn dot(&self, v: &Vector3) -> f32 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// 翻转法线使其与 v 位于同一半球
    pub fn face_forward(&self, v: &Vector3) -> Normal3 {
        if self.dot(v) < 0.0 {
            -*self
        } else {
            *self
        }
    }
}

impl Add for Normal3 {
    type Output = Normal3;
    fn add(self, o: Normal3) -> Normal3 {
        Normal3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Normal3 {
    type Output = Normal3;
    fn sub(self, o: Normal3) -> Normal3 {
        Normal3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl From<Vector3> for Normal3 {
    fn from(v: Vector3) -> Self {
        Normal3::new(v.x, v.y, v.z)
    }
}

impl From<Normal3> for Vector3 {
    fn from(n: Normal3) -> Self {
        Vector3::new(n.x, n.y, n.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_normalize() {
        let n = Normal3::new(0.0, 0.0, -4.0);
        assert_eq!(n.length_squared(), 16.0);
        assert_eq!(n.length(), 4.0);
        assert_eq!(n.normalize(), Normal3::new(0.0, 0.0, -1.0));
        assert_eq!(Normal3::default().normalize(), Normal3::default());
    }

    #[test]
    fn test_face_forward() {
        let n = Normal3::new(0.0, 0.0, 1.0);
        let toward = Vector3::new(0.0, 0.0, -1.0);
        assert_eq!(n.face_forward(&toward), Normal3::new(0.0, 0.0, -1.0));
        assert_eq!(n.face_forward(&Vector3::new(0.0, 1.0, 1.0)), n);
    }

    #[test]
    fn test_normal_arithmetic() {
        let a = Normal3::new(1.0, 2.0, 3.0);
        let b = Normal3::new(1.0, 1.0, 1.0);
        assert_eq!(a + b, Normal3::new(2.0, 3.0, 4.0));
        assert_eq!(a - b, Normal3::new(0.0, 1.0, 2.0));
        assert_eq!(a * 2.0, Normal3::new(2.0, 4.0, 6.0));
        assert_eq!(Vector3::from(a), Vector3::new(1.0, 2.0, 3.0));
    }
}

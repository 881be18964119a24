//! 二维、三维、四维向量

use bytemuck::{Pod, Zeroable};
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

/// 为分量类型实现标量乘除、取负和按下标访问
///
/// 除法先求倒数再相乘，与乘法共用一条路径。
macro_rules! impl_scalar_ops {
    ($ty:ident, $n:expr, { $($f:ident),+ }) => {
        impl Mul<f32> for $ty {
            type Output = $ty;
            fn mul(self, s: f32) -> $ty {
                $ty { $($f: self.$f * s),+ }
            }
        }

        impl Mul<$ty> for f32 {
            type Output = $ty;
            fn mul(self, v: $ty) -> $ty {
                v * self
            }
        }

        impl Div<f32> for $ty {
            type Output = $ty;
            fn div(self, s: f32) -> $ty {
                self * (1.0 / s)
            }
        }

        impl MulAssign<f32> for $ty {
            fn mul_assign(&mut self, s: f32) {
                $(self.$f *= s;)+
            }
        }

        impl DivAssign<f32> for $ty {
            fn div_assign(&mut self, s: f32) {
                *self *= 1.0 / s;
            }
        }

        impl Neg for $ty {
            type Output = $ty;
            fn neg(self) -> $ty {
                $ty { $($f: -self.$f),+ }
            }
        }

        impl Index<usize> for $ty {
            type Output = f32;
            fn index(&self, i: usize) -> &f32 {
                &bytemuck::cast_ref::<$ty, [f32; $n]>(self)[i]
            }
        }

        impl IndexMut<usize> for $ty {
            fn index_mut(&mut self, i: usize) -> &mut f32 {
                &mut bytemuck::cast_mut::<$ty, [f32; $n]>(self)[i]
            }
        }
    };
}

pub(crate) use impl_scalar_ops;

/// 向量之间的加减以及向量专属的方法
macro_rules! impl_vector {
    ($ty:ident, $n:expr, { $($f:ident),+ }) => {
        impl_scalar_ops!($ty, $n, { $($f),+ });

        impl $ty {
            /// 零向量
            pub const ZERO: $ty = $ty { $($f: 0.0),+ };

            /// 每个分量是否严格为 0
            pub fn is_zero(&self) -> bool {
                $(self.$f == 0.0)&&+
            }

            /// 点积
            pub fn dot(&self, other: &$ty) -> f32 {
                0.0 $(+ self.$f * other.$f)+
            }

            /// 长度的平方
            pub fn magnitude_squared(&self) -> f32 {
                self.dot(self)
            }

            /// 长度
            pub fn magnitude(&self) -> f32 {
                self.magnitude_squared().sqrt()
            }

            /// 单位向量；零向量返回零向量
            pub fn normalize(&self) -> $ty {
                if self.is_zero() {
                    $ty::ZERO
                } else {
                    self.normalize_unchecked()
                }
            }

            /// 单位向量，不检查零长度
            pub fn normalize_unchecked(&self) -> $ty {
                *self / self.magnitude()
            }

            /// 转换为数组
            pub fn to_array(self) -> [f32; $n] {
                bytemuck::cast(self)
            }
        }

        impl Add for $ty {
            type Output = $ty;
            fn add(self, o: $ty) -> $ty {
                $ty { $($f: self.$f + o.$f),+ }
            }
        }

        impl Sub for $ty {
            type Output = $ty;
            fn sub(self, o: $ty) -> $ty {
                $ty { $($f: self.$f - o.$f),+ }
            }
        }

        impl AddAssign for $ty {
            fn add_assign(&mut self, o: $ty) {
                $(self.$f += o.$f;)+
            }
        }

        impl SubAssign for $ty {
            fn sub_assign(&mut self, o: $ty) {
                $(self.$f -= o.$f;)+
            }
        }
    };
}

/// 二维向量
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

/// 三维向量
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 四维向量
///
/// 常量缓冲中的位置和颜色都以 `float4` 对齐，因此用 Vector4 上传。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl_vector!(Vector2, 2, { x, y });
impl_vector!(Vector3, 3, { x, y, z });
impl_vector!(Vector4, 4, { x, y, z, w });

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);

    /// 叉积
    pub fn cross(&self, b: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * b.z - self.z * b.y,
            self.z * b.x - self.x * b.z,
            self.x * b.y - self.y * b.x,
        )
    }

    /// self 在 b 上的投影
    pub fn project_onto(&self, b: &Vector3) -> Vector3 {
        *b * (self.dot(b) / b.dot(b))
    }

    /// self 相对 b 的拒绝分量，与 b 垂直
    pub fn reject_from(&self, b: &Vector3) -> Vector3 {
        *self - self.project_onto(b)
    }

    /// 扩展为齐次坐标
    pub fn extend(self, w: f32) -> Vector4 {
        Vector4::new(self.x, self.y, self.z, w)
    }
}

impl Vector4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// 丢弃 w 分量
    pub fn truncate(self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::approx_eq;

    #[test]
    fn test_dot_and_cross() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.dot(&y), 0.0);
        assert_eq!(x.cross(&y), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(&x), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_projection_and_rejection() {
        let a = Vector3::new(3.0, 4.0, 0.0);
        let b = Vector3::new(2.0, 0.0, 0.0);
        assert_eq!(a.project_onto(&b), Vector3::new(3.0, 0.0, 0.0));

        let r = a.reject_from(&b);
        assert_eq!(r, Vector3::new(0.0, 4.0, 0.0));
        assert!(approx_eq(r.dot(&b), 0.0, 1e-6));
        assert_eq!(a.project_onto(&b) + r, a);
    }

    #[test]
    fn test_normalize_is_zero_safe() {
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);
        assert!(Vector3::ZERO.is_zero());

        let n = Vector3::new(0.0, 3.0, 4.0).normalize();
        assert!(approx_eq(n.magnitude(), 1.0, 1e-6));
        assert!(approx_eq(n.y, 0.6, 1e-6));

        let v = Vector4::new(2.0, 0.0, 0.0, 0.0).normalize();
        assert_eq!(v, Vector4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(Vector2::new(0.0, -5.0).normalize(), Vector2::new(0.0, -1.0));
    }

    #[test]
    fn test_arithmetic_operators() {
        let mut v = Vector3::new(1.0, 2.0, 3.0);
        v += Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(v, Vector3::new(2.0, 3.0, 4.0));
        v -= Vector3::new(2.0, 3.0, 4.0);
        assert!(v.is_zero());

        let w = Vector3::new(2.0, 4.0, 8.0);
        assert_eq!(w * 0.5, Vector3::new(1.0, 2.0, 4.0));
        assert_eq!(0.5 * w, w / 2.0);
        assert_eq!(-w, Vector3::new(-2.0, -4.0, -8.0));

        let mut u = Vector2::new(4.0, 8.0);
        u /= 4.0;
        assert_eq!(u, Vector2::new(1.0, 2.0));
        u *= 3.0;
        assert_eq!(u, Vector2::new(3.0, 6.0));
    }

    #[test]
    fn test_indexing() {
        let mut v = Vector4::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[3], 4.0);
        v[2] = 9.0;
        assert_eq!(v.z, 9.0);
        assert_eq!(v.to_array(), [1.0, 2.0, 9.0, 4.0]);
    }

    #[test]
    #[should_panic]
    fn test_index_out_of_range() {
        let v = Vector2::new(1.0, 2.0);
        let _ = v[2];
    }
}

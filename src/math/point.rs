//! 二维、三维点
//!
//! 点与向量在运算上区分：点 + 向量 = 点，点 - 点 = 向量。

use bytemuck::{Pod, Zeroable};
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

use super::vector::impl_scalar_ops;
use super::{Vector2, Vector3};

/// 点与对应向量类型之间的运算
macro_rules! impl_point {
    ($ty:ident, $vec:ident, $n:expr, { $($f:ident),+ }) => {
        impl_scalar_ops!($ty, $n, { $($f),+ });

        impl $ty {
            /// 原点
            pub const ORIGIN: $ty = $ty { $($f: 0.0),+ };

            /// 到另一点的距离
            pub fn distance(&self, other: &$ty) -> f32 {
                (*self - *other).magnitude()
            }
        }

        impl Add<$vec> for $ty {
            type Output = $ty;
            fn add(self, v: $vec) -> $ty {
                $ty { $($f: self.$f + v.$f),+ }
            }
        }

        impl Sub<$vec> for $ty {
            type Output = $ty;
            fn sub(self, v: $vec) -> $ty {
                $ty { $($f: self.$f - v.$f),+ }
            }
        }

        impl Sub for $ty {
            type Output = $vec;
            fn sub(self, p: $ty) -> $vec {
                $vec { $($f: self.$f - p.$f),+ }
            }
        }

        impl AddAssign<$vec> for $ty {
            fn add_assign(&mut self, v: $vec) {
                $(self.$f += v.$f;)+
            }
        }

        impl SubAssign<$vec> for $ty {
            fn sub_assign(&mut self, v: $vec) {
                $(self.$f -= v.$f;)+
            }
        }

        impl From<$vec> for $ty {
            fn from(v: $vec) -> $ty {
                $ty { $($f: v.$f),+ }
            }
        }

        impl From<$ty> for $vec {
            fn from(p: $ty) -> $vec {
                $vec { $($f: p.$f),+ }
            }
        }
    };
}

/// 二维点
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

/// 三维点
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl_point!(Point2, Vector2, 2, { x, y });
impl_point!(Point3, Vector3, 3, { x, y, z });

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// 二维点提升为三维点，z = 0
impl From<Point2> for Point3 {
    fn from(p: Point2) -> Self {
        Point3::new(p.x, p.y, 0.0)
    }
}

/// 二维向量视为平面上的点，z = 0
impl From<Vector2> for Point3 {
    fn from(v: Vector2) -> Self {
        Point3::new(v.x, v.y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_vector_arithmetic() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let v = Vector3::new(1.0, 0.0, -1.0);

        let q = p + v;
        assert_eq!(q, Point3::new(2.0, 2.0, 2.0));
        assert_eq!(q - p, v);
        assert_eq!(q - v, p);

        let mut r = p;
        r += v;
        r -= v;
        assert_eq!(r, p);
    }

    #[test]
    fn test_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(Point3::ORIGIN.distance(&Point3::new(0.0, 0.0, 2.0)), 2.0);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Point3::from(Point2::new(1.0, 2.0)), Point3::new(1.0, 2.0, 0.0));
        assert_eq!(Point3::from(Vector2::new(4.0, 5.0)), Point3::new(4.0, 5.0, 0.0));
        assert_eq!(Vector3::from(Point3::new(1.0, 1.0, 1.0)), Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_scalar_ops_and_index() {
        let mut p = Point3::new(2.0, 4.0, 6.0) / 2.0;
        assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
        p *= 2.0;
        assert_eq!(p[1], 4.0);
        p[0] = -1.0;
        assert_eq!(p.x, -1.0);
    }
}

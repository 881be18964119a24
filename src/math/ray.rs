//! 射线

use super::{Point3, Vector3};

/// 射线：起点 `o`，方向 `d`
///
/// `length` 为射线的最大参数，默认无穷远。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub o: Point3,
    pub d: Vector3,
    pub t: f32,
    pub length: f32,
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Point3::ORIGIN, Vector3::ZERO)
    }
}

impl Ray {
    pub fn new(o: Point3, d: Vector3) -> Self {
        Self {
            o,
            d,
            t: 0.0,
            length: f32::INFINITY,
        }
    }

    pub fn with_length(o: Point3, d: Vector3, length: f32) -> Self {
        Self { length, ..Self::new(o, d) }
    }

    /// 参数 t 处的位置 `o + d * t`
    pub fn position(&self, t: f32) -> Point3 {
        self.o + self.d * t
    }

    /// 参数是否落在 `[0, length]` 内
    pub fn contains(&self, t: f32) -> bool {
        (0.0..=self.length).contains(&t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let r = Ray::new(Point3::new(1.0, 0.0, 0.0), Vector3::UP);
        assert_eq!(r.t, 0.0);
        assert!(r.length.is_infinite());
        assert!(r.contains(1.0e30));
        assert!(!r.contains(-1.0));
    }

    #[test]
    fn test_position() {
        let r = Ray::with_length(Point3::ORIGIN, Vector3::new(0.0, 0.0, 2.0), 10.0);
        assert_eq!(r.position(0.0), Point3::ORIGIN);
        assert_eq!(r.position(2.5), Point3::new(0.0, 0.0, 5.0));
        assert!(!r.contains(11.0));
    }
}

//! 3x3 矩阵

use bytemuck::{Pod, Zeroable};
use std::ops::{Index, IndexMut, Mul};

use super::Vector3;

/// 3x3 矩阵，行主序存储
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Matrix3 {
    m: [[f32; 3]; 3],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3 {
    pub const IDENTITY: Matrix3 = Matrix3 {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// 按行给出 9 个元素
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        n00: f32, n01: f32, n02: f32,
        n10: f32, n11: f32, n12: f32,
        n20: f32, n21: f32, n22: f32,
    ) -> Self {
        Self {
            m: [[n00, n01, n02], [n10, n11, n12], [n20, n21, n22]],
        }
    }

    /// 由三个行向量构造
    pub fn from_rows(a: Vector3, b: Vector3, c: Vector3) -> Self {
        Self {
            m: [[a.x, a.y, a.z], [b.x, b.y, b.z], [c.x, c.y, c.z]],
        }
    }

    pub fn row(&self, i: usize) -> Vector3 {
        let r = self.m[i];
        Vector3::new(r[0], r[1], r[2])
    }

    pub fn column(&self, j: usize) -> Vector3 {
        Vector3::new(self.m[0][j], self.m[1][j], self.m[2][j])
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.m[i][j]
    }

    pub fn transpose(&self) -> Matrix3 {
        Matrix3::from_rows(self.column(0), self.column(1), self.column(2))
    }

    pub fn determinant(&self) -> f32 {
        self.row(0).dot(&self.row(1).cross(&self.row(2)))
    }

    /// 逆矩阵；奇异矩阵返回 None
    pub fn inverse(&self) -> Option<Matrix3> {
        let a = self.column(0);
        let b = self.column(1);
        let c = self.column(2);

        let r0 = b.cross(&c);
        let r1 = c.cross(&a);
        let r2 = a.cross(&b);

        let det = r2.dot(&c);
        if det == 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Matrix3::from_rows(r0 * inv_det, r1 * inv_det, r2 * inv_det))
    }
}

impl Index<(usize, usize)> for Matrix3 {
    type Output = f32;
    fn index(&self, (i, j): (usize, usize)) -> &f32 {
        &self.m[i][j]
    }
}

impl IndexMut<(usize, usize)> for Matrix3 {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f32 {
        &mut self.m[i][j]
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;
    fn mul(self, b: Matrix3) -> Matrix3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.row(i).dot(&b.column(j));
            }
        }
        Matrix3 { m: out }
    }
}

impl Mul<Vector3> for Matrix3 {
    type Output = Vector3;
    fn mul(self, v: Vector3) -> Vector3 {
        Vector3::new(self.row(0).dot(&v), self.row(1).dot(&v), self.row(2).dot(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::approx_eq;

    #[test]
    fn test_identity_default() {
        let m = Matrix3::default();
        assert_eq!(m, Matrix3::IDENTITY);
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(m * v, v);
    }

    #[test]
    fn test_row_major_layout() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        assert_eq!(m.row(1), Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(m.column(1), Vector3::new(2.0, 5.0, 8.0));
        assert_eq!(m.get(2, 0), 7.0);
        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m.transpose().row(0), Vector3::new(1.0, 4.0, 7.0));
        assert_eq!(
            Matrix3::from_rows(m.row(0), m.row(1), m.row(2)),
            m
        );
    }

    #[test]
    fn test_multiply() {
        let a = Matrix3::new(1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0);
        let b = Matrix3::new(1.0, 0.0, 0.0, 3.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let c = a * b;
        assert_eq!(c.row(0), Vector3::new(7.0, 2.0, 0.0));
        assert_eq!(c.row(2), Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(a * Vector3::new(1.0, 1.0, 1.0), Vector3::new(3.0, 1.0, 2.0));
    }

    #[test]
    fn test_inverse() {
        let m = Matrix3::new(2.0, 0.0, 1.0, 1.0, 3.0, 0.0, 0.0, 1.0, 4.0);
        assert!(approx_eq(m.determinant(), 25.0, 1e-5));

        let inv = m.inverse().expect("matrix is invertible");
        let p = m * inv;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(approx_eq(p.get(i, j), expected, 1e-5));
            }
        }

        let singular = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0);
        assert!(singular.inverse().is_none());
    }
}

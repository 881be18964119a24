//! 4x4 矩阵
//!
//! 行主序存储，列向量约定（`M * v`）。视图与投影矩阵按 Direct3D 左手坐标系构造，
//! 裁剪空间深度范围 0..1。

use bytemuck::{Pod, Zeroable};
use std::ops::{Index, IndexMut, Mul};

use super::{Point3, Vector3, Vector4};

/// 4x4 矩阵
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Matrix4 {
    m: [[f32; 4]; 4],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    pub const IDENTITY: Matrix4 = Matrix4 {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// 按行给出 16 个元素
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        n00: f32, n01: f32, n02: f32, n03: f32,
        n10: f32, n11: f32, n12: f32, n13: f32,
        n20: f32, n21: f32, n22: f32, n23: f32,
        n30: f32, n31: f32, n32: f32, n33: f32,
    ) -> Self {
        Self {
            m: [
                [n00, n01, n02, n03],
                [n10, n11, n12, n13],
                [n20, n21, n22, n23],
                [n30, n31, n32, n33],
            ],
        }
    }

    pub const fn from_rows_array(m: [[f32; 4]; 4]) -> Self {
        Self { m }
    }

    /// 第 i 行的前三个元素
    pub fn row(&self, i: usize) -> Vector3 {
        let r = self.m[i];
        Vector3::new(r[0], r[1], r[2])
    }

    pub fn row4(&self, i: usize) -> Vector4 {
        let r = self.m[i];
        Vector4::new(r[0], r[1], r[2], r[3])
    }

    pub fn column4(&self, j: usize) -> Vector4 {
        Vector4::new(self.m[0][j], self.m[1][j], self.m[2][j], self.m[3][j])
    }

    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.m[i][j]
    }

    pub fn transpose(&self) -> Matrix4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.m[j][i];
            }
        }
        Matrix4 { m: out }
    }

    /// 前三列的上 3 个分量与第四行，求逆与行列式共用
    fn columns_3d(&self) -> (Vector3, Vector3, Vector3, Vector3) {
        let col = |j: usize| Vector3::new(self.m[0][j], self.m[1][j], self.m[2][j]);
        (col(0), col(1), col(2), col(3))
    }

    pub fn determinant(&self) -> f32 {
        let (a, b, c, d) = self.columns_3d();
        let [x, y, z, w] = self.m[3];

        let s = a.cross(&b);
        let t = c.cross(&d);
        let u = a * y - b * x;
        let v = c * w - d * z;
        s.dot(&v) + t.dot(&u)
    }

    /// 逆矩阵；奇异矩阵返回 None
    pub fn inverse(&self) -> Option<Matrix4> {
        let (a, b, c, d) = self.columns_3d();
        let [x, y, z, w] = self.m[3];

        let mut s = a.cross(&b);
        let mut t = c.cross(&d);
        let mut u = a * y - b * x;
        let mut v = c * w - d * z;

        let det = s.dot(&v) + t.dot(&u);
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        s *= inv_det;
        t *= inv_det;
        u *= inv_det;
        v *= inv_det;

        let r0 = b.cross(&v) + t * y;
        let r1 = v.cross(&a) - t * x;
        let r2 = d.cross(&u) + s * w;
        let r3 = u.cross(&c) - s * z;

        Some(Matrix4::new(
            r0.x, r0.y, r0.z, -b.dot(&t),
            r1.x, r1.y, r1.z, a.dot(&t),
            r2.x, r2.y, r2.z, -d.dot(&s),
            r3.x, r3.y, r3.z, c.dot(&s),
        ))
    }

    /// 变换点（w = 1，并做透视除法）
    pub fn transform_point(&self, p: Point3) -> Point3 {
        let r = *self * Vector4::new(p.x, p.y, p.z, 1.0);
        if r.w != 0.0 && r.w != 1.0 {
            Point3::new(r.x / r.w, r.y / r.w, r.z / r.w)
        } else {
            Point3::new(r.x, r.y, r.z)
        }
    }

    /// 变换方向向量（w = 0）
    pub fn transform_vector(&self, v: Vector3) -> Vector3 {
        (*self * v.extend(0.0)).truncate()
    }

    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new(
            1.0, 0.0, 0.0, x,
            0.0, 1.0, 0.0, y,
            0.0, 0.0, 1.0, z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new(
            x, 0.0, 0.0, 0.0,
            0.0, y, 0.0, 0.0,
            0.0, 0.0, z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn rotation_x(angle: f32) -> Matrix4 {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, c, -s, 0.0,
            0.0, s, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn rotation_y(angle: f32) -> Matrix4 {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn rotation_z(angle: f32) -> Matrix4 {
        let (s, c) = angle.sin_cos();
        Matrix4::new(
            c, -s, 0.0, 0.0,
            s, c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// 左手坐标系观察矩阵，等价于 XMMatrixLookAtLH
    pub fn look_at_lh(eye: Point3, at: Point3, up: Vector3) -> Matrix4 {
        let z = (at - eye).normalize();
        let x = up.cross(&z).normalize();
        let y = z.cross(&x);
        let e = Vector3::from(eye);

        Matrix4::new(
            x.x, x.y, x.z, -x.dot(&e),
            y.x, y.y, y.z, -y.dot(&e),
            z.x, z.y, z.z, -z.dot(&e),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// 左手坐标系透视投影，等价于 XMMatrixPerspectiveFovLH
    pub fn perspective_fov_lh(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let h = 1.0 / (fov_y * 0.5).tan();
        let w = h / aspect;
        let range = far / (far - near);

        Matrix4::new(
            w, 0.0, 0.0, 0.0,
            0.0, h, 0.0, 0.0,
            0.0, 0.0, range, -range * near,
            0.0, 0.0, 1.0, 0.0,
        )
    }

    /// DXR 实例描述使用的 3x4 行主序仿射变换
    pub fn to_3x4_row_major(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        for i in 0..3 {
            out[i * 4..i * 4 + 4].copy_from_slice(&self.m[i]);
        }
        out
    }
}

impl Index<(usize, usize)> for Matrix4 {
    type Output = f32;
    fn index(&self, (i, j): (usize, usize)) -> &f32 {
        &self.m[i][j]
    }
}

impl IndexMut<(usize, usize)> for Matrix4 {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f32 {
        &mut self.m[i][j]
    }
}

impl Mul for Matrix4 {
    type Output = Matrix4;
    fn mul(self, b: Matrix4) -> Matrix4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = self.row4(i).dot(&b.column4(j));
            }
        }
        Matrix4 { m: out }
    }
}

impl Mul<Vector4> for Matrix4 {
    type Output = Vector4;
    fn mul(self, v: Vector4) -> Vector4 {
        Vector4::new(
            self.row4(0).dot(&v),
            self.row4(1).dot(&v),
            self.row4(2).dot(&v),
            self.row4(3).dot(&v),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::constants::HALF_PI;
    use crate::math::utils::approx_eq;

    fn assert_matrix_eq(a: &Matrix4, b: &Matrix4, eps: f32) {
        for i in 0..4 {
            for j in 0..4 {
                assert!(
                    approx_eq(a.get(i, j), b.get(i, j), eps),
                    "mismatch at ({}, {}): {} vs {}",
                    i,
                    j,
                    a.get(i, j),
                    b.get(i, j)
                );
            }
        }
    }

    fn sample_matrix() -> Matrix4 {
        Matrix4::new(
            2.0, 0.0, 1.0, 3.0,
            1.0, 4.0, 0.0, -1.0,
            0.0, 1.0, 3.0, 2.0,
            1.0, 0.0, 0.0, 1.0,
        )
    }

    #[test]
    fn test_identity_and_rows() {
        let m = Matrix4::default();
        assert_eq!(m, Matrix4::IDENTITY);
        assert_eq!(m * m, m);

        let s = sample_matrix();
        assert_eq!(s.row(0), Vector3::new(2.0, 0.0, 1.0));
        assert_eq!(s.row4(0), Vector4::new(2.0, 0.0, 1.0, 3.0));
        assert_eq!(s.get(1, 3), -1.0);
        assert_eq!(s[(2, 2)], 3.0);
        assert_eq!(s.transpose().transpose(), s);
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = sample_matrix();
        let inv = m.inverse().expect("sample matrix is invertible");
        assert_matrix_eq(&(m * inv), &Matrix4::IDENTITY, 1e-5);
        assert_matrix_eq(&(inv * m), &Matrix4::IDENTITY, 1e-5);
    }

    #[test]
    fn test_inverse_matches_nalgebra() {
        let m = sample_matrix();
        let mut rows = [0.0f32; 16];
        for i in 0..4 {
            for j in 0..4 {
                rows[i * 4 + j] = m.get(i, j);
            }
        }
        let reference = nalgebra::Matrix4::from_row_slice(&rows)
            .try_inverse()
            .expect("nalgebra inverse");

        let inv = m.inverse().expect("invertible");
        for i in 0..4 {
            for j in 0..4 {
                assert!(approx_eq(inv.get(i, j), reference[(i, j)], 1e-5));
            }
        }
        assert!(approx_eq(m.determinant(), nalgebra::Matrix4::from_row_slice(&rows).determinant(), 1e-4));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let mut m = sample_matrix();
        for j in 0..4 {
            m[(3, j)] = m.get(0, j) * 2.0;
        }
        assert_eq!(m.determinant(), 0.0);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn test_affine_transforms() {
        let t = Matrix4::translation(1.0, 2.0, 3.0);
        assert_eq!(t.transform_point(Point3::ORIGIN), Point3::new(1.0, 2.0, 3.0));
        assert_eq!(t.transform_vector(Vector3::UP), Vector3::UP);

        let r = Matrix4::rotation_y(HALF_PI);
        let v = r.transform_vector(Vector3::new(0.0, 0.0, 1.0));
        assert!(approx_eq(v.x, 1.0, 1e-6));
        assert!(approx_eq(v.z, 0.0, 1e-6));

        let s = Matrix4::scaling(2.0, 3.0, 4.0);
        assert_eq!(s.transform_point(Point3::new(1.0, 1.0, 1.0)), Point3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_look_at_maps_eye_to_origin() {
        let eye = Point3::new(0.0, 0.0, -10.0);
        let view = Matrix4::look_at_lh(eye, Point3::ORIGIN, Vector3::UP);
        assert_eq!(view.transform_point(eye), Point3::ORIGIN);

        // 目标点位于 +z 方向
        let target = view.transform_point(Point3::ORIGIN);
        assert!(approx_eq(target.z, 10.0, 1e-5));
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Matrix4::perspective_fov_lh(HALF_PI, 16.0 / 9.0, 1.0, 100.0);
        let near = proj.transform_point(Point3::new(0.0, 0.0, 1.0));
        let far = proj.transform_point(Point3::new(0.0, 0.0, 100.0));
        assert!(approx_eq(near.z, 0.0, 1e-5));
        assert!(approx_eq(far.z, 1.0, 1e-5));
    }

    #[test]
    fn test_3x4_row_major() {
        let t = Matrix4::translation(5.0, 6.0, 7.0);
        let rows = t.to_3x4_row_major();
        assert_eq!(rows, [1.0, 0.0, 0.0, 5.0, 0.0, 1.0, 0.0, 6.0, 0.0, 0.0, 1.0, 7.0]);
    }
}

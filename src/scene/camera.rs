//! 相机
//!
//! 绕目标点沿 Y 轴旋转的观察相机，视图与投影都使用左手坐标系。

use crate::math::{constants::QUARTER_PI, Matrix4, Point3, Vector3};

/// 绕目标旋转的相机
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// 目标点
    at: Point3,
    /// 旋转角为 0 时眼睛相对目标的偏移
    offset: Vector3,
    /// 世界上向量
    up: Vector3,
    /// 当前绕 Y 轴的旋转角（弧度）
    yaw: f32,

    /// 垂直视场角（弧度）
    fov_y: f32,
    /// 近裁剪面距离
    near_z: f32,
    /// 远裁剪面距离
    far_z: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, -2.0), Point3::new(0.0, 0.0, 1.0), Vector3::UP)
    }
}

impl Camera {
    pub fn new(eye: Point3, at: Point3, up: Vector3) -> Self {
        Self {
            at,
            offset: eye - at,
            up,
            yaw: 0.0,
            fov_y: QUARTER_PI,
            near_z: 0.01,
            far_z: 125.0,
        }
    }

    /// 设置透视投影参数
    pub fn set_lens(&mut self, fov_y: f32, near_z: f32, far_z: f32) {
        self.fov_y = fov_y;
        self.near_z = near_z;
        self.far_z = far_z;
    }

    /// 绕目标点旋转 `radians`
    pub fn orbit(&mut self, radians: f32) {
        self.yaw = (self.yaw + radians) % std::f32::consts::TAU;
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// 当前眼睛位置
    pub fn eye(&self) -> Point3 {
        self.at + Matrix4::rotation_y(self.yaw).transform_vector(self.offset)
    }

    pub fn at(&self) -> Point3 {
        self.at
    }

    pub fn up(&self) -> Vector3 {
        self.up
    }

    pub fn view_matrix(&self) -> Matrix4 {
        Matrix4::look_at_lh(self.eye(), self.at, self.up)
    }

    pub fn proj_matrix(&self, aspect: f32) -> Matrix4 {
        Matrix4::perspective_fov_lh(self.fov_y, aspect, self.near_z, self.far_z)
    }

    /// 投影 * 视图
    pub fn view_proj(&self, aspect: f32) -> Matrix4 {
        self.proj_matrix(aspect) * self.view_matrix()
    }
}

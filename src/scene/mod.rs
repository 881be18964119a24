//! 场景模块
//!
//! 单个硬编码三角形、一台绕目标旋转的相机和一个点光源。`update` 推进动画，
//! 其余方法生成上传到 GPU 的常量。

mod buffers;
mod camera;
mod light;

pub use buffers::{ObjectConstantBuffer, RayGenConstantBuffer, SceneConstantBuffer, Vertex, ViewportRect};
pub use camera::Camera;
pub use light::PointLight;

use tracing::warn;

use crate::core::config::RaytracingConfig;
use crate::math::{constants::TAU, Color, Matrix4, Vector3, Vector4};

/// 三角形网格
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// 场景中唯一的三角形，朝向 -z
pub fn triangle_geometry() -> Geometry {
    let normal = Vector3::new(0.0, 0.0, -1.0);
    let depth = 1.0;
    let offset = 0.7;

    Geometry {
        vertices: vec![
            Vertex::new(Vector3::new(0.0, -offset, depth), normal),
            Vertex::new(Vector3::new(-offset, offset, depth), normal),
            Vertex::new(Vector3::new(offset, offset, depth), normal),
        ],
        indices: vec![0, 1, 2],
    }
}

/// 颜色通道的相位，三个通道错开 1/3 周期
const CHANNEL_PHASES: [f32; 3] = [0.0, TAU / 3.0, 2.0 * TAU / 3.0];

/// 颜色循环的角速度（弧度/秒）
const COLOUR_CYCLE_SPEED: f32 = 1.0;

/// 场景
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub light: PointLight,
    /// 物体颜色
    pub colour: Color,
    /// 相机绕一圈所需秒数，0 表示不旋转
    pub seconds_per_revolution: f32,
    elapsed_seconds: f32,
}

impl Default for Scene {
    fn default() -> Self {
        let mut scene = Self {
            camera: Camera::default(),
            light: PointLight::default(),
            colour: Color::WHITE,
            seconds_per_revolution: 24.0,
            elapsed_seconds: 0.0,
        };
        scene.update(0.0, 0.0);
        scene
    }
}

impl Scene {
    pub fn from_config(config: &RaytracingConfig) -> Self {
        let mut scene = Self::default();
        scene.seconds_per_revolution = config.seconds_per_revolution;
        scene
    }

    /// 推进动画
    pub fn update(&mut self, elapsed_seconds: f32, delta_seconds: f32) {
        self.elapsed_seconds = elapsed_seconds;

        if self.seconds_per_revolution > 0.0 {
            self.camera.orbit(delta_seconds * TAU / self.seconds_per_revolution);
        }

        self.colour = cycle_colour(elapsed_seconds);
        self.light.update(elapsed_seconds);
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed_seconds
    }

    /// 场景常量，`projection_to_world = inverse(P * V)`
    pub fn scene_constants(&self, aspect_ratio: f32) -> SceneConstantBuffer {
        let view_proj = self.camera.view_proj(aspect_ratio);
        let projection_to_world = view_proj.inverse().unwrap_or_else(|| {
            warn!(aspect_ratio, "View-projection matrix is singular, using identity");
            Matrix4::IDENTITY
        });

        let eye = self.camera.eye();
        SceneConstantBuffer {
            projection_to_world: projection_to_world.transpose(),
            camera_position: Vector4::new(eye.x, eye.y, eye.z, 1.0),
            light_position: self.light.position(),
            light_ambient_colour: self.light.ambient.to_vec4(),
            light_diffuse_colour: self.light.diffuse.to_vec4(),
        }
    }

    pub fn object_constants(&self) -> ObjectConstantBuffer {
        ObjectConstantBuffer {
            colour: self.colour.to_vec4(),
        }
    }
}

/// 每个通道为 0.5 + 0.5 * sin(ωt + φ)
fn cycle_colour(t: f32) -> Color {
    let [r, g, b] = CHANNEL_PHASES.map(|phase| 0.5 + 0.5 * (COLOUR_CYCLE_SPEED * t + phase).sin());
    Color::new(r, g, b, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{utils::approx_eq, Point3};

    #[test]
    fn test_triangle_geometry() {
        let geometry = triangle_geometry();
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.vertices[0].position, Vector3::new(0.0, -0.7, 1.0));
        assert_eq!(geometry.vertices[1].position, Vector3::new(-0.7, 0.7, 1.0));
        assert_eq!(geometry.vertices[2].position, Vector3::new(0.7, 0.7, 1.0));
        assert!(geometry.vertices.iter().all(|v| v.normal == Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_colour_cycle_phases() {
        let colour = cycle_colour(0.0);
        assert!(approx_eq(colour.r, 0.5, 1e-6));
        assert!(approx_eq(colour.g, 0.5 + 0.5 * (TAU / 3.0).sin(), 1e-6));
        assert!(approx_eq(colour.b, 0.5 + 0.5 * (2.0 * TAU / 3.0).sin(), 1e-6));
        assert_eq!(colour.a, 1.0);

        for step in 0..100 {
            let c = cycle_colour(step as f32 * 0.37);
            for channel in [c.r, c.g, c.b] {
                assert!((0.0..=1.0).contains(&channel));
            }
        }
    }

    #[test]
    fn test_update_rotates_camera() {
        let mut scene = Scene::default();
        scene.seconds_per_revolution = 4.0;
        scene.update(1.0, 1.0);
        assert!(approx_eq(scene.camera.yaw(), TAU / 4.0, 1e-5));
        assert_eq!(scene.elapsed_seconds(), 1.0);

        scene.seconds_per_revolution = 0.0;
        scene.update(2.0, 1.0);
        assert!(approx_eq(scene.camera.yaw(), TAU / 4.0, 1e-5));
    }

    #[test]
    fn test_projection_to_world_unprojects_centre() {
        let scene = Scene::default();
        let constants = scene.scene_constants(16.0 / 9.0);

        // 屏幕中心的点反投影后位于相机到目标的连线上
        let projection_to_world = constants.projection_to_world.transpose();
        let world = projection_to_world.transform_point(Point3::new(0.0, 0.0, 0.0));
        let eye = scene.camera.eye();
        let dir = (world - eye).normalize();
        let forward = (scene.camera.at() - eye).normalize();
        assert!(approx_eq(dir.dot(&forward), 1.0, 1e-4));

        assert_eq!(constants.camera_position, Vector4::new(eye.x, eye.y, eye.z, 1.0));
        assert_eq!(constants.light_position, scene.light.position());
    }

    #[test]
    fn test_object_constants_follow_colour() {
        let mut scene = Scene::default();
        scene.update(1.5, 0.0);
        assert_eq!(scene.object_constants().colour, scene.colour.to_vec4());
    }
}

//! 点光源
//!
//! 光源绕 Y 轴公转，高度随时间正弦起伏。

use crate::math::{Color, Vector4};

/// 点光源
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// 公转半径
    pub orbit_radius: f32,
    /// 基准高度
    pub base_height: f32,
    /// 高度起伏幅度
    pub bob_amplitude: f32,
    /// 公转角速度（弧度/秒）
    pub angular_speed: f32,

    pub ambient: Color,
    pub diffuse: Color,

    position: Vector4,
}

impl Default for PointLight {
    fn default() -> Self {
        let mut light = Self {
            orbit_radius: 3.0,
            base_height: 1.8,
            bob_amplitude: 0.5,
            angular_speed: 0.5,
            ambient: Color::new(0.5, 0.5, 0.5, 1.0),
            diffuse: Color::new(0.5, 0.0, 0.0, 1.0),
            position: Vector4::ZERO,
        };
        light.update(0.0);
        light
    }
}

impl PointLight {
    /// 按累计时间计算位置
    pub fn update(&mut self, elapsed_seconds: f32) {
        let angle = elapsed_seconds * self.angular_speed;
        // 起点在 -z 一侧，与相机同侧
        self.position = Vector4::new(
            self.orbit_radius * angle.sin(),
            self.base_height + self.bob_amplitude * elapsed_seconds.sin(),
            -self.orbit_radius * angle.cos(),
            0.0,
        );
    }

    pub fn position(&self) -> Vector4 {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::utils::approx_eq;

    #[test]
    fn test_initial_position() {
        let light = PointLight::default();
        let p = light.position();
        assert!(approx_eq(p.x, 0.0, 1e-6));
        assert!(approx_eq(p.y, 1.8, 1e-6));
        assert!(approx_eq(p.z, -3.0, 1e-6));
    }

    #[test]
    fn test_orbit_radius_and_height_bounds() {
        let mut light = PointLight::default();
        for step in 0..200 {
            light.update(step as f32 * 0.1);
            let p = light.position();
            let radius = (p.x * p.x + p.z * p.z).sqrt();
            assert!(approx_eq(radius, 3.0, 1e-4));
            assert!(p.y >= 1.3 - 1e-5 && p.y <= 2.3 + 1e-5);
        }
    }
}

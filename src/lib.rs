//! RTEngine - DirectX 12 光线追踪演示引擎
//!
//! 用最小的 DXR 管线渲染一个三角形：一个 BLAS、一个 TLAS、一套着色器表，
//! 光线追踪输出每帧拷贝到交换链后台缓冲。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理、帧计时）
//! - `math`: 手写的向量、点、法线、矩阵与射线
//! - `scene`: 相机、光源与常量缓冲数据
//! - `renderer`: 与平台无关的渲染布局，以及统一的 `Renderer`
//! - `gfx`: DX12 实现（仅 Windows）
//! - `app`: 窗口生命周期与每帧驱动
//!
//! # 使用示例
//!
//! ```no_run
//! use rt_engine::core::Config;
//! use rt_engine::scene::Scene;
//!
//! let config = Config::default();
//! let mut scene = Scene::from_config(&config.raytracing);
//! scene.update(0.5, 0.016);
//! ```

pub mod app;
pub mod core;
pub mod math;
pub mod renderer;
pub mod scene;

#[cfg(target_os = "windows")]
pub mod gfx;

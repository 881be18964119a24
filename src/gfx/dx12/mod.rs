//! DirectX 12 实现
//!
//! - `device_resources`：设备、交换链与帧同步
//! - `raytracing`：DXR 管线、加速结构与着色器表
//! - `shader`：DXC 着色器库编译
//! - `descriptor`：描述符堆
//! - `renderer`：把以上组合成每帧的渲染流程

pub mod descriptor;
pub mod device_resources;
pub mod raytracing;
pub mod renderer;
pub mod shader;
mod util;

pub use device_resources::{DeviceResources, FrameOutcome};
pub use raytracing::RaytracingResources;
pub use renderer::RaytracingRenderer;

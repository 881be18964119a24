//! 图形后端模块
//!
//! 目前只有 DirectX 12，仅在 Windows 上编译。

pub mod dx12;

pub use dx12::RaytracingRenderer;

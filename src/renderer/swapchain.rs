//! 交换链设置
//!
//! 与图形 API 无关的交换链参数：缓冲数量校验、输出尺寸、视口与裁剪矩形、
//! 呈现模式选择。DX12 层只负责把这些值翻译成 DXGI 结构体。

use serde::{Deserialize, Serialize};

use crate::core::error::{ConfigError, Result};
use crate::renderer::adapter::FeatureLevel;

/// 最大后台缓冲数量
pub const MAX_BACK_BUFFER_COUNT: u32 = 3;

/// 翻转模型交换链至少需要两个缓冲
pub const MIN_BACK_BUFFER_COUNT: u32 = 2;

/// `DXGI_SWAP_CHAIN_FLAG_ALLOW_TEARING`
pub const SWAP_CHAIN_FLAG_ALLOW_TEARING: u32 = 0x800;

/// 后台缓冲格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackBufferFormat {
    #[default]
    #[serde(rename = "b8g8r8a8_unorm")]
    B8G8R8A8Unorm,
    #[serde(rename = "r8g8b8a8_unorm")]
    R8G8B8A8Unorm,
    #[serde(rename = "r10g10b10a2_unorm")]
    R10G10B10A2Unorm,
    #[serde(rename = "r16g16b16a16_float")]
    R16G16B16A16Float,
}

impl BackBufferFormat {
    /// 对应的 `DXGI_FORMAT` 数值
    pub fn dxgi_value(self) -> i32 {
        match self {
            BackBufferFormat::B8G8R8A8Unorm => 87,
            BackBufferFormat::R8G8B8A8Unorm => 28,
            BackBufferFormat::R10G10B10A2Unorm => 24,
            BackBufferFormat::R16G16B16A16Float => 10,
        }
    }
}

/// 深度缓冲格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthFormat {
    #[default]
    #[serde(rename = "d32_float")]
    D32Float,
    #[serde(rename = "d24_unorm_s8_uint")]
    D24UnormS8Uint,
    #[serde(rename = "none")]
    None,
}

impl DepthFormat {
    /// 对应的 `DXGI_FORMAT` 数值，`None` 为 `DXGI_FORMAT_UNKNOWN`
    pub fn dxgi_value(self) -> i32 {
        match self {
            DepthFormat::D32Float => 40,
            DepthFormat::D24UnormS8Uint => 45,
            DepthFormat::None => 0,
        }
    }
}

/// 设备选项位标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceOptions(u32);

impl DeviceOptions {
    pub const NONE: DeviceOptions = DeviceOptions(0);
    pub const ALLOW_TEARING: DeviceOptions = DeviceOptions(0x1);
    /// 保留，没有 HDR 输出路径
    pub const ENABLE_HDR: DeviceOptions = DeviceOptions(0x2);

    pub fn contains(self, other: DeviceOptions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: DeviceOptions) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: DeviceOptions) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// 交换链与设备资源的创建参数
#[derive(Debug, Clone, PartialEq)]
pub struct SwapChainSettings {
    pub back_buffer_format: BackBufferFormat,
    pub depth_format: DepthFormat,
    pub back_buffer_count: u32,
    pub min_feature_level: FeatureLevel,
    pub options: DeviceOptions,
}

impl Default for SwapChainSettings {
    fn default() -> Self {
        Self {
            back_buffer_format: BackBufferFormat::B8G8R8A8Unorm,
            depth_format: DepthFormat::D32Float,
            back_buffer_count: MAX_BACK_BUFFER_COUNT,
            min_feature_level: FeatureLevel::Level11_0,
            options: DeviceOptions::NONE,
        }
    }
}

impl SwapChainSettings {
    /// 创建并校验缓冲数量
    pub fn new(
        back_buffer_format: BackBufferFormat,
        depth_format: DepthFormat,
        back_buffer_count: u32,
        min_feature_level: FeatureLevel,
        options: DeviceOptions,
    ) -> Result<Self> {
        check_back_buffer_count(back_buffer_count)?;
        Ok(Self {
            back_buffer_format,
            depth_format,
            back_buffer_count,
            min_feature_level,
            options,
        })
    }

    /// 从引擎配置构建
    pub fn from_config(config: &crate::core::Config) -> Result<Self> {
        let mut options = DeviceOptions::NONE;
        if config.graphics.allow_tearing {
            options.insert(DeviceOptions::ALLOW_TEARING);
        }
        Self::new(
            config.graphics.back_buffer_format,
            config.graphics.depth_format,
            config.graphics.back_buffer_count,
            config.graphics.min_feature_level,
            options,
        )
    }

    /// 交换链创建标志
    pub fn swap_chain_flags(&self) -> u32 {
        if self.options.contains(DeviceOptions::ALLOW_TEARING) {
            SWAP_CHAIN_FLAG_ALLOW_TEARING
        } else {
            0
        }
    }
}

/// 校验后台缓冲数量
pub fn check_back_buffer_count(count: u32) -> Result<()> {
    if count > MAX_BACK_BUFFER_COUNT {
        return Err(ConfigError::InvalidValue {
            field: "back_buffer_count".to_string(),
            reason: format!("back buffer count too large ({} > {})", count, MAX_BACK_BUFFER_COUNT),
        }
        .into());
    }
    if count < MIN_BACK_BUFFER_COUNT {
        return Err(ConfigError::InvalidValue {
            field: "back_buffer_count".to_string(),
            reason: format!("back buffer count too small ({} < {})", count, MIN_BACK_BUFFER_COUNT),
        }
        .into());
    }
    Ok(())
}

/// 输出尺寸，每一维至少为 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    /// 最小化窗口报告的 0 尺寸被钳制为 1
    pub fn from_window(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// 覆盖整个输出的视口
    pub fn viewport(&self) -> Viewport {
        Viewport {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width: self.width as f32,
            height: self.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// 覆盖整个输出的裁剪矩形
    pub fn scissor(&self) -> ScissorRect {
        ScissorRect {
            left: 0,
            top: 0,
            right: self.width as i32,
            bottom: self.height as i32,
        }
    }
}

/// 视口，字段与 `D3D12_VIEWPORT` 一一对应
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 裁剪矩形，字段与 `D3D12_RECT` 一一对应
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Present 调用参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentMode {
    pub sync_interval: u32,
    pub allow_tearing: bool,
}

impl PresentMode {
    /// 支持撕裂且未开启垂直同步时立即呈现，否则等待一个垂直同步间隔
    pub fn choose(tearing_supported: bool, vsync: bool) -> Self {
        if tearing_supported && !vsync {
            Self {
                sync_interval: 0,
                allow_tearing: true,
            }
        } else {
            Self {
                sync_interval: 1,
                allow_tearing: false,
            }
        }
    }
}

/// 后台缓冲的调试名称
pub fn render_target_name(index: u32) -> String {
    format!("Render target {}", index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_buffer_count_bounds() {
        assert!(check_back_buffer_count(2).is_ok());
        assert!(check_back_buffer_count(3).is_ok());

        let err = check_back_buffer_count(4).unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(check_back_buffer_count(1).is_err());
        assert!(check_back_buffer_count(0).is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = SwapChainSettings::default();
        assert_eq!(settings.back_buffer_format.dxgi_value(), 87);
        assert_eq!(settings.depth_format.dxgi_value(), 40);
        assert_eq!(settings.back_buffer_count, 3);
        assert_eq!(settings.swap_chain_flags(), 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = crate::core::Config::default();
        let settings = SwapChainSettings::from_config(&config).expect("valid");
        assert!(settings.options.contains(DeviceOptions::ALLOW_TEARING));
        assert_eq!(settings.swap_chain_flags(), SWAP_CHAIN_FLAG_ALLOW_TEARING);

        config.graphics.back_buffer_count = 5;
        assert!(SwapChainSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_device_options() {
        let mut options = DeviceOptions::NONE;
        options.insert(DeviceOptions::ALLOW_TEARING);
        options.insert(DeviceOptions::ENABLE_HDR);
        assert_eq!(options.bits(), 0x3);
        options.remove(DeviceOptions::ALLOW_TEARING);
        assert!(!options.contains(DeviceOptions::ALLOW_TEARING));
        assert!(options.contains(DeviceOptions::ENABLE_HDR));
    }

    #[test]
    fn test_output_size_clamped() {
        let size = OutputSize::from_window(0, 0);
        assert_eq!(size, OutputSize { width: 1, height: 1 });

        let size = OutputSize::from_window(1280, 720);
        let vp = size.viewport();
        assert_eq!(vp.width, 1280.0);
        assert_eq!(vp.height, 720.0);
        assert_eq!(vp.max_depth, 1.0);
        assert_eq!(size.scissor(), ScissorRect { left: 0, top: 0, right: 1280, bottom: 720 });
        assert!((size.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_present_mode() {
        assert_eq!(
            PresentMode::choose(true, false),
            PresentMode { sync_interval: 0, allow_tearing: true }
        );
        assert_eq!(
            PresentMode::choose(false, false),
            PresentMode { sync_interval: 1, allow_tearing: false }
        );
        assert_eq!(
            PresentMode::choose(true, true),
            PresentMode { sync_interval: 1, allow_tearing: false }
        );
    }

    #[test]
    fn test_render_target_name() {
        assert_eq!(render_target_name(0), "Render target 0");
        assert_eq!(render_target_name(2), "Render target 2");
    }
}

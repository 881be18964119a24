//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//! title = "D3D12 RTInterface Debug"
//!
//! [graphics]
//! back_buffer_count = 3
//! back_buffer_format = "b8g8r8a8_unorm"
//! min_feature_level = "11_0"
//! allow_tearing = true
//!
//! [raytracing]
//! enabled = true
//! shader_path = "shaders/raytracing.hlsl"
//! max_recursion_depth = 1
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result, RtError};
use crate::renderer::adapter::FeatureLevel;
use crate::renderer::pipeline::MAX_TRACE_RECURSION_DEPTH;
use crate::renderer::swapchain::{BackBufferFormat, DepthFormat, MAX_BACK_BUFFER_COUNT, MIN_BACK_BUFFER_COUNT};

/// 引擎配置
///
/// 包含了引擎运行所需的所有配置项。
/// 可以从配置文件加载，也可以通过代码构建。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 光线追踪配置
    #[serde(default)]
    pub raytracing: RaytracingConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,

    /// 是否在标题栏显示帧率
    #[serde(default = "default_show_frame_stats")]
    pub show_frame_stats: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 后台缓冲数量
    #[serde(default = "default_back_buffer_count")]
    pub back_buffer_count: u32,

    /// 后台缓冲格式
    #[serde(default)]
    pub back_buffer_format: BackBufferFormat,

    /// 深度缓冲格式
    #[serde(default)]
    pub depth_format: DepthFormat,

    /// 最低特性等级
    #[serde(default)]
    pub min_feature_level: FeatureLevel,

    /// 支持时允许撕裂（可变刷新率显示器）
    #[serde(default = "default_allow_tearing")]
    pub allow_tearing: bool,

    /// 垂直同步；开启后即使支持撕裂也按 1 个同步间隔呈现
    #[serde(default)]
    pub vsync: bool,

    /// 强制使用 WARP 软件适配器
    #[serde(default)]
    pub use_warp: bool,

    /// 启用 D3D12 调试层，默认跟随 debug 构建
    #[serde(default = "default_debug_layer")]
    pub debug_layer: bool,

    /// 未启用光线追踪时的清屏颜色
    #[serde(default = "default_clear_colour")]
    pub clear_colour: [f32; 4],
}

/// 光线追踪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaytracingConfig {
    /// 是否启用 DXR；关闭或硬件不支持时退化为清屏
    #[serde(default = "default_raytracing_enabled")]
    pub enabled: bool,

    /// HLSL 着色器库路径
    #[serde(default = "default_shader_path")]
    pub shader_path: String,

    /// 预编译的 DXIL 库；设置后跳过运行时编译
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precompiled_library: Option<String>,

    /// 最大递归深度
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: u32,

    /// 相机绕场景旋转一周的秒数，0 表示静止
    #[serde(default = "default_seconds_per_revolution")]
    pub seconds_per_revolution: f32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_title() -> String { "D3D12 RTInterface Debug".to_string() }
fn default_resizable() -> bool { true }
fn default_show_frame_stats() -> bool { true }
fn default_back_buffer_count() -> u32 { MAX_BACK_BUFFER_COUNT }
fn default_allow_tearing() -> bool { true }
fn default_debug_layer() -> bool { cfg!(debug_assertions) }
fn default_clear_colour() -> [f32; 4] { [0.0, 0.4, 0.4, 1.0] }
fn default_raytracing_enabled() -> bool { true }
fn default_shader_path() -> String { "shaders/raytracing.hlsl".to_string() }
fn default_max_recursion_depth() -> u32 { 1 }
fn default_seconds_per_revolution() -> f32 { 24.0 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "rt_engine.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
            show_frame_stats: default_show_frame_stats(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            back_buffer_count: default_back_buffer_count(),
            back_buffer_format: BackBufferFormat::default(),
            depth_format: DepthFormat::default(),
            min_feature_level: FeatureLevel::default(),
            allow_tearing: default_allow_tearing(),
            vsync: false,
            use_warp: false,
            debug_layer: default_debug_layer(),
            clear_colour: default_clear_colour(),
        }
    }
}

impl Default for RaytracingConfig {
    fn default() -> Self {
        Self {
            enabled: default_raytracing_enabled(),
            shader_path: default_shader_path(),
            precompiled_library: None,
            max_recursion_depth: default_max_recursion_depth(),
            seconds_per_revolution: default_seconds_per_revolution(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path_str.clone()).into(),
            _ => RtError::Io(e),
        })?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，文件不存在时使用默认配置
    ///
    /// 文件存在但无法读取或解析时返回错误，不会静默丢弃其中的设置。
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::from_file(path) {
            Err(RtError::Config(ConfigError::FileNotFound(_))) => Ok(Self::default()),
            other => other,
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--width <value>` / `--height <value>`：窗口尺寸
    /// - `--buffers <value>`：后台缓冲数量
    /// - `--warp`：强制使用 WARP 适配器
    /// - `--no-tearing`：禁止撕裂呈现
    /// - `--vsync`：开启垂直同步
    /// - `--no-raytracing`：只清屏，不派发光线
    /// - `--debug-layer`：启用 D3D12 调试层
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let has = |flag: &str| args.iter().any(|a| a == flag);
        let value_of = |flag: &str| -> Option<u32> {
            let idx = args.iter().position(|a| a == flag)?;
            args.get(idx + 1)?.parse().ok()
        };

        if let Some(width) = value_of("--width") {
            self.window.width = width;
        }
        if let Some(height) = value_of("--height") {
            self.window.height = height;
        }
        if let Some(count) = value_of("--buffers") {
            self.graphics.back_buffer_count = count;
        }

        if has("--warp") {
            self.graphics.use_warp = true;
        }
        if has("--no-tearing") {
            self.graphics.allow_tearing = false;
        }
        if has("--vsync") {
            self.graphics.vsync = true;
        }
        if has("--no-raytracing") {
            self.raytracing.enabled = false;
        }
        if has("--debug-layer") {
            self.graphics.debug_layer = true;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        // 验证窗口尺寸
        if self.window.width == 0 || self.window.height == 0 {
            return Err(invalid(
                "window.width/height",
                "Window dimensions must be greater than 0",
            ));
        }

        let count = self.graphics.back_buffer_count;
        if !(MIN_BACK_BUFFER_COUNT..=MAX_BACK_BUFFER_COUNT).contains(&count) {
            return Err(invalid(
                "graphics.back_buffer_count",
                &format!(
                    "Back buffer count must be between {} and {}, got {}",
                    MIN_BACK_BUFFER_COUNT, MAX_BACK_BUFFER_COUNT, count
                ),
            ));
        }

        let depth = self.raytracing.max_recursion_depth;
        if !(1..=MAX_TRACE_RECURSION_DEPTH).contains(&depth) {
            return Err(invalid(
                "raytracing.max_recursion_depth",
                &format!("Recursion depth must be between 1 and {}", MAX_TRACE_RECURSION_DEPTH),
            ));
        }

        if self.raytracing.enabled
            && self.raytracing.precompiled_library.is_none()
            && self.raytracing.shader_path.trim().is_empty()
        {
            return Err(invalid("raytracing.shader_path", "Shader path must not be empty"));
        }

        if self.raytracing.seconds_per_revolution < 0.0 {
            return Err(invalid(
                "raytracing.seconds_per_revolution",
                "Rotation period must not be negative",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> super::error::RtError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型。原生 API 返回的 HRESULT 在 gfx 层被转换为
//! `GraphicsError`，并带上失败调用的名称。
//!
//! # 设计原则
//!
//! - 为每种错误类型提供清晰的上下文信息
//! - 设备丢失不是致命错误，单独建模以便上层重建资源
//! - 易于模式匹配和错误处理

use std::fmt;

/// 引擎统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, RtError>;

/// RTEngine 的错误类型
#[derive(Debug)]
pub enum RtError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 设备创建失败
    DeviceCreation(String),

    /// 交换链错误
    SwapchainError(String),

    /// 着色器编译失败
    ShaderCompilation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),

    /// 当前平台或硬件不支持
    Unsupported(String),

    /// 设备被移除或重置，`reason` 为 HRESULT
    DeviceLost { reason: i32 },

    /// 调用顺序错误，例如在设置窗口之前创建交换链
    InvalidState(String),
}

impl RtError {
    /// 是否为设备丢失
    pub fn is_device_lost(&self) -> bool {
        matches!(self, RtError::Graphics(GraphicsError::DeviceLost { .. }))
    }
}

impl fmt::Display for RtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtError::Config(e) => write!(f, "Configuration error: {}", e),
            RtError::Graphics(e) => write!(f, "Graphics error: {}", e),
            RtError::Io(e) => write!(f, "IO error: {}", e),
            RtError::Log(msg) => write!(f, "Log error: {}", msg),
            RtError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            RtError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::SwapchainError(msg) => write!(f, "Swapchain error: {}", msg),
            GraphicsError::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
            GraphicsError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            GraphicsError::DeviceLost { reason } => {
                write!(f, "Device lost (reason 0x{:08X})", *reason as u32)
            }
            GraphicsError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for RtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RtError::Io(e) => Some(e),
            RtError::Config(e) => Some(e),
            RtError::Graphics(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for RtError {
    fn from(err: std::io::Error) -> Self {
        RtError::Io(err)
    }
}

impl From<ConfigError> for RtError {
    fn from(err: ConfigError) -> Self {
        RtError::Config(err)
    }
}

impl From<GraphicsError> for RtError {
    fn from(err: GraphicsError) -> Self {
        RtError::Graphics(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_lost_display() {
        let err: RtError = GraphicsError::DeviceLost { reason: 0x887A0005u32 as i32 }.into();
        assert!(err.is_device_lost());
        assert_eq!(err.to_string(), "Graphics error: Device lost (reason 0x887A0005)");
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let err: RtError = ConfigError::InvalidValue {
            field: "graphics.back_buffer_count".to_string(),
            reason: "too large".to_string(),
        }
        .into();
        assert!(!err.is_device_lost());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("graphics.back_buffer_count"));
    }
}

//! 核心功能模块
//!
//! 本模块提供了引擎的基础功能，包括日志系统、配置管理、错误处理和帧计时。
//! 这些模块独立于图形 API，在任何平台上都可以编译和测试。
//!
//! # 模块组织
//!
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载引擎设置
//! - `error`：错误处理，定义统一的错误类型
//! - `timer`：帧计时与帧率统计

pub mod config;
pub mod error;
pub mod log;
pub mod timer;

// 重新导出常用类型，方便使用
pub use config::{Config, LogLevel};
pub use error::{ConfigError, GraphicsError, Result, RtError};
pub use timer::{FrameStats, FrameTimer};

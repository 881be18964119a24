//! RTEngine - DirectX 12 光线追踪演示
//!
//! 打开一个窗口，构建最小的 DXR 管线（一个三角形的 BLAS/TLAS），
//! 每帧发射光线并把结果拷贝到交换链后台缓冲。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 强制 WARP 适配器并关闭光线追踪
//! cargo run -- --warp --no-raytracing
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  事件循环
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │     app     │  RtApplication：场景、计时、生命周期
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  renderer   │  统一渲染接口
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  gfx::dx12  │  设备资源 + DXR
//! └─────────────┘
//! ```

use anyhow::Context;
use rt_engine::app::{failure_context, RtApplication};
use rt_engine::core::{log, Config};
use tracing::{debug, error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

/// 应用程序入口点
///
/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）
/// 2. 应用命令行参数覆盖并验证
/// 3. 初始化日志系统
/// 4. 创建事件循环、窗口和渲染器
/// 5. 启动主循环
fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut config = Config::from_file_or_default("config.toml").context("Failed to load config.toml")?;
    config.apply_args(std::env::args());
    config.validate().context("Invalid configuration")?;

    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "RTEngine starting");
    info!(
        width = config.window.width,
        height = config.window.height,
        buffers = config.graphics.back_buffer_count,
        raytracing = config.raytracing.enabled,
        warp = config.graphics.use_warp,
        "Configuration"
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .with_resizable(config.window.resizable)
        .build(&event_loop)
        .context("Failed to create window")?;

    let mut app = RtApplication::new(config);
    app.on_init(&window).context("Failed to initialise renderer")?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut fatal: Option<anyhow::Error> = None;
    event_loop.run(|event, elwt| match event {
        Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down...");
                app.on_destroy();
                elwt.exit();
            }
            WindowEvent::Resized(size) => {
                let minimized = size.width == 0 || size.height == 0;
                debug!(width = size.width, height = size.height, minimized, "Window resized");
                if let Err(e) = app.on_size_changed(size.width, size.height, minimized) {
                    let context = failure_context("Resize", &e);
                    fatal = Some(anyhow::Error::new(e).context(context));
                    app.on_destroy();
                    elwt.exit();
                }
            }
            WindowEvent::Moved(position) => app.on_moved(position.x, position.y),
            WindowEvent::RedrawRequested => {
                app.on_update();
                if let Some(title) = app.take_window_title() {
                    window.set_title(&title);
                }
                if let Err(e) = app.on_render() {
                    let context = failure_context("Render", &e);
                    fatal = Some(anyhow::Error::new(e).context(context));
                    app.on_destroy();
                    elwt.exit();
                }
            }
            _ => (),
        },
        Event::AboutToWait => window.request_redraw(),
        _ => (),
    })?;

    match fatal {
        Some(e) => Err(e),
        None => {
            info!("RTEngine exited cleanly");
            Ok(())
        }
    }
}

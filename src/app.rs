//! 应用层
//!
//! `RtApplication` 持有场景、计时器和渲染器，响应窗口生命周期事件：
//! 初始化、每帧更新与渲染、尺寸变化、销毁。窗口本身由 `main` 中的事件循环管理。

use tracing::{debug, info};
use winit::window::Window;

use crate::core::error::{Result, RtError};
use crate::core::timer::window_title;
use crate::core::{Config, FrameStats, FrameTimer};
use crate::renderer::Renderer;
use crate::scene::Scene;

/// 窗口在屏幕上的矩形
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowBounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowBounds {
    pub fn from_position(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width as i32,
            bottom: y + height as i32,
        }
    }
}

pub struct RtApplication {
    width: u32,
    height: u32,
    aspect_ratio: f32,
    title: String,
    window_bounds: WindowBounds,
    minimized: bool,
    show_frame_stats: bool,

    scene: Scene,
    timer: FrameTimer,
    stats: FrameStats,
    pending_title: Option<String>,

    config: Config,
    renderer: Option<Renderer>,
}

impl RtApplication {
    pub fn new(config: Config) -> Self {
        let width = config.window.width;
        let height = config.window.height;

        Self {
            width,
            height,
            aspect_ratio: aspect_ratio(width, height),
            title: config.window.title.clone(),
            window_bounds: WindowBounds::from_position(0, 0, width, height),
            minimized: false,
            show_frame_stats: config.window.show_frame_stats,
            scene: Scene::from_config(&config.raytracing),
            timer: FrameTimer::new(),
            stats: FrameStats::new(),
            pending_title: None,
            config,
            renderer: None,
        }
    }

    /// 创建渲染器
    pub fn on_init(&mut self, window: &Window) -> Result<()> {
        let size = window.inner_size();
        self.set_size(size.width, size.height);

        let renderer = Renderer::new(window, &self.config)?;
        info!(
            adapter = renderer.adapter_description().unwrap_or("unknown"),
            raytracing = renderer.raytracing_active(),
            width = self.width,
            height = self.height,
            "Application initialised"
        );
        self.renderer = Some(renderer);
        Ok(())
    }

    /// 推进计时器与场景动画
    pub fn on_update(&mut self) {
        let delta = self.timer.tick();
        self.scene
            .update(self.timer.total_seconds() as f32, delta as f32);

        if let Some(rate) = self.stats.record() {
            debug!(fps = rate.fps, ms = rate.ms_per_frame, "Frame stats");
            if self.show_frame_stats {
                let adapter = self.renderer.as_ref().and_then(Renderer::adapter_description);
                self.pending_title = Some(window_title(&self.title, &rate, adapter));
            }
        }
    }

    /// 最小化或尚未初始化时跳过
    pub fn on_render(&mut self) -> Result<()> {
        if self.minimized {
            return Ok(());
        }
        match &mut self.renderer {
            Some(renderer) => renderer.render(&self.scene),
            None => Ok(()),
        }
    }

    pub fn on_size_changed(&mut self, width: u32, height: u32, minimized: bool) -> Result<()> {
        self.minimized = minimized;
        if minimized {
            debug!("Window minimised, rendering paused");
            return Ok(());
        }

        self.set_size(width, height);
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(width, height)?;
        }
        Ok(())
    }

    /// 窗口移动后更新屏幕矩形
    pub fn on_moved(&mut self, x: i32, y: i32) {
        self.window_bounds = WindowBounds::from_position(x, y, self.width, self.height);
    }

    /// 释放渲染器；释放前等待 GPU 完成
    pub fn on_destroy(&mut self) {
        if self.renderer.take().is_some() {
            info!(frames = self.timer.frame_count(), "Renderer released");
        }
    }

    /// 取出待更新的窗口标题
    pub fn take_window_title(&mut self) -> Option<String> {
        self.pending_title.take()
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.aspect_ratio = aspect_ratio(width, height);
        self.window_bounds = WindowBounds::from_position(self.window_bounds.left, self.window_bounds.top, width, height);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn window_bounds(&self) -> WindowBounds {
        self.window_bounds
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }
}

/// 事件循环中致命错误的上下文描述，无法恢复的设备丢失单独标出
pub fn failure_context(stage: &str, error: &RtError) -> String {
    if error.is_device_lost() {
        format!("{} failed: GPU device lost and could not be recovered", stage)
    } else {
        format!("{} failed", stage)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GraphicsError;

    fn app() -> RtApplication {
        let mut config = Config::default();
        config.window.width = 1280;
        config.window.height = 720;
        RtApplication::new(config)
    }

    #[test]
    fn test_initial_state() {
        let app = app();
        assert_eq!(app.width(), 1280);
        assert_eq!(app.height(), 720);
        assert!((app.aspect_ratio() - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!(app.window_bounds(), WindowBounds { left: 0, top: 0, right: 1280, bottom: 720 });
        assert!(!app.is_minimized());
    }

    #[test]
    fn test_size_changed_updates_aspect_ratio() {
        let mut app = app();
        app.on_size_changed(800, 800, false).unwrap();
        assert_eq!(app.width(), 800);
        assert!((app.aspect_ratio() - 1.0).abs() < 1e-6);
        assert_eq!(app.window_bounds().right, 800);
    }

    #[test]
    fn test_minimise_keeps_size_and_skips_render() {
        let mut app = app();
        app.on_size_changed(0, 0, true).unwrap();
        assert!(app.is_minimized());
        assert_eq!(app.width(), 1280);
        assert!(app.on_render().is_ok());

        app.on_size_changed(640, 480, false).unwrap();
        assert!(!app.is_minimized());
        assert_eq!(app.height(), 480);
    }

    #[test]
    fn test_moved_updates_bounds() {
        let mut app = app();
        app.on_moved(100, 50);
        assert_eq!(app.window_bounds(), WindowBounds { left: 100, top: 50, right: 1380, bottom: 770 });
    }

    #[test]
    fn test_failure_context_names_device_loss() {
        let lost: RtError = GraphicsError::DeviceLost { reason: 0x887A0005u32 as i32 }.into();
        assert_eq!(
            failure_context("Render", &lost),
            "Render failed: GPU device lost and could not be recovered"
        );

        let other: RtError = GraphicsError::CommandExecution("Signal failed".to_string()).into();
        assert_eq!(failure_context("Resize", &other), "Resize failed");
    }

    #[test]
    fn test_update_advances_scene() {
        let mut app = app();
        let before = app.scene().colour;
        std::thread::sleep(std::time::Duration::from_millis(20));
        app.on_update();
        assert!(app.scene().elapsed_seconds() > 0.0);
        assert_ne!(app.scene().colour, before);
        // 统计窗口未满一秒，不产生标题
        assert!(app.take_window_title().is_none());
        app.on_destroy();
    }
}

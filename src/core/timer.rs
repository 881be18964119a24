//! 帧计时与帧率统计

use std::time::{Duration, Instant};

/// 帧计时器
///
/// 每帧调用一次 `tick`，返回上一帧到现在的秒数。
#[derive(Debug)]
pub struct FrameTimer {
    start: Instant,
    last: Instant,
    total_seconds: f64,
    delta_seconds: f64,
    frame_count: u64,
}

impl FrameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            total_seconds: 0.0,
            delta_seconds: 0.0,
            frame_count: 0,
        }
    }

    /// 推进一帧
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f64 {
        self.delta_seconds = now.saturating_duration_since(self.last).as_secs_f64();
        self.total_seconds = now.saturating_duration_since(self.start).as_secs_f64();
        self.last = now;
        self.frame_count += 1;
        self.delta_seconds
    }

    /// 自创建以来的秒数
    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    pub fn delta_seconds(&self) -> f64 {
        self.delta_seconds
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 一个统计窗口内的帧率
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    pub fps: f64,
    pub ms_per_frame: f64,
}

/// 帧率统计，每秒产出一次结果
#[derive(Debug)]
pub struct FrameStats {
    window_start: Option<Instant>,
    frames: u32,
    interval: Duration,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            window_start: None,
            frames: 0,
            interval,
        }
    }

    /// 记录一帧；统计窗口结束时返回帧率
    pub fn record(&mut self) -> Option<FrameRate> {
        self.record_at(Instant::now())
    }

    fn record_at(&mut self, now: Instant) -> Option<FrameRate> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.interval {
            return None;
        }

        let seconds = elapsed.as_secs_f64();
        let fps = self.frames as f64 / seconds;
        self.frames = 0;
        self.window_start = Some(now);
        Some(FrameRate {
            fps,
            ms_per_frame: 1000.0 / fps,
        })
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// 标题栏文本："<title> - <fps> fps - <adapter>"
pub fn window_title(title: &str, rate: &FrameRate, adapter: Option<&str>) -> String {
    match adapter {
        Some(adapter) => format!("{} - {:.0} fps ({:.2} ms) - {}", title, rate.fps, rate.ms_per_frame, adapter),
        None => format!("{} - {:.0} fps ({:.2} ms)", title, rate.fps, rate.ms_per_frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_tick() {
        let mut timer = FrameTimer::new();
        let start = timer.start;
        let delta = timer.tick_at(start + Duration::from_millis(16));
        assert!((delta - 0.016).abs() < 1e-9);
        timer.tick_at(start + Duration::from_millis(48));
        assert!((timer.delta_seconds() - 0.032).abs() < 1e-9);
        assert!((timer.total_seconds() - 0.048).abs() < 1e-9);
        assert_eq!(timer.frame_count(), 2);
    }

    #[test]
    fn test_frame_stats_window() {
        let mut stats = FrameStats::new();
        let t0 = Instant::now();
        assert!(stats.record_at(t0).is_none());
        for i in 1..60 {
            assert!(stats.record_at(t0 + Duration::from_millis(i * 10)).is_none());
        }
        let rate = stats.record_at(t0 + Duration::from_secs(1)).expect("window elapsed");
        assert!((rate.fps - 61.0).abs() < 1e-9);
        assert!(stats.record_at(t0 + Duration::from_millis(1010)).is_none());
    }

    #[test]
    fn test_window_title() {
        let rate = FrameRate { fps: 60.0, ms_per_frame: 1000.0 / 60.0 };
        assert_eq!(
            window_title("D3D12 RTInterface Debug", &rate, Some("WARP")),
            "D3D12 RTInterface Debug - 60 fps (16.67 ms) - WARP"
        );
        assert_eq!(window_title("t", &rate, None), "t - 60 fps (16.67 ms)");
    }
}

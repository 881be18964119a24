//! GPU 同步机制模块
//!
//! 每个后台缓冲对应一个 Fence 值，CPU 在复用某个后台缓冲的命令分配器之前，
//! 必须等待 GPU 完成上一次使用该缓冲时提交的工作。
//!
//! # 状态机
//!
//! - `wait_for_gpu`：signal 当前缓冲的值并阻塞等待，然后递增该值
//! - `move_to_next_frame`：signal 当前值，切换到交换链给出的下一个缓冲，
//!   若该缓冲的工作未完成则等待，最后把它的值设为 `当前值 + 1`
//! - `reset_after_resize`：重建交换链后所有缓冲共享当前缓冲的值
//!
//! 真正的 Fence 操作通过 `GpuTimeline` trait 注入，DX12 层用
//! `ID3D12Fence` + 命令队列 + 事件实现，测试中使用模拟实现。

use crate::core::error::{GraphicsError, Result};
use crate::renderer::swapchain::check_back_buffer_count;

/// Fence 值
///
/// 用于CPU-GPU同步的单调递增值。
/// CPU可以等待GPU完成特定Fence值对应的工作。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 创建新的Fence值
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 递增Fence值
    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// GPU 时间线
///
/// 对一个 Fence 及其所属队列的抽象。
pub trait GpuTimeline {
    /// 在队列末尾 signal `value`
    fn signal(&self, value: FenceValue) -> Result<()>;

    /// GPU 已完成的值
    fn completed_value(&self) -> FenceValue;

    /// 阻塞直到 GPU 完成 `value`
    fn wait_until(&self, value: FenceValue) -> Result<()>;
}

/// 按后台缓冲跟踪 Fence 值的帧同步器
#[derive(Debug, Clone)]
pub struct FrameSync {
    fence_values: Vec<FenceValue>,
    back_buffer_index: usize,
}

impl FrameSync {
    /// 创建同步器，缓冲数量必须在允许范围内
    pub fn new(back_buffer_count: u32) -> Result<Self> {
        check_back_buffer_count(back_buffer_count)?;
        Ok(Self {
            fence_values: vec![FenceValue::default(); back_buffer_count as usize],
            back_buffer_index: 0,
        })
    }

    pub fn back_buffer_count(&self) -> usize {
        self.fence_values.len()
    }

    pub fn back_buffer_index(&self) -> usize {
        self.back_buffer_index
    }

    pub fn fence_value(&self, index: usize) -> FenceValue {
        self.fence_values[index]
    }

    pub fn current_fence_value(&self) -> FenceValue {
        self.fence_values[self.back_buffer_index]
    }

    /// 交换链创建后同步当前缓冲索引
    pub fn set_back_buffer_index(&mut self, index: usize) -> Result<()> {
        if index >= self.fence_values.len() {
            return Err(GraphicsError::InvalidState(format!(
                "back buffer index {} out of range ({} buffers)",
                index,
                self.fence_values.len()
            ))
            .into());
        }
        self.back_buffer_index = index;
        Ok(())
    }

    /// 创建 Fence 时使用的初始值；返回后当前缓冲的值加一
    pub fn initial_fence_value(&mut self) -> FenceValue {
        let value = self.fence_values[self.back_buffer_index];
        self.fence_values[self.back_buffer_index].increment();
        value
    }

    /// 等待所有已提交的 GPU 工作完成
    pub fn wait_for_gpu<T: GpuTimeline + ?Sized>(&mut self, timeline: &T) -> Result<()> {
        let value = self.fence_values[self.back_buffer_index];
        timeline.signal(value)?;
        timeline.wait_until(value)?;
        self.fence_values[self.back_buffer_index].increment();
        Ok(())
    }

    /// 切换到下一帧
    ///
    /// `next_index` 为交换链 Present 之后报告的当前后台缓冲索引。
    pub fn move_to_next_frame<T: GpuTimeline + ?Sized>(&mut self, timeline: &T, next_index: usize) -> Result<()> {
        let current = self.fence_values[self.back_buffer_index];
        timeline.signal(current)?;

        self.set_back_buffer_index(next_index)?;

        let pending = self.fence_values[self.back_buffer_index];
        if timeline.completed_value() < pending {
            timeline.wait_until(pending)?;
        }

        self.fence_values[self.back_buffer_index] = current.next();
        Ok(())
    }

    /// 交换链尺寸变化后，所有缓冲的值对齐到当前缓冲
    pub fn reset_after_resize(&mut self) {
        let value = self.fence_values[self.back_buffer_index];
        self.fence_values.iter_mut().for_each(|v| *v = value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// 模拟 GPU：`instant` 为 true 时 signal 立即完成，否则只有 wait 会推进
    struct MockTimeline {
        completed: Cell<u64>,
        signals: RefCell<Vec<u64>>,
        waits: RefCell<Vec<u64>>,
        instant: bool,
    }

    impl MockTimeline {
        fn new(instant: bool) -> Self {
            Self {
                completed: Cell::new(0),
                signals: RefCell::new(Vec::new()),
                waits: RefCell::new(Vec::new()),
                instant,
            }
        }
    }

    impl GpuTimeline for MockTimeline {
        fn signal(&self, value: FenceValue) -> Result<()> {
            self.signals.borrow_mut().push(value.value());
            if self.instant {
                self.completed.set(self.completed.get().max(value.value()));
            }
            Ok(())
        }

        fn completed_value(&self) -> FenceValue {
            FenceValue::new(self.completed.get())
        }

        fn wait_until(&self, value: FenceValue) -> Result<()> {
            self.waits.borrow_mut().push(value.value());
            self.completed.set(self.completed.get().max(value.value()));
            Ok(())
        }
    }

    #[test]
    fn test_fence_value() {
        let mut fence = FenceValue::new(0);
        assert_eq!(fence.value(), 0);

        fence.increment();
        assert_eq!(fence.value(), 1);

        let next = fence.next();
        assert_eq!(next.value(), 2);
        assert_eq!(fence.value(), 1); // 原值不变
        assert!(fence < next);
    }

    #[test]
    fn test_rejects_too_many_buffers() {
        assert!(FrameSync::new(4).is_err());
        assert!(FrameSync::new(3).is_ok());
    }

    #[test]
    fn test_initial_fence_value() {
        let mut sync = FrameSync::new(3).unwrap();
        assert_eq!(sync.initial_fence_value(), FenceValue::new(0));
        assert_eq!(sync.current_fence_value(), FenceValue::new(1));
        assert_eq!(sync.fence_value(1), FenceValue::new(0));
    }

    #[test]
    fn test_wait_for_gpu() {
        let timeline = MockTimeline::new(false);
        let mut sync = FrameSync::new(2).unwrap();
        sync.initial_fence_value();

        sync.wait_for_gpu(&timeline).unwrap();
        assert_eq!(*timeline.signals.borrow(), vec![1]);
        assert_eq!(*timeline.waits.borrow(), vec![1]);
        assert_eq!(sync.current_fence_value(), FenceValue::new(2));
    }

    #[test]
    fn test_move_to_next_frame_waits_only_when_pending() {
        let timeline = MockTimeline::new(false);
        let mut sync = FrameSync::new(3).unwrap();
        sync.initial_fence_value();

        // 帧 0 -> 1：缓冲 1 的值为 0，已经完成，不需要等待
        sync.move_to_next_frame(&timeline, 1).unwrap();
        assert_eq!(sync.back_buffer_index(), 1);
        assert_eq!(sync.fence_value(1), FenceValue::new(2));
        assert!(timeline.waits.borrow().is_empty());

        // 帧 1 -> 2
        sync.move_to_next_frame(&timeline, 2).unwrap();
        assert_eq!(sync.fence_value(2), FenceValue::new(3));
        assert!(timeline.waits.borrow().is_empty());

        // 帧 2 -> 0：缓冲 0 的值 1 已 signal 但 GPU 未完成，需要等待
        sync.move_to_next_frame(&timeline, 0).unwrap();
        assert_eq!(*timeline.waits.borrow(), vec![1]);
        assert_eq!(sync.fence_value(0), FenceValue::new(4));
        assert_eq!(*timeline.signals.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_move_to_next_frame_no_wait_when_gpu_caught_up() {
        let timeline = MockTimeline::new(true);
        let mut sync = FrameSync::new(2).unwrap();
        sync.initial_fence_value();

        for frame in 0..10usize {
            sync.move_to_next_frame(&timeline, (frame + 1) % 2).unwrap();
        }
        assert!(timeline.waits.borrow().is_empty());
        // 每帧 signal 的值严格递增
        let signals = timeline.signals.borrow();
        assert!(signals.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reset_after_resize() {
        let timeline = MockTimeline::new(true);
        let mut sync = FrameSync::new(3).unwrap();
        sync.initial_fence_value();
        sync.move_to_next_frame(&timeline, 1).unwrap();
        sync.move_to_next_frame(&timeline, 2).unwrap();

        sync.reset_after_resize();
        let value = sync.current_fence_value();
        for i in 0..3 {
            assert_eq!(sync.fence_value(i), value);
        }
    }

    #[test]
    fn test_invalid_next_index() {
        let timeline = MockTimeline::new(true);
        let mut sync = FrameSync::new(2).unwrap();
        assert!(sync.move_to_next_frame(&timeline, 5).is_err());
        assert!(sync.set_back_buffer_index(2).is_err());
    }
}

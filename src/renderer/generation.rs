//! 设备代数跟踪
//!
//! 光线追踪资源在首帧按需构建，设备重建（设备代数变化）后必须丢弃并重新构建。
//! `BuiltGeneration` 记录资源所基于的设备代数，决定何时构建、何时可以复用。

/// 资源所基于的设备代数，`None` 表示尚未构建
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltGeneration {
    built: Option<u64>,
}

impl BuiltGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否需要（重新）构建
    ///
    /// `enabled` 为 false 时走清屏路径，永远不构建。
    pub fn needs_build(&self, enabled: bool, device_generation: u64) -> bool {
        enabled && self.built != Some(device_generation)
    }

    /// 资源基于当前设备，可以直接使用（例如随窗口调整尺寸）
    pub fn is_current(&self, device_generation: u64) -> bool {
        self.built == Some(device_generation)
    }

    pub fn mark_built(&mut self, device_generation: u64) {
        self.built = Some(device_generation);
    }

    /// 资源已被丢弃
    pub fn invalidate(&mut self) {
        self.built = None;
    }

    pub fn built(&self) -> Option<u64> {
        self.built
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_builds() {
        let generation = BuiltGeneration::new();
        assert!(generation.needs_build(true, 1));
        assert!(!generation.is_current(1));
    }

    #[test]
    fn test_disabled_never_builds() {
        let generation = BuiltGeneration::new();
        assert!(!generation.needs_build(false, 1));
        assert!(!generation.needs_build(false, 7));
    }

    #[test]
    fn test_built_resources_are_reused() {
        let mut generation = BuiltGeneration::new();
        generation.mark_built(1);
        assert!(!generation.needs_build(true, 1));
        assert!(generation.is_current(1));
        assert_eq!(generation.built(), Some(1));
    }

    #[test]
    fn test_device_recreated_forces_rebuild() {
        let mut generation = BuiltGeneration::new();
        generation.mark_built(1);

        // 设备重建后代数递增，旧资源不能用于尺寸调整
        assert!(generation.needs_build(true, 2));
        assert!(!generation.is_current(2));

        generation.mark_built(2);
        assert!(!generation.needs_build(true, 2));
    }

    #[test]
    fn test_invalidate_after_device_lost() {
        let mut generation = BuiltGeneration::new();
        generation.mark_built(3);
        generation.invalidate();
        assert!(generation.needs_build(true, 3));
        assert!(!generation.is_current(3));
        assert_eq!(generation.built(), None);
    }
}

//! 资源状态转换规划
//!
//! 一帧内后台缓冲与光线追踪输出纹理需要的转换屏障在这里以数据的形式给出，
//! DX12 层把每个 `Transition` 翻译成 `D3D12_RESOURCE_BARRIER`。

/// 资源状态，对应 `D3D12_RESOURCE_STATES` 的子集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    Present,
    RenderTarget,
    CopySource,
    CopyDest,
    UnorderedAccess,
}

impl ResourceState {
    /// `D3D12_RESOURCE_STATES` 数值
    pub fn raw(self) -> i32 {
        match self {
            // COMMON 与 PRESENT 的数值都是 0
            ResourceState::Common | ResourceState::Present => 0,
            ResourceState::RenderTarget => 0x4,
            ResourceState::UnorderedAccess => 0x8,
            ResourceState::CopyDest => 0x400,
            ResourceState::CopySource => 0x800,
        }
    }
}

/// 屏障作用的资源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceSlot {
    /// 当前后台缓冲
    BackBuffer,
    /// 光线追踪输出纹理
    RaytracingOutput,
}

/// 一次状态转换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub resource: ResourceSlot,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Transition {
    pub const fn new(resource: ResourceSlot, before: ResourceState, after: ResourceState) -> Self {
        Self { resource, before, after }
    }
}

/// 录制开始时把后台缓冲转到 RenderTarget；已经是 RenderTarget 时不需要屏障
pub fn prepare_transitions(before: ResourceState) -> Option<Transition> {
    (before != ResourceState::RenderTarget)
        .then(|| Transition::new(ResourceSlot::BackBuffer, before, ResourceState::RenderTarget))
}

/// 呈现前把后台缓冲转到 Present；已经是 Present 时不需要屏障
pub fn present_transitions(before: ResourceState) -> Option<Transition> {
    (before != ResourceState::Present)
        .then(|| Transition::new(ResourceSlot::BackBuffer, before, ResourceState::Present))
}

/// 输出纹理拷贝到后台缓冲前后的屏障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutputPlan {
    /// CopyResource 之前
    pub before_copy: [Transition; 2],
    /// CopyResource 之后
    pub after_copy: [Transition; 2],
}

/// 拷贝光线追踪输出
///
/// `back_buffer_state` 为录制期间后台缓冲所处的状态，`final_state` 为拷贝完成后
/// 后台缓冲应回到的状态（通常是 Present，交给 `present` 时就不再需要额外屏障）。
pub fn copy_output_transitions(back_buffer_state: ResourceState, final_state: ResourceState) -> CopyOutputPlan {
    use ResourceSlot::*;
    use ResourceState::*;

    CopyOutputPlan {
        before_copy: [
            Transition::new(BackBuffer, back_buffer_state, CopyDest),
            Transition::new(RaytracingOutput, UnorderedAccess, CopySource),
        ],
        after_copy: [
            Transition::new(BackBuffer, CopyDest, final_state),
            Transition::new(RaytracingOutput, CopySource, UnorderedAccess),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_skips_redundant_barrier() {
        assert_eq!(
            prepare_transitions(ResourceState::Present),
            Some(Transition::new(ResourceSlot::BackBuffer, ResourceState::Present, ResourceState::RenderTarget))
        );
        assert_eq!(prepare_transitions(ResourceState::RenderTarget), None);
    }

    #[test]
    fn test_present_skips_redundant_barrier() {
        assert_eq!(
            present_transitions(ResourceState::RenderTarget),
            Some(Transition::new(ResourceSlot::BackBuffer, ResourceState::RenderTarget, ResourceState::Present))
        );
        assert_eq!(present_transitions(ResourceState::Present), None);
    }

    #[test]
    fn test_copy_output_plan_restores_states() {
        let plan = copy_output_transitions(ResourceState::RenderTarget, ResourceState::Present);

        // 拷贝前：后台缓冲可写，输出可读
        assert_eq!(plan.before_copy[0].after, ResourceState::CopyDest);
        assert_eq!(plan.before_copy[1].after, ResourceState::CopySource);

        // 拷贝后：输出回到 UAV，后台缓冲到达目标状态
        assert_eq!(plan.after_copy[0].after, ResourceState::Present);
        assert_eq!(plan.after_copy[1].after, ResourceState::UnorderedAccess);

        // 每个资源的前后状态首尾相接
        for (b, a) in plan.before_copy.iter().zip(plan.after_copy.iter()) {
            assert_eq!(b.resource, a.resource);
            assert_eq!(b.after, a.before);
        }
    }

    #[test]
    fn test_raw_states() {
        assert_eq!(ResourceState::Present.raw(), 0);
        assert_eq!(ResourceState::CopySource.raw(), 0x800);
        assert_eq!(ResourceState::UnorderedAccess.raw(), 0x8);
    }
}

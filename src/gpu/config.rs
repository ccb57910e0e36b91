//! GPU 模型配置

use super::KernelError;

/// 默认 warp 宽度
pub const DEFAULT_WARP_SIZE: u32 = 8;
/// 默认周期上限，超过后判定为死循环
pub const DEFAULT_MAX_CYCLES: u64 = 1_000_000;

/// 分歧后的重汇聚策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconvergencePolicy {
    /// 栈式重汇聚：到达挂起路径的 PC 时合并；活跃路径返回时恢复挂起路径
    #[default]
    Stack,
    /// 不重汇聚：挂起的 lane 永不恢复，warp 在首次返回时结束
    None,
}

/// GPU 模型配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuConfig {
    pub warp_size: u32,
    pub max_cycles: u64,
    pub reconvergence: ReconvergencePolicy,
    /// 分歧栈深度上限；`None` 表示不限
    pub max_divergence_depth: Option<usize>,
}

impl GpuConfig {
    pub fn new() -> Self {
        Self {
            warp_size: DEFAULT_WARP_SIZE,
            max_cycles: DEFAULT_MAX_CYCLES,
            reconvergence: ReconvergencePolicy::default(),
            max_divergence_depth: None,
        }
    }

    pub fn with_warp_size(mut self, warp_size: u32) -> Self {
        self.warp_size = warp_size;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn with_reconvergence(mut self, policy: ReconvergencePolicy) -> Self {
        self.reconvergence = policy;
        self
    }

    /// 限制分歧栈深度，超出时 kernel 以 `DivergenceOverflow` 失败
    pub fn with_max_divergence_depth(mut self, depth: usize) -> Self {
        self.max_divergence_depth = Some(depth);
        self
    }

    /// 检查配置合法性：lane 掩码为 32 位，warp 宽度必须在 1..=32
    pub fn validate(&self) -> Result<(), KernelError> {
        if !(1..=32).contains(&self.warp_size) {
            return Err(KernelError::InvalidWarpSize(self.warp_size));
        }
        Ok(())
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self::new()
    }
}

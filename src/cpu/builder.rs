//! 标量核配置器
//!
//! # 示例
//!
//! ```
//! use simt_golden::cpu::{CoreBuilder, TrapCauseMode};
//!
//! let core = CoreBuilder::new()
//!     .with_reset_pc(0x1000)
//!     .with_trap_vector(0x2000)
//!     .with_trap_cause_mode(TrapCauseMode::Precise)
//!     .build()
//!     .expect("aligned addresses");
//! assert_eq!(core.pc(), 0x1000);
//! ```

use std::sync::Arc;

use thiserror::Error;

use super::ScalarCore;
use super::trap::TrapCauseMode;
use crate::isa::DecoderRegistry;
use crate::memory::SparseMemory;

/// 默认复位 PC
pub const DEFAULT_RESET_PC: u32 = 0x0000_0000;
/// 默认 trap 向量
pub const DEFAULT_TRAP_VECTOR: u32 = 0x0000_0100;

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("reset pc 0x{0:08x} is not 4-byte aligned")]
    MisalignedResetPc(u32),
    #[error("trap vector 0x{0:08x} is not 4-byte aligned")]
    MisalignedTrapVector(u32),
}

/// 标量核构建器
pub struct CoreBuilder {
    reset_pc: u32,
    trap_vector: u32,
    trap_cause_mode: TrapCauseMode,
    memory: Option<SparseMemory>,
    decoder: Option<Arc<DecoderRegistry>>,
}

impl CoreBuilder {
    pub fn new() -> Self {
        Self {
            reset_pc: DEFAULT_RESET_PC,
            trap_vector: DEFAULT_TRAP_VECTOR,
            trap_cause_mode: TrapCauseMode::default(),
            memory: None,
            decoder: None,
        }
    }

    pub fn with_reset_pc(mut self, pc: u32) -> Self {
        self.reset_pc = pc;
        self
    }

    pub fn with_trap_vector(mut self, vector: u32) -> Self {
        self.trap_vector = vector;
        self
    }

    pub fn with_trap_cause_mode(mut self, mode: TrapCauseMode) -> Self {
        self.trap_cause_mode = mode;
        self
    }

    /// 使用预先装载好的内存
    pub fn with_memory(mut self, memory: SparseMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// 共享一个已构造的解码器注册表
    pub fn with_decoder(mut self, decoder: Arc<DecoderRegistry>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// 构建标量核
    ///
    /// 复位 PC 或 trap 向量未按 4 字节对齐时返回 `Err`
    pub fn build(self) -> Result<ScalarCore, BuildError> {
        if self.reset_pc % 4 != 0 {
            return Err(BuildError::MisalignedResetPc(self.reset_pc));
        }
        if self.trap_vector % 4 != 0 {
            return Err(BuildError::MisalignedTrapVector(self.trap_vector));
        }

        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(DecoderRegistry::scalar()));
        Ok(ScalarCore::with_config(
            self.reset_pc,
            self.trap_vector,
            self.trap_cause_mode,
            self.memory.unwrap_or_default(),
            decoder,
        ))
    }
}

impl Default for CoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let core = CoreBuilder::new().build().unwrap();
        assert_eq!(core.pc(), DEFAULT_RESET_PC);
        assert_eq!(core.trap_vector(), DEFAULT_TRAP_VECTOR);
        assert_eq!(core.trap_cause_mode(), TrapCauseMode::Unified);
    }

    #[test]
    fn test_rejects_misaligned() {
        assert_eq!(
            CoreBuilder::new().with_reset_pc(0x1002).build().err(),
            Some(BuildError::MisalignedResetPc(0x1002))
        );
        assert_eq!(
            CoreBuilder::new().with_trap_vector(0x101).build().err(),
            Some(BuildError::MisalignedTrapVector(0x101))
        );
    }

    #[test]
    fn test_with_memory() {
        let mut mem = SparseMemory::new();
        mem.write(0x0, 0x02A00093, 4).unwrap(); // addi x1, x0, 42
        let mut core = CoreBuilder::new().with_memory(mem).build().unwrap();
        core.step(None);
        assert_eq!(core.read_reg(1), 42);
    }
}

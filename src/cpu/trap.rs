//! Trap 原因与编码
//!
//! 标量核只产生四种同步异常：非法指令，以及取指/加载/存储地址未对齐。
//! trap 被记录在 `CommitRecord` 中，模型继续运行，不会向调用方返回错误。

use thiserror::Error;

use crate::memory::MemError;

/// Trap 原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum TrapCause {
    /// 指令地址未对齐 (code = 0)
    #[error("instruction address misaligned")]
    InstructionAddressMisaligned,
    /// 非法指令 (code = 2)
    #[error("illegal instruction")]
    IllegalInstruction,
    /// 加载地址未对齐 (code = 4)
    #[error("load address misaligned")]
    LoadAddressMisaligned,
    /// 存储地址未对齐 (code = 6)
    #[error("store address misaligned")]
    StoreAddressMisaligned,
}

impl TrapCause {
    /// RISC-V 特权规范中的异常代码（mcause 低位）
    pub fn code(&self) -> u32 {
        match self {
            TrapCause::InstructionAddressMisaligned => 0,
            TrapCause::IllegalInstruction => 2,
            TrapCause::LoadAddressMisaligned => 4,
            TrapCause::StoreAddressMisaligned => 6,
        }
    }
}

/// 内存访问方向，用于把 `MemError` 映射为对应的 trap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Fetch,
    Load,
    Store,
}

impl AccessKind {
    /// 访存失败对应的 trap 原因
    pub fn trap_for(self, err: MemError) -> TrapCause {
        match err {
            MemError::MisalignedAccess { .. } => match self {
                AccessKind::Fetch => TrapCause::InstructionAddressMisaligned,
                AccessKind::Load => TrapCause::LoadAddressMisaligned,
                AccessKind::Store => TrapCause::StoreAddressMisaligned,
            },
            // 指令只会发出 1/2/4 字节访问
            MemError::InvalidAccessSize { .. } => TrapCause::IllegalInstruction,
        }
    }
}

/// 记录在 `CommitRecord` 中的 cause 编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrapCauseMode {
    /// 所有 trap 都记为 2，与被测硬件的上报一致
    #[default]
    Unified,
    /// 使用 RISC-V 标准异常代码
    Precise,
}

impl TrapCauseMode {
    pub fn encode(self, cause: TrapCause) -> u32 {
        match self {
            TrapCauseMode::Unified => TrapCause::IllegalInstruction.code(),
            TrapCauseMode::Precise => cause.code(),
        }
    }
}

/// 最近一次 trap 的信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap {
    pub cause: TrapCause,
    /// 触发 trap 的指令地址
    pub pc: u32,
    /// 附加信息：非法指令为指令字，未对齐访问为访问地址
    pub tval: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::AccessSize;

    #[test]
    fn test_trap_cause_codes() {
        assert_eq!(TrapCause::InstructionAddressMisaligned.code(), 0);
        assert_eq!(TrapCause::IllegalInstruction.code(), 2);
        assert_eq!(TrapCause::LoadAddressMisaligned.code(), 4);
        assert_eq!(TrapCause::StoreAddressMisaligned.code(), 6);
    }

    #[test]
    fn test_cause_modes() {
        let cause = TrapCause::StoreAddressMisaligned;
        assert_eq!(TrapCauseMode::Unified.encode(cause), 2);
        assert_eq!(TrapCauseMode::Precise.encode(cause), 6);
        assert_eq!(TrapCauseMode::default(), TrapCauseMode::Unified);
    }

    #[test]
    fn test_mem_error_mapping() {
        let err = MemError::MisalignedAccess { addr: 0x1001, access: AccessSize::Word };
        assert_eq!(AccessKind::Fetch.trap_for(err), TrapCause::InstructionAddressMisaligned);
        assert_eq!(AccessKind::Load.trap_for(err), TrapCause::LoadAddressMisaligned);
        assert_eq!(AccessKind::Store.trap_for(err), TrapCause::StoreAddressMisaligned);
    }
}

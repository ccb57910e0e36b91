//! 提交记录
//!
//! 每次 `step()` 产出一条 `CommitRecord`，描述该指令可被外部观察到的全部效果，
//! 供验证环境与硬件提交逐条比对。

use std::fmt;

use crate::memory::AccessSize;

/// 访存方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccessKind {
    Read,
    Write,
}

/// 一次访存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemAccess {
    pub addr: u32,
    /// 读：扩展后写入 rd 的值；写：截断到访问宽度的存储值
    pub data: u32,
    pub size: AccessSize,
    pub kind: MemAccessKind,
}

impl MemAccess {
    pub fn is_write(&self) -> bool {
        self.kind == MemAccessKind::Write
    }
}

/// 一条指令的提交记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRecord {
    /// 执行前的 PC
    pub pc: u32,
    /// 指令字（停机或取指失败时为 0）
    pub insn: u32,
    /// 目的寄存器（包括 x0）
    pub rd: Option<u8>,
    /// 写回后的 rd 值，x0 恒为 0
    pub rd_value: Option<u32>,
    pub mem: Option<MemAccess>,
    pub trap: bool,
    pub trap_cause: Option<u32>,
    /// 下一次 `step()` 使用的 PC
    pub next_pc: u32,
}

impl CommitRecord {
    /// 顺序执行的空记录，`next_pc = pc + 4`
    pub fn new(pc: u32, insn: u32) -> Self {
        Self {
            pc,
            insn,
            rd: None,
            rd_value: None,
            mem: None,
            trap: false,
            trap_cause: None,
            next_pc: pc.wrapping_add(4),
        }
    }

    /// 停机状态下的无操作记录
    pub fn halted(pc: u32) -> Self {
        Self {
            next_pc: pc,
            ..Self::new(pc, 0)
        }
    }

    /// trap 记录：不写寄存器、不访存
    pub fn trapped(pc: u32, insn: u32, cause_code: u32, trap_vector: u32) -> Self {
        Self {
            trap: true,
            trap_cause: Some(cause_code),
            next_pc: trap_vector,
            ..Self::new(pc, insn)
        }
    }

    pub fn mem_addr(&self) -> Option<u32> {
        self.mem.map(|m| m.addr)
    }

    pub fn mem_write(&self) -> Option<bool> {
        self.mem.map(|m| m.is_write())
    }
}

impl fmt::Display for CommitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pc=0x{:08x} insn=0x{:08x}", self.pc, self.insn)?;
        if let (Some(rd), Some(value)) = (self.rd, self.rd_value) {
            write!(f, " x{}=0x{:08x}", rd, value)?;
        }
        if let Some(mem) = self.mem {
            let dir = if mem.is_write() { "W" } else { "R" };
            write!(f, " mem{}[0x{:08x}]=0x{:08x}", dir, mem.addr, mem.data)?;
        }
        if let Some(cause) = self.trap_cause {
            write!(f, " trap({})", cause)?;
        }
        write!(f, " -> 0x{:08x}", self.next_pc)
    }
}

/// 标量核的可观察状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreState {
    pub pc: u32,
    pub regs: [u32; 32],
    pub cycle_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halted_record() {
        let rec = CommitRecord::halted(0x40);
        assert_eq!(rec.pc, 0x40);
        assert_eq!(rec.next_pc, 0x40);
        assert_eq!(rec.insn, 0);
        assert!(!rec.trap);
    }

    #[test]
    fn test_display() {
        let mut rec = CommitRecord::new(0, 0x002081B3);
        rec.rd = Some(3);
        rec.rd_value = Some(30);
        assert_eq!(rec.to_string(), "pc=0x00000000 insn=0x002081b3 x3=0x0000001e -> 0x00000004");

        let trap = CommitRecord::trapped(8, 0, 2, 0x100);
        assert_eq!(trap.to_string(), "pc=0x00000008 insn=0x00000000 trap(2) -> 0x00000100");
    }
}

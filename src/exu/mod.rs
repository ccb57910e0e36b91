//! 执行单元
//!
//! 按指令集拆分的纯函数求值：给定已解码指令、当前 PC 与寄存器读取函数，
//! 计算出一条 `Outcome`。标量核与 warp 的每个 lane 各自把 `Outcome`
//! 落实到自己的寄存器文件与内存上，因此两者的指令语义完全一致。

pub mod rv32i;
pub mod simt;

use crate::isa::RvInstr;
use crate::memory::AccessSize;

/// 一条指令的架构效果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 写寄存器，PC 顺序递增
    Write { rd: u8, value: u32 },
    /// 读内存写入 rd，结果按 `signed` 做符号或零扩展
    Load { rd: u8, addr: u32, access: AccessSize, signed: bool },
    /// 写内存，`value` 已截断到访问宽度
    Store { addr: u32, value: u32, access: AccessSize },
    /// 无条件跳转并写链接寄存器
    Jump { rd: u8, link: u32, target: u32 },
    /// 条件分支
    Branch { taken: bool, target: u32 },
    /// 读特殊寄存器（需要 lane 上下文）
    SpecialRead { rd: u8, sreg: u8 },
    /// 屏障，无架构效果
    Sync,
    /// kernel 返回
    Return,
    /// 非法指令
    Illegal,
}

/// 求值一条指令
///
/// 依次尝试各执行单元，都不认领时视为非法指令。
pub fn evaluate<F>(instr: &RvInstr, pc: u32, read: F) -> Outcome
where
    F: Fn(u8) -> u32,
{
    if let Some(outcome) = rv32i::evaluate(instr, pc, &read) {
        return outcome;
    }
    if let Some(outcome) = simt::evaluate(instr, &read) {
        return outcome;
    }
    Outcome::Illegal
}

/// 将内存读出的原始值扩展到 32 位
#[inline]
pub fn extend_load(raw: u32, access: AccessSize, signed: bool) -> u32 {
    match (access, signed) {
        (AccessSize::Byte, true) => raw as u8 as i8 as i32 as u32,
        (AccessSize::Half, true) => raw as u16 as i16 as i32 as u32,
        _ => raw & access.mask(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_load() {
        assert_eq!(extend_load(0x80, AccessSize::Byte, true), 0xFFFF_FF80);
        assert_eq!(extend_load(0x80, AccessSize::Byte, false), 0x80);
        assert_eq!(extend_load(0x8000, AccessSize::Half, true), 0xFFFF_8000);
        assert_eq!(extend_load(0x7FFF, AccessSize::Half, true), 0x7FFF);
        assert_eq!(extend_load(0x8000_0000, AccessSize::Word, true), 0x8000_0000);
    }

    #[test]
    fn test_illegal_falls_through() {
        let outcome = evaluate(&RvInstr::Illegal { raw: 0 }, 0, |_| 0);
        assert_eq!(outcome, Outcome::Illegal);
    }
}

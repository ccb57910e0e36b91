//! mask/match 形式的指令定义与表驱动解码器
//!
//! 同一张表既驱动解码，也用于静态检查两条定义是否可能命中同一指令字。

use std::fmt;

use super::decoder::InstrDecoder;
use super::instr::{DecodedInstr, RvInstr};

/// 一条指令的编码模式：`raw & mask == match_val` 时由 `decode` 构造语义
#[derive(Clone)]
pub struct InstrDef {
    pub name: &'static str,
    pub mask: u32,
    pub match_val: u32,
    pub decode: fn(u32) -> RvInstr,
}

impl InstrDef {
    pub const fn new(
        name: &'static str,
        mask: u32,
        match_val: u32,
        decode: fn(u32) -> RvInstr,
    ) -> Self {
        Self { name, mask, match_val, decode }
    }

    #[inline]
    pub fn matches(&self, raw: u32) -> bool {
        raw & self.mask == self.match_val
    }

    #[inline]
    pub fn decode_instr(&self, raw: u32) -> DecodedInstr {
        let instr = (self.decode)(raw);
        DecodedInstr { raw, instr }
    }

    /// 两条定义在共同检查的位上取值一致，即存在同时命中两者的指令字
    pub fn conflicts_with(&self, other: &InstrDef) -> bool {
        let shared = self.mask & other.mask;
        (self.match_val ^ other.match_val) & shared == 0
    }
}

impl fmt::Debug for InstrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InstrDef({} mask=0x{:08X} match=0x{:08X})",
            self.name, self.mask, self.match_val
        )
    }
}

// ========== mask 与 match 构造 ==========

/// 只看 opcode（U/J-type 与 SIMT 的 VRET/VSYNC/VMOV）
pub const MASK_OPCODE: u32 = 0x0000_007F;
/// opcode + funct3（I/S/B-type）
pub const MASK_FUNCT3: u32 = 0x0000_707F;
/// opcode + funct3 + funct7；RV32 移位立即数的 imm[11:5] 也在这里检查
pub const MASK_FUNCT7: u32 = 0xFE00_707F;

#[inline]
pub const fn funct3_match(funct3: u32, opcode: u32) -> u32 {
    funct3 << 12 | opcode
}

#[inline]
pub const fn funct7_match(funct7: u32, funct3: u32, opcode: u32) -> u32 {
    funct7 << 25 | funct3_match(funct3, opcode)
}

// ========== 表驱动解码器 ==========

/// 按表顺序匹配，首个命中的定义生效
#[derive(Clone, Copy)]
pub struct TableDrivenDecoder {
    name: &'static str,
    instrs: &'static [InstrDef],
    /// 注册表据此分桶；`None` 表示挂到全部 opcode
    opcodes: Option<&'static [u32]>,
    allow_overlap: bool,
}

impl TableDrivenDecoder {
    pub const fn new(
        name: &'static str,
        instrs: &'static [InstrDef],
        opcodes: Option<&'static [u32]>,
        allow_overlap: bool,
    ) -> Self {
        Self { name, instrs, opcodes, allow_overlap }
    }

    pub fn instrs(&self) -> &'static [InstrDef] {
        self.instrs
    }

    /// 表内可能重叠的定义名称对
    pub fn conflicts(&self) -> Vec<(&'static str, &'static str)> {
        let instrs = self.instrs;
        instrs
            .iter()
            .enumerate()
            .flat_map(|(i, a)| {
                instrs[i + 1..]
                    .iter()
                    .filter(move |b| a.conflicts_with(b))
                    .map(move |b| (a.name, b.name))
            })
            .collect()
    }
}

impl InstrDecoder for TableDrivenDecoder {
    fn name(&self) -> &str {
        self.name
    }

    fn decode(&self, raw: u32) -> Option<DecodedInstr> {
        let def = self.instrs.iter().find(|def| def.matches(raw))?;
        Some(def.decode_instr(raw))
    }

    fn handled_opcodes(&self) -> Option<&[u32]> {
        self.opcodes
    }

    fn allow_opcode_overlap(&self) -> bool {
        self.allow_overlap
    }
}

//! RISC-V ISA 抽象与解码框架
//!
//! - `RvInstr`: 指令的语义表示
//! - `InstrDecoder`: 解码器 trait，允许插件式扩展
//! - `DecoderRegistry`: 按 opcode 分桶的解码器注册表
//! - `InstrDef`: 统一的指令定义，同时用于解码和冲突检测
//! - `encode`: 指令编码辅助函数

mod decoder;
pub mod encode;
mod fields;
mod instr;
mod instr_def;
mod rv32i;
pub mod simt;

pub use decoder::{DecoderRegistry, InstrDecoder, RegistryError};
pub use fields::*;
pub use instr::{DecodedInstr, RvInstr};
pub use instr_def::{InstrDef, TableDrivenDecoder};
pub use rv32i::{RV32I_DECODER, RV32I_INSTRS, RV32I_OPCODES};
pub use simt::{SIMT_DECODER, SIMT_INSTRS, SIMT_OPCODES};

/// 便捷函数：使用 RV32I 解码器解码指令，不认识的编码返回 `Illegal`
pub fn decode(raw: u32) -> DecodedInstr {
    RV32I_DECODER
        .decode(raw)
        .unwrap_or_else(|| DecodedInstr::illegal(raw))
}

#[cfg(test)]
mod tests;

//! SIMT 扩展指令解码器
//!
//! GPU warp 在 RV32I 之上额外识别四条指令：
//!
//! | 指令  | 编码                                  |
//! |-------|---------------------------------------|
//! | VRET  | opcode 1110011，其余位任意            |
//! | VSYNC | opcode 0001111，其余位任意            |
//! | VMOV  | opcode 1110111，rd 目标，rs1 选择 sreg |
//! | VMUL  | R-type，funct7 0000001，funct3 001    |

use crate::isa::fields::*;
use crate::isa::instr::RvInstr;
use crate::isa::instr_def::{InstrDef, MASK_FUNCT7, MASK_OPCODE, TableDrivenDecoder, funct7_match};

/// VMUL 的 funct7/funct3
pub const FUNCT7_VMUL: u32 = 0b0000001;
pub const FUNCT3_VMUL: u32 = 0b001;

/// 特殊寄存器编号（VMOV 的 rs1 字段）
pub const SREG_TID_X: u8 = 0;
pub const SREG_TID_Y: u8 = 1;
pub const SREG_TID_Z: u8 = 2;
pub const SREG_BID_X: u8 = 3;
pub const SREG_BID_Y: u8 = 4;
pub const SREG_BID_Z: u8 = 5;

/// SIMT 扩展指令定义表
pub static SIMT_INSTRS: &[InstrDef] = &[
    InstrDef::new("VRET", MASK_OPCODE, OP_VRET, |_| RvInstr::Vret),
    InstrDef::new("VSYNC", MASK_OPCODE, OP_VSYNC, |_| RvInstr::Vsync),
    InstrDef::new("VMOV", MASK_OPCODE, OP_VMOV, |raw| RvInstr::Vmov {
        rd: rd(raw),
        sreg: rs1(raw),
    }),
    InstrDef::new("VMUL", MASK_FUNCT7, funct7_match(FUNCT7_VMUL, FUNCT3_VMUL, OP_REG), |raw| RvInstr::Vmul {
        rd: rd(raw),
        rs1: rs1(raw),
        rs2: rs2(raw),
    }),
];

/// SIMT 扩展占用的 opcode
pub static SIMT_OPCODES: [u32; 4] = [OP_VRET, OP_VSYNC, OP_VMOV, OP_REG];

/// SIMT 解码器，与 RV32I 共享 OP_REG
pub static SIMT_DECODER: TableDrivenDecoder =
    TableDrivenDecoder::new("SIMT", SIMT_INSTRS, Some(&SIMT_OPCODES), true);

//! RV32I 基础指令集解码器
//!
//! 只覆盖用户态整数指令。FENCE、ECALL 等 MISC-MEM/SYSTEM 编码
//! 不在表内，标量核遇到它们按非法指令处理；
//! 这两个 opcode 在 GPU 侧由 SIMT 扩展表接管。

use crate::isa::fields::*;
use crate::isa::instr::RvInstr;
use crate::isa::instr_def::{
    InstrDef, MASK_FUNCT3, MASK_FUNCT7, MASK_OPCODE, TableDrivenDecoder, funct3_match, funct7_match,
};

/// R-type 字段 (rd, rs1, rs2)
#[inline]
fn r_ops(raw: u32) -> (u8, u8, u8) {
    (rd(raw), rs1(raw), rs2(raw))
}

/// I-type 字段 (rd, rs1, imm)
#[inline]
fn i_ops(raw: u32) -> (u8, u8, i32) {
    (rd(raw), rs1(raw), imm_i(raw))
}

/// B-type 字段 (rs1, rs2, offset)
#[inline]
fn b_ops(raw: u32) -> (u8, u8, i32) {
    (rs1(raw), rs2(raw), imm_b(raw))
}

/// S-type 字段 (rs1, rs2, offset)
#[inline]
fn s_ops(raw: u32) -> (u8, u8, i32) {
    (rs1(raw), rs2(raw), imm_s(raw))
}

// ========== RV32I 指令定义表 ==========

/// RV32I 指令定义表
pub static RV32I_INSTRS: &[InstrDef] = &[
    // ========== U-type / J-type ==========
    InstrDef::new("LUI", MASK_OPCODE, OP_LUI, |raw| RvInstr::Lui { rd: rd(raw), imm: imm_u(raw) }),
    InstrDef::new("AUIPC", MASK_OPCODE, OP_AUIPC, |raw| RvInstr::Auipc { rd: rd(raw), imm: imm_u(raw) }),
    InstrDef::new("JAL", MASK_OPCODE, OP_JAL, |raw| RvInstr::Jal { rd: rd(raw), offset: imm_j(raw) }),
    // JALR 要求 funct3 = 000
    InstrDef::new("JALR", MASK_FUNCT3, funct3_match(0b000, OP_JALR), |raw| {
        let (rd, rs1, offset) = i_ops(raw);
        RvInstr::Jalr { rd, rs1, offset }
    }),

    // ========== B-type（funct3 010/011 保留）==========
    InstrDef::new("BEQ", MASK_FUNCT3, funct3_match(0b000, OP_BRANCH), |raw| {
        let (rs1, rs2, offset) = b_ops(raw);
        RvInstr::Beq { rs1, rs2, offset }
    }),
    InstrDef::new("BNE", MASK_FUNCT3, funct3_match(0b001, OP_BRANCH), |raw| {
        let (rs1, rs2, offset) = b_ops(raw);
        RvInstr::Bne { rs1, rs2, offset }
    }),
    InstrDef::new("BLT", MASK_FUNCT3, funct3_match(0b100, OP_BRANCH), |raw| {
        let (rs1, rs2, offset) = b_ops(raw);
        RvInstr::Blt { rs1, rs2, offset }
    }),
    InstrDef::new("BGE", MASK_FUNCT3, funct3_match(0b101, OP_BRANCH), |raw| {
        let (rs1, rs2, offset) = b_ops(raw);
        RvInstr::Bge { rs1, rs2, offset }
    }),
    InstrDef::new("BLTU", MASK_FUNCT3, funct3_match(0b110, OP_BRANCH), |raw| {
        let (rs1, rs2, offset) = b_ops(raw);
        RvInstr::Bltu { rs1, rs2, offset }
    }),
    InstrDef::new("BGEU", MASK_FUNCT3, funct3_match(0b111, OP_BRANCH), |raw| {
        let (rs1, rs2, offset) = b_ops(raw);
        RvInstr::Bgeu { rs1, rs2, offset }
    }),

    // ========== Load ==========
    InstrDef::new("LB", MASK_FUNCT3, funct3_match(0b000, OP_LOAD), |raw| {
        let (rd, rs1, offset) = i_ops(raw);
        RvInstr::Lb { rd, rs1, offset }
    }),
    InstrDef::new("LH", MASK_FUNCT3, funct3_match(0b001, OP_LOAD), |raw| {
        let (rd, rs1, offset) = i_ops(raw);
        RvInstr::Lh { rd, rs1, offset }
    }),
    InstrDef::new("LW", MASK_FUNCT3, funct3_match(0b010, OP_LOAD), |raw| {
        let (rd, rs1, offset) = i_ops(raw);
        RvInstr::Lw { rd, rs1, offset }
    }),
    InstrDef::new("LBU", MASK_FUNCT3, funct3_match(0b100, OP_LOAD), |raw| {
        let (rd, rs1, offset) = i_ops(raw);
        RvInstr::Lbu { rd, rs1, offset }
    }),
    InstrDef::new("LHU", MASK_FUNCT3, funct3_match(0b101, OP_LOAD), |raw| {
        let (rd, rs1, offset) = i_ops(raw);
        RvInstr::Lhu { rd, rs1, offset }
    }),

    // ========== Store ==========
    InstrDef::new("SB", MASK_FUNCT3, funct3_match(0b000, OP_STORE), |raw| {
        let (rs1, rs2, offset) = s_ops(raw);
        RvInstr::Sb { rs1, rs2, offset }
    }),
    InstrDef::new("SH", MASK_FUNCT3, funct3_match(0b001, OP_STORE), |raw| {
        let (rs1, rs2, offset) = s_ops(raw);
        RvInstr::Sh { rs1, rs2, offset }
    }),
    InstrDef::new("SW", MASK_FUNCT3, funct3_match(0b010, OP_STORE), |raw| {
        let (rs1, rs2, offset) = s_ops(raw);
        RvInstr::Sw { rs1, rs2, offset }
    }),

    // ========== I-type ALU ==========
    InstrDef::new("ADDI", MASK_FUNCT3, funct3_match(0b000, OP_IMM), |raw| {
        let (rd, rs1, imm) = i_ops(raw);
        RvInstr::Addi { rd, rs1, imm }
    }),
    InstrDef::new("SLTI", MASK_FUNCT3, funct3_match(0b010, OP_IMM), |raw| {
        let (rd, rs1, imm) = i_ops(raw);
        RvInstr::Slti { rd, rs1, imm }
    }),
    InstrDef::new("SLTIU", MASK_FUNCT3, funct3_match(0b011, OP_IMM), |raw| {
        let (rd, rs1, imm) = i_ops(raw);
        RvInstr::Sltiu { rd, rs1, imm }
    }),
    InstrDef::new("XORI", MASK_FUNCT3, funct3_match(0b100, OP_IMM), |raw| {
        let (rd, rs1, imm) = i_ops(raw);
        RvInstr::Xori { rd, rs1, imm }
    }),
    InstrDef::new("ORI", MASK_FUNCT3, funct3_match(0b110, OP_IMM), |raw| {
        let (rd, rs1, imm) = i_ops(raw);
        RvInstr::Ori { rd, rs1, imm }
    }),
    InstrDef::new("ANDI", MASK_FUNCT3, funct3_match(0b111, OP_IMM), |raw| {
        let (rd, rs1, imm) = i_ops(raw);
        RvInstr::Andi { rd, rs1, imm }
    }),

    // ========== Shift immediate ==========
    // RV32 要求 imm[11:5] 严格为 0000000 / 0100000
    InstrDef::new("SLLI", MASK_FUNCT7, funct7_match(0b0000000, 0b001, OP_IMM), |raw| {
        RvInstr::Slli { rd: rd(raw), rs1: rs1(raw), shamt: shamt(raw) }
    }),
    InstrDef::new("SRLI", MASK_FUNCT7, funct7_match(0b0000000, 0b101, OP_IMM), |raw| {
        RvInstr::Srli { rd: rd(raw), rs1: rs1(raw), shamt: shamt(raw) }
    }),
    InstrDef::new("SRAI", MASK_FUNCT7, funct7_match(0b0100000, 0b101, OP_IMM), |raw| {
        RvInstr::Srai { rd: rd(raw), rs1: rs1(raw), shamt: shamt(raw) }
    }),

    // ========== R-type ==========
    InstrDef::new("ADD", MASK_FUNCT7, funct7_match(0b0000000, 0b000, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Add { rd, rs1, rs2 }
    }),
    InstrDef::new("SUB", MASK_FUNCT7, funct7_match(0b0100000, 0b000, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Sub { rd, rs1, rs2 }
    }),
    InstrDef::new("SLL", MASK_FUNCT7, funct7_match(0b0000000, 0b001, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Sll { rd, rs1, rs2 }
    }),
    InstrDef::new("SLT", MASK_FUNCT7, funct7_match(0b0000000, 0b010, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Slt { rd, rs1, rs2 }
    }),
    InstrDef::new("SLTU", MASK_FUNCT7, funct7_match(0b0000000, 0b011, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Sltu { rd, rs1, rs2 }
    }),
    InstrDef::new("XOR", MASK_FUNCT7, funct7_match(0b0000000, 0b100, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Xor { rd, rs1, rs2 }
    }),
    InstrDef::new("SRL", MASK_FUNCT7, funct7_match(0b0000000, 0b101, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Srl { rd, rs1, rs2 }
    }),
    InstrDef::new("SRA", MASK_FUNCT7, funct7_match(0b0100000, 0b101, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Sra { rd, rs1, rs2 }
    }),
    InstrDef::new("OR", MASK_FUNCT7, funct7_match(0b0000000, 0b110, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::Or { rd, rs1, rs2 }
    }),
    InstrDef::new("AND", MASK_FUNCT7, funct7_match(0b0000000, 0b111, OP_REG), |raw| {
        let (rd, rs1, rs2) = r_ops(raw);
        RvInstr::And { rd, rs1, rs2 }
    }),
];

/// RV32I 基础指令集的 opcode 列表
pub static RV32I_OPCODES: [u32; 9] = [
    OP_LUI, OP_AUIPC, OP_JAL, OP_JALR, OP_BRANCH, OP_LOAD, OP_STORE, OP_IMM, OP_REG,
];

// ========== 解码器实例 ==========

/// RV32I 解码器，允许 SIMT 扩展共享 OP_REG
pub static RV32I_DECODER: TableDrivenDecoder =
    TableDrivenDecoder::new("RV32I", RV32I_INSTRS, Some(&RV32I_OPCODES), true);

//! 指令编码器
//!
//! 生成 RV32I 与 SIMT 扩展的 32-bit 指令字，供测试、演示程序
//! 以及需要构造程序镜像的上层环境使用。立即数超出字段宽度的部分被截断。

use crate::isa::fields::*;
use crate::isa::simt::{FUNCT3_VMUL, FUNCT7_VMUL};

// ========== 按格式编码 ==========

pub fn encode_r(opcode: u32, rd: u8, funct3: u32, rs1: u8, rs2: u8, funct7: u32) -> u32 {
    ((funct7 & 0x7F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 & 0x7) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | (opcode & 0x7F)
}

pub fn encode_i(opcode: u32, rd: u8, funct3: u32, rs1: u8, imm: i32) -> u32 {
    (((imm as u32) & 0xFFF) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 & 0x7) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | (opcode & 0x7F)
}

pub fn encode_s(opcode: u32, funct3: u32, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    (((imm >> 5) & 0x7F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 & 0x7) << 12)
        | ((imm & 0x1F) << 7)
        | (opcode & 0x7F)
}

/// B-type：imm 为字节偏移，bit 0 被丢弃
pub fn encode_b(opcode: u32, funct3: u32, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | ((rs2 as u32 & 0x1F) << 20)
        | ((rs1 as u32 & 0x1F) << 15)
        | ((funct3 & 0x7) << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | (opcode & 0x7F)
}

/// U-type：imm 为高 20 位的值（不含低 12 位）
pub fn encode_u(opcode: u32, rd: u8, imm20: u32) -> u32 {
    ((imm20 & 0xFFFFF) << 12) | ((rd as u32 & 0x1F) << 7) | (opcode & 0x7F)
}

/// J-type：imm 为字节偏移，bit 0 被丢弃
pub fn encode_j(opcode: u32, rd: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | ((rd as u32 & 0x1F) << 7)
        | (opcode & 0x7F)
}

// ========== R-type ==========

pub fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b000, rs1, rs2, 0b0000000)
}

pub fn sub(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b000, rs1, rs2, 0b0100000)
}

pub fn sll(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b001, rs1, rs2, 0)
}

pub fn slt(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b010, rs1, rs2, 0)
}

pub fn sltu(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b011, rs1, rs2, 0)
}

pub fn xor(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b100, rs1, rs2, 0)
}

pub fn srl(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b101, rs1, rs2, 0)
}

pub fn sra(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b101, rs1, rs2, 0b0100000)
}

pub fn or(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b110, rs1, rs2, 0)
}

pub fn and(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, 0b111, rs1, rs2, 0)
}

// ========== I-type ALU ==========

pub fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    encode_i(OP_IMM, rd, 0b000, rs1, imm)
}

pub fn slti(rd: u8, rs1: u8, imm: i32) -> u32 {
    encode_i(OP_IMM, rd, 0b010, rs1, imm)
}

pub fn sltiu(rd: u8, rs1: u8, imm: i32) -> u32 {
    encode_i(OP_IMM, rd, 0b011, rs1, imm)
}

pub fn xori(rd: u8, rs1: u8, imm: i32) -> u32 {
    encode_i(OP_IMM, rd, 0b100, rs1, imm)
}

pub fn ori(rd: u8, rs1: u8, imm: i32) -> u32 {
    encode_i(OP_IMM, rd, 0b110, rs1, imm)
}

pub fn andi(rd: u8, rs1: u8, imm: i32) -> u32 {
    encode_i(OP_IMM, rd, 0b111, rs1, imm)
}

pub fn slli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    encode_i(OP_IMM, rd, 0b001, rs1, i32::from(shamt & 0x1F))
}

pub fn srli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    encode_i(OP_IMM, rd, 0b101, rs1, i32::from(shamt & 0x1F))
}

/// SRAI：imm[11:5] = 0100000
pub fn srai(rd: u8, rs1: u8, shamt: u8) -> u32 {
    encode_i(OP_IMM, rd, 0b101, rs1, 0x400 | i32::from(shamt & 0x1F))
}

/// 伪指令 NOP = addi x0, x0, 0
pub fn nop() -> u32 {
    addi(0, 0, 0)
}

// ========== U/J-type 与跳转 ==========

pub fn lui(rd: u8, imm20: u32) -> u32 {
    encode_u(OP_LUI, rd, imm20)
}

pub fn auipc(rd: u8, imm20: u32) -> u32 {
    encode_u(OP_AUIPC, rd, imm20)
}

pub fn jal(rd: u8, offset: i32) -> u32 {
    encode_j(OP_JAL, rd, offset)
}

pub fn jalr(rd: u8, rs1: u8, offset: i32) -> u32 {
    encode_i(OP_JALR, rd, 0b000, rs1, offset)
}

// ========== 分支 ==========

pub fn beq(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_b(OP_BRANCH, 0b000, rs1, rs2, offset)
}

pub fn bne(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_b(OP_BRANCH, 0b001, rs1, rs2, offset)
}

pub fn blt(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_b(OP_BRANCH, 0b100, rs1, rs2, offset)
}

pub fn bge(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_b(OP_BRANCH, 0b101, rs1, rs2, offset)
}

pub fn bltu(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_b(OP_BRANCH, 0b110, rs1, rs2, offset)
}

pub fn bgeu(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_b(OP_BRANCH, 0b111, rs1, rs2, offset)
}

// ========== 访存 ==========

pub fn lb(rd: u8, rs1: u8, offset: i32) -> u32 {
    encode_i(OP_LOAD, rd, 0b000, rs1, offset)
}

pub fn lh(rd: u8, rs1: u8, offset: i32) -> u32 {
    encode_i(OP_LOAD, rd, 0b001, rs1, offset)
}

pub fn lw(rd: u8, rs1: u8, offset: i32) -> u32 {
    encode_i(OP_LOAD, rd, 0b010, rs1, offset)
}

pub fn lbu(rd: u8, rs1: u8, offset: i32) -> u32 {
    encode_i(OP_LOAD, rd, 0b100, rs1, offset)
}

pub fn lhu(rd: u8, rs1: u8, offset: i32) -> u32 {
    encode_i(OP_LOAD, rd, 0b101, rs1, offset)
}

pub fn sb(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_s(OP_STORE, 0b000, rs1, rs2, offset)
}

pub fn sh(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_s(OP_STORE, 0b001, rs1, rs2, offset)
}

pub fn sw(rs1: u8, rs2: u8, offset: i32) -> u32 {
    encode_s(OP_STORE, 0b010, rs1, rs2, offset)
}

// ========== SIMT 扩展 ==========

pub fn vret() -> u32 {
    OP_VRET
}

pub fn vsync() -> u32 {
    OP_VSYNC
}

/// VMOV rd, sreg（sreg 编码在 rs1 字段）
pub fn vmov(rd: u8, sreg: u8) -> u32 {
    encode_r(OP_VMOV, rd, 0, sreg, 0, 0)
}

pub fn vmul(rd: u8, rs1: u8, rs2: u8) -> u32 {
    encode_r(OP_REG, rd, FUNCT3_VMUL, rs1, rs2, FUNCT7_VMUL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{DecoderRegistry, RvInstr, decode};

    #[test]
    fn test_known_encodings() {
        assert_eq!(add(3, 1, 2), 0x002081B3);
        assert_eq!(sub(3, 1, 2), 0x402081B3);
        assert_eq!(addi(1, 0, 42), 0x02A00093);
        assert_eq!(addi(2, 0, -1), 0xFFF00113);
        assert_eq!(lw(1, 2, 4), 0x00412083);
        assert_eq!(sw(2, 1, 8), 0x00112423);
        assert_eq!(beq(1, 2, 8), 0x00208463);
        assert_eq!(jal(1, 8), 0x008000EF);
        assert_eq!(lui(1, 0x12345), 0x123450B7);
        assert_eq!(nop(), 0x00000013);
    }

    #[test]
    fn test_negative_offsets_decode_back() {
        assert_eq!(
            decode(beq(1, 2, -4)).instr,
            RvInstr::Beq { rs1: 1, rs2: 2, offset: -4 }
        );
        assert_eq!(
            decode(jal(0, -2048)).instr,
            RvInstr::Jal { rd: 0, offset: -2048 }
        );
        assert_eq!(
            decode(sw(5, 6, -12)).instr,
            RvInstr::Sw { rs1: 5, rs2: 6, offset: -12 }
        );
    }

    #[test]
    fn test_srai_encoding() {
        let raw = srai(4, 5, 3);
        assert_eq!(funct7(raw), 0b0100000);
        assert_eq!(decode(raw).instr, RvInstr::Srai { rd: 4, rs1: 5, shamt: 3 });
    }

    #[test]
    fn test_simt_encodings() {
        let registry = DecoderRegistry::simt();
        assert_eq!(registry.decode(vret()).instr, RvInstr::Vret);
        assert_eq!(registry.decode(vsync()).instr, RvInstr::Vsync);
        assert_eq!(registry.decode(vmov(7, 4)).instr, RvInstr::Vmov { rd: 7, sreg: 4 });
        assert_eq!(
            registry.decode(vmul(3, 1, 2)).instr,
            RvInstr::Vmul { rd: 3, rs1: 1, rs2: 2 }
        );
        assert_eq!(vmul(2, 1, 1), (1 << 25) | (1 << 20) | (1 << 15) | (0b001 << 12) | (2 << 7) | 0x33);
    }
}

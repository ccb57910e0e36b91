//! 指令字段提取
//!
//! 标量核与 SIMT 扩展共用 RV32 的字段布局。所有提取都建立在
//! `bits()` 与 `sign_extend()` 两个原语上，立即数按各格式拼接后一次性符号扩展。

/// 取 `raw[hi:lo]`（含两端）
#[inline]
pub const fn bits(raw: u32, hi: u32, lo: u32) -> u32 {
    (raw >> lo) & (u32::MAX >> (31 - (hi - lo)))
}

/// 把低 `width` 位视为有符号数扩展到 32 位
#[inline]
pub const fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

#[inline]
pub fn opcode(raw: u32) -> u32 {
    bits(raw, 6, 0)
}

#[inline]
pub fn rd(raw: u32) -> u8 {
    bits(raw, 11, 7) as u8
}

#[inline]
pub fn funct3(raw: u32) -> u32 {
    bits(raw, 14, 12)
}

#[inline]
pub fn rs1(raw: u32) -> u8 {
    bits(raw, 19, 15) as u8
}

#[inline]
pub fn rs2(raw: u32) -> u8 {
    bits(raw, 24, 20) as u8
}

#[inline]
pub fn funct7(raw: u32) -> u32 {
    bits(raw, 31, 25)
}

/// 移位量，与 rs2 同位置
#[inline]
pub fn shamt(raw: u32) -> u8 {
    rs2(raw)
}

/// I-type：imm[11:0] = raw[31:20]
#[inline]
pub fn imm_i(raw: u32) -> i32 {
    sign_extend(bits(raw, 31, 20), 12)
}

/// S-type：imm[11:5] = raw[31:25]，imm[4:0] = raw[11:7]
#[inline]
pub fn imm_s(raw: u32) -> i32 {
    sign_extend(bits(raw, 31, 25) << 5 | bits(raw, 11, 7), 12)
}

/// B-type：imm[12|10:5] = raw[31:25]，imm[4:1|11] = raw[11:7]
#[inline]
pub fn imm_b(raw: u32) -> i32 {
    let imm = bits(raw, 31, 31) << 12
        | bits(raw, 7, 7) << 11
        | bits(raw, 30, 25) << 5
        | bits(raw, 11, 8) << 1;
    sign_extend(imm, 13)
}

/// U-type：低 12 位为 0 的 32 位立即数
#[inline]
pub fn imm_u(raw: u32) -> i32 {
    (raw & !0xFFF) as i32
}

/// J-type：imm[20|10:1|11|19:12] = raw[31:12]
#[inline]
pub fn imm_j(raw: u32) -> i32 {
    let imm = bits(raw, 31, 31) << 20
        | bits(raw, 19, 12) << 12
        | bits(raw, 20, 20) << 11
        | bits(raw, 30, 21) << 1;
    sign_extend(imm, 21)
}

// ========== RV32I opcode ==========
pub const OP_LUI: u32 = 0b0110111;
pub const OP_AUIPC: u32 = 0b0010111;
pub const OP_JAL: u32 = 0b1101111;
pub const OP_JALR: u32 = 0b1100111;
pub const OP_BRANCH: u32 = 0b1100011;
pub const OP_LOAD: u32 = 0b0000011;
pub const OP_STORE: u32 = 0b0100011;
pub const OP_MISC_MEM: u32 = 0b0001111;
pub const OP_IMM: u32 = 0b0010011;
pub const OP_REG: u32 = 0b0110011;
pub const OP_SYSTEM: u32 = 0b1110011;

// ========== SIMT 扩展 opcode ==========
/// VRET 复用 SYSTEM opcode
pub const OP_VRET: u32 = OP_SYSTEM;
/// VSYNC 复用 MISC-MEM opcode
pub const OP_VSYNC: u32 = OP_MISC_MEM;
pub const OP_VMOV: u32 = 0b1110111;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_and_sign_extend() {
        assert_eq!(bits(0xDEAD_BEEF, 31, 0), 0xDEAD_BEEF);
        assert_eq!(bits(0xDEAD_BEEF, 7, 4), 0xE);
        assert_eq!(bits(0x8000_0000, 31, 31), 1);
        assert_eq!(sign_extend(0xFFF, 12), -1);
        assert_eq!(sign_extend(0x7FF, 12), 2047);
        assert_eq!(sign_extend(0x1000, 13), -4096);
    }

    #[test]
    fn test_branch_offsets() {
        assert_eq!(imm_b(0x00208463), 8); // beq x1, x2, 8
        assert_eq!(imm_b(0xFE208EE3), -4); // beq x1, x2, -4
    }

    #[test]
    fn test_jump_offsets() {
        assert_eq!(imm_j(0x0040006F), 4); // jal x0, 4
        let raw = 0x0000006F; // jal x0, 0
        assert_eq!(imm_j(raw), 0);
        assert_eq!(rd(raw), 0);
    }

    #[test]
    fn test_store_offset() {
        assert_eq!(imm_s(0x00112423), 8); // sw x1, 8(x2)
        assert_eq!(imm_s(0xFE112E23), -4); // sw x1, -4(x2)
    }

    #[test]
    fn test_imm_i_sign_extension() {
        let raw = 0xFFF00113; // addi x2, x0, -1
        assert_eq!(imm_i(raw), -1);
        assert_eq!(rd(raw), 2);
        assert_eq!(rs1(raw), 0);
    }

    #[test]
    fn test_imm_u() {
        let raw = 0x123450B7; // lui x1, 0x12345
        assert_eq!(imm_u(raw) as u32, 0x1234_5000);
        assert_eq!(opcode(raw), OP_LUI);
    }

    #[test]
    fn test_vmov_sreg_field() {
        // vmov x5, sreg 3 (bid.x)
        let raw = (3 << 15) | (5 << 7) | OP_VMOV;
        assert_eq!(opcode(raw), OP_VMOV);
        assert_eq!(rs1(raw), 3);
        assert_eq!(rd(raw), 5);
    }
}

//! 解码后的指令表示
//!
//! 解码阶段一次性完成字段提取与符号扩展，执行阶段只需穷举匹配 `RvInstr`。
//! 变体按操作数形状分组，字段名与汇编语法一致。

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RvInstr {
    // ========== 寄存器-寄存器 ==========
    Add { rd: u8, rs1: u8, rs2: u8 },
    Sub { rd: u8, rs1: u8, rs2: u8 },
    And { rd: u8, rs1: u8, rs2: u8 },
    Or { rd: u8, rs1: u8, rs2: u8 },
    Xor { rd: u8, rs1: u8, rs2: u8 },
    /// 有符号比较
    Slt { rd: u8, rs1: u8, rs2: u8 },
    Sltu { rd: u8, rs1: u8, rs2: u8 },
    /// 移位量取 rs2 低 5 位，下同
    Sll { rd: u8, rs1: u8, rs2: u8 },
    Srl { rd: u8, rs1: u8, rs2: u8 },
    Sra { rd: u8, rs1: u8, rs2: u8 },

    // ========== 寄存器-立即数 ==========
    Addi { rd: u8, rs1: u8, imm: i32 },
    Andi { rd: u8, rs1: u8, imm: i32 },
    Ori { rd: u8, rs1: u8, imm: i32 },
    Xori { rd: u8, rs1: u8, imm: i32 },
    Slti { rd: u8, rs1: u8, imm: i32 },
    /// imm 先符号扩展，再按无符号比较
    Sltiu { rd: u8, rs1: u8, imm: i32 },
    Slli { rd: u8, rs1: u8, shamt: u8 },
    Srli { rd: u8, rs1: u8, shamt: u8 },
    Srai { rd: u8, rs1: u8, shamt: u8 },

    // ========== 访存 ==========
    Lb { rd: u8, rs1: u8, offset: i32 },
    Lh { rd: u8, rs1: u8, offset: i32 },
    Lw { rd: u8, rs1: u8, offset: i32 },
    Lbu { rd: u8, rs1: u8, offset: i32 },
    Lhu { rd: u8, rs1: u8, offset: i32 },
    Sb { rs1: u8, rs2: u8, offset: i32 },
    Sh { rs1: u8, rs2: u8, offset: i32 },
    Sw { rs1: u8, rs2: u8, offset: i32 },

    // ========== 上位立即数与跳转 ==========
    /// imm 低 12 位已是 0
    Lui { rd: u8, imm: i32 },
    Auipc { rd: u8, imm: i32 },
    Jal { rd: u8, offset: i32 },
    /// 目标地址最低位清零
    Jalr { rd: u8, rs1: u8, offset: i32 },
    Beq { rs1: u8, rs2: u8, offset: i32 },
    Bne { rs1: u8, rs2: u8, offset: i32 },
    Blt { rs1: u8, rs2: u8, offset: i32 },
    Bge { rs1: u8, rs2: u8, offset: i32 },
    Bltu { rs1: u8, rs2: u8, offset: i32 },
    Bgeu { rs1: u8, rs2: u8, offset: i32 },

    // ========== SIMT 扩展 ==========
    /// 结束当前活跃路径
    Vret,
    /// 读特殊寄存器：0-2 为 tid.xyz，3-5 为 bid.xyz
    Vmov { rd: u8, sreg: u8 },
    /// 锁步执行下不做任何事
    Vsync,
    /// 乘积低 32 位
    Vmul { rd: u8, rs1: u8, rs2: u8 },

    Illegal { raw: u32 },
}

impl fmt::Display for RvInstr {
    /// 输出汇编形式，寄存器写作 `xN`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RvInstr::*;
        match *self {
            Add { rd, rs1, rs2 } => write!(f, "add x{rd}, x{rs1}, x{rs2}"),
            Sub { rd, rs1, rs2 } => write!(f, "sub x{rd}, x{rs1}, x{rs2}"),
            And { rd, rs1, rs2 } => write!(f, "and x{rd}, x{rs1}, x{rs2}"),
            Or { rd, rs1, rs2 } => write!(f, "or x{rd}, x{rs1}, x{rs2}"),
            Xor { rd, rs1, rs2 } => write!(f, "xor x{rd}, x{rs1}, x{rs2}"),
            Slt { rd, rs1, rs2 } => write!(f, "slt x{rd}, x{rs1}, x{rs2}"),
            Sltu { rd, rs1, rs2 } => write!(f, "sltu x{rd}, x{rs1}, x{rs2}"),
            Sll { rd, rs1, rs2 } => write!(f, "sll x{rd}, x{rs1}, x{rs2}"),
            Srl { rd, rs1, rs2 } => write!(f, "srl x{rd}, x{rs1}, x{rs2}"),
            Sra { rd, rs1, rs2 } => write!(f, "sra x{rd}, x{rs1}, x{rs2}"),
            Vmul { rd, rs1, rs2 } => write!(f, "vmul x{rd}, x{rs1}, x{rs2}"),

            Addi { rd, rs1, imm } => write!(f, "addi x{rd}, x{rs1}, {imm}"),
            Andi { rd, rs1, imm } => write!(f, "andi x{rd}, x{rs1}, {imm}"),
            Ori { rd, rs1, imm } => write!(f, "ori x{rd}, x{rs1}, {imm}"),
            Xori { rd, rs1, imm } => write!(f, "xori x{rd}, x{rs1}, {imm}"),
            Slti { rd, rs1, imm } => write!(f, "slti x{rd}, x{rs1}, {imm}"),
            Sltiu { rd, rs1, imm } => write!(f, "sltiu x{rd}, x{rs1}, {imm}"),
            Slli { rd, rs1, shamt } => write!(f, "slli x{rd}, x{rs1}, {shamt}"),
            Srli { rd, rs1, shamt } => write!(f, "srli x{rd}, x{rs1}, {shamt}"),
            Srai { rd, rs1, shamt } => write!(f, "srai x{rd}, x{rs1}, {shamt}"),

            Lb { rd, rs1, offset } => write!(f, "lb x{rd}, {offset}(x{rs1})"),
            Lh { rd, rs1, offset } => write!(f, "lh x{rd}, {offset}(x{rs1})"),
            Lw { rd, rs1, offset } => write!(f, "lw x{rd}, {offset}(x{rs1})"),
            Lbu { rd, rs1, offset } => write!(f, "lbu x{rd}, {offset}(x{rs1})"),
            Lhu { rd, rs1, offset } => write!(f, "lhu x{rd}, {offset}(x{rs1})"),
            Sb { rs1, rs2, offset } => write!(f, "sb x{rs2}, {offset}(x{rs1})"),
            Sh { rs1, rs2, offset } => write!(f, "sh x{rs2}, {offset}(x{rs1})"),
            Sw { rs1, rs2, offset } => write!(f, "sw x{rs2}, {offset}(x{rs1})"),

            Lui { rd, imm } => write!(f, "lui x{rd}, {:#x}", (imm as u32) >> 12),
            Auipc { rd, imm } => write!(f, "auipc x{rd}, {:#x}", (imm as u32) >> 12),
            Jal { rd, offset } => write!(f, "jal x{rd}, {offset}"),
            Jalr { rd, rs1, offset } => write!(f, "jalr x{rd}, {offset}(x{rs1})"),
            Beq { rs1, rs2, offset } => write!(f, "beq x{rs1}, x{rs2}, {offset}"),
            Bne { rs1, rs2, offset } => write!(f, "bne x{rs1}, x{rs2}, {offset}"),
            Blt { rs1, rs2, offset } => write!(f, "blt x{rs1}, x{rs2}, {offset}"),
            Bge { rs1, rs2, offset } => write!(f, "bge x{rs1}, x{rs2}, {offset}"),
            Bltu { rs1, rs2, offset } => write!(f, "bltu x{rs1}, x{rs2}, {offset}"),
            Bgeu { rs1, rs2, offset } => write!(f, "bgeu x{rs1}, x{rs2}, {offset}"),

            Vret => f.write_str("vret"),
            Vsync => f.write_str("vsync"),
            Vmov { rd, sreg } => write!(f, "vmov x{rd}, sreg{sreg}"),
            Illegal { raw } => write!(f, "illegal 0x{raw:08x}"),
        }
    }
}

/// 原始编码与解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstr {
    pub raw: u32,
    pub instr: RvInstr,
}

impl DecodedInstr {
    pub fn illegal(raw: u32) -> Self {
        Self { raw, instr: RvInstr::Illegal { raw } }
    }

    pub fn is_illegal(&self) -> bool {
        matches!(self.instr, RvInstr::Illegal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disassembly() {
        let cases = [
            (RvInstr::Addi { rd: 1, rs1: 0, imm: -3 }, "addi x1, x0, -3"),
            (RvInstr::Sw { rs1: 2, rs2: 7, offset: 8 }, "sw x7, 8(x2)"),
            (RvInstr::Lui { rd: 10, imm: 0x1000 }, "lui x10, 0x1"),
            (RvInstr::Vmov { rd: 5, sreg: 3 }, "vmov x5, sreg3"),
            (RvInstr::Illegal { raw: 0xFFFF_FFFF }, "illegal 0xffffffff"),
        ];
        for (instr, text) in cases {
            assert_eq!(instr.to_string(), text);
        }
    }

    #[test]
    fn test_illegal_helper() {
        let d = DecodedInstr::illegal(0);
        assert!(d.is_illegal());
        assert_eq!(d.instr, RvInstr::Illegal { raw: 0 });
    }
}

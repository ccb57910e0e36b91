use super::Outcome;
use crate::isa::RvInstr;
use crate::memory::AccessSize;

/// 计算 `base + offset`（模 2^32）
#[inline]
fn offset_addr(base: u32, offset: i32) -> u32 {
    base.wrapping_add(offset as u32)
}

/// Evaluate RV32I-base instructions. Returns `None` if not handled.
pub fn evaluate<F>(instr: &RvInstr, pc: u32, read: &F) -> Option<Outcome>
where
    F: Fn(u8) -> u32,
{
    let write = |rd: u8, value: u32| Outcome::Write { rd, value };
    let branch = |taken: bool, offset: i32| Outcome::Branch {
        taken,
        target: offset_addr(pc, offset),
    };
    let load = |rd: u8, rs1: u8, offset: i32, access: AccessSize, signed: bool| Outcome::Load {
        rd,
        addr: offset_addr(read(rs1), offset),
        access,
        signed,
    };
    let store = |rs1: u8, rs2: u8, offset: i32, access: AccessSize| Outcome::Store {
        addr: offset_addr(read(rs1), offset),
        value: read(rs2) & access.mask(),
        access,
    };

    let outcome = match *instr {
        // ========== R-type 算术/逻辑指令 ==========
        RvInstr::Add { rd, rs1, rs2 } => write(rd, read(rs1).wrapping_add(read(rs2))),
        RvInstr::Sub { rd, rs1, rs2 } => write(rd, read(rs1).wrapping_sub(read(rs2))),
        RvInstr::And { rd, rs1, rs2 } => write(rd, read(rs1) & read(rs2)),
        RvInstr::Or { rd, rs1, rs2 } => write(rd, read(rs1) | read(rs2)),
        RvInstr::Xor { rd, rs1, rs2 } => write(rd, read(rs1) ^ read(rs2)),
        RvInstr::Slt { rd, rs1, rs2 } => {
            write(rd, u32::from((read(rs1) as i32) < (read(rs2) as i32)))
        }
        RvInstr::Sltu { rd, rs1, rs2 } => write(rd, u32::from(read(rs1) < read(rs2))),
        RvInstr::Sll { rd, rs1, rs2 } => write(rd, read(rs1) << (read(rs2) & 0x1F)),
        RvInstr::Srl { rd, rs1, rs2 } => write(rd, read(rs1) >> (read(rs2) & 0x1F)),
        RvInstr::Sra { rd, rs1, rs2 } => {
            write(rd, ((read(rs1) as i32) >> (read(rs2) & 0x1F)) as u32)
        }

        // ========== I-type 立即数算术/逻辑指令 ==========
        RvInstr::Addi { rd, rs1, imm } => write(rd, offset_addr(read(rs1), imm)),
        RvInstr::Andi { rd, rs1, imm } => write(rd, read(rs1) & imm as u32),
        RvInstr::Ori { rd, rs1, imm } => write(rd, read(rs1) | imm as u32),
        RvInstr::Xori { rd, rs1, imm } => write(rd, read(rs1) ^ imm as u32),
        RvInstr::Slti { rd, rs1, imm } => write(rd, u32::from((read(rs1) as i32) < imm)),
        // 立即数先符号扩展，再按无符号比较
        RvInstr::Sltiu { rd, rs1, imm } => write(rd, u32::from(read(rs1) < imm as u32)),
        RvInstr::Slli { rd, rs1, shamt } => write(rd, read(rs1) << shamt),
        RvInstr::Srli { rd, rs1, shamt } => write(rd, read(rs1) >> shamt),
        RvInstr::Srai { rd, rs1, shamt } => write(rd, ((read(rs1) as i32) >> shamt) as u32),

        // ========== Load / Store ==========
        RvInstr::Lb { rd, rs1, offset } => load(rd, rs1, offset, AccessSize::Byte, true),
        RvInstr::Lh { rd, rs1, offset } => load(rd, rs1, offset, AccessSize::Half, true),
        RvInstr::Lw { rd, rs1, offset } => load(rd, rs1, offset, AccessSize::Word, false),
        RvInstr::Lbu { rd, rs1, offset } => load(rd, rs1, offset, AccessSize::Byte, false),
        RvInstr::Lhu { rd, rs1, offset } => load(rd, rs1, offset, AccessSize::Half, false),
        RvInstr::Sb { rs1, rs2, offset } => store(rs1, rs2, offset, AccessSize::Byte),
        RvInstr::Sh { rs1, rs2, offset } => store(rs1, rs2, offset, AccessSize::Half),
        RvInstr::Sw { rs1, rs2, offset } => store(rs1, rs2, offset, AccessSize::Word),

        // ========== U-type 指令 ==========
        RvInstr::Lui { rd, imm } => write(rd, imm as u32),
        RvInstr::Auipc { rd, imm } => write(rd, offset_addr(pc, imm)),

        // ========== 控制流指令 ==========
        RvInstr::Jal { rd, offset } => Outcome::Jump {
            rd,
            link: pc.wrapping_add(4),
            target: offset_addr(pc, offset),
        },
        // rs1 在写 rd 之前读取
        RvInstr::Jalr { rd, rs1, offset } => Outcome::Jump {
            rd,
            link: pc.wrapping_add(4),
            target: offset_addr(read(rs1), offset) & !1,
        },
        RvInstr::Beq { rs1, rs2, offset } => branch(read(rs1) == read(rs2), offset),
        RvInstr::Bne { rs1, rs2, offset } => branch(read(rs1) != read(rs2), offset),
        RvInstr::Blt { rs1, rs2, offset } => {
            branch((read(rs1) as i32) < (read(rs2) as i32), offset)
        }
        RvInstr::Bge { rs1, rs2, offset } => {
            branch((read(rs1) as i32) >= (read(rs2) as i32), offset)
        }
        RvInstr::Bltu { rs1, rs2, offset } => branch(read(rs1) < read(rs2), offset),
        RvInstr::Bgeu { rs1, rs2, offset } => branch(read(rs1) >= read(rs2), offset),

        _ => return None,
    };
    Some(outcome)
}

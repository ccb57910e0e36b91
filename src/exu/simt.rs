//! SIMT 扩展指令求值

use super::Outcome;
use crate::isa::RvInstr;

/// 求值 SIMT 扩展指令，非本扩展指令返回 `None`
pub fn evaluate<F>(instr: &RvInstr, read: &F) -> Option<Outcome>
where
    F: Fn(u8) -> u32,
{
    let outcome = match *instr {
        RvInstr::Vret => Outcome::Return,
        RvInstr::Vsync => Outcome::Sync,
        RvInstr::Vmov { rd, sreg } => Outcome::SpecialRead { rd, sreg },
        RvInstr::Vmul { rd, rs1, rs2 } => Outcome::Write {
            rd,
            value: read(rs1).wrapping_mul(read(rs2)),
        },
        _ => return None,
    };
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vmul_low_bits() {
        let read = |r: u8| if r == 1 { 0x1234_5678 } else { 0x10 };
        let outcome = evaluate(&RvInstr::Vmul { rd: 3, rs1: 1, rs2: 2 }, &read);
        assert_eq!(outcome, Some(Outcome::Write { rd: 3, value: 0x2345_6780 }));
    }

    #[test]
    fn test_non_simt_ignored() {
        let outcome = evaluate(&RvInstr::Add { rd: 1, rs1: 2, rs2: 3 }, &|_| 0);
        assert_eq!(outcome, None);
    }
}

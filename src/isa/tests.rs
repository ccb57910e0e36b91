//! ISA 模块测试

use super::*;

/// 手工汇编的指令字与期望语义
const KNOWN_WORDS: &[(u32, RvInstr)] = &[
    (0x02A0_0093, RvInstr::Addi { rd: 1, rs1: 0, imm: 42 }),
    (0xFFF0_0113, RvInstr::Addi { rd: 2, rs1: 0, imm: -1 }),
    (0x0020_81B3, RvInstr::Add { rd: 3, rs1: 1, rs2: 2 }),
    (0x4020_81B3, RvInstr::Sub { rd: 3, rs1: 1, rs2: 2 }),
    (0x4030_D113, RvInstr::Srai { rd: 2, rs1: 1, shamt: 3 }),
    (0x0041_2083, RvInstr::Lw { rd: 1, rs1: 2, offset: 4 }),
    (0xFFC1_4283, RvInstr::Lbu { rd: 5, rs1: 2, offset: -4 }),
    (0x0011_2423, RvInstr::Sw { rs1: 2, rs2: 1, offset: 8 }),
    (0x0020_8463, RvInstr::Beq { rs1: 1, rs2: 2, offset: 8 }),
    (0xFE20_CEE3, RvInstr::Blt { rs1: 1, rs2: 2, offset: -4 }),
    (0x0000_00EF, RvInstr::Jal { rd: 1, offset: 0 }),
    (0x0000_8067, RvInstr::Jalr { rd: 0, rs1: 1, offset: 0 }),
    (0x1234_50B7, RvInstr::Lui { rd: 1, imm: 0x1234_5000 }),
];

#[test]
fn test_decode_known_words() {
    for &(raw, expected) in KNOWN_WORDS {
        let decoded = decode(raw);
        assert_eq!(decoded.raw, raw);
        assert_eq!(decoded.instr, expected, "raw 0x{raw:08x}");
    }
}

#[test]
fn test_encoders_agree_with_decoder() {
    assert_eq!(encode::srai(2, 1, 3), 0x4030_D113);
    assert_eq!(encode::lbu(5, 2, -4), 0xFFC1_4283);
    assert_eq!(encode::blt(1, 2, -4), 0xFE20_CEE3);
    assert_eq!(encode::jalr(0, 1, 0), 0x0000_8067);
    assert_eq!(encode::lui(1, 0x12345), 0x1234_50B7);
}

#[test]
fn test_zero_word_is_illegal() {
    assert_eq!(decode(0).instr, RvInstr::Illegal { raw: 0 });
}

#[test]
fn test_system_and_fence_illegal_on_scalar() {
    // ECALL / FENCE 不属于标量核支持的子集
    assert!(matches!(decode(0x00000073).instr, RvInstr::Illegal { raw: 0x00000073 }));
    assert!(matches!(decode(0x0000000F).instr, RvInstr::Illegal { .. }));
}

#[test]
fn test_reserved_function_fields_illegal() {
    // funct3 010 的分支是保留编码
    assert!(matches!(decode(0x0020A063).instr, RvInstr::Illegal { .. }));
    // 带 funct3 = 001 的 JALR
    assert!(matches!(decode(0x000090E7).instr, RvInstr::Illegal { .. }));
    // SLLI 的 imm[11:5] 非零
    assert!(matches!(decode(0x02109093).instr, RvInstr::Illegal { .. }));
    // ADD 的 funct7 = 0000001（M 扩展的 MUL）在标量核上非法
    assert!(matches!(decode(0x022081B3).instr, RvInstr::Illegal { .. }));
}

#[test]
fn test_decoder_registry() {
    let registry = DecoderRegistry::scalar();

    for &(raw, expected) in KNOWN_WORDS {
        assert_eq!(registry.decode(raw).instr, expected);
    }
    assert!(registry.decode(0).is_illegal());
    assert_eq!(registry.decoder_names(), vec!["RV32I"]);
}

#[test]
fn test_simt_registry() {
    let registry = DecoderRegistry::simt();
    assert_eq!(registry.decoder_names(), vec!["RV32I", "SIMT"]);

    // RV32I 指令照常解码
    assert!(matches!(registry.decode(0x002081B3).instr, RvInstr::Add { .. }));
    // 共享 OP_REG 的 VMUL：funct7 0000001，funct3 001
    assert_eq!(
        registry.decode(0x022091B3).instr,
        RvInstr::Vmul { rd: 3, rs1: 1, rs2: 2 }
    );
    // funct3 000 的同 funct7 编码不是 VMUL
    assert!(registry.decode(0x022081B3).is_illegal());
    // SYSTEM opcode 任意其余位都是 VRET
    assert_eq!(registry.decode(0x00000073).instr, RvInstr::Vret);
    assert_eq!(registry.decode(0x00100073).instr, RvInstr::Vret);
    assert_eq!(registry.decode(0x0000000F).instr, RvInstr::Vsync);
}

#[test]
fn test_decoder_registry_rejects_taken_opcode() {
    use std::sync::Arc;

    struct Exclusive;

    impl InstrDecoder for Exclusive {
        fn name(&self) -> &str {
            "Exclusive"
        }

        fn decode(&self, raw: u32) -> Option<DecodedInstr> {
            (opcode(raw) == 0b0001011).then_some(DecodedInstr { raw, instr: RvInstr::Vsync })
        }

        fn handled_opcodes(&self) -> Option<&[u32]> {
            static OPS: [u32; 1] = [0b0001011];
            Some(&OPS)
        }
    }

    let mut registry = DecoderRegistry::scalar();
    registry
        .register(Arc::new(Exclusive))
        .expect("first registration should succeed");
    assert_eq!(
        registry.register(Arc::new(Exclusive)),
        Err(RegistryError::OpcodeTaken {
            opcode: 0b0001011,
            decoder: "Exclusive".to_string()
        })
    );
    assert_eq!(registry.decoder_count(), 2);
    assert_eq!(registry.decode(0x0000000B).instr, RvInstr::Vsync);
    assert!(matches!(registry.decode(0x02A00093).instr, RvInstr::Addi { .. }));
}

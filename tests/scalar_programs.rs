mod common;

use common::{program, program_at};
use simt_golden::cpu::{
    CoreBuilder, MemAccessKind, ScalarCore, TrapCause, TrapCauseMode, DEFAULT_TRAP_VECTOR,
};
use simt_golden::isa::encode;
use simt_golden::scoreboard::{CommitScoreboard, MismatchKind, ObservedCommit};

#[test]
fn fibonacci_runs_to_trap() {
    // F(10) = 55 in x2
    let words = [
        encode::addi(1, 0, 0),  // a = 0
        encode::addi(2, 0, 1),  // b = 1
        encode::addi(3, 0, 1),  // i = 1
        encode::addi(4, 0, 10), // n = 10
        encode::bge(3, 4, 24),  // 16: if i >= n goto done
        encode::add(5, 1, 2),   // t = a + b
        encode::addi(1, 2, 0),  // a = b
        encode::addi(2, 5, 0),  // b = t
        encode::addi(3, 3, 1),  // i++
        encode::beq(0, 0, -20), // goto 16
        0x0000_0000,            // 40: done
    ];
    let mut core = ScalarCore::new();
    core.load_program(&program(&words)).unwrap();

    let commits = core.run(1000);
    let last = commits.last().unwrap();
    assert!(last.trap);
    assert_eq!(last.pc, 40);
    assert_eq!(core.read_reg(2), 55);
}

#[test]
fn memcpy_bytes_and_halves() {
    let mut core = ScalarCore::new();
    core.memory_mut().write_bytes(0x400, &[1, 2, 3, 4, 0xFE, 0xFF]);

    let words = [
        encode::addi(1, 0, 0x400),
        encode::addi(2, 0, 0x500),
        encode::lbu(3, 1, 0),
        encode::sb(2, 3, 0),
        encode::lh(4, 1, 4), // 0xFFFE → -2
        encode::sh(2, 4, 2),
        encode::lw(5, 1, 0),
        encode::sw(2, 5, 4),
    ];
    core.load_program(&program_at(0x1000, &words)).unwrap();
    core.set_pc(0x1000);

    let commits = core.run(words.len() as u64);
    assert!(commits.iter().all(|c| !c.trap));
    assert_eq!(core.read_reg(4), 0xFFFF_FFFE);
    assert_eq!(core.memory().read_bytes(0x500, 8), vec![1, 0, 0xFE, 0xFF, 1, 2, 3, 4]);

    let kinds: Vec<_> = commits
        .iter()
        .filter_map(|c| c.mem.map(|m| m.kind))
        .collect();
    assert_eq!(kinds.len(), 6);
    assert_eq!(kinds[0], MemAccessKind::Read);
    assert_eq!(kinds[1], MemAccessKind::Write);
}

#[test]
fn function_call_and_return() {
    // main: x10 = 7; call double; halt
    // double: x10 = x10 + x10; ret
    let words = [
        encode::addi(10, 0, 7), // 0
        encode::jal(1, 12),     // 4 → 16
        0x0000_0000,            // 8
        0x0000_0000,            // 12
        encode::add(10, 10, 10), // 16
        encode::jalr(0, 1, 0),  // 20 → 8
    ];
    let mut core = ScalarCore::new();
    core.load_program(&program(&words)).unwrap();

    let commits = core.run(100);
    assert_eq!(core.read_reg(10), 14);
    assert_eq!(core.read_reg(1), 8);
    assert_eq!(commits.last().unwrap().pc, 8);
    assert!(commits.last().unwrap().trap);
}

#[test]
fn precise_trap_codes() {
    let mut core = CoreBuilder::new()
        .with_trap_vector(0x800)
        .with_trap_cause_mode(TrapCauseMode::Precise)
        .build()
        .unwrap();

    let rec = core.step(Some(0xFFFF_FFFF));
    assert_eq!(rec.trap_cause, Some(2));
    assert_eq!(core.pc(), 0x800);

    core.set_pc(0x6);
    let rec = core.step(None);
    assert_eq!(rec.trap_cause, Some(0));
    assert_eq!(core.last_trap().unwrap().cause, TrapCause::InstructionAddressMisaligned);

    core.set_pc(0);
    core.write_reg(1, 0x3);
    let rec = core.step(Some(encode::sh(1, 0, 0)));
    assert_eq!(rec.trap_cause, Some(6));
}

#[test]
fn trap_handler_continues_execution() {
    // 非法指令跳到 trap 向量，处理程序写 x31 后继续
    let mut core = ScalarCore::new();
    core.load_program(&program(&[0x0000_0000])).unwrap();
    core.load_program(&program_at(
        DEFAULT_TRAP_VECTOR,
        &[encode::addi(31, 0, 1), encode::addi(31, 31, 1)],
    ))
    .unwrap();

    let first = core.step(None);
    assert!(first.trap);
    core.step(None);
    core.step(None);
    assert_eq!(core.read_reg(31), 2);
    assert_eq!(core.cycle_count(), 2);
}

#[test]
fn scoreboard_replays_model_commits() {
    let words = [
        encode::addi(1, 0, 0x100),
        encode::addi(2, 0, 9),
        encode::sw(1, 2, 0),
        encode::lw(3, 1, 0),
        encode::add(4, 3, 2),
    ];

    // 用一个独立的模型生成“硬件”提交
    let mut hw = ScalarCore::new();
    hw.load_program(&program(&words)).unwrap();
    let observed: Vec<ObservedCommit> = hw.run(words.len() as u64).iter().map(ObservedCommit::from).collect();

    let mut sb = CommitScoreboard::new(ScalarCore::new());
    for commit in &observed {
        sb.check_commit(commit).unwrap();
    }
    assert!(sb.report().passed());

    // 篡改一条写回值
    let mut sb = CommitScoreboard::new(ScalarCore::new());
    let mut bad = observed.clone();
    bad[4].rd_value = Some(17);
    let results: Vec<_> = bad.iter().map(|c| sb.check_commit(c)).collect();
    assert!(results[..4].iter().all(Result::is_ok));
    assert_eq!(results[4].as_ref().unwrap_err().kind, MismatchKind::RdValue);

    let report = sb.report();
    assert_eq!(report.matches, 4);
    assert_eq!(report.mismatches, 1);
}

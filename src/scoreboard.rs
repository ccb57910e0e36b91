//! 提交比对记分板
//!
//! 把硬件观察到的每条提交喂给标量核参考模型，逐字段比对：
//! PC、指令字、目的寄存器与写回值、访存地址与方向。
//! 硬件没有上报的字段不参与比对。

use std::fmt;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::cpu::{CommitRecord, ScalarCore};

/// 报告中保留的错误条数
pub const REPORT_ERROR_LIMIT: usize = 10;

/// 硬件侧观察到的一条提交
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObservedCommit {
    pub pc: u32,
    pub insn: u32,
    pub rd: Option<u8>,
    pub rd_value: Option<u32>,
    pub mem_addr: Option<u32>,
    pub mem_write: Option<bool>,
}

impl ObservedCommit {
    /// 只有 PC 与指令字的提交
    pub fn new(pc: u32, insn: u32) -> Self {
        Self {
            pc,
            insn,
            ..Self::default()
        }
    }

    pub fn with_rd(mut self, rd: u8, value: u32) -> Self {
        self.rd = Some(rd);
        self.rd_value = Some(value);
        self
    }

    pub fn with_mem(mut self, addr: u32, write: bool) -> Self {
        self.mem_addr = Some(addr);
        self.mem_write = Some(write);
        self
    }
}

impl From<&CommitRecord> for ObservedCommit {
    fn from(rec: &CommitRecord) -> Self {
        Self {
            pc: rec.pc,
            insn: rec.insn,
            rd: rec.rd,
            rd_value: rec.rd_value,
            mem_addr: rec.mem_addr(),
            mem_write: rec.mem_write(),
        }
    }
}

/// 不一致的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    Pc,
    Insn,
    Rd,
    RdValue,
    MemAddr,
    MemWrite,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MismatchKind::Pc => "PC",
            MismatchKind::Insn => "instruction",
            MismatchKind::Rd => "destination register",
            MismatchKind::RdValue => "register value",
            MismatchKind::MemAddr => "memory address",
            MismatchKind::MemWrite => "memory write flag",
        };
        f.write_str(name)
    }
}

/// 一次比对失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} mismatch at pc 0x{pc:08x}: hardware=0x{actual:08x}, model=0x{expected:08x}")]
pub struct Mismatch {
    pub kind: MismatchKind,
    /// 模型执行的指令 PC
    pub pc: u32,
    /// 模型给出的值
    pub expected: u32,
    /// 硬件上报的值
    pub actual: u32,
}

/// 比对汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardReport {
    pub matches: u64,
    pub mismatches: u64,
    /// 前 `REPORT_ERROR_LIMIT` 条失败
    pub first_errors: Vec<Mismatch>,
}

impl ScoreboardReport {
    pub fn total(&self) -> u64 {
        self.matches + self.mismatches
    }

    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

/// 提交记分板
pub struct CommitScoreboard {
    model: ScalarCore,
    matches: u64,
    mismatches: u64,
    errors: Vec<Mismatch>,
}

impl CommitScoreboard {
    pub fn new(model: ScalarCore) -> Self {
        Self {
            model,
            matches: 0,
            mismatches: 0,
            errors: Vec::new(),
        }
    }

    pub fn model(&self) -> &ScalarCore {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ScalarCore {
        &mut self.model
    }

    pub fn matches(&self) -> u64 {
        self.matches
    }

    pub fn mismatches(&self) -> u64 {
        self.mismatches
    }

    pub fn errors(&self) -> &[Mismatch] {
        &self.errors
    }

    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }

    /// 比对一条硬件提交
    ///
    /// 模型以硬件上报的指令字执行一步；第一处不一致即返回 `Err`。
    pub fn check_commit(&mut self, observed: &ObservedCommit) -> Result<CommitRecord, Mismatch> {
        let expected = self.model.step(Some(observed.insn));
        match compare(&expected, observed) {
            Ok(()) => {
                self.matches += 1;
                debug!(pc = format_args!("0x{:08x}", observed.pc), "commit matched");
                Ok(expected)
            }
            Err(mismatch) => {
                error!("{}", mismatch);
                self.mismatches += 1;
                self.errors.push(mismatch);
                Err(mismatch)
            }
        }
    }

    /// 生成汇总并写日志
    pub fn report(&self) -> ScoreboardReport {
        let report = ScoreboardReport {
            matches: self.matches,
            mismatches: self.mismatches,
            first_errors: self.errors.iter().take(REPORT_ERROR_LIMIT).copied().collect(),
        };

        info!(
            total = report.total(),
            matches = report.matches,
            mismatches = report.mismatches,
            "scoreboard report"
        );
        if report.passed() {
            info!("all commits matched");
        } else {
            error!("{} mismatches, first {}:", report.mismatches, report.first_errors.len());
            for (i, mismatch) in report.first_errors.iter().enumerate() {
                error!("  {}. {}", i + 1, mismatch);
            }
        }
        report
    }
}

/// 逐字段比对，模型值为 `expected`
fn compare(expected: &CommitRecord, observed: &ObservedCommit) -> Result<(), Mismatch> {
    let check = |kind: MismatchKind, model: u32, hw: u32| {
        if model == hw {
            Ok(())
        } else {
            Err(Mismatch { kind, pc: expected.pc, expected: model, actual: hw })
        }
    };

    check(MismatchKind::Pc, expected.pc, observed.pc)?;
    check(MismatchKind::Insn, expected.insn, observed.insn)?;

    // 只在硬件上报 rd 且模型写了非零 rd 时比对
    if let (Some(hw_rd), Some(model_rd)) = (observed.rd, expected.rd) {
        if model_rd != 0 {
            check(MismatchKind::Rd, u32::from(model_rd), u32::from(hw_rd))?;
            let model_value = expected.rd_value.unwrap_or(0);
            check(MismatchKind::RdValue, model_value, observed.rd_value.unwrap_or(0))?;
        }
    }

    if let (Some(hw_addr), Some(mem)) = (observed.mem_addr, expected.mem) {
        check(MismatchKind::MemAddr, mem.addr, hw_addr)?;
        if let Some(hw_write) = observed.mem_write {
            check(MismatchKind::MemWrite, u32::from(mem.is_write()), u32::from(hw_write))?;
        }
    }
    Ok(())
}

//! 标量核参考模型
//!
//! 本模块定义了单线程 RV32I 核心 `ScalarCore`：
//! 32 个通用寄存器（x0 恒为 0）、程序计数器、trap 分发，
//! 以及独占的一块 `SparseMemory`。
//!
//! 每次 `step()` 最多修改 PC、一个寄存器和一个内存位置，
//! 并返回描述该指令效果的 `CommitRecord`。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::exu::{self, Outcome};
use crate::isa::DecoderRegistry;
use crate::memory::{MemError, Memory, SparseMemory};

mod builder;
mod commit;
mod status;
pub mod trap;

pub use builder::{BuildError, CoreBuilder, DEFAULT_RESET_PC, DEFAULT_TRAP_VECTOR};
pub use commit::{CommitRecord, CoreState, MemAccess, MemAccessKind};
pub use status::{GenericRegFile, RegFile};
pub use trap::{AccessKind, Trap, TrapCause, TrapCauseMode};

/// 单线程 RV32I 核心
///
/// 设计约定：
/// - x0 永远为 0，写入时丢弃
/// - PC 为字节地址，自取指时要求 4 字节对齐
/// - trap 时 PC 跳到 trap 向量，不写寄存器、不访存、不计数
pub struct ScalarCore {
    regs: RegFile,
    pc: u32,
    reset_pc: u32,
    trap_vector: u32,
    trap_cause_mode: TrapCauseMode,
    halted: bool,
    /// 成功提交的指令数
    cycle_count: u64,
    last_trap: Option<Trap>,
    memory: SparseMemory,
    decoder: Arc<DecoderRegistry>,
}

impl ScalarCore {
    /// 使用默认配置创建核心（复位 PC 0，trap 向量 0x100）
    ///
    /// # 示例
    ///
    /// ```
    /// use simt_golden::cpu::ScalarCore;
    ///
    /// let mut core = ScalarCore::new();
    /// let rec = core.step(Some(0x02A00093)); // addi x1, x0, 42
    /// assert_eq!(rec.rd_value, Some(42));
    /// assert_eq!(core.pc(), 4);
    /// ```
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_RESET_PC,
            DEFAULT_TRAP_VECTOR,
            TrapCauseMode::default(),
            SparseMemory::new(),
            Arc::new(DecoderRegistry::scalar()),
        )
    }

    pub(crate) fn with_config(
        reset_pc: u32,
        trap_vector: u32,
        trap_cause_mode: TrapCauseMode,
        memory: SparseMemory,
        decoder: Arc<DecoderRegistry>,
    ) -> Self {
        ScalarCore {
            regs: RegFile::new(),
            pc: reset_pc,
            reset_pc,
            trap_vector,
            trap_cause_mode,
            halted: false,
            cycle_count: 0,
            last_trap: None,
            memory,
            decoder,
        }
    }

    /// 恢复复位状态：PC、寄存器、计数器、停机与 trap 状态（内存保留）
    pub fn reset(&mut self) {
        self.pc = self.reset_pc;
        self.regs.clear();
        self.halted = false;
        self.cycle_count = 0;
        self.last_trap = None;
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn trap_vector(&self) -> u32 {
        self.trap_vector
    }

    pub fn trap_cause_mode(&self) -> TrapCauseMode {
        self.trap_cause_mode
    }

    /// 读取 x0 总是返回 0；寄存器号只取低 5 位
    pub fn read_reg(&self, reg: u8) -> u32 {
        self.regs.read(reg & 0x1F)
    }

    /// 写入 x0 被忽略；寄存器号只取低 5 位
    pub fn write_reg(&mut self, reg: u8, value: u32) {
        self.regs.write(reg & 0x1F, value)
    }

    pub fn regs(&self) -> &[u32; 32] {
        self.regs.snapshot()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// 停机：之后的 `step()` 返回空记录
    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn resume(&mut self) {
        self.halted = false;
    }

    /// 最近一次 trap
    pub fn last_trap(&self) -> Option<Trap> {
        self.last_trap
    }

    pub fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut SparseMemory {
        &mut self.memory
    }

    /// 以字为单位装载程序 `{地址: 指令字}`
    pub fn load_program(&mut self, program: &BTreeMap<u32, u32>) -> Result<(), MemError> {
        self.memory.load_block(program, 4)
    }

    /// 可观察状态快照
    pub fn get_state(&self) -> CoreState {
        CoreState {
            pc: self.pc,
            regs: *self.regs.snapshot(),
            cycle_count: self.cycle_count,
        }
    }

    /// 执行单步指令
    ///
    /// `instruction` 为 `None` 时从 PC 处取 4 字节。
    ///
    /// # 流程
    ///
    /// 1. 取指（或使用外部提供的指令字）
    /// 2. 解码
    /// 3. 在执行单元中求值得到 `Outcome`
    /// 4. 落实寄存器/内存写入并更新 PC，失败则进入 trap
    pub fn step(&mut self, instruction: Option<u32>) -> CommitRecord {
        if self.halted {
            return CommitRecord::halted(self.pc);
        }

        let pc = self.pc;
        let insn = match instruction {
            Some(word) => word,
            None => match self.memory.load32(pc) {
                Ok(word) => word,
                Err(err) => return self.take_trap(pc, 0, AccessKind::Fetch.trap_for(err), pc),
            },
        };

        let decoded = self.decoder.decode(insn);
        let regs = &self.regs;
        let outcome = exu::evaluate(&decoded.instr, pc, |r| regs.read(r));

        match self.commit(pc, insn, outcome) {
            Ok(record) => {
                self.pc = record.next_pc;
                self.cycle_count += 1;
                trace!(instr = %decoded.instr, "{}", record);
                record
            }
            Err((cause, tval)) => self.take_trap(pc, insn, cause, tval),
        }
    }

    /// 落实一条指令的效果；失败时不产生任何寄存器或内存写入
    fn commit(&mut self, pc: u32, insn: u32, outcome: Outcome) -> Result<CommitRecord, (TrapCause, u32)> {
        let mut record = CommitRecord::new(pc, insn);
        match outcome {
            Outcome::Write { rd, value } => self.retire_rd(&mut record, rd, value),
            Outcome::Load { rd, addr, access, signed } => {
                let raw = self
                    .memory
                    .load(addr, access)
                    .map_err(|err| (AccessKind::Load.trap_for(err), addr))?;
                let data = exu::extend_load(raw, access, signed);
                self.retire_rd(&mut record, rd, data);
                record.mem = Some(MemAccess { addr, data, size: access, kind: MemAccessKind::Read });
            }
            Outcome::Store { addr, value, access } => {
                self.memory
                    .store(addr, value, access)
                    .map_err(|err| (AccessKind::Store.trap_for(err), addr))?;
                record.mem = Some(MemAccess { addr, data: value, size: access, kind: MemAccessKind::Write });
            }
            Outcome::Jump { rd, link, target } => {
                self.retire_rd(&mut record, rd, link);
                record.next_pc = target;
            }
            Outcome::Branch { taken, target } => {
                if taken {
                    record.next_pc = target;
                }
            }
            // SIMT 指令在标量核上同样非法
            Outcome::Illegal | Outcome::SpecialRead { .. } | Outcome::Sync | Outcome::Return => {
                return Err((TrapCause::IllegalInstruction, insn));
            }
        }
        Ok(record)
    }

    fn retire_rd(&mut self, record: &mut CommitRecord, rd: u8, value: u32) {
        self.regs.write(rd, value);
        record.rd = Some(rd);
        record.rd_value = Some(self.regs.read(rd));
    }

    /// 进入 trap：PC 跳到 trap 向量，记录原因
    fn take_trap(&mut self, pc: u32, insn: u32, cause: TrapCause, tval: u32) -> CommitRecord {
        let code = self.trap_cause_mode.encode(cause);
        debug!(pc = format_args!("0x{:08x}", pc), insn = format_args!("0x{:08x}", insn), %cause, code, "trap");
        self.pc = self.trap_vector;
        self.last_trap = Some(Trap { cause, pc, tval });
        CommitRecord::trapped(pc, insn, code, self.trap_vector)
    }

    /// 自取指运行多条指令
    ///
    /// # 停止条件
    ///
    /// - 达到最大指令数
    /// - 发生 trap（trap 记录包含在返回值中）
    /// - 核心处于停机状态
    pub fn run(&mut self, max_steps: u64) -> Vec<CommitRecord> {
        let mut commits = Vec::new();
        for _ in 0..max_steps {
            if self.halted {
                break;
            }
            let record = self.step(None);
            let trapped = record.trap;
            commits.push(record);
            if trapped {
                break;
            }
        }
        commits
    }

    /// 通过 tracing 输出寄存器状态（用于调试）
    pub fn dump_regs(&self) {
        info!(
            pc = format_args!("0x{:08x}", self.pc),
            halted = self.halted,
            cycles = self.cycle_count,
            "scalar core state"
        );
        for row in 0..8u8 {
            let base = row * 4;
            info!(
                "x{:02}: 0x{:08x}  x{:02}: 0x{:08x}  x{:02}: 0x{:08x}  x{:02}: 0x{:08x}",
                base,
                self.read_reg(base),
                base + 1,
                self.read_reg(base + 1),
                base + 2,
                self.read_reg(base + 2),
                base + 3,
                self.read_reg(base + 3),
            );
        }
    }
}

impl Default for ScalarCore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScalarCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalarCore")
            .field("pc", &format_args!("0x{:08x}", self.pc))
            .field("halted", &self.halted)
            .field("cycle_count", &self.cycle_count)
            .field("memory", &self.memory)
            .finish()
    }
}

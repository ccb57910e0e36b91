//! SIMT warp 执行模型
//!
//! `WarpKernelModel` 把一个 kernel 的 grid 拆成若干 warp，
//! 按严格轮转方式每个调度量子为一个未完成的 warp 发射一条指令。
//! warp 内所有活跃 lane 锁步执行同一条指令，每个 lane 拥有私有寄存器，
//! 所有 warp 共享一块数据内存。
//!
//! 指令语义与标量核共用 `exu`，只有控制流（分歧/重汇聚）与
//! 特殊寄存器读取是 warp 特有的。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::exu::{self, Outcome};
use crate::isa::{DecoderRegistry, RvInstr};
use crate::memory::{MemResult, Memory, SparseMemory};

mod config;
pub mod sreg;
mod warp;

pub use config::{DEFAULT_MAX_CYCLES, DEFAULT_WARP_SIZE, GpuConfig, ReconvergencePolicy};
pub use sreg::Dim3;
pub use warp::{DivergenceEntry, LaneMask, Warp};

/// kernel 执行错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("kernel exceeded maximum cycle count ({cycles} cycles, possible infinite loop)")]
    Timeout { cycles: u64 },
    #[error("warp {warp_id} diverged beyond the supported depth at pc 0x{pc:08x}")]
    DivergenceOverflow { warp_id: usize, pc: u32 },
    #[error("warp size {0} is outside 1..=32")]
    InvalidWarpSize(u32),
}

/// `execute_kernel()` 的统计结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelStats {
    pub cycles: u64,
    pub completed_warps: usize,
}

/// 一次发射对 warp 控制流的影响
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpEvent {
    /// 正常执行
    Executed,
    /// 非法指令被跳过
    Skipped,
    /// 分支分歧：先执行 taken 路径
    Diverged { taken: LaneMask, not_taken: LaneMask },
    /// 活跃路径返回，恢复挂起路径
    Resumed { mask: LaneMask },
    /// warp 结束
    Finished,
}

/// 一个调度量子的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarpCommit {
    pub warp_id: usize,
    pub pc: u32,
    /// 指令字（取指越界时为 0）
    pub insn: u32,
    /// 发射时的活跃掩码（已合并到达的挂起路径）
    pub active_mask: LaneMask,
    pub next_pc: u32,
    pub event: WarpEvent,
}

impl fmt::Display for WarpCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "warp{} pc=0x{:08x} insn=0x{:08x} mask={} -> 0x{:08x}",
            self.warp_id, self.pc, self.insn, self.active_mask, self.next_pc
        )?;
        match self.event {
            WarpEvent::Executed => Ok(()),
            WarpEvent::Skipped => write!(f, " (skipped)"),
            WarpEvent::Diverged { taken, not_taken } => {
                write!(f, " (diverged taken={} deferred={})", taken, not_taken)
            }
            WarpEvent::Resumed { mask } => write!(f, " (resumed {})", mask),
            WarpEvent::Finished => write!(f, " (done)"),
        }
    }
}

/// SIMT kernel 参考模型
pub struct WarpKernelModel {
    config: GpuConfig,
    grid_dim: Dim3,
    block_dim: Dim3,
    kernel_addr: u32,
    warps: Vec<Warp>,
    /// 轮转调度游标
    cursor: usize,
    completed_warps: usize,
    cycle_count: u64,
    kernel: BTreeMap<u32, u32>,
    memory: SparseMemory,
    decoder: Arc<DecoderRegistry>,
}

impl WarpKernelModel {
    /// 默认配置（warp 宽度 8）
    pub fn new() -> Self {
        Self::build(GpuConfig::default())
    }

    /// 使用自定义配置
    ///
    /// # 示例
    ///
    /// ```
    /// use simt_golden::gpu::{GpuConfig, KernelError, WarpKernelModel};
    ///
    /// let model = WarpKernelModel::with_config(GpuConfig::new().with_warp_size(4)).unwrap();
    /// assert_eq!(model.config().warp_size, 4);
    ///
    /// let err = WarpKernelModel::with_config(GpuConfig::new().with_warp_size(0)).err();
    /// assert_eq!(err, Some(KernelError::InvalidWarpSize(0)));
    /// ```
    pub fn with_config(config: GpuConfig) -> Result<Self, KernelError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: GpuConfig) -> Self {
        Self {
            config,
            grid_dim: Dim3::default(),
            block_dim: Dim3::default(),
            kernel_addr: 0,
            warps: Vec::new(),
            cursor: 0,
            completed_warps: 0,
            cycle_count: 0,
            kernel: BTreeMap::new(),
            memory: SparseMemory::new(),
            decoder: Arc::new(DecoderRegistry::simt()),
        }
    }

    pub fn config(&self) -> &GpuConfig {
        &self.config
    }

    /// 清空 warp、计数器、kernel 与内存
    pub fn reset(&mut self) {
        self.grid_dim = Dim3::default();
        self.block_dim = Dim3::default();
        self.kernel_addr = 0;
        self.warps.clear();
        self.cursor = 0;
        self.completed_warps = 0;
        self.cycle_count = 0;
        self.kernel.clear();
        self.memory.clear();
    }

    /// 按 grid/block 维度创建 warp
    ///
    /// block 按 x、y、z 的顺序展开，每个 block 含
    /// `ceil(threads_per_block / warp_size)` 个 warp。
    pub fn configure(&mut self, grid_dim: impl Into<Dim3>, block_dim: impl Into<Dim3>, kernel_addr: u32) {
        let grid_dim = grid_dim.into();
        let block_dim = block_dim.into();
        let warp_size = self.config.warp_size;
        let threads_per_block = block_dim.volume();
        let warps_per_block = threads_per_block.div_ceil(u64::from(warp_size)) as u32;

        self.warps.clear();
        for bz in 0..grid_dim.z {
            for by in 0..grid_dim.y {
                for bx in 0..grid_dim.x {
                    let block_id = Dim3::new(bx, by, bz);
                    for warp_in_block in 0..warps_per_block {
                        let warp_id = self.warps.len();
                        self.warps
                            .push(Warp::new(warp_id, block_id, warp_in_block, kernel_addr, warp_size));
                    }
                }
            }
        }

        self.grid_dim = grid_dim;
        self.block_dim = block_dim;
        self.kernel_addr = kernel_addr;
        self.cursor = 0;
        self.completed_warps = 0;
        self.cycle_count = 0;

        debug!(
            grid = %grid_dim,
            block = %block_dim,
            warps = self.warps.len(),
            kernel_addr = format_args!("0x{:08x}", kernel_addr),
            "kernel configured"
        );
    }

    /// 整体替换 kernel 指令表 `{地址: 指令字}`
    pub fn load_kernel(&mut self, instructions: BTreeMap<u32, u32>) {
        self.kernel = instructions;
    }

    pub fn kernel(&self) -> &BTreeMap<u32, u32> {
        &self.kernel
    }

    pub fn grid_dim(&self) -> Dim3 {
        self.grid_dim
    }

    pub fn block_dim(&self) -> Dim3 {
        self.block_dim
    }

    pub fn kernel_addr(&self) -> u32 {
        self.kernel_addr
    }

    pub fn warps(&self) -> &[Warp] {
        &self.warps
    }

    pub fn warp(&self, warp_id: usize) -> Option<&Warp> {
        self.warps.get(warp_id)
    }

    pub fn warp_mut(&mut self, warp_id: usize) -> Option<&mut Warp> {
        self.warps.get_mut(warp_id)
    }

    pub fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut SparseMemory {
        &mut self.memory
    }

    pub fn mem_read(&self, addr: u32, size: u32) -> MemResult<u32> {
        self.memory.read(addr, size)
    }

    pub fn mem_write(&mut self, addr: u32, data: u32, size: u32) -> MemResult<()> {
        self.memory.write(addr, data, size)
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn completed_warps(&self) -> usize {
        self.completed_warps
    }

    pub fn all_done(&self) -> bool {
        self.warps.iter().all(|w| w.done)
    }

    /// 运行到所有 warp 结束
    ///
    /// # 错误
    ///
    /// - 周期数超过上限：`KernelError::Timeout`
    /// - 分歧深度超过上限：`KernelError::DivergenceOverflow`
    pub fn execute_kernel(&mut self) -> Result<KernelStats, KernelError> {
        self.cycle_count = 0;
        self.completed_warps = 0;

        while self.step()?.is_some() {}

        debug!(cycles = self.cycle_count, completed = self.completed_warps, "kernel finished");
        Ok(KernelStats {
            cycles: self.cycle_count,
            completed_warps: self.completed_warps,
        })
    }

    /// 一个调度量子
    ///
    /// 从游标处查找第一个未完成的 warp 并发射一条指令，
    /// 跳过的 warp 同样推进游标。所有 warp 结束时返回 `Ok(None)`。
    /// 本量子结束后周期数超过上限时返回 `KernelError::Timeout`。
    pub fn step(&mut self) -> Result<Option<WarpCommit>, KernelError> {
        let count = self.warps.len();
        for _ in 0..count {
            let idx = self.cursor;
            self.cursor = (self.cursor + 1) % count;
            if self.warps[idx].done {
                continue;
            }
            self.cycle_count += 1;
            let commit = self.issue(idx)?;
            trace!("{}", commit);
            if self.cycle_count > self.config.max_cycles {
                warn!(cycles = self.cycle_count, "kernel timed out");
                return Err(KernelError::Timeout { cycles: self.cycle_count });
            }
            return Ok(Some(commit));
        }
        Ok(None)
    }

    /// 为一个 warp 发射一条指令
    fn issue(&mut self, idx: usize) -> Result<WarpCommit, KernelError> {
        let warp_size = self.config.warp_size;
        let policy = self.config.reconvergence;
        let max_depth = self.config.max_divergence_depth;
        let block_dim = self.block_dim;
        let warp = &mut self.warps[idx];

        if policy == ReconvergencePolicy::Stack {
            if let Some(mask) = warp.merge_at_pc() {
                debug!(warp = warp.warp_id, pc = format_args!("0x{:08x}", warp.pc), %mask, "reconverged");
            }
        }

        let pc = warp.pc;
        let active = warp.active_mask;
        let mut commit = WarpCommit {
            warp_id: warp.warp_id,
            pc,
            insn: 0,
            active_mask: active,
            next_pc: pc.wrapping_add(4),
            event: WarpEvent::Executed,
        };

        // 取指越界等同于返回
        let Some(&insn) = self.kernel.get(&pc) else {
            return Ok(self.finish_path(idx, commit));
        };
        commit.insn = insn;

        let instr = self.decoder.decode(insn).instr;
        match instr {
            RvInstr::Vret => return Ok(self.finish_path(idx, commit)),
            RvInstr::Illegal { raw } => {
                warn!(warp = warp.warp_id, pc = format_args!("0x{:08x}", pc), raw = format_args!("0x{:08x}", raw), "illegal instruction skipped");
                commit.event = WarpEvent::Skipped;
                warp.pc = commit.next_pc;
                return Ok(commit);
            }
            _ => {}
        }

        let mut taken = LaneMask::EMPTY;
        let mut not_taken = LaneMask::EMPTY;
        let mut branch_target = None;
        let mut jump_target: Option<u32> = None;
        let mut targets_disagree = false;

        for lane in active.lanes().take_while(|&lane| lane < warp_size as usize) {
            let outcome = {
                let regs = warp.lane(lane);
                exu::evaluate(&instr, pc, |r| regs.read(r))
            };
            match outcome {
                Outcome::Write { rd, value } => warp.write_reg(lane, rd, value),
                Outcome::SpecialRead { rd, sreg } => {
                    let tid = sreg::thread_id(block_dim, warp_size, warp.warp_in_block, lane as u32);
                    warp.write_reg(lane, rd, sreg::read(sreg, tid, warp.block_id));
                }
                Outcome::Load { rd, addr, access, signed } => {
                    let value = match self.memory.load(addr, access) {
                        Ok(raw) => exu::extend_load(raw, access, signed),
                        Err(err) => {
                            warn!(warp = warp.warp_id, lane, pc = format_args!("0x{:08x}", pc), %err, "lane load fault, writing 0");
                            0
                        }
                    };
                    warp.write_reg(lane, rd, value);
                }
                Outcome::Store { addr, value, access } => {
                    if let Err(err) = self.memory.store(addr, value, access) {
                        warn!(warp = warp.warp_id, lane, pc = format_args!("0x{:08x}", pc), %err, "lane store fault, dropped");
                    }
                }
                Outcome::Jump { rd, link, target } => {
                    warp.write_reg(lane, rd, link);
                    match jump_target {
                        None => jump_target = Some(target),
                        Some(first) if first != target => targets_disagree = true,
                        Some(_) => {}
                    }
                }
                Outcome::Branch { taken: lane_taken, target } => {
                    branch_target = Some(target);
                    if lane_taken {
                        taken.insert(lane);
                    } else {
                        not_taken.insert(lane);
                    }
                }
                Outcome::Sync | Outcome::Return | Outcome::Illegal => {}
            }
        }

        if let Some(target) = jump_target {
            if targets_disagree {
                warn!(warp = warp.warp_id, pc = format_args!("0x{:08x}", pc), target = format_args!("0x{:08x}", target), "jalr targets differ across lanes, following lowest lane");
            }
            commit.next_pc = target;
        }

        if let Some(target) = branch_target {
            if !taken.is_empty() && !not_taken.is_empty() {
                if !warp.defer(commit.next_pc, not_taken, max_depth) {
                    return Err(KernelError::DivergenceOverflow { warp_id: warp.warp_id, pc });
                }
                debug!(warp = warp.warp_id, pc = format_args!("0x{:08x}", pc), %taken, %not_taken, "diverged");
                warp.active_mask = taken;
                commit.event = WarpEvent::Diverged { taken, not_taken };
                commit.next_pc = target;
            } else if !taken.is_empty() {
                commit.next_pc = target;
            }
        }

        warp.pc = commit.next_pc;
        Ok(commit)
    }

    /// 活跃路径结束：有挂起路径则恢复，否则 warp 完成
    fn finish_path(&mut self, idx: usize, mut commit: WarpCommit) -> WarpCommit {
        let warp = &mut self.warps[idx];
        if self.config.reconvergence == ReconvergencePolicy::Stack {
            if let Some(entry) = warp.resume_deferred() {
                debug!(warp = warp.warp_id, pc = format_args!("0x{:08x}", entry.pc), mask = %entry.mask, "resumed deferred path");
                commit.next_pc = entry.pc;
                commit.event = WarpEvent::Resumed { mask: entry.mask };
                return commit;
            }
        }

        warp.done = true;
        self.completed_warps += 1;
        debug!(warp = warp.warp_id, cycle = self.cycle_count, "warp done");
        commit.next_pc = warp.pc;
        commit.event = WarpEvent::Finished;
        commit
    }
}

impl Default for WarpKernelModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WarpKernelModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarpKernelModel")
            .field("config", &self.config)
            .field("grid_dim", &self.grid_dim)
            .field("block_dim", &self.block_dim)
            .field("warps", &self.warps.len())
            .field("completed_warps", &self.completed_warps)
            .field("cycle_count", &self.cycle_count)
            .field("memory", &self.memory)
            .finish()
    }
}

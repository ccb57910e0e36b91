//! Warp 状态：lane 掩码、lane 寄存器文件与分歧栈

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use super::sreg::Dim3;
use crate::cpu::RegFile;

/// 活跃 lane 位图，bit i 对应 lane i
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LaneMask(u32);

impl LaneMask {
    pub const EMPTY: LaneMask = LaneMask(0);

    /// 低 `warp_size` 位全为 1
    pub fn full(warp_size: u32) -> Self {
        if warp_size >= 32 {
            LaneMask(u32::MAX)
        } else {
            LaneMask((1u32 << warp_size) - 1)
        }
    }

    pub const fn from_bits(bits: u32) -> Self {
        LaneMask(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(self, lane: usize) -> bool {
        lane < 32 && self.0 & (1 << lane) != 0
    }

    #[inline]
    pub fn insert(&mut self, lane: usize) {
        self.0 |= 1 << lane;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// 编号最小的活跃 lane
    pub fn lowest(self) -> Option<usize> {
        (self.0 != 0).then(|| self.0.trailing_zeros() as usize)
    }

    /// 按编号升序遍历活跃 lane
    pub fn lanes(self) -> impl Iterator<Item = usize> {
        (0..32).filter(move |&lane| self.contains(lane))
    }
}

impl BitOr for LaneMask {
    type Output = LaneMask;

    fn bitor(self, rhs: LaneMask) -> LaneMask {
        LaneMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for LaneMask {
    fn bitor_assign(&mut self, rhs: LaneMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for LaneMask {
    type Output = LaneMask;

    fn bitand(self, rhs: LaneMask) -> LaneMask {
        LaneMask(self.0 & rhs.0)
    }
}

impl Not for LaneMask {
    type Output = LaneMask;

    fn not(self) -> LaneMask {
        LaneMask(!self.0)
    }
}

impl fmt::Debug for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LaneMask({:#x})", self.0)
    }
}

impl fmt::Display for LaneMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// 分歧栈条目：挂起路径的恢复 PC 与 lane 掩码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivergenceEntry {
    pub pc: u32,
    pub mask: LaneMask,
}

/// 单个 warp
///
/// 在 `configure()` 时一次性创建，之后不会换 block。
#[derive(Debug, Clone)]
pub struct Warp {
    pub warp_id: usize,
    /// 所属 block 坐标
    pub block_id: Dim3,
    pub warp_in_block: u32,
    pub pc: u32,
    pub active_mask: LaneMask,
    pub done: bool,
    lanes: Vec<RegFile>,
    divergence_stack: Vec<DivergenceEntry>,
}

impl Warp {
    pub fn new(warp_id: usize, block_id: Dim3, warp_in_block: u32, pc: u32, warp_size: u32) -> Self {
        Self {
            warp_id,
            block_id,
            warp_in_block,
            pc,
            active_mask: LaneMask::full(warp_size),
            done: false,
            lanes: vec![RegFile::new(); warp_size as usize],
            divergence_stack: Vec::new(),
        }
    }

    pub fn warp_size(&self) -> usize {
        self.lanes.len()
    }

    /// lane 的寄存器文件
    pub fn lane(&self, lane: usize) -> &RegFile {
        &self.lanes[lane]
    }

    pub fn lane_mut(&mut self, lane: usize) -> &mut RegFile {
        &mut self.lanes[lane]
    }

    /// `lane` 必须小于 warp 宽度；寄存器号只取低 5 位
    pub fn read_reg(&self, lane: usize, reg: u8) -> u32 {
        self.lanes[lane].read(reg & 0x1F)
    }

    pub fn write_reg(&mut self, lane: usize, reg: u8, value: u32) {
        self.lanes[lane].write(reg & 0x1F, value)
    }

    /// 所有 lane 的同一寄存器
    pub fn reg_column(&self, reg: u8) -> Vec<u32> {
        self.lanes.iter().map(|rf| rf.read(reg & 0x1F)).collect()
    }

    pub fn divergence_stack(&self) -> &[DivergenceEntry] {
        &self.divergence_stack
    }

    pub fn divergence_depth(&self) -> usize {
        self.divergence_stack.len()
    }

    /// 挂起 `mask` 中的 lane，在 `pc` 处恢复
    ///
    /// 栈顶已在同一 PC 等待时合并掩码，不增加深度。
    /// 设置了 `max_depth` 且已到上限时返回 `false`，栈保持不变。
    pub(crate) fn defer(&mut self, pc: u32, mask: LaneMask, max_depth: Option<usize>) -> bool {
        if let Some(top) = self.divergence_stack.last_mut() {
            if top.pc == pc {
                top.mask |= mask;
                return true;
            }
        }
        if max_depth.is_some_and(|limit| self.divergence_stack.len() >= limit) {
            return false;
        }
        self.divergence_stack.push(DivergenceEntry { pc, mask });
        true
    }

    /// 若栈顶在当前 PC 等待，则弹出并并入活跃掩码
    pub(crate) fn merge_at_pc(&mut self) -> Option<LaneMask> {
        let mut merged = None;
        while let Some(top) = self.divergence_stack.last().copied() {
            if top.pc != self.pc {
                break;
            }
            self.divergence_stack.pop();
            self.active_mask |= top.mask;
            merged = Some(self.active_mask);
        }
        merged
    }

    /// 弹出栈顶作为新的活跃路径
    pub(crate) fn resume_deferred(&mut self) -> Option<DivergenceEntry> {
        let entry = self.divergence_stack.pop()?;
        self.pc = entry.pc;
        self.active_mask = entry.mask;
        Some(entry)
    }
}

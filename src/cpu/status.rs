//! 架构状态：整数寄存器文件
//!
//! 标量核与每个 warp lane 各持有一份 `RegFile`。

use std::fmt;

/// 定长寄存器文件
///
/// `ZERO_REG` 为真时 0 号寄存器恒读为 `T::default()`，写入被丢弃。
#[derive(Clone, PartialEq, Eq)]
pub struct GenericRegFile<const N: usize, T: Copy + Default, const ZERO_REG: bool> {
    cells: [T; N],
}

impl<const N: usize, T: Copy + Default, const ZERO_REG: bool> GenericRegFile<N, T, ZERO_REG> {
    pub fn new() -> Self {
        Self { cells: [T::default(); N] }
    }

    #[inline]
    fn hardwired(index: u8) -> bool {
        ZERO_REG && index == 0
    }

    #[inline]
    pub fn read(&self, index: u8) -> T {
        match Self::hardwired(index) {
            true => T::default(),
            false => self.cells[usize::from(index)],
        }
    }

    #[inline]
    pub fn write(&mut self, index: u8, value: T) {
        if !Self::hardwired(index) {
            self.cells[usize::from(index)] = value;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(T::default());
    }

    pub fn snapshot(&self) -> &[T; N] {
        &self.cells
    }
}

impl<const N: usize, T: Copy + Default, const ZERO_REG: bool> Default for GenericRegFile<N, T, ZERO_REG> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, T, const ZERO_REG: bool> fmt::Debug for GenericRegFile<N, T, ZERO_REG>
where
    T: Copy + Default + PartialEq + fmt::LowerHex,
{
    /// 只列出非零寄存器，如 `{x1: 0x2a, x5: 0xdeadbeef}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (i, v) in self.cells.iter().enumerate() {
            if *v != T::default() {
                map.entry(&format_args!("x{i}"), &format_args!("{v:#x}"));
            }
        }
        map.finish()
    }
}

/// x0..x31，x0 恒为 0
pub type RegFile = GenericRegFile<32, u32, true>;

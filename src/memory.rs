//! 内存抽象层
//!
//! 本模块定义了内存访问的统一接口 `Memory` trait，
//! 以及参考模型使用的稀疏内存实现 `SparseMemory`。
//!
//! 约定：
//! - 多字节数据按小端序存取
//! - 访问地址必须按访问粒度自然对齐，否则返回 `MemError::MisalignedAccess`
//! - 从未写过的地址读出 0

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// 访存粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessSize {
    Byte,
    Half,
    Word,
}

impl AccessSize {
    pub fn bytes(self) -> usize {
        match self {
            AccessSize::Byte => 1,
            AccessSize::Half => 2,
            AccessSize::Word => 4,
        }
    }

    /// 由字节数构造访存粒度，仅接受 1、2、4
    pub fn from_bytes(size: u32) -> MemResult<Self> {
        match size {
            1 => Ok(AccessSize::Byte),
            2 => Ok(AccessSize::Half),
            4 => Ok(AccessSize::Word),
            _ => Err(MemError::InvalidAccessSize { size }),
        }
    }

    /// 该粒度下的数据掩码
    pub fn mask(self) -> u32 {
        match self {
            AccessSize::Byte => 0xFF,
            AccessSize::Half => 0xFFFF,
            AccessSize::Word => 0xFFFF_FFFF,
        }
    }

    pub fn is_aligned(self, addr: u32) -> bool {
        addr % self.bytes() as u32 == 0
    }
}

/// 内存访问错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemError {
    /// 访问宽度不是 1、2、4 字节
    #[error("invalid access size {size} (expected 1, 2 or 4 bytes)")]
    InvalidAccessSize { size: u32 },
    /// 地址未按访问粒度对齐
    #[error("misaligned {access:?} access at 0x{addr:08x}")]
    MisalignedAccess { addr: u32, access: AccessSize },
}

pub type MemResult<T> = Result<T, MemError>;

/// 内存访问的统一接口
///
/// 标量核与 warp 执行单元都只通过此接口访问内存。
pub trait Memory {
    /// 从指定地址读取 8 位数据
    fn load8(&self, addr: u32) -> MemResult<u8>;

    /// 从指定地址读取 16 位数据（小端序）
    fn load16(&self, addr: u32) -> MemResult<u16>;

    /// 从指定地址读取 32 位数据（小端序）
    fn load32(&self, addr: u32) -> MemResult<u32>;

    /// 向指定地址写入 8 位数据
    fn store8(&mut self, addr: u32, value: u8) -> MemResult<()>;

    /// 向指定地址写入 16 位数据（小端序）
    fn store16(&mut self, addr: u32, value: u16) -> MemResult<()>;

    /// 向指定地址写入 32 位数据（小端序）
    fn store32(&mut self, addr: u32, value: u32) -> MemResult<()>;

    /// 按粒度读取，结果零扩展到 32 位
    fn load(&self, addr: u32, access: AccessSize) -> MemResult<u32> {
        match access {
            AccessSize::Byte => self.load8(addr).map(u32::from),
            AccessSize::Half => self.load16(addr).map(u32::from),
            AccessSize::Word => self.load32(addr),
        }
    }

    /// 按粒度写入，高位被截断
    fn store(&mut self, addr: u32, value: u32, access: AccessSize) -> MemResult<()> {
        match access {
            AccessSize::Byte => self.store8(addr, value as u8),
            AccessSize::Half => self.store16(addr, value as u16),
            AccessSize::Word => self.store32(addr, value),
        }
    }
}

const PAGE_SHIFT: u32 = 12;
const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
const PAGE_MASK: u32 = (PAGE_SIZE as u32) - 1;

/// 一个 4 KiB 页：数据 + 每字节的“已写入”位图
#[derive(Clone)]
struct Page {
    data: Box<[u8; PAGE_SIZE]>,
    written: [u64; PAGE_SIZE / 64],
}

impl Page {
    fn new() -> Self {
        Page {
            data: Box::new([0; PAGE_SIZE]),
            written: [0; PAGE_SIZE / 64],
        }
    }

    #[inline]
    fn is_written(&self, offset: usize) -> bool {
        self.written[offset / 64] & (1u64 << (offset % 64)) != 0
    }

    /// 写入一个字节，返回该字节此前是否未被写过
    #[inline]
    fn set(&mut self, offset: usize, value: u8) -> bool {
        let fresh = !self.is_written(offset);
        self.data[offset] = value;
        self.written[offset / 64] |= 1u64 << (offset % 64);
        fresh
    }
}

/// 稀疏内存实现
///
/// 按页惰性分配，未映射的地址读出 0。
/// 每页记录哪些字节被写过，`dump` 只返回写过的地址。
#[derive(Clone, Default)]
pub struct SparseMemory {
    pages: BTreeMap<u32, Page>,
    /// 已写入的字节数
    stored: usize,
}

impl SparseMemory {
    /// 创建空内存
    ///
    /// # 示例
    ///
    /// ```
    /// use simt_golden::memory::SparseMemory;
    ///
    /// let mut mem = SparseMemory::new();
    /// mem.write(0x1000, 0x1234_5678, 4).unwrap();
    /// assert_eq!(mem.read(0x1000, 1).unwrap(), 0x78);
    /// assert_eq!(mem.read(0x2000, 4).unwrap(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的字节数
    pub fn len(&self) -> usize {
        self.stored
    }

    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    /// 已分配的页数
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn ensure_aligned(addr: u32, access: AccessSize) -> MemResult<()> {
        if access.is_aligned(addr) {
            Ok(())
        } else {
            Err(MemError::MisalignedAccess { addr, access })
        }
    }

    #[inline]
    fn byte(&self, addr: u32) -> u8 {
        self.pages
            .get(&(addr >> PAGE_SHIFT))
            .map(|page| page.data[(addr & PAGE_MASK) as usize])
            .unwrap_or(0)
    }

    #[inline]
    fn set_byte(&mut self, addr: u32, value: u8) {
        let page = self.pages.entry(addr >> PAGE_SHIFT).or_insert_with(Page::new);
        if page.set((addr & PAGE_MASK) as usize, value) {
            self.stored += 1;
        }
    }

    fn read_le(&self, addr: u32, access: AccessSize) -> MemResult<u32> {
        Self::ensure_aligned(addr, access)?;
        // 对齐访问不会跨越 4 GiB 边界
        let value = (0..access.bytes() as u32)
            .fold(0u32, |acc, i| acc | (u32::from(self.byte(addr + i)) << (i * 8)));
        Ok(value)
    }

    fn write_le(&mut self, addr: u32, value: u32, access: AccessSize) -> MemResult<()> {
        Self::ensure_aligned(addr, access)?;
        for (i, byte) in value.to_le_bytes().iter().take(access.bytes()).enumerate() {
            self.set_byte(addr + i as u32, *byte);
        }
        Ok(())
    }

    /// 读取 `size` 字节（1、2 或 4），小端序
    pub fn read(&self, addr: u32, size: u32) -> MemResult<u32> {
        let access = AccessSize::from_bytes(size)?;
        self.read_le(addr, access)
    }

    /// 写入 `size` 字节（1、2 或 4），小端序，超出宽度的高位被丢弃
    pub fn write(&mut self, addr: u32, value: u32, size: u32) -> MemResult<()> {
        let access = AccessSize::from_bytes(size)?;
        self.write_le(addr, value, access)
    }

    /// 批量写入 `{地址: 值}` 映射
    ///
    /// 按地址升序逐项写入，不回滚：出错时此前的写入保持有效。
    pub fn load_block(&mut self, mapping: &BTreeMap<u32, u32>, word_size: u32) -> MemResult<()> {
        let access = AccessSize::from_bytes(word_size)?;
        for (&addr, &value) in mapping {
            self.write_le(addr, value, access)?;
        }
        Ok(())
    }

    /// 导出 `[start, end)` 范围内所有被写过的字节
    pub fn dump(&self, start: u32, end: u32) -> BTreeMap<u32, u8> {
        let mut out = BTreeMap::new();
        if start >= end {
            return out;
        }
        let last = end - 1;
        for (&index, page) in self.pages.range((start >> PAGE_SHIFT)..=(last >> PAGE_SHIFT)) {
            let base = index << PAGE_SHIFT;
            for offset in 0..PAGE_SIZE {
                let addr = base | offset as u32;
                if addr >= start && addr <= last && page.is_written(offset) {
                    out.insert(addr, page.data[offset]);
                }
            }
        }
        out
    }

    /// 清空所有内容
    pub fn clear(&mut self) {
        self.pages.clear();
        self.stored = 0;
    }

    /// 批量写入字节（无对齐要求），超出 4 GiB 的部分回绕
    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.set_byte(addr.wrapping_add(i as u32), byte);
        }
    }

    /// 批量读取字节
    pub fn read_bytes(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len).map(|i| self.byte(addr.wrapping_add(i as u32))).collect()
    }

    /// 将指定范围填充为固定字节
    pub fn fill(&mut self, addr: u32, len: usize, value: u8) {
        for i in 0..len {
            self.set_byte(addr.wrapping_add(i as u32), value);
        }
    }
}

impl Memory for SparseMemory {
    fn load8(&self, addr: u32) -> MemResult<u8> {
        Ok(self.byte(addr))
    }

    fn load16(&self, addr: u32) -> MemResult<u16> {
        self.read_le(addr, AccessSize::Half).map(|v| v as u16)
    }

    fn load32(&self, addr: u32) -> MemResult<u32> {
        self.read_le(addr, AccessSize::Word)
    }

    fn store8(&mut self, addr: u32, value: u8) -> MemResult<()> {
        self.set_byte(addr, value);
        Ok(())
    }

    fn store16(&mut self, addr: u32, value: u16) -> MemResult<()> {
        self.write_le(addr, u32::from(value), AccessSize::Half)
    }

    fn store32(&mut self, addr: u32, value: u32) -> MemResult<()> {
        self.write_le(addr, value, AccessSize::Word)
    }
}

impl fmt::Display for SparseMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SparseMemory({} bytes stored)", self.stored)
    }
}

impl fmt::Debug for SparseMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMemory")
            .field("pages", &self.pages.len())
            .field("stored", &self.stored)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sparse_memory_basic() {
        let mut mem = SparseMemory::new();
        assert!(mem.is_empty());

        // 测试 8 位读写
        mem.store8(0, 0x12).unwrap();
        assert_eq!(mem.load8(0).unwrap(), 0x12);

        // 测试 16 位读写（小端序）
        mem.store16(2, 0x3456).unwrap();
        assert_eq!(mem.load16(2).unwrap(), 0x3456);
        assert_eq!(mem.load8(2).unwrap(), 0x56); // 低字节
        assert_eq!(mem.load8(3).unwrap(), 0x34); // 高字节

        // 测试 32 位读写（小端序）
        mem.store32(4, 0x78ABCDEF).unwrap();
        assert_eq!(mem.load32(4).unwrap(), 0x78ABCDEF);
        assert_eq!(mem.load8(4).unwrap(), 0xEF);
        assert_eq!(mem.load8(7).unwrap(), 0x78);
    }

    #[test]
    fn test_unwritten_reads_zero() {
        let mut mem = SparseMemory::new();
        assert_eq!(mem.read(0x1000, 4).unwrap(), 0);
        assert_eq!(mem.read(0x2000, 1).unwrap(), 0);

        mem.write(0x1000, 0xDEADBEEF, 4).unwrap();
        assert_eq!(mem.read(0x1004, 4).unwrap(), 0);
        assert_eq!(mem.read(0x1000, 4).unwrap(), 0xDEADBEEF);
        // 读操作不分配页
        assert_eq!(mem.page_count(), 1);
    }

    #[test]
    fn test_misaligned() {
        let mut mem = SparseMemory::new();
        assert!(matches!(
            mem.write(0x1001, 0x1234_5678, 4),
            Err(MemError::MisalignedAccess { addr: 0x1001, access: AccessSize::Word })
        ));
        assert!(matches!(mem.read(0x1002, 4), Err(MemError::MisalignedAccess { .. })));
        assert!(matches!(mem.read(0x1003, 2), Err(MemError::MisalignedAccess { .. })));
        // 失败的写入不留下任何字节
        assert!(mem.is_empty());
    }

    #[test]
    fn test_invalid_size() {
        let mut mem = SparseMemory::new();
        assert_eq!(
            mem.write(0x1000, 0x1234_5678, 3),
            Err(MemError::InvalidAccessSize { size: 3 })
        );
        assert_eq!(mem.read(0x1000, 8), Err(MemError::InvalidAccessSize { size: 8 }));
    }

    #[test]
    fn test_overlapping_writes() {
        let mut mem = SparseMemory::new();
        mem.write(0x1000, 0xDEADBEEF, 4).unwrap();
        mem.write(0x1001, 0xAA, 1).unwrap();
        mem.write(0x1002, 0xBB, 1).unwrap();
        assert_eq!(mem.read(0x1000, 4).unwrap(), 0xDEBBAAEF);
        assert_eq!(mem.len(), 4);
    }

    #[test]
    fn test_dump_only_written() {
        let mut mem = SparseMemory::new();
        mem.write(0x1000, 0x12345678, 4).unwrap();
        mem.write(0x1FFF, 0x99, 1).unwrap();

        let dump = mem.dump(0x1000, 0x1004);
        assert_eq!(dump.len(), 4);
        assert_eq!(dump[&0x1000], 0x78);
        assert_eq!(dump[&0x1003], 0x12);

        let wide = mem.dump(0x0, 0x3000);
        assert_eq!(wide.len(), 5);
        assert_eq!(wide[&0x1FFF], 0x99);
        assert!(mem.dump(0x1004, 0x1004).is_empty());
    }

    #[test]
    fn test_load_block_no_rollback() {
        let mut mem = SparseMemory::new();
        let mut block = BTreeMap::new();
        block.insert(0x0, 0x0000_0093);
        block.insert(0x4, 0x0010_0113);
        block.insert(0x9, 0xFFFF_FFFF);

        let err = mem.load_block(&block, 4).unwrap_err();
        assert!(matches!(err, MemError::MisalignedAccess { addr: 0x9, .. }));
        assert_eq!(mem.read(0x0, 4).unwrap(), 0x0000_0093);
        assert_eq!(mem.read(0x4, 4).unwrap(), 0x0010_0113);
    }

    #[test]
    fn test_clear_and_display() {
        let mut mem = SparseMemory::new();
        assert_eq!(mem.to_string(), "SparseMemory(0 bytes stored)");
        mem.write(0x1000, 0x12345678, 4).unwrap();
        assert_eq!(mem.to_string(), "SparseMemory(4 bytes stored)");

        mem.clear();
        assert!(mem.is_empty());
        assert_eq!(mem.read(0x1000, 4).unwrap(), 0);
    }

    #[test]
    fn test_bytes_helpers() {
        let mut mem = SparseMemory::new();
        mem.write_bytes(0x0FFE, &[1, 2, 3, 4]);
        assert_eq!(mem.read(0x1000, 2).unwrap(), 0x0403);
        assert_eq!(mem.read_bytes(0x0FFE, 5), vec![1, 2, 3, 4, 0]);

        mem.fill(0x2000, 8, 0xAA);
        assert_eq!(mem.read(0x2004, 4).unwrap(), 0xAAAA_AAAA);
        assert_eq!(mem.len(), 12);
    }

    proptest! {
        #[test]
        fn aligned_round_trip(addr in any::<u32>(), value in any::<u32>(), size_idx in 0usize..3) {
            let size = [1u32, 2, 4][size_idx];
            let addr = addr & !(size - 1);
            let mut mem = SparseMemory::new();
            mem.write(addr, value, size).unwrap();
            let mask = AccessSize::from_bytes(size).unwrap().mask();
            prop_assert_eq!(mem.read(addr, size).unwrap(), value & mask);
        }

        #[test]
        fn misaligned_always_rejected(addr in any::<u32>(), size_idx in 0usize..2) {
            let size = [2u32, 4][size_idx];
            prop_assume!(addr % size != 0);
            let mut mem = SparseMemory::new();
            let write_misaligned = matches!(
                mem.write(addr, 0, size),
                Err(MemError::MisalignedAccess { .. })
            );
            let read_misaligned = matches!(
                mem.read(addr, size),
                Err(MemError::MisalignedAccess { .. })
            );
            prop_assert!(write_misaligned);
            prop_assert!(read_misaligned);
        }
    }
}

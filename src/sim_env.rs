//! 程序装载
//!
//! 解析 RISC-V ELF32 可执行文件，把 PT_LOAD 段写入 `SparseMemory`，
//! 或整理成 kernel 指令表交给 `WarpKernelModel`。
//!
//! # 示例
//!
//! ```no_run
//! use simt_golden::cpu::ScalarCore;
//! use simt_golden::sim_env::load_elf_into_core;
//!
//! let mut core = ScalarCore::new();
//! load_elf_into_core("program.elf", &mut core).expect("failed to load ELF");
//! let commits = core.run(1000);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use elf::ElfBytes;
use elf::abi::{EM_RISCV, PF_W, PF_X, PT_LOAD};
use elf::endian::AnyEndian;
use elf::file::Class;
use thiserror::Error;
use tracing::{debug, info};

use crate::cpu::ScalarCore;
use crate::memory::{AccessSize, MemError, SparseMemory};

/// 装载错误
#[derive(Debug, Error)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ELF parse error: {0}")]
    ElfParse(String),
    #[error("memory error: {0}")]
    Memory(#[from] MemError),
}

/// 一个 PT_LOAD 段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfSegment {
    pub vaddr: u32,
    /// 文件中的数据，长度即 `p_filesz`
    pub data: Vec<u8>,
    /// 内存中的大小，超出 `data` 的部分为 BSS
    pub mem_size: u32,
    pub executable: bool,
    pub writable: bool,
}

impl ElfSegment {
    /// BSS 部分的长度
    pub fn bss_len(&self) -> u32 {
        self.mem_size - self.data.len() as u32
    }
}

/// 解析后的可执行映像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfImage {
    pub entry: u32,
    pub segments: Vec<ElfSegment>,
}

impl ElfImage {
    /// 从文件解析
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let data = fs::read(path.as_ref())?;
        Self::parse_bytes(&data)
    }

    /// 从字节解析，仅接受 RISC-V ELF32 小端
    pub fn parse_bytes(data: &[u8]) -> Result<Self, SimError> {
        let file = ElfBytes::<AnyEndian>::minimal_parse(data)
            .map_err(|e| SimError::ElfParse(format!("failed to parse ELF: {e}")))?;
        let header = &file.ehdr;

        if header.e_machine != EM_RISCV {
            return Err(SimError::ElfParse(format!(
                "not a RISC-V ELF (machine 0x{:x}, expected 0x{:x})",
                header.e_machine, EM_RISCV
            )));
        }
        if header.class != Class::ELF32 {
            return Err(SimError::ElfParse("only 32-bit ELF is supported".into()));
        }
        if header.endianness != AnyEndian::Little {
            return Err(SimError::ElfParse("only little-endian ELF is supported".into()));
        }

        let mut segments = Vec::new();
        let phdrs = file.segments().into_iter().flatten();
        for phdr in phdrs.filter(|p| p.p_type == PT_LOAD) {
            let data = file
                .segment_data(&phdr)
                .map_err(|e| SimError::ElfParse(format!("failed to read segment data: {e}")))?
                .to_vec();

            let vaddr = phdr.p_vaddr as u32;
            let mem_size = phdr.p_memsz as u32;
            if (mem_size as usize) < data.len() {
                return Err(SimError::ElfParse(format!(
                    "segment at 0x{vaddr:08x} has memsz 0x{mem_size:x} smaller than filesz 0x{:x}",
                    data.len()
                )));
            }
            if vaddr.checked_add(mem_size).is_none() {
                return Err(SimError::ElfParse(format!(
                    "segment at 0x{vaddr:08x} (0x{mem_size:x} bytes) wraps the address space"
                )));
            }

            segments.push(ElfSegment {
                vaddr,
                data,
                mem_size,
                executable: phdr.p_flags & PF_X != 0,
                writable: phdr.p_flags & PF_W != 0,
            });
        }

        debug!(entry = format_args!("0x{:08x}", header.e_entry), segments = segments.len(), "parsed ELF");
        Ok(ElfImage {
            entry: header.e_entry as u32,
            segments,
        })
    }

    /// 写入所有段并把 BSS 清零
    pub fn load_into(&self, memory: &mut SparseMemory) {
        for seg in &self.segments {
            memory.write_bytes(seg.vaddr, &seg.data);
            let bss = seg.bss_len();
            if bss > 0 {
                memory.fill(seg.vaddr + seg.data.len() as u32, bss as usize, 0);
            }
            debug!(
                vaddr = format_args!("0x{:08x}", seg.vaddr),
                filesz = seg.data.len(),
                memsz = seg.mem_size,
                "loaded segment"
            );
        }
    }

    /// 可执行段整理成 `{地址: 指令字}`，用于 `WarpKernelModel::load_kernel`
    ///
    /// 末尾不足 4 字节的部分被丢弃。
    pub fn instruction_words(&self) -> BTreeMap<u32, u32> {
        let mut words = BTreeMap::new();
        for seg in self.segments.iter().filter(|s| s.executable) {
            for (i, chunk) in seg.data.chunks_exact(4).enumerate() {
                let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                words.insert(seg.vaddr + (i as u32) * 4, word);
            }
        }
        words
    }
}

/// 把 ELF 装载进标量核的内存并把 PC 设为入口地址
pub fn load_elf_into_core<P: AsRef<Path>>(path: P, core: &mut ScalarCore) -> Result<ElfImage, SimError> {
    let image = ElfImage::parse(path.as_ref())?;
    if !AccessSize::Word.is_aligned(image.entry) {
        return Err(MemError::MisalignedAccess {
            addr: image.entry,
            access: AccessSize::Word,
        }
        .into());
    }
    image.load_into(core.memory_mut());
    core.set_pc(image.entry);
    info!(
        path = %path.as_ref().display(),
        entry = format_args!("0x{:08x}", image.entry),
        "ELF loaded"
    );
    Ok(image)
}

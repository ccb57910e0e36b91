//! 解码器框架
//!
//! 标量核只注册 RV32I；GPU warp 在 RV32I 之上再注册 SIMT 扩展。
//! 注册表构造完成后不可变，通过 `Arc` 在多个模型间共享。

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::isa::{DecodedInstr, opcode, rv32i::RV32I_DECODER, simt::SIMT_DECODER};

const OPCODE_SPACE: usize = 128;

/// 可插入注册表的解码器
pub trait InstrDecoder: Send + Sync {
    fn name(&self) -> &str;

    /// 不认识的编码返回 `None`，交给同桶的下一个解码器
    fn decode(&self, raw: u32) -> Option<DecodedInstr>;

    /// 声明负责的 opcode；`None` 表示全部
    fn handled_opcodes(&self) -> Option<&[u32]> {
        None
    }

    /// 为真时可以与其他同样允许共享的解码器挂在同一 opcode 上
    fn allow_opcode_overlap(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("opcode 0x{opcode:02X} already handled; rejecting decoder {decoder}")]
    OpcodeTaken { opcode: u32, decoder: String },
    #[error("wildcard decoder {decoder} cannot register due to overlap")]
    WildcardOverlap { decoder: String },
}

/// 按 opcode 分桶的解码器注册表
///
/// 同一桶内按注册顺序尝试，首个返回 `Some` 的解码器生效。
pub struct DecoderRegistry {
    decoders: Vec<Arc<dyn InstrDecoder>>,
    buckets: [Vec<usize>; OPCODE_SPACE],
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self {
            decoders: Vec::new(),
            buckets: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// 标量核：仅 RV32I
    pub fn scalar() -> Self {
        let mut registry = Self::new();
        let registered = registry.register(Arc::new(RV32I_DECODER));
        debug_assert!(registered.is_ok(), "RV32I rejected: {registered:?}");
        registry
    }

    /// warp：RV32I + SIMT 扩展，两者只在 OP_REG 上共享
    pub fn simt() -> Self {
        let mut registry = Self::scalar();
        let registered = registry.register(Arc::new(SIMT_DECODER));
        debug_assert!(registered.is_ok(), "SIMT rejected: {registered:?}");
        registry
    }

    /// 桶内是否已有独占解码器
    fn bucket_exclusive(&self, bucket: &[usize]) -> bool {
        bucket.iter().any(|&i| !self.decoders[i].allow_opcode_overlap())
    }

    fn target_buckets(decoder: &dyn InstrDecoder) -> Vec<usize> {
        match decoder.handled_opcodes() {
            Some(ops) => ops
                .iter()
                .map(|&op| op as usize)
                .filter(|&op| op < OPCODE_SPACE)
                .collect(),
            None => (0..OPCODE_SPACE).collect(),
        }
    }

    /// 注册一个解码器；失败时注册表保持原样
    pub fn register(&mut self, decoder: Arc<dyn InstrDecoder>) -> Result<(), RegistryError> {
        let targets = Self::target_buckets(decoder.as_ref());
        let shareable = decoder.allow_opcode_overlap();

        if decoder.handled_opcodes().is_none() {
            let occupied = self.buckets.iter().any(|b| !b.is_empty());
            let exclusive = self.buckets.iter().any(|b| self.bucket_exclusive(b));
            if exclusive || (occupied && !shareable) {
                return Err(RegistryError::WildcardOverlap { decoder: decoder.name().to_string() });
            }
        } else if let Some(&taken) = targets.iter().find(|&&op| {
            let bucket = &self.buckets[op];
            !bucket.is_empty() && (!shareable || self.bucket_exclusive(bucket))
        }) {
            return Err(RegistryError::OpcodeTaken {
                opcode: taken as u32,
                decoder: decoder.name().to_string(),
            });
        }

        let idx = self.decoders.len();
        for op in targets {
            self.buckets[op].push(idx);
        }
        self.decoders.push(decoder);
        Ok(())
    }

    /// 解码；没有解码器认识时返回 `Illegal`
    pub fn decode(&self, raw: u32) -> DecodedInstr {
        self.buckets[opcode(raw) as usize]
            .iter()
            .find_map(|&idx| self.decoders[idx].decode(raw))
            .unwrap_or_else(|| DecodedInstr::illegal(raw))
    }

    pub fn decoder_count(&self) -> usize {
        self.decoders.len()
    }

    pub fn decoder_names(&self) -> Vec<&str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::scalar()
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DecoderRegistry").field(&self.decoder_names()).finish()
    }
}

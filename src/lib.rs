//! simt_golden: RV32I 标量核与 SIMT warp 的黄金参考模型
//!
//! 本库为硬件验证提供可逐条比对的参考实现：
//! 标量核每一步产出一条 `CommitRecord`，warp 模型以轮转方式
//! 调度多个 8 lane warp 执行 kernel，并处理分支分歧与重汇聚。
//!
//! # 模块结构
//!
//! - `memory`: 稀疏字节寻址内存
//! - `isa`: 指令定义、表驱动解码与编码
//! - `exu`: 与执行上下文无关的指令求值
//! - `cpu`: 标量核参考模型
//! - `gpu`: SIMT warp 执行模型
//! - `scoreboard`: 硬件提交比对
//! - `sim_env`: ELF 装载

pub mod cpu;
pub mod exu;
pub mod gpu;
pub mod isa;
pub mod memory;
pub mod scoreboard;
pub mod sim_env;

pub use cpu::{CommitRecord, CoreBuilder, ScalarCore};
pub use gpu::{GpuConfig, KernelError, KernelStats, WarpKernelModel};
pub use memory::{MemError, Memory, SparseMemory};
pub use scoreboard::{CommitScoreboard, ObservedCommit, ScoreboardReport};

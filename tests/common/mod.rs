#![allow(dead_code)]

use std::collections::BTreeMap;

use simt_golden::gpu::{GpuConfig, WarpKernelModel};

/// 从 `base` 开始连续放置指令
pub fn program_at(base: u32, words: &[u32]) -> BTreeMap<u32, u32> {
    words
        .iter()
        .enumerate()
        .map(|(i, &w)| (base + i as u32 * 4, w))
        .collect()
}

pub fn program(words: &[u32]) -> BTreeMap<u32, u32> {
    program_at(0, words)
}

/// 配置好的 warp 模型，kernel 从地址 0 开始
pub fn kernel_model(
    config: GpuConfig,
    grid: (u32, u32, u32),
    block: (u32, u32, u32),
    words: &[u32],
) -> WarpKernelModel {
    let mut model = WarpKernelModel::with_config(config).expect("valid config");
    model.configure(grid, block, 0);
    model.load_kernel(program(words));
    model
}

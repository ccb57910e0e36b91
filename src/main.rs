//! simt_golden CLI
//!
//! 用法：
//!
//! ```text
//! simt_golden_cli                     # 运行内置的标量与 SIMT 演示
//! simt_golden_cli program.elf [steps] # 在标量核上运行 ELF
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `info`。

use std::collections::BTreeMap;
use std::process;

use simt_golden::cpu::ScalarCore;
use simt_golden::gpu::{Dim3, WarpKernelModel};
use simt_golden::isa::encode;
use simt_golden::isa::simt::{SREG_BID_X, SREG_TID_X};
use simt_golden::sim_env::load_elf_into_core;
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_STEPS: u64 = 100_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [] => run_demos(),
        [path] => run_elf(path, DEFAULT_MAX_STEPS),
        [path, steps] => match steps.parse::<u64>() {
            Ok(steps) => run_elf(path, steps),
            Err(err) => Err(format!("invalid step count {steps:?}: {err}")),
        },
        _ => Err("usage: simt_golden_cli [program.elf] [max_steps]".to_string()),
    };

    if let Err(err) = result {
        eprintln!("simt_golden_cli: {err}");
        process::exit(1);
    }
}

fn run_elf(path: &str, max_steps: u64) -> Result<(), String> {
    let mut core = ScalarCore::new();
    load_elf_into_core(path, &mut core).map_err(|e| e.to_string())?;

    let commits = core.run(max_steps);
    for rec in &commits {
        println!("{rec}");
    }
    println!("retired {} instructions", core.cycle_count());
    if let Some(trap) = core.last_trap() {
        println!("stopped on trap: {} at 0x{:08x}", trap.cause, trap.pc);
    }
    core.dump_regs();
    Ok(())
}

fn run_demos() -> Result<(), String> {
    println!("=== simt_golden: RV32I + SIMT 参考模型 ===\n");
    demo_scalar_sum()?;
    println!();
    demo_warp_squares()
}

/// 从地址 0 开始连续放置指令
fn program(words: &[u32]) -> BTreeMap<u32, u32> {
    words
        .iter()
        .enumerate()
        .map(|(i, &w)| (i as u32 * 4, w))
        .collect()
}

/// 标量核：计算 1 + 2 + ... + 10 = 55，以非法指令结束
fn demo_scalar_sum() -> Result<(), String> {
    let words = [
        encode::addi(1, 0, 0),  // x1 = sum = 0
        encode::addi(2, 0, 1),  // x2 = i = 1
        encode::addi(3, 0, 11), // x3 = limit = 11
        encode::add(1, 1, 2),   // loop: sum += i
        encode::addi(2, 2, 1),  // i++
        encode::blt(2, 3, -8),  // if i < limit goto loop
        0x0000_0000,            // 非法指令，进入 trap
    ];

    let mut core = ScalarCore::new();
    core.load_program(&program(&words)).map_err(|e| e.to_string())?;
    let commits = core.run(1000);

    println!("标量核: 执行 {} 条指令", core.cycle_count());
    if let Some(last) = commits.last() {
        println!("最后一条提交: {last}");
    }
    let sum = core.read_reg(1);
    println!("x1 = {sum} (预期 55)");
    if sum != 55 {
        return Err(format!("scalar demo produced {sum}, expected 55"));
    }
    Ok(())
}

/// SIMT：每个线程写出 gid * gid，gid = bid.x * 8 + tid.x
fn demo_warp_squares() -> Result<(), String> {
    const OUT_BASE: i32 = 0x100;

    let words = [
        encode::vmov(1, SREG_TID_X),   // x1 = tid.x
        encode::vmov(2, SREG_BID_X),   // x2 = bid.x
        encode::slli(3, 2, 3),         // x3 = bid.x * 8
        encode::add(3, 3, 1),          // x3 = gid
        encode::vmul(4, 3, 3),         // x4 = gid * gid
        encode::slli(5, 3, 2),         // x5 = gid * 4
        encode::sw(5, 4, OUT_BASE),    // out[gid] = x4
        encode::vret(),
    ];

    let grid = Dim3::new(2, 1, 1);
    let block = Dim3::new(8, 1, 1);
    let mut model = WarpKernelModel::new();
    model.configure(grid, block, 0);
    model.load_kernel(program(&words));
    let stats = model.execute_kernel().map_err(|e| e.to_string())?;

    println!(
        "SIMT: grid={grid} block={block} warps={} cycles={}",
        stats.completed_warps, stats.cycles
    );
    for gid in 0..16u32 {
        let value = model
            .mem_read(OUT_BASE as u32 + gid * 4, 4)
            .map_err(|e| e.to_string())?;
        if value != gid * gid {
            return Err(format!("out[{gid}] = {value}, expected {}", gid * gid));
        }
    }
    println!("out[0..16] = gid^2 ✓");
    Ok(())
}

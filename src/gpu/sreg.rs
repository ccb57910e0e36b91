//! 特殊寄存器：线程与 block 坐标

use std::fmt;

use crate::isa::simt::{SREG_BID_X, SREG_BID_Y, SREG_BID_Z, SREG_TID_X, SREG_TID_Y, SREG_TID_Z};

/// 三维坐标 / 维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// 元素总数
    pub fn volume(&self) -> u64 {
        u64::from(self.x) * u64::from(self.y) * u64::from(self.z)
    }
}

impl From<(u32, u32, u32)> for Dim3 {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 计算 lane 在 block 内的三维线程号
///
/// block 内线性编号为 `warp_in_block * warp_size + lane`，再按 block 维度拆分。
/// 调用方保证 `block_dim` 各维非零（零维 block 不会产生 warp）。
pub fn thread_id(block_dim: Dim3, warp_size: u32, warp_in_block: u32, lane: u32) -> Dim3 {
    let t = warp_in_block * warp_size + lane;
    let (bx, by) = (block_dim.x, block_dim.y);
    Dim3 {
        x: t % bx,
        y: (t / bx) % by,
        z: t / (bx * by),
    }
}

/// 读取特殊寄存器，未定义的编号读出 0
pub fn read(sreg: u8, tid: Dim3, bid: Dim3) -> u32 {
    match sreg {
        SREG_TID_X => tid.x,
        SREG_TID_Y => tid.y,
        SREG_TID_Z => tid.z,
        SREG_BID_X => bid.x,
        SREG_BID_Y => bid.y,
        SREG_BID_Z => bid.z,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_linear() {
        let block = Dim3::new(8, 1, 1);
        assert_eq!(thread_id(block, 8, 0, 5), Dim3::new(5, 0, 0));
    }

    #[test]
    fn test_thread_id_3d() {
        // block 4x2x2，第二个 warp 的 lane 3 → t = 11
        let block = Dim3::new(4, 2, 2);
        assert_eq!(thread_id(block, 8, 1, 3), Dim3::new(3, 0, 1));
        // t = 6
        assert_eq!(thread_id(block, 8, 0, 6), Dim3::new(2, 1, 0));
    }

    #[test]
    fn test_read_special() {
        let tid = Dim3::new(1, 2, 3);
        let bid = Dim3::new(4, 5, 6);
        let values: Vec<u32> = (0..8).map(|s| read(s, tid, bid)).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 0, 0]);
    }
}

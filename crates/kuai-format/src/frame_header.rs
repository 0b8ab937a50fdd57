//! 帧头部编解码.
//!
//! 每帧 8 字节:
//!
//! ```text
//! [size: 3 字节大端][dts: 4 字节大端][pts - dts: 1 字节, 0xFF 表示无 pts]
//! ```
//!
//! `dts` 只携带时间戳的低 32 位, 接收端用 `TimestampReconstructor` 还原.
//! `pts - dts` 只能表示 `0..=254`, 超出范围时按饱和截断并报告, 不做按位回绕.

use byteorder::{BigEndian, ByteOrder};
use kuai_core::{KuaiError, KuaiResult};
use log::warn;

/// 帧头部长度 (字节)
pub const FRAME_HEADER_SIZE: usize = 3 + 4 + 1;

/// `pts_delta` 字节中表示"无 pts"的取值
pub const PTS_ABSENT: u8 = 0xFF;

/// 可表示的最大 `pts - dts`
pub const MAX_PTS_DELTA: u8 = 254;

/// 单帧负载的最大长度 (24 位)
pub const MAX_FRAME_SIZE: usize = (1 << 24) - 1;

/// 帧头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// 负载长度 (24 位)
    pub size: u32,
    /// 解码时间戳的低 32 位
    pub dts: i32,
    /// `pts - dts`, `None` 表示没有独立的 pts
    pub pts_delta: Option<u8>,
}

/// 计算 `pts - dts` 并饱和到 `0..=254`
///
/// 返回 (差值, 是否发生了截断).
pub fn clamp_pts_delta(dts: i64, pts: i64) -> (u8, bool) {
    let delta = pts.saturating_sub(dts);
    if delta < 0 {
        (0, true)
    } else if delta > i64::from(MAX_PTS_DELTA) {
        (MAX_PTS_DELTA, true)
    } else {
        (delta as u8, false)
    }
}

impl FrameHeader {
    /// 由负载长度和线上时间基下的完整时间戳构造帧头部
    ///
    /// - `size` 超过 24 位返回 `InvalidArgument`
    /// - `dts` 只保留低 32 位
    /// - `pts - dts` 超出 `0..=254` 时截断并输出警告
    pub fn with_timestamps(size: usize, dts: i64, pts: Option<i64>) -> KuaiResult<Self> {
        if size > MAX_FRAME_SIZE {
            return Err(KuaiError::InvalidArgument(format!(
                "帧长度 {size} 超过 24 位上限"
            )));
        }
        let pts_delta = pts.map(|pts| {
            let (delta, clamped) = clamp_pts_delta(dts, pts);
            if clamped {
                warn!(
                    "pts - dts = {} 超出可表示范围, 截断为 {}",
                    pts.saturating_sub(dts),
                    delta
                );
            }
            delta
        });
        Ok(Self {
            size: size as u32,
            dts: dts as i32,
            pts_delta,
        })
    }

    /// 写入 8 字节帧头部
    pub fn write_to(&self, buf: &mut [u8]) {
        BigEndian::write_u24(&mut buf[0..3], self.size);
        BigEndian::write_i32(&mut buf[3..7], self.dts);
        buf[7] = self.pts_delta.unwrap_or(PTS_ABSENT);
    }

    /// 编码为 8 字节
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        self.write_to(&mut buf);
        buf
    }

    /// 从 8 字节解析帧头部
    pub fn parse(data: &[u8]) -> KuaiResult<Self> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(KuaiError::MalformedChunk(format!(
                "帧头部需要 {FRAME_HEADER_SIZE} 字节, 实际 {}",
                data.len()
            )));
        }
        let pts_delta = match data[7] {
            PTS_ABSENT => None,
            delta => Some(delta),
        };
        Ok(Self {
            size: BigEndian::read_u24(&data[0..3]),
            dts: BigEndian::read_i32(&data[3..7]),
            pts_delta,
        })
    }

    /// dts 低 32 位 (无符号)
    pub fn dts_low(&self) -> u32 {
        self.dts as u32
    }
}

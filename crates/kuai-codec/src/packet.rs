//! 压缩数据包 (Packet).
//!
//! 生产端从数据源读取的一帧, 以及消费端交给解码器的一帧, 都用 `Packet` 表示.

use bytes::Bytes;
use kuai_core::Rational;
use kuai_core::timestamp::NOPTS_VALUE;

/// 压缩数据包
#[derive(Debug, Clone)]
pub struct Packet {
    /// 压缩数据
    pub data: Bytes,
    /// 显示时间戳 (PTS), `NOPTS_VALUE` 表示未知
    pub pts: i64,
    /// 解码时间戳 (DTS), `NOPTS_VALUE` 表示未知
    pub dts: i64,
    /// 数据包时长 (以 time_base 为单位, 0 表示未知)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 所属流的索引
    pub stream_index: usize,
    /// 是否为关键帧
    pub is_keyframe: bool,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: NOPTS_VALUE,
            dts: NOPTS_VALUE,
            duration: 0,
            time_base: Rational::UNDEFINED,
            stream_index: 0,
            is_keyframe: false,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// PTS, 未知时为 `None`
    pub fn pts(&self) -> Option<i64> {
        (self.pts != NOPTS_VALUE).then_some(self.pts)
    }

    /// DTS, 未知时为 `None`
    pub fn dts(&self) -> Option<i64> {
        (self.dts != NOPTS_VALUE).then_some(self.dts)
    }
}

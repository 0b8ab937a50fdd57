//! 编解码器线上编号表.
//!
//! 块的流头部第一个字节是线上编解码器编号:
//! - `0`: 未知, 对应的帧不会被发送
//! - `1..=127`: 视频编解码器
//! - `128..=255`: 音频编解码器
//!
//! 取值范围本身就是媒体类型标签, 块中不再携带单独的类型字段.

use kuai_core::MediaType;
use log::warn;
use std::fmt;

use crate::codec_id::CodecId;

/// 线上编解码器编号 (1 字节)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WireCodecId(pub u8);

impl WireCodecId {
    /// 未知编解码器
    pub const UNKNOWN: Self = Self(0);

    /// 按取值范围判断媒体类型, `0` 返回 `None`
    pub const fn media_type(&self) -> Option<MediaType> {
        match self.0 {
            0 => None,
            1..=127 => Some(MediaType::Video),
            _ => Some(MediaType::Audio),
        }
    }

    /// 是否为未知编号
    pub const fn is_unknown(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WireCodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 内部标识 <-> 线上编号映射表
///
/// 同一线上编号可以对应多个内部标识 (编码方向多对一);
/// 解码方向取表中该编号的第一条记录, 因此规范解码目标排在前面.
const WIRE_TABLE: &[(CodecId, u8)] = &[
    // 视频
    (CodecId::Mpeg2Video, 1),
    (CodecId::Mpeg1Video, 1),
    (CodecId::H261, 2),
    (CodecId::H263p, 3),
    (CodecId::H263, 3),
    (CodecId::Mjpeg, 4),
    (CodecId::Mpeg4, 5),
    (CodecId::Flv1, 6),
    (CodecId::Svq3, 7),
    (CodecId::DvVideo, 8),
    (CodecId::H264, 9),
    (CodecId::Theora, 10),
    (CodecId::Vp3, 10),
    (CodecId::Snow, 11),
    (CodecId::Vp6, 12),
    (CodecId::Dirac, 13),
    // 音频
    (CodecId::Mp3, 129),
    (CodecId::Mp2, 129),
    (CodecId::Aac, 130),
    (CodecId::Ac3, 131),
    (CodecId::Vorbis, 132),
];

/// 内部标识 -> 线上编号
///
/// 不在表中的编解码器返回 [`WireCodecId::UNKNOWN`] 并输出警告.
pub fn to_wire(codec_id: CodecId) -> WireCodecId {
    match WIRE_TABLE.iter().find(|(id, _)| *id == codec_id) {
        Some(&(_, wire)) => WireCodecId(wire),
        None => {
            warn!("编解码器 {} 没有线上编号", codec_id);
            WireCodecId::UNKNOWN
        }
    }
}

/// 线上编号 -> 内部标识
///
/// 无法识别的编号返回 `None` 并输出警告.
pub fn from_wire(wire: WireCodecId) -> Option<CodecId> {
    let found = WIRE_TABLE
        .iter()
        .find(|(_, w)| *w == wire.0)
        .map(|&(id, _)| id);
    if found.is_none() {
        warn!("无法识别的线上编解码器编号 {}", wire);
    }
    found
}

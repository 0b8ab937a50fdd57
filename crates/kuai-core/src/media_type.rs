//! 媒体类型与媒体选择掩码.
//!
//! 一个块流中只承载视频和音频两类媒体, 由线上编解码器编号的取值范围区分.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

use crate::error::KuaiError;

/// 媒体流类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// 视频流
    Video,
    /// 音频流
    Audio,
    /// 其他 (字幕、数据等, 不参与分块)
    Data,
}

impl MediaType {
    /// 对应的选择位, `Data` 没有选择位
    pub const fn selection(&self) -> MediaSelection {
        match self {
            Self::Video => MediaSelection::VIDEO,
            Self::Audio => MediaSelection::AUDIO,
            Self::Data => MediaSelection::empty(),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "视频",
            Self::Audio => "音频",
            Self::Data => "数据",
        };
        write!(f, "{name}")
    }
}

bitflags! {
    /// 媒体选择位掩码
    ///
    /// 生产端用于限制参与分块的流, 消费端用于限制接受解码的媒体类型.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MediaSelection: u8 {
        /// 视频 (bit 0)
        const VIDEO = 1 << 0;
        /// 音频 (bit 1)
        const AUDIO = 1 << 1;
        /// 音视频
        const AV = Self::VIDEO.bits() | Self::AUDIO.bits();
    }
}

impl MediaSelection {
    /// 是否选中指定媒体类型
    pub fn accepts(&self, media_type: MediaType) -> bool {
        let bit = media_type.selection();
        !bit.is_empty() && self.contains(bit)
    }

    /// 配置字符串中使用的名称
    pub fn name(&self) -> &'static str {
        if *self == Self::AV {
            "av"
        } else if *self == Self::VIDEO {
            "video"
        } else if *self == Self::AUDIO {
            "audio"
        } else {
            "none"
        }
    }
}

impl FromStr for MediaSelection {
    type Err = KuaiError;

    /// 解析 `audio` / `video` / `av`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::VIDEO),
            "audio" => Ok(Self::AUDIO),
            "av" => Ok(Self::AV),
            other => Err(KuaiError::InvalidArgument(format!(
                "无法识别的媒体选择: {other}"
            ))),
        }
    }
}

impl fmt::Display for MediaSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

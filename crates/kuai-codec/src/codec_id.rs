//! 编解码器标识符.
//!
//! 为每种编解码算法分配唯一的内部标识, 与线上编号无关.

use kuai_core::MediaType;
use std::fmt;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,

    // ========================
    // 视频编解码器
    // ========================
    /// MPEG-1 Video
    Mpeg1Video,
    /// MPEG-2 Video
    Mpeg2Video,
    /// H.261
    H261,
    /// H.263
    H263,
    /// H.263+ (H.263 version 2)
    H263p,
    /// Motion JPEG
    Mjpeg,
    /// MPEG-4 Part 2 (ASP)
    Mpeg4,
    /// Sorenson Spark (FLV1)
    Flv1,
    /// Sorenson Video 3
    Svq3,
    /// DV Video
    DvVideo,
    /// H.264 / AVC
    H264,
    /// Theora
    Theora,
    /// On2 VP3
    Vp3,
    /// Snow
    Snow,
    /// On2 VP6
    Vp6,
    /// Dirac
    Dirac,
    /// H.265 / HEVC (无线上编号)
    H265,
    /// VP8 (无线上编号)
    Vp8,
    /// VP9 (无线上编号)
    Vp9,
    /// AV1 (无线上编号)
    Av1,

    // ========================
    // 音频编解码器
    // ========================
    /// MP2 (MPEG Audio Layer II)
    Mp2,
    /// MP3 (MPEG Audio Layer III)
    Mp3,
    /// AAC (Advanced Audio Coding)
    Aac,
    /// AC-3 (Dolby Digital)
    Ac3,
    /// Vorbis
    Vorbis,
    /// Opus (无线上编号)
    Opus,
    /// FLAC (无线上编号)
    Flac,
    /// PCM 有符号 16 位小端 (无线上编号)
    PcmS16le,
}

impl CodecId {
    /// 获取编解码器对应的媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::None => MediaType::Data,

            Self::Mpeg1Video
            | Self::Mpeg2Video
            | Self::H261
            | Self::H263
            | Self::H263p
            | Self::Mjpeg
            | Self::Mpeg4
            | Self::Flv1
            | Self::Svq3
            | Self::DvVideo
            | Self::H264
            | Self::Theora
            | Self::Vp3
            | Self::Snow
            | Self::Vp6
            | Self::Dirac
            | Self::H265
            | Self::Vp8
            | Self::Vp9
            | Self::Av1 => MediaType::Video,

            Self::Mp2
            | Self::Mp3
            | Self::Aac
            | Self::Ac3
            | Self::Vorbis
            | Self::Opus
            | Self::Flac
            | Self::PcmS16le => MediaType::Audio,
        }
    }

    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mpeg1Video => "mpeg1video",
            Self::Mpeg2Video => "mpeg2video",
            Self::H261 => "h261",
            Self::H263 => "h263",
            Self::H263p => "h263p",
            Self::Mjpeg => "mjpeg",
            Self::Mpeg4 => "mpeg4",
            Self::Flv1 => "flv1",
            Self::Svq3 => "svq3",
            Self::DvVideo => "dvvideo",
            Self::H264 => "h264",
            Self::Theora => "theora",
            Self::Vp3 => "vp3",
            Self::Snow => "snow",
            Self::Vp6 => "vp6",
            Self::Dirac => "dirac",
            Self::H265 => "hevc",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::Mp2 => "mp2",
            Self::Mp3 => "mp3",
            Self::Aac => "aac",
            Self::Ac3 => "ac3",
            Self::Vorbis => "vorbis",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::PcmS16le => "pcm_s16le",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

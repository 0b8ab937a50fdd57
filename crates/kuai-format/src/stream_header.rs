//! 流头部编解码.
//!
//! 每个块以流头部开始, 布局由媒体类型完全决定:
//!
//! ```text
//! 视频 (10 字节): [codec:1][width:2][height:2][rate_num:2][rate_den:2][frame_count:1]
//! 音频 (7 字节):  [codec:1][channels:1][sample_rate:2][frame_size:2][frame_count:1]
//! ```
//!
//! 多字节字段均为大端. 第一个字节的线上编号范围决定媒体类型.

use byteorder::{BigEndian, ByteOrder};
use kuai_codec::{WireCodecId, wire};
use kuai_core::{KuaiError, KuaiResult, MediaType, Rational};

use crate::stream::{Stream, StreamParams};

/// 视频流头部长度 (含帧数字节)
pub const VIDEO_HEADER_SIZE: usize = 1 + 2 + 2 + 2 + 2 + 1;

/// 音频流头部长度 (含帧数字节)
pub const AUDIO_HEADER_SIZE: usize = 1 + 1 + 2 + 2 + 1;

/// 视频流头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoHeader {
    pub codec: WireCodecId,
    pub width: u16,
    pub height: u16,
    pub frame_rate_num: u16,
    pub frame_rate_den: u16,
}

/// 音频流头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioHeader {
    pub codec: WireCodecId,
    pub channels: u8,
    pub sample_rate: u16,
    pub frame_size: u16,
}

/// 流头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamHeader {
    Video(VideoHeader),
    Audio(AudioHeader),
}

/// 把帧率比例缩放到 16 位以内
///
/// 分子或分母超过 65535 时, 两者除以同一个因子 (四舍五入); 分母至少为 1.
pub fn scale_rate(num: u32, den: u32) -> (u16, u16) {
    let den = den.max(1);
    let factor = num.max(den).div_ceil(u32::from(u16::MAX)).max(1);
    let num = (num + factor / 2) / factor;
    let den = ((den + factor / 2) / factor).max(1);
    (num as u16, den as u16)
}

fn to_u16(value: u32, what: &str) -> KuaiResult<u16> {
    u16::try_from(value)
        .map_err(|_| KuaiError::InvalidArgument(format!("{what} = {value} 超出 16 位")))
}

impl VideoHeader {
    /// 编码方向: 检查取值范围, 帧率按需缩放
    pub fn new(codec: WireCodecId, width: u32, height: u32, frame_rate: Rational) -> KuaiResult<Self> {
        if !frame_rate.is_positive() {
            return Err(KuaiError::InvalidArgument(format!(
                "无效帧率 {frame_rate}"
            )));
        }
        let (frame_rate_num, frame_rate_den) =
            scale_rate(frame_rate.num as u32, frame_rate.den as u32);
        Ok(Self {
            codec,
            width: to_u16(width, "宽度")?,
            height: to_u16(height, "高度")?,
            frame_rate_num,
            frame_rate_den,
        })
    }

    /// 编码为 10 字节, 帧数字节为 0 占位
    pub fn encode(&self) -> [u8; VIDEO_HEADER_SIZE] {
        let mut buf = [0u8; VIDEO_HEADER_SIZE];
        buf[0] = self.codec.0;
        BigEndian::write_u16(&mut buf[1..3], self.width);
        BigEndian::write_u16(&mut buf[3..5], self.height);
        BigEndian::write_u16(&mut buf[5..7], self.frame_rate_num);
        BigEndian::write_u16(&mut buf[7..9], self.frame_rate_den);
        buf
    }

    /// 从块首部解析
    pub fn decode(data: &[u8]) -> KuaiResult<Self> {
        check_len(data, VIDEO_HEADER_SIZE)?;
        Ok(Self {
            codec: WireCodecId(data[0]),
            width: BigEndian::read_u16(&data[1..3]),
            height: BigEndian::read_u16(&data[3..5]),
            frame_rate_num: BigEndian::read_u16(&data[5..7]),
            frame_rate_den: BigEndian::read_u16(&data[7..9]),
        })
    }
}

impl AudioHeader {
    /// 编码方向: 检查取值范围
    pub fn new(codec: WireCodecId, channels: u32, sample_rate: u32, frame_size: u32) -> KuaiResult<Self> {
        let channels = u8::try_from(channels)
            .map_err(|_| KuaiError::InvalidArgument(format!("声道数 {channels} 超出 8 位")))?;
        if sample_rate == 0 {
            return Err(KuaiError::InvalidArgument("采样率为 0".into()));
        }
        Ok(Self {
            codec,
            channels,
            sample_rate: to_u16(sample_rate, "采样率")?,
            frame_size: to_u16(frame_size, "帧长")?,
        })
    }

    /// 编码为 7 字节, 帧数字节为 0 占位
    pub fn encode(&self) -> [u8; AUDIO_HEADER_SIZE] {
        let mut buf = [0u8; AUDIO_HEADER_SIZE];
        buf[0] = self.codec.0;
        buf[1] = self.channels;
        BigEndian::write_u16(&mut buf[2..4], self.sample_rate);
        BigEndian::write_u16(&mut buf[4..6], self.frame_size);
        buf
    }

    /// 从块首部解析
    pub fn decode(data: &[u8]) -> KuaiResult<Self> {
        check_len(data, AUDIO_HEADER_SIZE)?;
        Ok(Self {
            codec: WireCodecId(data[0]),
            channels: data[1],
            sample_rate: BigEndian::read_u16(&data[2..4]),
            frame_size: BigEndian::read_u16(&data[4..6]),
        })
    }
}

fn check_len(data: &[u8], need: usize) -> KuaiResult<()> {
    if data.len() < need {
        return Err(KuaiError::MalformedChunk(format!(
            "流头部需要 {need} 字节, 实际 {}",
            data.len()
        )));
    }
    Ok(())
}

/// 指定媒体类型的流头部长度
pub fn header_size(media_type: MediaType) -> Option<usize> {
    match media_type {
        MediaType::Video => Some(VIDEO_HEADER_SIZE),
        MediaType::Audio => Some(AUDIO_HEADER_SIZE),
        MediaType::Data => None,
    }
}

impl StreamHeader {
    /// 由数据源的流信息生成流头部
    ///
    /// 编解码器没有线上编号时返回 `UnknownCodec`.
    /// 视频帧率无效时回退到时间基的倒数.
    pub fn from_stream(stream: &Stream) -> KuaiResult<Self> {
        let codec = wire::to_wire(stream.codec_id);
        if codec.is_unknown() {
            return Err(KuaiError::UnknownCodec(stream.codec_id.name().to_string()));
        }
        match &stream.params {
            StreamParams::Video(v) => {
                let rate = if v.frame_rate.is_positive() {
                    v.frame_rate
                } else {
                    stream.time_base.invert()
                };
                Ok(Self::Video(VideoHeader::new(codec, v.width, v.height, rate)?))
            }
            StreamParams::Audio(a) => Ok(Self::Audio(AudioHeader::new(
                codec,
                a.channels,
                a.sample_rate,
                a.frame_size,
            )?)),
            StreamParams::Other => Err(KuaiError::InvalidArgument(format!(
                "流 #{} 不是音视频流",
                stream.index
            ))),
        }
    }

    /// 解析块首部的流头部
    ///
    /// 线上编号为 0 或不在编号表中时返回 `UnknownCodec`.
    pub fn parse(data: &[u8]) -> KuaiResult<Self> {
        let first = *data
            .first()
            .ok_or_else(|| KuaiError::MalformedChunk("空块".into()))?;
        let codec = WireCodecId(first);
        let media_type = codec
            .media_type()
            .ok_or_else(|| KuaiError::UnknownCodec(codec.to_string()))?;
        if wire::from_wire(codec).is_none() {
            return Err(KuaiError::UnknownCodec(codec.to_string()));
        }
        match media_type {
            MediaType::Video => Ok(Self::Video(VideoHeader::decode(data)?)),
            _ => Ok(Self::Audio(AudioHeader::decode(data)?)),
        }
    }

    /// 媒体类型
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Video(_) => MediaType::Video,
            Self::Audio(_) => MediaType::Audio,
        }
    }

    /// 线上编解码器编号
    pub fn codec(&self) -> WireCodecId {
        match self {
            Self::Video(v) => v.codec,
            Self::Audio(a) => a.codec,
        }
    }

    /// 头部长度 (含帧数字节)
    pub fn size(&self) -> usize {
        match self {
            Self::Video(_) => VIDEO_HEADER_SIZE,
            Self::Audio(_) => AUDIO_HEADER_SIZE,
        }
    }

    /// 线上时间戳使用的时间基
    ///
    /// 视频为帧率的倒数; 音频为 `frame_size / sample_rate`,
    /// `frame_size` 为 0 (可变帧长) 时为 `1 / sample_rate`.
    pub fn time_base(&self) -> Rational {
        match self {
            Self::Video(v) if v.frame_rate_num > 0 && v.frame_rate_den > 0 => Rational::new(
                i32::from(v.frame_rate_den),
                i32::from(v.frame_rate_num),
            ),
            Self::Audio(a) if a.sample_rate > 0 => Rational::new(
                i32::from(a.frame_size.max(1)),
                i32::from(a.sample_rate),
            ),
            _ => Rational::UNDEFINED,
        }
    }

    /// 写入头部字段和帧数
    ///
    /// `buf` 至少为 [`StreamHeader::size`] 字节.
    pub fn write_to(&self, buf: &mut [u8], frame_count: u8) {
        let size = self.size();
        match self {
            Self::Video(v) => buf[..size].copy_from_slice(&v.encode()),
            Self::Audio(a) => buf[..size].copy_from_slice(&a.encode()),
        }
        buf[size - 1] = frame_count;
    }
}

/// 读取块的帧数字节
pub fn read_frame_count(data: &[u8], media_type: MediaType) -> KuaiResult<u8> {
    let size = header_size(media_type)
        .ok_or_else(|| KuaiError::InvalidArgument(format!("{media_type}没有流头部")))?;
    check_len(data, size)?;
    Ok(data[size - 1])
}

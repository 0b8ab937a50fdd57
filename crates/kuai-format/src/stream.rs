//! 流信息定义.
//!
//! 描述数据源中的一条音视频流. 分块器据此生成流头部和线上时间基.

use kuai_codec::CodecId;
use kuai_core::{MediaType, Rational};

/// 流信息
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在数据源中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 数据包时间戳使用的时间基
    pub time_base: Rational,
    /// 流特定参数
    pub params: StreamParams,
}

/// 流特定参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamParams {
    /// 视频流参数
    Video(VideoStreamParams),
    /// 音频流参数
    Audio(AudioStreamParams),
    /// 其他
    Other,
}

/// 视频流参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStreamParams {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
    /// 帧率 (平均帧率, 无效时回退到时间基的倒数)
    pub frame_rate: Rational,
}

/// 音频流参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 每帧采样数 (如 AAC 为 1024, MP3 为 1152; 0 表示可变)
    pub frame_size: u32,
}

impl Stream {
    /// 创建视频流描述
    pub fn video(
        index: usize,
        codec_id: CodecId,
        time_base: Rational,
        width: u32,
        height: u32,
        frame_rate: Rational,
    ) -> Self {
        Self {
            index,
            media_type: MediaType::Video,
            codec_id,
            time_base,
            params: StreamParams::Video(VideoStreamParams {
                width,
                height,
                frame_rate,
            }),
        }
    }

    /// 创建音频流描述
    pub fn audio(
        index: usize,
        codec_id: CodecId,
        time_base: Rational,
        sample_rate: u32,
        channels: u32,
        frame_size: u32,
    ) -> Self {
        Self {
            index,
            media_type: MediaType::Audio,
            codec_id,
            time_base,
            params: StreamParams::Audio(AudioStreamParams {
                sample_rate,
                channels,
                frame_size,
            }),
        }
    }

    /// 标称帧间隔 (微秒), 无法确定时为 0
    ///
    /// 视频取帧率的倒数, 音频取 `frame_size / sample_rate`.
    /// 外部调度器按此节奏驱动分块.
    pub fn period_us(&self) -> i64 {
        match &self.params {
            StreamParams::Video(v) if v.frame_rate.is_positive() => {
                1_000_000 * i64::from(v.frame_rate.den) / i64::from(v.frame_rate.num)
            }
            StreamParams::Audio(a) if a.sample_rate > 0 && a.frame_size > 0 => {
                1_000_000 * i64::from(a.frame_size) / i64::from(a.sample_rate)
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_帧间隔() {
        let v = Stream::video(0, CodecId::H264, Rational::new(1, 90000), 640, 480, Rational::new(25, 1));
        assert_eq!(v.period_us(), 40_000);
        let a = Stream::audio(1, CodecId::Aac, Rational::new(1, 48000), 48000, 2, 1024);
        assert_eq!(a.period_us(), 21_333);
        let unknown = Stream::video(2, CodecId::H264, Rational::new(1, 90000), 640, 480, Rational::UNDEFINED);
        assert_eq!(unknown.period_us(), 0);
    }
}

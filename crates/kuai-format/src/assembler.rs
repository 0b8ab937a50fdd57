//! 块聚合器.
//!
//! 把同一媒体类型的连续帧聚合为一个块. 每种媒体类型独立维护一个批次:
//!
//! ```text
//! Empty --首帧--> Accumulating --帧数达到上限 / 流头部变化 / flush--> 封块 --> Empty
//! ```
//!
//! 批次缓冲区在首帧时分配, 布局为 `[流头部预留][帧头部...][负载...]`.
//! 新帧的帧头部插入到帧头部区的末尾, 负载追加到缓冲区末尾.
//! 流头部和帧数字节在封块时写入.

use std::collections::VecDeque;

use bytes::Bytes;
use kuai_codec::Packet;
use kuai_core::timestamp::{NOPTS_VALUE, rescale_q};
use kuai_core::{KuaiError, KuaiResult, MediaType, Rational};
use log::{debug, warn};

use crate::config::ChunkiserConfig;
use crate::frame_header::{FRAME_HEADER_SIZE, FrameHeader};
use crate::selector::StreamSelector;
use crate::stream::Stream;
use crate::stream_header::StreamHeader;

/// 一个完整的块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 块数据 (流头部 + 帧头部 + 负载)
    pub data: Bytes,
    /// 媒体类型
    pub media_type: MediaType,
    /// 帧数
    pub frame_count: u8,
    /// 最后一帧的解码时间 (微秒, 含循环偏移)
    pub ts: i64,
}

impl Chunk {
    /// 块长度 (字节)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空块
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 正在聚合的批次
struct Batch {
    header: StreamHeader,
    stream_index: usize,
    buf: Vec<u8>,
    /// 帧头部区的结束位置
    headers_end: usize,
    frame_count: u8,
    ts: i64,
}

impl Batch {
    /// 分配首帧所需空间并预留流头部区
    fn start(
        header: StreamHeader,
        stream_index: usize,
        frames_max: u8,
        payload_len: usize,
    ) -> KuaiResult<Self> {
        let mut buf = Vec::new();
        buf.try_reserve(header.size() + FRAME_HEADER_SIZE * usize::from(frames_max) + payload_len)?;
        buf.resize(header.size(), 0);
        Ok(Self {
            header,
            stream_index,
            headers_end: buf.len(),
            buf,
            frame_count: 0,
            ts: 0,
        })
    }

    fn append(&mut self, frame: &FrameHeader, payload: &[u8], ts: i64) -> KuaiResult<()> {
        self.buf.try_reserve(FRAME_HEADER_SIZE + payload.len())?;
        self.buf
            .splice(self.headers_end..self.headers_end, frame.to_bytes());
        self.headers_end += FRAME_HEADER_SIZE;
        self.buf.extend_from_slice(payload);
        self.frame_count += 1;
        self.ts = ts;
        Ok(())
    }

    fn seal(mut self) -> Chunk {
        let size = self.header.size();
        self.header.write_to(&mut self.buf[..size], self.frame_count);
        debug!(
            "封块: {} {} 帧, {} 字节, ts={}",
            self.header.media_type(),
            self.frame_count,
            self.buf.len(),
            self.ts
        );
        Chunk {
            media_type: self.header.media_type(),
            frame_count: self.frame_count,
            ts: self.ts,
            data: Bytes::from(self.buf),
        }
    }
}

/// 块聚合器
pub struct ChunkAssembler {
    streams: Vec<Stream>,
    selector: StreamSelector,
    vframes: u8,
    aframes: u8,
    video: Option<Batch>,
    audio: Option<Batch>,
    /// 已封好但尚未取走的块
    ready: VecDeque<Chunk>,
    /// 循环偏移 (微秒)
    base_ts: i64,
    /// 最近一帧的解码时间 (微秒, 含偏移)
    last_ts: i64,
    period_us: i64,
}

impl ChunkAssembler {
    /// 创建聚合器并完成流选择
    pub fn new(streams: Vec<Stream>, config: &ChunkiserConfig) -> Self {
        let selector = StreamSelector::select(&streams, config.media);
        if selector.is_empty() {
            warn!("没有可分块的流 (media={})", config.media);
        }
        let period_us = [MediaType::Video, MediaType::Audio]
            .into_iter()
            .find_map(|media| {
                selector
                    .selected(&streams, media)
                    .map(Stream::period_us)
                    .find(|p| *p > 0)
            })
            .unwrap_or(0);
        debug!(
            "聚合器: 选择掩码 {:#x}, vframes={}, aframes={}, 帧间隔 {}us",
            selector.mask(),
            config.vframes,
            config.aframes,
            period_us
        );
        Self {
            streams,
            selector,
            vframes: config.vframes,
            aframes: config.aframes,
            video: None,
            audio: None,
            ready: VecDeque::new(),
            base_ts: 0,
            last_ts: 0,
            period_us,
        }
    }

    /// 流选择结果
    pub fn selector(&self) -> &StreamSelector {
        &self.selector
    }

    /// 所有流信息
    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    /// 标称帧间隔 (微秒), 取第一条选中的视频流, 没有视频时取音频
    pub fn period_us(&self) -> i64 {
        self.period_us
    }

    /// 最近一帧的解码时间 (微秒)
    pub fn last_ts(&self) -> i64 {
        self.last_ts
    }

    /// 当前循环偏移 (微秒)
    pub fn base_ts(&self) -> i64 {
        self.base_ts
    }

    /// 取出一个已封好的块
    pub fn pop_ready(&mut self) -> Option<Chunk> {
        self.ready.pop_front()
    }

    /// 加入一个数据包
    pub fn push_packet(&mut self, packet: &Packet) -> KuaiResult<Option<Chunk>> {
        self.push_frame(packet.stream_index, &packet.data, packet.dts, packet.pts())
    }

    /// 加入一帧
    ///
    /// `dts` / `pts` 以所属流的时间基为单位, `dts` 为 `NOPTS_VALUE` 时按 0 处理.
    ///
    /// # 返回
    /// - `Ok(Some(chunk))`: 某个批次已封块
    /// - `Ok(None)`: 帧已加入批次, 或所属流未被选中
    /// - `Err(UnknownCodec)`: 编解码器没有线上编号, 帧被丢弃
    /// - `Err(OutOfMemory)`: 分配失败, 当前批次被丢弃
    pub fn push_frame(
        &mut self,
        stream_index: usize,
        payload: &[u8],
        dts: i64,
        pts: Option<i64>,
    ) -> KuaiResult<Option<Chunk>> {
        if !self.selector.is_selected(stream_index) {
            return Ok(self.ready.pop_front());
        }
        let stream = self
            .streams
            .iter()
            .find(|s| s.index == stream_index)
            .ok_or(KuaiError::StreamNotFound(stream_index))?;
        let media_type = stream.media_type;
        let header = StreamHeader::from_stream(stream)?;
        let wire_tb = header.time_base();
        if !stream.time_base.is_valid() || !wire_tb.is_valid() {
            return Err(KuaiError::InvalidArgument(format!(
                "流 #{stream_index} 时间基无效: {} -> {}",
                stream.time_base, wire_tb
            )));
        }

        let dts = if dts == NOPTS_VALUE {
            warn!("流 #{stream_index} 的帧缺少 dts, 按 0 处理");
            0
        } else {
            dts
        };
        let base = rescale_q(self.base_ts, Rational::MICRO, wire_tb);
        let dts_wire = rescale_q(dts, stream.time_base, wire_tb) + base;
        let pts_wire = pts.map(|pts| rescale_q(pts, stream.time_base, wire_tb) + base);
        let frame = FrameHeader::with_timestamps(payload.len(), dts_wire, pts_wire)?;
        let ts = rescale_q(dts, stream.time_base, Rational::MICRO) + self.base_ts;

        let frames_max = match media_type {
            MediaType::Video => self.vframes,
            _ => self.aframes,
        };
        let slot = match media_type {
            MediaType::Video => &mut self.video,
            _ => &mut self.audio,
        };

        // 流头部变化时先封掉当前批次
        if slot
            .as_ref()
            .is_some_and(|b| b.header != header || b.stream_index != stream_index)
        {
            if let Some(batch) = slot.take() {
                debug!("{media_type}流头部变化, 提前封块 ({} 帧)", batch.frame_count);
                self.ready.push_back(batch.seal());
            }
        }

        let mut batch = match slot.take() {
            Some(batch) => batch,
            None => Batch::start(header, stream_index, frames_max, payload.len())?,
        };
        // 分配失败时批次随 batch 一起丢弃
        batch.append(&frame, payload, ts)?;
        self.last_ts = ts;

        if batch.frame_count >= frames_max {
            self.ready.push_back(batch.seal());
        } else {
            *slot = Some(batch);
        }
        Ok(self.ready.pop_front())
    }

    /// 封掉所有未满的批次, 返回全部待取走的块
    pub fn flush(&mut self) -> Vec<Chunk> {
        for batch in [self.video.take(), self.audio.take()].into_iter().flatten() {
            self.ready.push_back(batch.seal());
        }
        self.ready.drain(..).collect()
    }

    /// 数据源回到开头后调用
    ///
    /// 循环偏移推进到最近一帧之后一个帧间隔, 保证线上时间戳继续递增.
    pub fn rewind(&mut self) {
        self.base_ts = self.last_ts + self.period_us;
        debug!("数据源回退, 循环偏移 {}us", self.base_ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_header::VIDEO_HEADER_SIZE;
    use kuai_codec::CodecId;

    fn video_stream() -> Stream {
        Stream::video(0, CodecId::H264, Rational::new(1, 1000), 320, 240, Rational::new(30, 1))
    }

    fn audio_stream() -> Stream {
        Stream::audio(1, CodecId::Aac, Rational::new(1, 48000), 48000, 2, 1024)
    }

    fn config(vframes: u8) -> ChunkiserConfig {
        ChunkiserConfig {
            vframes,
            ..ChunkiserConfig::default()
        }
    }

    #[test]
    fn test_单帧块() {
        let mut asm = ChunkAssembler::new(vec![video_stream()], &config(1));
        let chunk = asm.push_frame(0, &[0xAA; 5], 33, Some(66)).unwrap().unwrap();
        assert_eq!(chunk.len(), VIDEO_HEADER_SIZE + FRAME_HEADER_SIZE + 5);
        assert_eq!(chunk.frame_count, 1);
        assert_eq!(chunk.data[0], 9);
        assert_eq!(chunk.data[VIDEO_HEADER_SIZE - 1], 1);
        let frame = FrameHeader::parse(&chunk.data[VIDEO_HEADER_SIZE..]).unwrap();
        assert_eq!(frame.size, 5);
        // 33ms / 66ms 在 1/30 时间基下为 1 / 2
        assert_eq!(frame.dts, 1);
        assert_eq!(frame.pts_delta, Some(1));
        assert_eq!(chunk.ts, 33_000);
    }

    #[test]
    fn test_多帧聚合_布局() {
        let mut asm = ChunkAssembler::new(vec![video_stream()], &config(2));
        assert!(asm.push_frame(0, &[1, 1, 1], 0, None).unwrap().is_none());
        let chunk = asm.push_frame(0, &[2, 2], 33, None).unwrap().unwrap();
        let data = &chunk.data;
        assert_eq!(data.len(), VIDEO_HEADER_SIZE + 2 * FRAME_HEADER_SIZE + 5);
        let first = FrameHeader::parse(&data[VIDEO_HEADER_SIZE..]).unwrap();
        let second = FrameHeader::parse(&data[VIDEO_HEADER_SIZE + FRAME_HEADER_SIZE..]).unwrap();
        assert_eq!((first.size, second.size), (3, 2));
        assert_eq!(&data[VIDEO_HEADER_SIZE + 2 * FRAME_HEADER_SIZE..], &[1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_未选中流忽略() {
        let cfg = ChunkiserConfig {
            media: kuai_core::MediaSelection::VIDEO,
            ..ChunkiserConfig::default()
        };
        let mut asm = ChunkAssembler::new(vec![video_stream(), audio_stream()], &cfg);
        assert!(asm.push_frame(1, &[0; 4], 0, None).unwrap().is_none());
        assert!(asm.flush().is_empty());
    }

    #[test]
    fn test_未知编解码器丢帧() {
        let hevc = Stream::video(0, CodecId::H265, Rational::new(1, 1000), 320, 240, Rational::new(30, 1));
        let mut asm = ChunkAssembler::new(vec![hevc], &config(1));
        assert!(matches!(
            asm.push_frame(0, &[0; 4], 0, None),
            Err(KuaiError::UnknownCodec(_))
        ));
    }

    #[test]
    fn test_flush_封未满批次() {
        let mut asm = ChunkAssembler::new(vec![video_stream(), audio_stream()], &config(3));
        assert!(asm.push_frame(0, &[0; 4], 0, None).unwrap().is_none());
        // 音频默认每块 1 帧
        let audio = asm.push_frame(1, &[0; 6], 0, None).unwrap().unwrap();
        assert_eq!(audio.media_type, MediaType::Audio);
        let rest = asm.flush();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].frame_count, 1);
        assert_eq!(rest[0].data[VIDEO_HEADER_SIZE - 1], 1);
    }

    #[test]
    fn test_流头部变化提前封块() {
        let a = video_stream();
        let mut b = video_stream();
        b.index = 1;
        let mut asm = ChunkAssembler::new(vec![a, b], &config(3));
        // 只选中第一条视频流, 直接按掩码构造第二条
        asm.selector = StreamSelector::from_mask(0b11);
        assert!(asm.push_frame(0, &[0; 2], 0, None).unwrap().is_none());
        let early = asm.push_frame(1, &[0; 2], 33, None).unwrap().unwrap();
        assert_eq!(early.frame_count, 1);
        assert_eq!(asm.flush().len(), 1);
    }

    #[test]
    fn test_缺少dts按0处理() {
        let mut asm = ChunkAssembler::new(vec![video_stream()], &config(1));
        let chunk = asm.push_frame(0, &[0; 1], NOPTS_VALUE, None).unwrap().unwrap();
        let frame = FrameHeader::parse(&chunk.data[VIDEO_HEADER_SIZE..]).unwrap();
        assert_eq!(frame.dts, 0);
    }

    #[test]
    fn test_回退推进偏移() {
        let mut asm = ChunkAssembler::new(vec![video_stream()], &config(1));
        assert_eq!(asm.period_us(), 33_333);
        asm.push_frame(0, &[0; 1], 1000, None).unwrap();
        asm.rewind();
        assert_eq!(asm.base_ts(), 1_000_000 + 33_333);
        let chunk = asm.push_frame(0, &[0; 1], 0, None).unwrap().unwrap();
        assert_eq!(chunk.ts, 1_033_333);
        let frame = FrameHeader::parse(&chunk.data[VIDEO_HEADER_SIZE..]).unwrap();
        // 1.033333s 在 1/30 时间基下为 31
        assert_eq!(frame.dts, 31);
    }
}

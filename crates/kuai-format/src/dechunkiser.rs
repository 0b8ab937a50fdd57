//! 解块器.
//!
//! 按推模式接收块, 解析流头部和帧头部, 把截断的时间戳还原为 64 位时间线,
//! 再按媒体类型放入视频/音频投递队列, 由两个投递线程交给 [`FrameSink`].
//!
//! 一个块在入队前会被完整校验; 校验失败时不交付任何帧, 时间戳状态保持不变.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use bytes::Bytes;
use kuai_codec::{Packet, WireCodecId, wire};
use kuai_core::timestamp::NOPTS_VALUE;
use kuai_core::{KuaiError, KuaiResult, MediaSelection, MediaType, TimestampReconstructor};
use log::{debug, info, warn};

use crate::config::DechunkiserConfig;
use crate::frame_header::{FRAME_HEADER_SIZE, FrameHeader};
use crate::queue::{DeliveryQueue, spawn_worker};
use crate::sink::FrameSink;
use crate::stream_header::StreamHeader;

/// 单一媒体类型的时间戳重建状态
///
/// 只有 dts 经过回绕重建, pts 由重建后的 dts 加上帧头部中的差值得到,
/// 两者始终处在同一条时间线上.
///
/// 会话的第一个 dts 按有符号 32 位解释, 生产端在起始处产生的负 dts
/// (例如带 B 帧的流) 因此还原为负值, 之后按回绕规则递推.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructionState {
    /// 最近一个带 pts 的帧还原出的 pts
    pub pts: i64,
    pub dts: TimestampReconstructor,
    started: bool,
}

impl ReconstructionState {
    /// 还原一帧的 (pts, dts), 没有 pts 时 pts 为 `NOPTS_VALUE`
    pub fn restore(&mut self, frame: &FrameHeader) -> (i64, i64) {
        let dts = if self.started {
            self.dts.extend(frame.dts_low())
        } else {
            self.started = true;
            self.dts = TimestampReconstructor::starting_at(i64::from(frame.dts));
            self.dts.prev()
        };
        let pts = match frame.pts_delta {
            Some(delta) => {
                self.pts = dts + i64::from(delta);
                self.pts
            }
            None => NOPTS_VALUE,
        };
        (pts, dts)
    }
}

/// 一种媒体类型的解块状态
struct MediaLane {
    media_type: MediaType,
    header: Option<StreamHeader>,
    state: ReconstructionState,
    queue: Arc<DeliveryQueue>,
    worker: Option<JoinHandle<()>>,
}

impl MediaLane {
    fn open(
        media_type: MediaType,
        shutdown: &Arc<AtomicBool>,
        sink: &Arc<dyn FrameSink>,
    ) -> KuaiResult<Self> {
        let queue = Arc::new(DeliveryQueue::new(Arc::clone(shutdown)));
        let worker = spawn_worker(media_type, Arc::clone(&queue), Arc::clone(sink))?;
        Ok(Self {
            media_type,
            header: None,
            state: ReconstructionState::default(),
            queue,
            worker: Some(worker),
        })
    }

    /// 交付时使用的流索引
    ///
    /// 视频为 0; 音频在同时选择了视频时为 1, 只消费音频时为 0.
    fn stream_index(&self, media: MediaSelection) -> usize {
        match self.media_type {
            MediaType::Audio if media.accepts(MediaType::Video) => 1,
            _ => 0,
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("{}投递线程异常退出", self.media_type);
            }
        }
    }
}

/// 已收到流头部后, 每个块的编号仍须在编号表中且与头部一致
fn check_codec(header: &StreamHeader, codec: WireCodecId) -> KuaiResult<()> {
    if wire::from_wire(codec).is_none() {
        return Err(KuaiError::UnknownCodec(codec.to_string()));
    }
    if codec != header.codec() {
        return Err(KuaiError::MalformedChunk(format!(
            "编解码器编号从 {} 变为 {codec}",
            header.codec()
        )));
    }
    Ok(())
}

/// 校验块结构, 返回每帧的帧头部
///
/// 帧数至少为 1, 帧头部区不能越界, 负载长度之和必须恰好等于剩余字节数.
fn parse_frames(data: &[u8], header_size: usize) -> KuaiResult<Vec<FrameHeader>> {
    if data.len() < header_size {
        return Err(KuaiError::MalformedChunk(format!(
            "块长度 {} 小于流头部 {header_size}",
            data.len()
        )));
    }
    let count = usize::from(data[header_size - 1]);
    if count == 0 {
        return Err(KuaiError::MalformedChunk("帧数为 0".into()));
    }
    let payload_start = header_size + count * FRAME_HEADER_SIZE;
    if payload_start > data.len() {
        return Err(KuaiError::MalformedChunk(format!(
            "{count} 个帧头部超出块长度 {}",
            data.len()
        )));
    }
    let mut frames = Vec::new();
    frames.try_reserve(count)?;
    let mut total = 0usize;
    for header in data[header_size..payload_start].chunks_exact(FRAME_HEADER_SIZE) {
        let frame = FrameHeader::parse(header)?;
        total += frame.size as usize;
        frames.push(frame);
    }
    let remaining = data.len() - payload_start;
    if total != remaining {
        return Err(KuaiError::MalformedChunk(format!(
            "帧长度之和 {total} 与剩余 {remaining} 字节不符"
        )));
    }
    Ok(frames)
}

/// 解块器
pub struct Dechunkiser {
    media: MediaSelection,
    sink: Arc<dyn FrameSink>,
    video: MediaLane,
    audio: MediaLane,
    shutdown: Arc<AtomicBool>,
    closed: bool,
}

impl Dechunkiser {
    /// 创建解块器并启动视频/音频投递线程
    pub fn open(config: &DechunkiserConfig, sink: Arc<dyn FrameSink>) -> KuaiResult<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let video = MediaLane::open(MediaType::Video, &shutdown, &sink)?;
        let audio = match MediaLane::open(MediaType::Audio, &shutdown, &sink) {
            Ok(lane) => lane,
            Err(e) => {
                let mut video = video;
                shutdown.store(true, Ordering::Release);
                video.queue.wake_all();
                video.join();
                return Err(e);
            }
        };
        info!("解块器已打开: media={}", config.media);
        Ok(Self {
            media: config.media,
            sink,
            video,
            audio,
            shutdown,
            closed: false,
        })
    }

    /// 写入一个块
    ///
    /// # 返回
    /// - `Ok(n)`: 块已接受, `n` 为块长度
    /// - `Ok(0)`: 块的媒体类型未被选择, 直接丢弃
    /// - `Err(UnknownCodec)` / `Err(MalformedChunk)`: 块被丢弃, 会话继续
    pub fn write_chunk(&mut self, chunk: Bytes) -> KuaiResult<usize> {
        if self.closed {
            return Err(KuaiError::InvalidArgument("解块器已关闭".into()));
        }
        let first = *chunk
            .first()
            .ok_or_else(|| KuaiError::MalformedChunk("空块".into()))?;
        let codec = WireCodecId(first);
        let Some(media_type) = codec.media_type() else {
            warn!("块的编解码器编号为 0, 丢弃");
            return Err(KuaiError::UnknownCodec(codec.to_string()));
        };
        if !self.media.accepts(media_type) {
            debug!("丢弃未选择的{media_type}块 ({} 字节)", chunk.len());
            return Ok(0);
        }

        let lane = match media_type {
            MediaType::Video => &mut self.video,
            _ => &mut self.audio,
        };
        let (header, first_seen) = match lane.header {
            Some(header) => {
                check_codec(&header, codec).inspect_err(|e| warn!("{e}"))?;
                (header, false)
            }
            None => (StreamHeader::parse(&chunk).inspect_err(|e| warn!("{e}"))?, true),
        };
        let frames = parse_frames(&chunk, header.size()).inspect_err(|e| warn!("{e}"))?;

        let time_base = header.time_base();
        let stream_index = lane.stream_index(self.media);
        let mut state = lane.state;
        let mut packets = Vec::new();
        packets.try_reserve(frames.len())?;
        let mut offset = header.size() + frames.len() * FRAME_HEADER_SIZE;
        for frame in &frames {
            let size = frame.size as usize;
            let (pts, dts) = state.restore(frame);
            packets.push(Packet {
                data: chunk.slice(offset..offset + size),
                pts,
                dts,
                duration: 0,
                time_base,
                stream_index,
                is_keyframe: false,
            });
            offset += size;
        }

        if first_seen {
            info!(
                "收到{}流头部: 编号 {}, 时间基 {}",
                media_type,
                header.codec(),
                time_base
            );
            self.sink.open(&header);
            lane.header = Some(header);
        }
        lane.queue.push(packets)?;
        lane.state = state;
        debug!(
            "{media_type}块: {} 帧, {} 字节, 最后 dts={}",
            frames.len(),
            chunk.len(),
            state.dts.prev()
        );
        Ok(chunk.len())
    }

    /// 写入一个块 (复制数据)
    pub fn write(&mut self, data: &[u8]) -> KuaiResult<usize> {
        self.write_chunk(Bytes::copy_from_slice(data))
    }

    /// 阻塞直到已写入的帧全部交付
    pub fn drain(&self) {
        self.video.queue.wait_idle();
        self.audio.queue.wait_idle();
    }

    /// 已收到的流头部
    pub fn header(&self, media_type: MediaType) -> Option<StreamHeader> {
        match media_type {
            MediaType::Video => self.video.header,
            MediaType::Audio => self.audio.header,
            MediaType::Data => None,
        }
    }

    /// 当前时间戳重建状态
    pub fn reconstruction(&self, media_type: MediaType) -> Option<ReconstructionState> {
        match media_type {
            MediaType::Video => Some(self.video.state),
            MediaType::Audio => Some(self.audio.state),
            MediaType::Data => None,
        }
    }

    /// 关闭解块器
    ///
    /// 置位关闭标志并唤醒投递线程, 尚未交付的帧被丢弃. 可重复调用.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.shutdown.store(true, Ordering::Release);
        self.video.queue.wake_all();
        self.audio.queue.wake_all();
        self.video.join();
        self.audio.join();
        info!("解块器已关闭");
    }
}

impl Drop for Dechunkiser {
    fn drop(&mut self) {
        self.close();
    }
}

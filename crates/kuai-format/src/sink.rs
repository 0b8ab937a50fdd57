//! 帧接收端 (FrameSink) trait 定义.
//!
//! 解块器的两个投递线程把还原后的帧交给接收端, 接收端通常是解码器.

use std::sync::Mutex;

use kuai_codec::Packet;
use kuai_core::MediaType;

use crate::stream_header::StreamHeader;

/// 帧接收端 trait
///
/// `deliver` 由视频和音频两个投递线程并发调用, 同一媒体类型内保持帧顺序.
pub trait FrameSink: Send + Sync {
    /// 首次见到某种媒体类型的流头部时调用一次
    fn open(&self, _header: &StreamHeader) {}

    /// 交付一帧
    fn deliver(&self, media_type: MediaType, packet: Packet);
}

/// 收集所有交付帧的接收端
#[derive(Default)]
pub struct CollectingSink {
    headers: Mutex<Vec<StreamHeader>>,
    frames: Mutex<Vec<(MediaType, Packet)>>,
}

impl CollectingSink {
    /// 创建空接收端
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到的流头部 (按到达顺序)
    pub fn headers(&self) -> Vec<StreamHeader> {
        self.headers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 指定媒体类型已交付的帧 (按交付顺序)
    pub fn frames(&self, media_type: MediaType) -> Vec<Packet> {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(m, _)| *m == media_type)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// 已交付的总帧数
    pub fn len(&self) -> usize {
        self.frames.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 是否尚未收到任何帧
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FrameSink for CollectingSink {
    fn open(&self, header: &StreamHeader) {
        self.headers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*header);
    }

    fn deliver(&self, media_type: MediaType, packet: Packet) {
        self.frames
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((media_type, packet));
    }
}

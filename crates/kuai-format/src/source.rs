//! 帧数据源 (FrameSource) trait 定义.
//!
//! 生产端按拉模式从数据源读取编码帧. 真实的解封装器实现此 trait 即可接入分块器.

use kuai_codec::Packet;
use kuai_core::{KuaiError, KuaiResult};

use crate::stream::Stream;

/// 帧数据源 trait
///
/// 使用流程:
/// 1. 调用 `streams()` 获取流信息
/// 2. 循环调用 `next_frame()` 读取帧
/// 3. 到达末尾后可调用 `rewind()` 回到开头 (循环播放)
pub trait FrameSource: Send {
    /// 获取所有流信息
    fn streams(&self) -> &[Stream];

    /// 读取下一帧
    ///
    /// # 返回
    /// - `Ok(packet)`: 成功读取一帧, `stream_index` 指向所属流
    /// - `Err(KuaiError::Eof)`: 已到达末尾
    fn next_frame(&mut self) -> KuaiResult<Packet>;

    /// 回到开头
    ///
    /// 不支持回退的数据源返回错误.
    fn rewind(&mut self) -> KuaiResult<()>;
}

/// 内存数据源
///
/// 按顺序返回预先准备好的帧, 主要用于测试和离线处理.
pub struct MemorySource {
    streams: Vec<Stream>,
    packets: Vec<Packet>,
    position: usize,
}

impl MemorySource {
    /// 创建内存数据源
    pub fn new(streams: Vec<Stream>, packets: Vec<Packet>) -> Self {
        Self {
            streams,
            packets,
            position: 0,
        }
    }

    /// 剩余未读取的帧数
    pub fn remaining(&self) -> usize {
        self.packets.len() - self.position
    }
}

impl FrameSource for MemorySource {
    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn next_frame(&mut self) -> KuaiResult<Packet> {
        let packet = self.packets.get(self.position).cloned().ok_or(KuaiError::Eof)?;
        if !self.streams.iter().any(|s| s.index == packet.stream_index) {
            return Err(KuaiError::StreamNotFound(packet.stream_index));
        }
        self.position += 1;
        Ok(packet)
    }

    fn rewind(&mut self) -> KuaiResult<()> {
        self.position = 0;
        Ok(())
    }
}

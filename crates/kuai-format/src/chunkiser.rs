//! 分块器.
//!
//! 从 [`FrameSource`] 按拉模式读取帧, 交给 [`ChunkAssembler`] 聚合.
//! 外部调度器每隔 [`Chunkiser::period_us`] 调用一次 [`Chunkiser::chunkise`].

use kuai_core::{KuaiError, KuaiResult};
use log::{debug, info, warn};

use crate::assembler::{Chunk, ChunkAssembler};
use crate::config::ChunkiserConfig;
use crate::source::FrameSource;
use crate::stream::Stream;

/// 一次分块调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkiseOutcome {
    /// 产出一个块
    Chunk(Chunk),
    /// 本次没有产出块, `ts` 为最近一帧的解码时间 (微秒)
    Pending { ts: i64 },
}

/// 分块器
pub struct Chunkiser<S: FrameSource> {
    source: S,
    assembler: ChunkAssembler,
    looping: bool,
}

impl<S: FrameSource> Chunkiser<S> {
    /// 打开数据源并完成流选择
    pub fn open(source: S, config: &ChunkiserConfig) -> KuaiResult<Self> {
        let streams = source.streams().to_vec();
        if streams.is_empty() {
            return Err(KuaiError::InvalidArgument("数据源没有任何流".into()));
        }
        let assembler = ChunkAssembler::new(streams, config);
        info!(
            "分块器已打开: {} 条流, 选中 {} 条, 帧间隔 {}us, 循环={}",
            assembler.streams().len(),
            assembler.selector().count(),
            assembler.period_us(),
            config.looping
        );
        Ok(Self {
            source,
            assembler,
            looping: config.looping,
        })
    }

    /// 读取一帧并尝试产出一个块
    ///
    /// - 编解码器未知等只影响当前帧的错误被记录后返回 `Pending`
    /// - 到达末尾时, 开启循环则回到开头并返回 `Pending`, 否则返回 `Err(Eof)`
    /// - 其他数据源错误原样返回
    pub fn chunkise(&mut self) -> KuaiResult<ChunkiseOutcome> {
        if let Some(chunk) = self.assembler.pop_ready() {
            return Ok(ChunkiseOutcome::Chunk(chunk));
        }
        let packet = match self.source.next_frame() {
            Ok(packet) => packet,
            Err(KuaiError::Eof) if self.looping => {
                self.source.rewind()?;
                self.assembler.rewind();
                debug!("数据源到达末尾, 回到开头");
                return Ok(self.pending());
            }
            Err(e) => return Err(e),
        };
        match self.assembler.push_packet(&packet) {
            Ok(Some(chunk)) => Ok(ChunkiseOutcome::Chunk(chunk)),
            Ok(None) => Ok(self.pending()),
            Err(e) if e.is_recoverable() => {
                warn!("丢弃流 #{} 的帧: {}", packet.stream_index, e);
                Ok(self.pending())
            }
            Err(e) => Err(e),
        }
    }

    /// 封掉所有未满的批次
    pub fn finish(&mut self) -> Vec<Chunk> {
        self.assembler.flush()
    }

    /// 标称帧间隔 (微秒)
    pub fn period_us(&self) -> i64 {
        self.assembler.period_us()
    }

    /// 所有流信息
    pub fn streams(&self) -> &[Stream] {
        self.assembler.streams()
    }

    /// 取回数据源
    pub fn into_source(self) -> S {
        self.source
    }

    fn pending(&self) -> ChunkiseOutcome {
        ChunkiseOutcome::Pending {
            ts: self.assembler.last_ts(),
        }
    }
}

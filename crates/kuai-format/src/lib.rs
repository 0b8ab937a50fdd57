//! # kuai-format
//!
//! 把编码后的音视频帧打包为自描述的二进制块, 并在接收端还原帧序列.
//!
//! ## 块结构
//!
//! ```text
//! 流头部 (视频 10 字节 / 音频 7 字节, 最后一字节为帧数)
//! 帧头部 (8 字节) x 帧数
//! 负载 (按帧顺序拼接)
//! ```
//!
//! ## 组成
//!
//! - 生产端: [`Chunkiser`] 从 [`FrameSource`] 拉取帧, 交给 [`ChunkAssembler`] 聚合
//! - 消费端: [`Dechunkiser`] 解析块, 重建时间戳, 按媒体类型分发到两个投递线程
//! - [`StreamSelector`]: 决定哪些流参与分块

pub mod assembler;
pub mod chunkiser;
pub mod config;
pub mod dechunkiser;
pub mod dump;
pub mod frame_header;
pub mod queue;
pub mod selector;
pub mod sink;
pub mod source;
pub mod stream;
pub mod stream_header;

// 重导出常用类型
pub use assembler::{Chunk, ChunkAssembler};
pub use chunkiser::{ChunkiseOutcome, Chunkiser};
pub use config::{ChunkiserConfig, ConfigTags, DechunkiserConfig};
pub use dechunkiser::{Dechunkiser, ReconstructionState};
pub use dump::{ChunkReader, ChunkWriter};
pub use frame_header::FrameHeader;
pub use selector::StreamSelector;
pub use sink::{CollectingSink, FrameSink};
pub use source::{FrameSource, MemorySource};
pub use stream::Stream;
pub use stream_header::StreamHeader;

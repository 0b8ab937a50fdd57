//! # Kuai (块)
//!
//! 纯 Rust 实现的 P2P 音视频分块/解块框架.
//!
//! 生产端把数据源输出的编码帧打包为自描述的二进制块, 交给覆盖网络传输;
//! 接收端解析块, 还原 64 位时间戳后按媒体类型把帧交给解码器.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use kuai::core::Rational;
//! use kuai::codec::{CodecId, Packet};
//! use kuai::format::{Chunkiser, ChunkiserConfig, ChunkiseOutcome, MemorySource, Stream};
//!
//! let stream = Stream::video(0, CodecId::H264, Rational::new(1, 90000), 640, 480, Rational::new(25, 1));
//! let mut packet = Packet::from_data(vec![0u8; 100]);
//! packet.dts = 0;
//! let source = MemorySource::new(vec![stream], vec![packet]);
//!
//! let config = ChunkiserConfig::parse("media=video,vframes=1").unwrap();
//! let mut chunkiser = Chunkiser::open(source, &config).unwrap();
//! if let Ok(ChunkiseOutcome::Chunk(chunk)) = chunkiser.chunkise() {
//!     println!("块: {} 字节, {} 帧", chunk.len(), chunk.frame_count);
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `kuai-core` | 错误类型、媒体类型、有理数与时间戳工具 |
//! | `kuai-codec` | 编解码器标识、线上编号表与数据包 |
//! | `kuai-format` | 块头编解码、分块器与解块器 |

pub mod logging;

/// 核心类型与工具
pub use kuai_core as core;

/// 编解码器标识与数据包
pub use kuai_codec as codec;

/// 块格式、分块与解块
pub use kuai_format as format;

/// 获取 Kuai 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

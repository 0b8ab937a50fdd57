//! # kuai-codec
//!
//! 编解码器标识与压缩数据包抽象.
//!
//! - [`CodecId`]: 数据源/解码器侧使用的内部编解码器标识
//! - [`WireCodecId`]: 块头中的 1 字节线上编号, 取值范围同时表示媒体类型
//! - [`Packet`]: 一帧压缩数据及其时间戳
//!
//! 内部标识与线上编号之间的映射集中在 [`wire`] 模块的静态表中,
//! 不同编解码库版本之间的可移植性只在这里处理.

pub mod codec_id;
pub mod packet;
pub mod wire;

// 重导出常用类型
pub use codec_id::CodecId;
pub use packet::Packet;
pub use wire::WireCodecId;

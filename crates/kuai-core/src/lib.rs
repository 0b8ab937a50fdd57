//! # kuai-core
//!
//! kuai 分块传输框架核心库, 提供基础类型定义、错误处理和时间戳工具.
//!
//! 生产端 (分块) 与消费端 (解块) 共用本 crate 中的类型.

pub mod error;
pub mod media_type;
pub mod rational;
pub mod timestamp;

// 重导出常用类型
pub use error::{KuaiError, KuaiResult};
pub use media_type::{MediaSelection, MediaType};
pub use rational::Rational;
pub use timestamp::{Timestamp, TimestampReconstructor};

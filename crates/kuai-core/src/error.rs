//! 统一错误类型定义.
//!
//! 所有 kuai crate 共用的错误类型, 支持跨模块传播.
//!
//! 编解码层面的错误 (`UnknownCodec`, `MalformedChunk`, `InvalidArgument`) 只影响当前帧或当前块,
//! 调用方记录日志后继续会话; `OutOfMemory` 与数据源错误需要上报给调用方.

use thiserror::Error;

/// kuai 框架统一错误类型
#[derive(Debug, Error)]
pub enum KuaiError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 编解码器无法映射到线上编号 (或线上编号无法识别)
    #[error("未知编解码器: {0}")]
    UnknownCodec(String),

    /// 块结构与缓冲区长度不一致
    #[error("块格式错误: {0}")]
    MalformedChunk(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 无效数据 (损坏的输入等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 内部错误 (不应发生)
    #[error("内部错误: {0}")]
    Internal(String),
}

impl KuaiError {
    /// 是否为只影响当前帧/块的错误
    ///
    /// 这类错误由调用方记录后丢弃对应数据, 不中断会话.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownCodec(_) | Self::MalformedChunk(_) | Self::InvalidArgument(_)
        )
    }
}

impl From<std::collections::TryReserveError> for KuaiError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory(err.to_string())
    }
}

/// kuai 框架统一 Result 类型
pub type KuaiResult<T> = Result<T, KuaiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_可恢复错误分类() {
        assert!(KuaiError::UnknownCodec("0".into()).is_recoverable());
        assert!(KuaiError::MalformedChunk("短".into()).is_recoverable());
        assert!(KuaiError::InvalidArgument("宽度".into()).is_recoverable());
        assert!(!KuaiError::OutOfMemory("x".into()).is_recoverable());
        assert!(!KuaiError::Eof.is_recoverable());
    }

    #[test]
    fn test_分配失败转换() {
        let mut v: Vec<u8> = Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        let err: KuaiError = err.into();
        assert!(matches!(err, KuaiError::OutOfMemory(_)));
    }
}

//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 输入源 ID 重复
    #[error("source {source_id} is already registered")]
    DuplicateSource {
        /// 输入源 ID
        source_id: String,
    },

    /// 输入源不存在
    #[error("source {source_id} is not registered")]
    UnknownSource {
        /// 输入源 ID
        source_id: String,
    },

    /// 模拟源参数非法
    #[error("invalid mock source {source_id}: {message}")]
    InvalidSource {
        /// 输入源 ID
        source_id: String,
        /// 错误消息
        message: String,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;

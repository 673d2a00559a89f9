// ==========================================
// 冷链仓储入库收货系统 - API 层错误类型
// ==========================================
// 约定: 录入校验/业务拒绝不是 Err，而是带错误文案的应答;
// 仓储与外部服务失败是 Err，原样上抛，不吞不重试
// ==========================================

use thiserror::Error;

use crate::engine::services::ServiceError;
use crate::repository::error::RepositoryError;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("仓储访问失败: {0}")]
    Repository(#[from] RepositoryError),

    #[error("外部服务失败: {0}")]
    Service(#[from] ServiceError),

    #[error("会话状态异常: {0}")]
    SessionState(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// Result 类型别名
pub type HandlerResult<T> = Result<T, HandlerError>;

// ==========================================
// 冷链仓储入库收货系统 - API 层
// ==========================================
// 职责: 扫码请求分发与各步骤处理器
// 红线: 业务错误走应答错误文案; 外部失败原样上抛
// ==========================================

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod response;

pub use dispatcher::Dispatcher;
pub use error::{HandlerError, HandlerResult};
pub use response::{FieldOverride, FunctionKey, Response, ScanRequest};

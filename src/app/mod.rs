// ==========================================
// 冷链仓储入库收货系统 - 应用层
// ==========================================
// 职责: 装配仓储/引擎/处理器，提供终端入口所需的共享状态
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};

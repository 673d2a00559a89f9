// ==========================================
// 冷链仓储入库收货系统 - 配置层
// ==========================================
// 职责: 库区级配置的加载与只读访问
// 红线: 配置上下文注入使用方，不使用进程级全局状态
// ==========================================

pub mod facility;

pub use facility::{FacilityConfig, FacilityContext};

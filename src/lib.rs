// ==========================================
// 冷链仓储入库收货系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + Tokio
// 系统定位: RF 手持终端逐字段扫码收货 + 批次结算
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 步骤决策与批次结算
pub mod engine;

// API 层 - 扫码分发与步骤处理
pub mod api;

// 配置层 - 库区配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BestByKind, DateKind, ReceivingStep};

// 领域实体
pub use domain::{
    AsnPallet, BatchHeader, LotAggregate, LotTransaction, PalletTransaction, PhysicalPallet,
    ProductSnapshot, ReceivingSession, ScanRequirements, ShipmentConfirmation,
};

// 引擎
pub use engine::{CloseEngine, CloseQueue, SequencerFlags, StepSequencer};

// API
pub use api::{Dispatcher, Response, ScanRequest};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "冷链仓储入库收货系统";

// 会话命名空间（SessionStore 按操作员+命名空间存储）
pub const SESSION_NAMESPACE: &str = "RECEIVING";

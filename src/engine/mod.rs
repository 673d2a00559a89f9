// ==========================================
// 冷链仓储入库收货系统 - 引擎层
// ==========================================
// 职责: 步骤决策 (纯函数) 与批次结算 (异步任务)
// 红线: sequencer 不做 I/O; close 整算重写，不做增量
// ==========================================

pub mod close;
pub mod close_queue;
pub mod sequencer;
pub mod services;

pub use close::{CloseEngine, CloseOutcome};
pub use close_queue::CloseQueue;
pub use sequencer::{SequencerFlags, StepSequencer};
pub use services::{
    DynamicAttributeProvider, FieldMetadataProvider, HoldAction, HoldScope, HoldService,
    HppCheck, InboundProcedures, LocalProcedures, LotDates, NoopDynamicAttributes,
    RenameOutcome, ServiceError, ServiceResult, StaticFieldProvider, TracingHoldService,
    TracingYardService, YardService,
};

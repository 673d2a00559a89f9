// ==========================================
// 冷链仓储入库收货系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、步骤枚举
// 红线: 不含数据访问逻辑，不含引擎逻辑
// ==========================================

pub mod asn;
pub mod batch;
pub mod confirmation;
pub mod dates;
pub mod lot;
pub mod pallet;
pub mod product;
pub mod requirements;
pub mod session;
pub mod types;

// 重导出核心类型
pub use asn::AsnPallet;
pub use batch::BatchHeader;
pub use confirmation::ShipmentConfirmation;
pub use lot::{LotAggregate, LotTransaction};
pub use pallet::{PalletTransaction, PhysicalPallet};
pub use product::ProductSnapshot;
pub use requirements::ScanRequirements;
pub use session::ReceivingSession;
pub use types::{BestByKind, DateKind, ReceivingStep};

// ==========================================
// 冷链仓储入库收货系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口，屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod asn_repo;
pub mod batch_repo;
pub mod blast_repo;
pub mod close_task_repo;
pub mod confirmation_repo;
pub mod error;
pub mod lot_repo;
pub mod pallet_repo;
pub mod product_repo;
pub mod quick_repo;
pub mod rail_repo;
pub mod requirement_repo;
pub mod session_repo;

// 重导出核心仓储
pub use asn_repo::AsnPalletRepository;
pub use batch_repo::BatchRepository;
pub use blast_repo::BlastControlRepository;
pub use close_task_repo::{CloseTask, CloseTaskRepository, CloseTaskStatus};
pub use confirmation_repo::ConfirmationRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use lot_repo::LotRepository;
pub use pallet_repo::PalletRepository;
pub use product_repo::ProductRepository;
pub use quick_repo::QuickReceiveRepository;
pub use rail_repo::RailRepository;
pub use requirement_repo::RequirementRepository;
pub use session_repo::{SessionStore, SqliteSessionStore};

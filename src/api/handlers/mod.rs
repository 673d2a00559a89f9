// ==========================================
// 冷链仓储入库收货系统 - 步骤处理器
// ==========================================
// 一个步骤族一个处理器: 校验录入、改写会话、读写记录，
// 需要时覆盖走向，否则交给 StepSequencer
// ==========================================

pub mod batch;
pub mod blast;
pub mod close;
pub mod common;
pub mod dates;
pub mod pallet;
pub mod product;
pub mod quantity;
pub mod rail;
pub mod scalars;
pub mod send_pallet;

pub use batch::BatchHandler;
pub use blast::BlastHandler;
pub use close::CloseHandler;
pub use common::StepFlow;
pub use dates::DateHandler;
pub use pallet::PalletHandler;
pub use product::ProductHandler;
pub use quantity::QuantityHandler;
pub use rail::RailHandler;
pub use scalars::ScalarHandler;
pub use send_pallet::SendPalletHandler;

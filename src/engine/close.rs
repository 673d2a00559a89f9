// ==========================================
// 冷链仓储入库收货系统 - 批次结算引擎
// ==========================================
// 职责: 批次关闭后的一次性整算:
//   托盘/批号数量重算、冻结传播、重量重算、
//   零数量清理、批次点数与时间戳、确认单级联、下游通知
// 红线: 整算从头重算，不做增量; 已发运批次直接跳过 (幂等保护)
// ==========================================

mod core;
mod weights;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use thiserror::Error;

use crate::config::FacilityContext;
use crate::engine::services::{HoldService, InboundProcedures, ServiceError, YardService};
use crate::repository::{
    BatchRepository, ConfirmationRepository, LotRepository, PalletRepository, ProductRepository,
    RepositoryError, RequirementRepository,
};

pub use weights::lot_weights;

/// 结算引擎错误
///
/// 任一持久化/外部失败终止本次调用的后续步骤，
/// 已提交的子步骤不回滚; 批次可重新触发结算
#[derive(Error, Debug)]
pub enum CloseError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// 结算结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// 批次不存在
    NotFound,
    /// 批次已发运，未做任何改动
    AlreadyShipped,
    /// 整算完成
    Completed {
        surviving_lots: usize,
        deleted_lots: usize,
        deleted_pallets: usize,
    },
}

/// 批次结算引擎
pub struct CloseEngine {
    batches: Arc<BatchRepository>,
    pallets: Arc<PalletRepository>,
    lots: Arc<LotRepository>,
    products: Arc<ProductRepository>,
    requirements: Arc<RequirementRepository>,
    confirmations: Arc<ConfirmationRepository>,
    hold_service: Arc<dyn HoldService>,
    yard_service: Arc<dyn YardService>,
    procedures: Arc<dyn InboundProcedures>,
    ctx: Arc<FacilityContext>,
}

impl CloseEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        batches: Arc<BatchRepository>,
        pallets: Arc<PalletRepository>,
        lots: Arc<LotRepository>,
        products: Arc<ProductRepository>,
        requirements: Arc<RequirementRepository>,
        confirmations: Arc<ConfirmationRepository>,
        hold_service: Arc<dyn HoldService>,
        yard_service: Arc<dyn YardService>,
        procedures: Arc<dyn InboundProcedures>,
        ctx: Arc<FacilityContext>,
    ) -> Self {
        Self {
            batches,
            pallets,
            lots,
            products,
            requirements,
            confirmations,
            hold_service,
            yard_service,
            procedures,
            ctx,
        }
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 急冻/高压步骤处理器
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::HandlerResult;
use crate::api::handlers::common::StepFlow;
use crate::api::response::Response;
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::services::{HoldAction, HoldScope, HoldService, InboundProcedures};
use crate::i18n;
use crate::repository::PalletRepository;

pub struct BlastHandler {
    pallets: Arc<PalletRepository>,
    procedures: Arc<dyn InboundProcedures>,
    holds: Arc<dyn HoldService>,
    flow: Arc<StepFlow>,
}

impl BlastHandler {
    pub fn new(
        pallets: Arc<PalletRepository>,
        procedures: Arc<dyn InboundProcedures>,
        holds: Arc<dyn HoldService>,
        flow: Arc<StepFlow>,
    ) -> Self {
        Self {
            pallets,
            procedures,
            holds,
            flow,
        }
    }

    pub fn process(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let answer = input.trim().to_uppercase();
        if !matches!(answer.as_str(), "Y" | "N" | "") {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.must_yn"),
            ));
        }
        let value = if answer.is_empty() {
            "N".to_string()
        } else {
            answer
        };

        let hours = if value == "N" { 0 } else { session.blast_hours };
        self.pallets
            .update_blast(&session.pallet_id, value == "Y", hours)?;
        session.is_blast = value.clone();
        session.blast_initial = value;

        resolve_hpp(
            self.pallets.as_ref(),
            self.procedures.as_ref(),
            self.holds.as_ref(),
            session,
        )?;
        self.flow.advance(session, ReceivingStep::Blast)
    }
}

/// 高压处理解析 (进入步骤决策前的带副作用查询)
///
/// 品种为高压处理时: 外部检查决定堆垛冻结或直接冻结代码，
/// 并在托盘行上落 HPP 标志
pub(crate) fn resolve_hpp(
    pallets: &PalletRepository,
    procedures: &dyn InboundProcedures,
    holds: &dyn HoldService,
    session: &mut ReceivingSession,
) -> HandlerResult<()> {
    if session.used_copy || !session.hpp_product {
        return Ok(());
    }
    if let Some(pallet) = pallets.find_by_pallet_id(&session.pallet_id)? {
        let check = procedures.check_hpp(
            &pallet.customer_code,
            &pallet.customer_pallet_id,
            &pallet.pallet_id,
        )?;
        if check.use_stack_hold {
            holds.apply_or_release(
                &check.hold_code,
                &session.operator_id,
                HoldAction::Hold,
                HoldScope::Pallet,
                &pallet.track_id,
                &pallet.serial_no,
            )?;
        }
        pallets.update_hpp(pallet.id, &check.hold_code)?;
        debug!(
            pallet = %pallet.pallet_id,
            hold = %check.hold_code,
            stack = check.use_stack_hold,
            "高压处理冻结落位"
        );
    }
    session.is_hpp = "Y".to_string();
    Ok(())
}

// ==========================================
// 冷链仓储入库收货系统 - 数量步骤处理器
// ==========================================
// 数量校验 -> 快速收货装车保护 -> ASN 数量比对 (只标记)
// -> 码放不符 Y/N 确认 -> 急冻推导 -> 急冻步骤或直接续走
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::HandlerResult;
use crate::api::handlers::blast::resolve_hpp;
use crate::api::handlers::common::{self, StepFlow};
use crate::api::response::{FieldOverride, Response};
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::services::{HoldService, InboundProcedures};
use crate::i18n;
use crate::repository::{BlastControlRepository, PalletRepository, RailRepository};

pub struct QuantityHandler {
    blast_control: Arc<BlastControlRepository>,
    rail: Arc<RailRepository>,
    pallets: Arc<PalletRepository>,
    procedures: Arc<dyn InboundProcedures>,
    holds: Arc<dyn HoldService>,
    flow: Arc<StepFlow>,
}

impl QuantityHandler {
    pub fn new(
        blast_control: Arc<BlastControlRepository>,
        rail: Arc<RailRepository>,
        pallets: Arc<PalletRepository>,
        procedures: Arc<dyn InboundProcedures>,
        holds: Arc<dyn HoldService>,
        flow: Arc<StepFlow>,
    ) -> Self {
        Self {
            blast_control,
            rail,
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
        let step = session.current_step;

        if step == ReceivingStep::QuantityConfirm {
            if common::is_yes(input) {
                let qty = session.quantity.trim().parse::<i64>().unwrap_or(0);
                return self.accept_quantity(session, ReceivingStep::QuantityConfirm, qty);
            }
            // 否: 清数量重新采集
            session.quantity.clear();
            session.current_step = ReceivingStep::Quantity;
            return Ok(self.quantity_reprompt(session));
        }

        let raw = input.trim();
        if raw.is_empty() {
            return Ok(Response::error(step, i18n::t("receiving.qty_empty")));
        }
        let qty: i64 = match raw.parse() {
            Ok(v) => v,
            Err(_) => return Ok(Response::error(step, i18n::t("receiving.qty_empty"))),
        };
        if qty < 0 {
            return Ok(Response::error(step, i18n::t("receiving.qty_not_negative")));
        }

        // 快速收货清零保护: 托盘已装车不能清零
        if session.quick_receive && qty == 0 && self.rail.staged_pallet_loaded(&session.pallet_id)?
        {
            return Ok(Response::error(step, i18n::t("receiving.pallets_loaded")));
        }

        // ASN 数量比对: 只标记，不阻断
        if session.expected_asn_qty > 0 && session.expected_asn_qty != qty {
            session.unmatched_asn_qty = true;
            debug!(
                pallet = %session.pallet_id,
                expected = session.expected_asn_qty,
                scanned = qty,
                "数量与 ASN 不符"
            );
        }

        // 码放不符: 转 Y/N 确认
        if qty != session.tie * session.high {
            session.quantity = qty.to_string();
            session.previous_step = Some(ReceivingStep::Quantity);
            session.current_step = ReceivingStep::QuantityConfirm;
            return Ok(Response::ok(ReceivingStep::QuantityConfirm).with_field(
                FieldOverride::new("qty_confirm")
                    .label(i18n::t_with_args(
                        "receiving.qty_tie_prompt",
                        &[
                            ("tie", &session.tie.to_string()),
                            ("high", &session.high.to_string()),
                        ],
                    ))
                    .value(format!("{} X {}", session.tie, session.high)),
            ));
        }

        self.accept_quantity(session, ReceivingStep::Quantity, qty)
    }

    /// 数量被接受后的急冻推导与续走
    fn accept_quantity(
        &self,
        session: &mut ReceivingSession,
        completed: ReceivingStep,
        qty: i64,
    ) -> HandlerResult<Response> {
        session.quantity = qty.to_string();

        let reqs = session.reqs();
        if !session.used_copy {
            let derived = if reqs.has_blast {
                let mut initial = session.blast_initial.clone();
                let edi_status = self.blast_control.edi_status(&session.edi_batch_product)?;
                let customer_status = self.blast_control.customer_status(&session.customer_code)?;
                if reqs.edi_blast_control.to_uppercase() == "P" {
                    if let (Some(edi), Some(cust)) = (&edi_status, &customer_status) {
                        if edi == cust {
                            initial = "Y".to_string();
                        }
                    }
                } else if self.blast_control.request_exists(&session.blast_request_key)? {
                    initial = "N".to_string();
                }
                (initial == "Y" || initial == "N").then_some(initial)
            } else {
                Some("N".to_string())
            };
            if let Some(v) = derived {
                session.is_blast = v;
            }
        }

        if !session.used_copy && reqs.has_blast {
            session.previous_step = Some(completed);
            session.current_step = ReceivingStep::Blast;
            return Ok(Response::ok(ReceivingStep::Blast).with_field(
                FieldOverride::new("blast").default_value(session.blast_initial.clone()),
            ));
        }

        resolve_hpp(
            self.pallets.as_ref(),
            self.procedures.as_ref(),
            self.holds.as_ref(),
            session,
        )?;
        self.flow.advance(session, completed)
    }

    /// 重新采集数量的应答
    fn quantity_reprompt(&self, session: &ReceivingSession) -> Response {
        let reqs = session.reqs();
        let mut f = FieldOverride::new("qty")
            .label(i18n::t_with_args(
                "receiving.qty_tie_prompt",
                &[
                    ("tie", &session.tie.to_string()),
                    ("high", &session.high.to_string()),
                ],
            ))
            .value(format!("{}", session.tie * session.high));
        if !(reqs.asn_pallet && !reqs.asn_no_qty) {
            f = f.default_value("");
        }
        Response::ok(ReceivingStep::Quantity).with_field(f)
    }
}

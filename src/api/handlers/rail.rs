// ==========================================
// 冷链仓储入库收货系统 - 动态轨道步骤处理器
// ==========================================
// 新品种入轨: BOL 数量 -> 码放确认 (Y/N) -> 可改每层数/层数
// 确认后登记轨道，回到品码后的日期/数量流程
// ==========================================

use std::sync::Arc;

use crate::api::error::HandlerResult;
use crate::api::handlers::common;
use crate::api::handlers::product::advance_after_product;
use crate::api::response::{FieldOverride, Response};
use crate::config::FacilityContext;
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::services::InboundProcedures;
use crate::i18n;

pub struct RailHandler {
    procedures: Arc<dyn InboundProcedures>,
    ctx: Arc<FacilityContext>,
}

impl RailHandler {
    pub fn new(procedures: Arc<dyn InboundProcedures>, ctx: Arc<FacilityContext>) -> Self {
        Self { procedures, ctx }
    }

    fn tie_confirm_prompt(session: &ReceivingSession) -> Response {
        Response::ok(ReceivingStep::TieConfirm).with_field(
            FieldOverride::new("tie_confirm")
                .label(i18n::t_with_args(
                    "receiving.qty_tie_prompt",
                    &[
                        ("tie", &session.tie.to_string()),
                        ("high", &session.high.to_string()),
                    ],
                ))
                .value(format!("{} X {}", session.tie, session.high)),
        )
    }

    pub fn process_bol_quantity(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let raw = input.trim();
        if raw.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.qty_empty"),
            ));
        }
        let qty: i64 = match raw.parse() {
            Ok(v) if v >= 0 => v,
            Ok(_) => {
                return Ok(Response::error(
                    session.current_step,
                    i18n::t("receiving.qty_not_negative"),
                ))
            }
            Err(_) => {
                return Ok(Response::error(
                    session.current_step,
                    i18n::t("receiving.qty_empty"),
                ))
            }
        };
        session.bol_quantity = qty;
        session.previous_step = Some(ReceivingStep::BolQuantity);
        session.current_step = ReceivingStep::TieConfirm;
        Ok(Self::tie_confirm_prompt(session))
    }

    pub fn process_tie_confirm(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        if common::is_yes(input) {
            let product = session.product.clone();
            let (tie, high) = match &product {
                Some(p) => (
                    if session.tie > 0 { session.tie } else { p.tie },
                    if session.high > 0 { session.high } else { p.high },
                ),
                None => (session.tie, session.high),
            };
            self.procedures.register_dynamic_rail(
                &session.batch_id,
                &session.product_code,
                tie,
                high,
                session.bol_quantity,
                &session.operator_id,
            )?;
            session.tie = tie;
            session.high = high;
            session.previous_step = Some(ReceivingStep::TieConfirm);
            return Ok(advance_after_product(session, &self.ctx));
        }
        if common::is_no(input) {
            session.previous_step = Some(ReceivingStep::TieConfirm);
            session.current_step = ReceivingStep::Tie;
            return Ok(Response::ok(ReceivingStep::Tie).with_field(FieldOverride::new("tie")));
        }
        Ok(Response::error(
            session.current_step,
            i18n::t("receiving.must_yn"),
        ))
    }

    pub fn process_tie(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        match input.trim().parse::<i64>() {
            Ok(v) if v > 0 => {
                session.tie = v;
                session.previous_step = Some(ReceivingStep::Tie);
                session.current_step = ReceivingStep::High;
                Ok(Response::ok(ReceivingStep::High).with_field(FieldOverride::new("high")))
            }
            Ok(_) => Ok(Response::error(
                session.current_step,
                i18n::t("receiving.value_not_zero"),
            )),
            Err(_) => Ok(Response::error(
                session.current_step,
                i18n::t("receiving.value_empty"),
            )),
        }
    }

    pub fn process_high(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        match input.trim().parse::<i64>() {
            Ok(v) if v > 0 => {
                session.high = v;
                session.previous_step = Some(ReceivingStep::High);
                session.current_step = ReceivingStep::TieConfirm;
                Ok(Self::tie_confirm_prompt(session))
            }
            Ok(_) => Ok(Response::error(
                session.current_step,
                i18n::t("receiving.value_not_zero"),
            )),
            Err(_) => Ok(Response::error(
                session.current_step,
                i18n::t("receiving.value_empty"),
            )),
        }
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 标量步骤处理器
// ==========================================
// 批号 / 客户批号 / 厂号 / 出厂日期 / 参考号 / 温度 / 收货方:
// 校验 -> 存会话 -> 交给 StepSequencer
// ==========================================

use std::sync::Arc;

use crate::api::error::HandlerResult;
use crate::api::handlers::common::StepFlow;
use crate::api::response::{FieldOverride, Response};
use crate::domain::dates::parse_code_date;
use crate::domain::session::ReceivingSession;
use crate::domain::types::{DateKind, ReceivingStep};
use crate::engine::services::InboundProcedures;
use crate::i18n;

pub struct ScalarHandler {
    procedures: Arc<dyn InboundProcedures>,
    flow: Arc<StepFlow>,
}

impl ScalarHandler {
    pub fn new(procedures: Arc<dyn InboundProcedures>, flow: Arc<StepFlow>) -> Self {
        Self { procedures, flow }
    }

    /// 批号采集; 批号反推日期时顺带取回日期默认值
    pub fn process_lot(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.lot_not_blank"),
            ));
        }
        let lot: String = scanned.chars().take(16).collect();
        session.lot_no = lot.clone();
        session.previous_lot = lot;
        session.lot_skip_presses = 0;

        let reqs = session.reqs();
        let mut date_default = String::new();
        if reqs.auto_date_for_lot && reqs.require_lot {
            let dates = self.procedures.dates_from_product_lot(
                &session.batch_id,
                &session.product_code,
                &session.lot_no,
            )?;
            date_default = match session.date_kind {
                DateKind::Julian if !dates.julian_date.is_empty() => dates.julian_date.clone(),
                _ if !dates.code_date.is_empty() => dates.code_date.clone(),
                _ => String::new(),
            };
            if !dates.best_by_date.is_empty() && session.best_by_date.is_empty() {
                session.best_by_date = dates.best_by_date;
            }
            if !dates.best_by_julian.is_empty() && session.best_by_julian.is_empty() {
                session.best_by_julian = dates.best_by_julian;
            }
        }

        let mut resp = self.flow.advance(session, ReceivingStep::Lot)?;
        if session.current_step == ReceivingStep::CodeDate && !date_default.is_empty() {
            resp.fields
                .retain(|f| f.key != "code_date");
            resp = resp.with_field(FieldOverride::new("code_date").default_value(date_default));
        }
        Ok(resp)
    }

    /// 批号跳过键 (F4): 连按两次才生效
    pub fn skip_lot(&self, session: &mut ReceivingSession) -> HandlerResult<Response> {
        if session.lot_skip_presses == 0 {
            session.lot_skip_presses = 1;
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.lot_not_blank"),
            ));
        }
        session.lot_skip_presses = 0;
        session.lot_no.clear();
        self.flow.advance(session, ReceivingStep::Lot)
    }

    pub fn process_customer_lot(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.customer_lot_blank"),
            ));
        }
        session.customer_lot_no = scanned;
        self.flow.advance(session, ReceivingStep::CustomerLot)
    }

    pub fn process_establishment(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.establishment_blank"),
            ));
        }
        session.establishment_no = scanned;
        self.flow.advance(session, ReceivingStep::Establishment)
    }

    /// 出厂日期 (MMDDYYYY)
    pub fn process_ship_date(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim();
        if parse_code_date(scanned).is_none() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.ship_date_invalid"),
            ));
        }
        session.ship_date = scanned.to_string();
        self.flow.advance(session, ReceivingStep::ShipDate)
    }

    pub fn process_reference(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.reference_blank"),
            ));
        }
        session.reference_no = scanned;
        self.flow.advance(session, ReceivingStep::Reference)
    }

    pub fn process_temperature(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim();
        if scanned.is_empty() || scanned.parse::<f64>().is_err() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.temperature_invalid"),
            ));
        }
        session.temperature = scanned.to_string();
        self.flow.advance(session, ReceivingStep::Temperature)
    }

    pub fn process_consignee(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.consignee_blank"),
            ));
        }
        session.consignee = scanned;
        self.flow.advance(session, ReceivingStep::Consignee)
    }
}

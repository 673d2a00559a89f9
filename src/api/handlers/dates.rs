// ==========================================
// 冷链仓储入库收货系统 - 日期步骤处理器
// ==========================================
// 生产日期: 日历 MMDDYYYY / 儒略 YYYYDDD，回溯窗口与未来日期按客户策略
// 保质期: 面向未来，只校验格式
// F2 在日期步骤跳过采集
// ==========================================

use std::sync::Arc;

use crate::api::error::HandlerResult;
use crate::api::handlers::common::StepFlow;
use crate::api::handlers::product::quantity_prompt;
use crate::api::response::Response;
use crate::config::FacilityContext;
use crate::domain::dates::{
    check_window, parse_code_date, parse_julian_date, to_code_date, to_julian_date, DateCheck,
};
use crate::domain::session::ReceivingSession;
use crate::domain::types::{BestByKind, DateKind, ReceivingStep};
use crate::i18n;

pub struct DateHandler {
    flow: Arc<StepFlow>,
    ctx: Arc<FacilityContext>,
}

impl DateHandler {
    pub fn new(flow: Arc<StepFlow>, ctx: Arc<FacilityContext>) -> Self {
        Self { flow, ctx }
    }

    /// 生产日期采集
    pub fn process_code_date(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();

        // F2 跳过: 沿用预填日期，否则取批次日期
        if scanned == "F2" {
            if session.code_date.is_empty() {
                let date = session
                    .batch
                    .as_ref()
                    .and_then(|b| b.batch_date)
                    .unwrap_or_else(|| self.ctx.today());
                session.code_date = to_code_date(date);
                session.julian_date = to_julian_date(date);
            }
            return self.after_code_date(session);
        }

        let parsed = match session.date_kind {
            DateKind::Julian => parse_julian_date(&scanned),
            _ => parse_code_date(&scanned),
        };
        let date = match parsed {
            Some(d) => d,
            None => {
                return Ok(Response::error(
                    session.current_step,
                    i18n::t("receiving.date_invalid"),
                ))
            }
        };

        let reqs = session.reqs();
        match check_window(
            date,
            self.ctx.today(),
            reqs.years_back,
            reqs.future_date_allowed,
        ) {
            DateCheck::Ok => {}
            DateCheck::Future => {
                return Ok(Response::error(
                    session.current_step,
                    i18n::t("receiving.date_future"),
                ))
            }
            DateCheck::TooOld | DateCheck::Invalid => {
                return Ok(Response::error(
                    session.current_step,
                    i18n::t("receiving.date_too_old"),
                ))
            }
        }

        session.code_date = to_code_date(date);
        session.julian_date = to_julian_date(date);
        self.after_code_date(session)
    }

    /// 日期确认后的走向
    ///
    /// 批号反推日期路径 (批号之后才进日期) 交给 StepSequencer;
    /// 常规路径 (品码之后进日期) 接着采数量
    fn after_code_date(&self, session: &mut ReceivingSession) -> HandlerResult<Response> {
        if session.previous_step == Some(ReceivingStep::Lot) {
            return self.flow.advance(session, ReceivingStep::CodeDate);
        }
        session.previous_step = Some(ReceivingStep::CodeDate);
        Ok(quantity_prompt(session))
    }

    /// 保质期采集 (日历或儒略变体)
    pub fn process_best_by(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let step = session.current_step;
        let scanned = input.trim().to_uppercase();

        // F2 跳过: 本托盘不再要求保质期
        if scanned == "F2" {
            session.best_by_kind = BestByKind::None;
            return self.flow.advance(session, step);
        }

        let parsed = match step {
            ReceivingStep::BestByJulian => parse_julian_date(&scanned),
            _ => parse_code_date(&scanned),
        };
        let date = match parsed {
            Some(d) => d,
            None => return Ok(Response::error(step, i18n::t("receiving.date_invalid"))),
        };

        session.best_by_date = to_code_date(date);
        session.best_by_julian = to_julian_date(date);
        self.flow.advance(session, step)
    }
}

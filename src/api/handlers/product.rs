// ==========================================
// 冷链仓储入库收货系统 - 品码步骤处理器
// ==========================================
// 匹配有效品种 (品码/供应商品码/GTIN) -> 复制品种默认值
// -> 快速收货预期发票校验 -> 动态轨道未登记分流
// -> 按日期类型与自动日期策略进入日期或数量
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::HandlerResult;
use crate::api::response::{FieldOverride, FunctionKey, Response};
use crate::config::FacilityContext;
use crate::domain::dates::to_code_date;
use crate::domain::session::ReceivingSession;
use crate::domain::types::{BestByKind, DateKind, ReceivingStep};
use crate::i18n;
use crate::repository::{ProductRepository, RailRepository};

pub struct ProductHandler {
    products: Arc<ProductRepository>,
    rail: Arc<RailRepository>,
    ctx: Arc<FacilityContext>,
}

impl ProductHandler {
    pub fn new(
        products: Arc<ProductRepository>,
        rail: Arc<RailRepository>,
        ctx: Arc<FacilityContext>,
    ) -> Self {
        Self {
            products,
            rail,
            ctx,
        }
    }

    fn blank_error(session: &ReceivingSession) -> Response {
        let key = if session.reqs().use_128_barcode {
            "receiving.bad_scan"
        } else {
            "receiving.product_blank"
        };
        Response::error(session.current_step, i18n::t(key))
    }

    pub fn process(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();

        // 上托盘复制: 同品连续收货时键入 6 复用上一托盘
        if self.ctx.config().copy_forward_enabled
            && !session.previous_product.is_empty()
            && scanned == "6"
        {
            session.apply_copy_forward();
            return Ok(quantity_prompt(session));
        }

        if scanned.is_empty() {
            return Ok(Self::blank_error(session));
        }

        let reqs = session.reqs();
        let snapshot = self.products.find_active(
            &session.customer_code,
            &session.owner_code,
            &scanned,
            reqs.gtin_validation,
        )?;
        let snapshot = match snapshot {
            Some(s) => s,
            None => {
                return Ok(Response::error(
                    session.current_step,
                    i18n::t("receiving.product_no_active"),
                ))
            }
        };
        let product_code = snapshot.product_code.clone();

        // 快速收货必须有预期发票行
        if session.quick_receive
            && !session.truck_to_truck
            && !self
                .products
                .expected_invoice_exists(&session.batch_id, &product_code)?
        {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.quick_no_asn"),
            ));
        }

        // 品种默认值落会话
        session.catch_weight = snapshot.is_catch_weight();
        session.unit_net_weight = snapshot.net_weight;
        session.date_kind = snapshot.date_kind();
        session.best_by_kind = snapshot.best_by_kind();
        session.blast_hours = snapshot.effective_blast_hours();
        session.tie = snapshot.tie;
        session.high = snapshot.high;
        session.is_blast = (if snapshot.needs_blast() { "Y" } else { "N" }).to_string();
        session.blast_initial = session.is_blast.clone();
        session.is_hpp = (if snapshot.is_hpp { "Y" } else { "N" }).to_string();
        session.hpp_product = snapshot.is_hpp;
        session.edi_batch_product = format!("{}{}", session.batch_id, product_code);
        session.blast_request_key = format!(
            "{}{:<4}{}",
            session.batch_id, snapshot.product_group, product_code
        );
        session.previous_product = product_code.clone();
        session.product_code = product_code.clone();
        session.product = Some(snapshot);
        debug!(
            batch = %session.batch_id,
            product = %product_code,
            date_kind = %session.date_kind,
            "品种命中"
        );

        // 动态轨道: 本批未登记码放的品种先采 BOL 数量
        if session.dynamic_rail && session.current_scan_product != product_code {
            let registered = self
                .rail
                .rail_exists(&session.assigned_batch, &product_code)?;
            if !registered {
                session.current_scan_product = product_code;
                session.previous_step = Some(ReceivingStep::Product);
                session.current_step = ReceivingStep::BolQuantity;
                return Ok(Response::ok(ReceivingStep::BolQuantity)
                    .with_field(FieldOverride::new("bol_qty")));
            }
        }
        session.current_scan_product = product_code;

        session.previous_step = Some(ReceivingStep::Product);
        Ok(advance_after_product(session, &self.ctx))
    }
}

/// 品码确认后的走向 (动态轨道登记完成后复用)
///
/// - 无日期品种: 日期取批次日期，直接采数量
/// - 批号反推日期: 跳过日期采集，直接采数量
/// - 其他: 进日期步骤
pub(crate) fn advance_after_product(
    session: &mut ReceivingSession,
    ctx: &FacilityContext,
) -> Response {
    let reqs = session.reqs();
    match session.date_kind {
        DateKind::None => {
            let date = session
                .batch
                .as_ref()
                .and_then(|b| b.batch_date)
                .unwrap_or_else(|| ctx.today());
            session.code_date = to_code_date(date);
            quantity_prompt(session)
        }
        _ if reqs.auto_date_for_lot && reqs.require_lot => {
            let mut resp = quantity_prompt(session);
            resp.fields.push(FieldOverride::new("code_date").readonly());
            resp
        }
        _ => {
            session.current_step = ReceivingStep::CodeDate;
            let default = match session.date_kind {
                DateKind::Julian => session.julian_date.clone(),
                _ => session.code_date.clone(),
            };
            let mut f = FieldOverride::new("code_date");
            if reqs.asn_pallet && !default.is_empty() {
                f = f.default_value(default);
            }
            let mut resp = Response::ok(ReceivingStep::CodeDate)
                .with_field(f)
                .with_keys(vec![FunctionKey::Exit, FunctionKey::SkipDate]);
            // 推算保质期时展示只读保质期字段
            if reqs.calc_best_by && session.best_by_kind != BestByKind::None {
                let key = match session.best_by_kind {
                    BestByKind::Julian => "best_by_julian",
                    _ => "best_by_date",
                };
                resp = resp.with_field(FieldOverride::new(key).readonly());
            }
            resp
        }
    }
}

/// 数量采集应答 (码放提示 + ASN 默认值)
pub(crate) fn quantity_prompt(session: &mut ReceivingSession) -> Response {
    session.current_step = ReceivingStep::Quantity;
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
    if reqs.asn_pallet && !reqs.asn_no_qty {
        let default = session
            .quantity
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|v| *v != 0)
            .map(|v| v.to_string())
            .unwrap_or_default();
        f = f.default_value(default);
    } else {
        f = f.default_value("");
    }
    let mut resp = Response::ok(ReceivingStep::Quantity).with_field(f);
    if !session.code_date.is_empty() {
        resp = resp.with_field(
            FieldOverride::new("code_date")
                .value(session.code_date.clone())
                .readonly(),
        );
    }
    resp
}

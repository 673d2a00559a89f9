// ==========================================
// 冷链仓储入库收货系统 - 托盘步骤处理器
// ==========================================
// 规范化 -> 批号条码交换启发式 -> 偏移截取 -> 长度校验
// -> 多收货员复核 -> 外部重命名解析 -> 续用在库托盘或插占位行
// -> 客户托盘/品码/ASN 预填
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::HandlerResult;
use crate::api::handlers::common;
use crate::api::response::{FieldOverride, FunctionKey, Response};
use crate::config::FacilityContext;
use crate::domain::dates::{to_code_date, to_julian_date};
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::services::InboundProcedures;
use crate::i18n;
use crate::repository::pallet_repo::NewPallet;
use crate::repository::{AsnPalletRepository, BatchRepository, PalletRepository};

pub struct PalletHandler {
    pallets: Arc<PalletRepository>,
    batches: Arc<BatchRepository>,
    asn: Arc<AsnPalletRepository>,
    procedures: Arc<dyn InboundProcedures>,
    ctx: Arc<FacilityContext>,
}

impl PalletHandler {
    pub fn new(
        pallets: Arc<PalletRepository>,
        batches: Arc<BatchRepository>,
        asn: Arc<AsnPalletRepository>,
        procedures: Arc<dyn InboundProcedures>,
        ctx: Arc<FacilityContext>,
    ) -> Self {
        Self {
            pallets,
            batches,
            asn,
            procedures,
            ctx,
        }
    }

    /// 批号条码交换启发式
    ///
    /// 前三位数字 + 第四位连字符 => 重排为 "尾段(去末位)-前三位"
    fn swap_by_lot_barcode(session: &mut ReceivingSession) -> bool {
        let pal = session.pallet_id.clone();
        let chars: Vec<char> = pal.chars().collect();
        if chars.len() > 4
            && chars[0].is_ascii_digit()
            && chars[1].is_ascii_digit()
            && chars[2].is_ascii_digit()
            && chars[3] == '-'
        {
            session.working_pallet_id = pal.clone();
            let tail: String = chars[4..chars.len() - 1].iter().collect();
            let head: String = chars[..3].iter().collect();
            session.pallet_id = format!("{}-{}", tail, head);
            return true;
        }
        false
    }

    pub fn process(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let step = session.current_step;
        let reqs = session.reqs();

        // F8: 请求下一个 SSCC 标签作为托盘号
        let mut scanned = input.trim().to_uppercase();
        let mut used_label = false;
        if scanned == "F8" {
            match self
                .procedures
                .next_sscc_label(&session.customer_code, "")?
            {
                Some(label) => {
                    scanned = label.trim().to_uppercase();
                    used_label = true;
                }
                None => {
                    return Ok(Response::error(step, i18n::t("receiving.pallet_blank")));
                }
            }
        }

        session.clear_pallet_fields();
        if scanned.is_empty() {
            return Ok(Response::error(step, i18n::t("receiving.pallet_blank")));
        }

        session.pallet_id = scanned.clone();
        let swapped = Self::swap_by_lot_barcode(session);
        let mut lc_pal = scanned.clone();
        if swapped {
            if reqs.found && (reqs.pallet_offset_from > 0 || reqs.pallet_offset_to > 0) {
                lc_pal = common::js_slice(&scanned, reqs.pallet_offset_from, reqs.pallet_offset_to);
            } else {
                lc_pal = session.pallet_id.clone();
            }
        }
        if lc_pal.is_empty() {
            return Ok(Response::error(step, i18n::t("receiving.pallet_blank")));
        }

        // YYWWD 冷码解析
        if reqs.yyww_cool_code && lc_pal.trim().len() >= 6 {
            session.code_date = common::js_slice(&lc_pal, 1, lc_pal.chars().count() as i64 - 5);
            session.cool_code = common::js_slice(&lc_pal, 1, lc_pal.chars().count() as i64 - 6);
        }

        if reqs.validate_pallet_length
            && lc_pal.trim().chars().count() as i64 > reqs.pallet_max_length
        {
            return Ok(Response::error(step, i18n::t("receiving.pallet_too_long")));
        }

        // 多收货员: 批次可能已被其他人收完
        if session.multi_receiver {
            if let Some(status) = self.batches.scan_status(&session.batch_id)? {
                session.multi_scan_status = status;
            }
            if session.multi_scan_status == "R" {
                session.previous_step = Some(step);
                session.current_step = ReceivingStep::CloseReceived;
                return Ok(Response::info(
                    ReceivingStep::CloseReceived,
                    i18n::t("receiving.data_not_sent"),
                ));
            }
        }

        // 外部重命名解析
        let outcome = self.procedures.rename_pallet(&lc_pal)?;
        if let Some(resolved) = outcome.resolved_id {
            let resolved = resolved.trim().to_string();
            if !resolved.is_empty() {
                lc_pal = resolved;
            }
        }

        if outcome.message == "NOT SHIPPED" {
            if let Some(existing) = self.pallets.find_by_pallet_id(&lc_pal)? {
                if existing.batch_prefix() != session.batch_id {
                    return Ok(Response::error(step, i18n::t("receiving.pallet_duplicate")));
                }
                if existing.rec_type.to_uppercase() == "O" {
                    return Ok(Response::error(step, i18n::t("receiving.pallet_outbound")));
                }
                if !session.assigned_batch.is_empty() {
                    // 动态联动下重复扫到自己批次的托盘: 询问是否重扫
                    session.pallet_id = lc_pal;
                    session.previous_step = Some(step);
                    session.current_step = ReceivingStep::PalletRescan;
                    return Ok(Response::ok(ReceivingStep::PalletRescan)
                        .with_field(
                            FieldOverride::new("pallet_rescan")
                                .label(i18n::t("receiving.pallet_rescan")),
                        ));
                }
                // 续用本批次在库托盘
            } else {
                self.insert_placeholder(session, &lc_pal)?;
            }
        } else {
            self.insert_placeholder(session, &lc_pal)?;
        }

        session.pallet_id = lc_pal;
        self.advance_after_pallet(session, used_label)
    }

    fn insert_placeholder(
        &self,
        session: &ReceivingSession,
        pallet_id: &str,
    ) -> HandlerResult<()> {
        let status = session
            .requirements
            .as_ref()
            .map(|r| r.customer_status.clone())
            .unwrap_or_default();
        debug!(pallet_id, batch = %session.batch_id, "插入托盘占位行");
        self.pallets.insert_placeholder(&NewPallet {
            pallet_id,
            customer_code: &session.customer_code,
            batch_id: &session.batch_id,
            status_code: &status,
            operator_id: &session.operator_id,
            now: self.ctx.now(),
        })?;
        Ok(())
    }

    /// 托盘落账后的走向: 客户托盘 / 品码 (+ASN 预填)
    pub(crate) fn advance_after_pallet(
        &self,
        session: &mut ReceivingSession,
        echo_pallet: bool,
    ) -> HandlerResult<Response> {
        let reqs = session.reqs();
        let mut resp;
        if reqs.require_customer_pallet && reqs.found {
            if reqs.customer_pallet_same {
                session.customer_pallet_id = session.pallet_id.clone();
                session.current_step = ReceivingStep::Product;
                resp = self.product_prompt(session)?;

                // 客户托盘号按配置截取后回显
                let mut f = FieldOverride::new("customer_pallet").readonly();
                let derived = if reqs.customer_pallet_from > 1 || reqs.customer_pallet_to > 0 {
                    let start = if reqs.customer_pallet_from < 2 {
                        1
                    } else {
                        reqs.customer_pallet_from
                    };
                    let chars: Vec<char> = session.customer_pallet_id.chars().collect();
                    let end = reqs.customer_pallet_to.clamp(0, chars.len() as i64);
                    let begin = (start - 1).clamp(0, end);
                    chars[begin as usize..end as usize].iter().collect()
                } else if reqs.customer_pid_length > 0 {
                    common::right_chars(session.customer_pallet_id.trim(), reqs.customer_pid_length)
                } else {
                    session.customer_pallet_id.clone()
                };
                session.customer_pallet_id = derived.clone();
                f = f.value(derived.clone()).default_value(derived);
                resp = resp.with_field(f);
            } else {
                session.current_step = ReceivingStep::CustomerPallet;
                resp = Response::ok(ReceivingStep::CustomerPallet)
                    .with_field(FieldOverride::new("customer_pallet").max_length(reqs.scan_length));
            }
        } else {
            session.current_step = ReceivingStep::Product;
            resp = self.product_prompt(session)?;
        }
        session.previous_step = Some(ReceivingStep::Pallet);

        if echo_pallet {
            resp = resp.with_field(
                FieldOverride::new("pallet")
                    .value(session.pallet_id.clone())
                    .readonly(),
            );
        }
        Ok(resp)
    }

    /// 品码采集应答 (含 ASN 预填)
    pub(crate) fn product_prompt(
        &self,
        session: &mut ReceivingSession,
    ) -> HandlerResult<Response> {
        let reqs = session.reqs();
        if reqs.asn_pallet {
            self.apply_asn(session)?;
        }
        let mut f = FieldOverride::new("product").max_length(reqs.scan_length);
        if !session.product_code.is_empty() {
            f = f
                .default_value(session.product_code.clone())
                .value(session.product_code.clone());
        }
        Ok(Response::ok(ReceivingStep::Product).with_field(f))
    }

    /// ASN 预填: 品码/日期/批号/数量
    fn apply_asn(&self, session: &mut ReceivingSession) -> HandlerResult<()> {
        let reqs = session.reqs();
        let mut row = self.asn.find(&session.batch_id, &session.pallet_id)?;
        if row.is_none() && reqs.require_customer_pallet {
            row = self
                .asn
                .find(&session.batch_id, &session.customer_pallet_id)?;
        }
        if let Some(asn) = row {
            if !asn.product_code.is_empty() {
                session.product_code = asn.product_code.clone();
            }
            if let Some(d) = asn.code_date {
                session.code_date = to_code_date(d);
                session.julian_date = to_julian_date(d);
            }
            session.lot_no = if reqs.require_lot && !asn.lot_no.trim().is_empty() {
                asn.lot_no.clone()
            } else {
                String::new()
            };
            session.quantity = format!("{:0>4}", asn.qty);
            session.expected_asn_qty = asn.qty;
            debug!(
                pallet = %session.pallet_id,
                product = %session.product_code,
                qty = asn.qty,
                "按 ASN 预填"
            );
        }
        Ok(())
    }

    /// 重复托盘重扫确认 (动态联动)
    pub fn process_rescan(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        if common::is_yes(input) {
            self.pallets.clear_merge_flag(&session.pallet_id)?;
            return self.advance_after_pallet(session, false);
        }
        session.current_step = ReceivingStep::Pallet;
        let reqs = session.reqs();
        Ok(
            Response::error(ReceivingStep::Pallet, i18n::t("receiving.pallet_not_same"))
                .with_field(FieldOverride::new("pallet").max_length(reqs.scan_length))
                .with_keys(vec![FunctionKey::Exit, FunctionKey::Label]),
        )
    }

    /// 客户托盘号采集
    pub fn process_customer_pallet(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.custpal_blank"),
            ));
        }
        let reqs = session.reqs();
        session.customer_pallet_id = if reqs.customer_pid_length > 0 {
            common::right_chars(&scanned, reqs.customer_pid_length)
        } else {
            scanned
        };
        session.previous_step = Some(ReceivingStep::CustomerPallet);
        session.current_step = ReceivingStep::Product;
        let mut resp = self.product_prompt(session)?;
        if reqs.customer_pid_length > 0 {
            resp = resp.with_field(
                FieldOverride::new("customer_pallet")
                    .value(session.customer_pallet_id.clone())
                    .default_value(session.customer_pallet_id.clone()),
            );
        }
        Ok(resp)
    }
}

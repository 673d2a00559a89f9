// ==========================================
// 冷链仓储入库收货系统 - 处理器公共部件
// ==========================================

use std::sync::Arc;

use crate::api::error::HandlerResult;
use crate::api::response::{FieldOverride, FunctionKey, Response};
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::sequencer::StepSequencer;
use crate::engine::services::DynamicAttributeProvider;
use crate::i18n;

/// 批次号规范化: 去空白、大写、纯数字左补零到 7 位
pub fn normalize_batch(input: &str) -> String {
    let s = input.trim().to_uppercase();
    if !s.is_empty() && s.len() < 7 && s.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>7}", s)
    } else {
        s
    }
}

pub fn is_yes(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("Y")
}

pub fn is_no(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("N")
}

/// JS 风格切片: slice(from, len - to)，越界取空
pub fn js_slice(s: &str, from: i64, to_off: i64) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let start = from.clamp(0, len);
    let end = (len - to_off).clamp(start, len);
    chars[start as usize..end as usize].iter().collect()
}

/// 右取 n 个字符
pub fn right_chars(s: &str, n: i64) -> String {
    if n <= 0 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let skip = chars.len().saturating_sub(n as usize);
    chars[skip..].iter().collect()
}

/// 无效步骤应答（路由兜底，不改会话）
pub fn invalid_operation(step: ReceivingStep) -> Response {
    Response::error(step, i18n::t("common.invalid_operation"))
}

// ==========================================
// StepFlow - 标量步骤完成后的公共推进
// ==========================================
// 调 StepSequencer 决定下一步，并按下一步组装字段覆盖;
// 到达托盘小结时拼装小结负载与动态属性
pub struct StepFlow {
    attributes: Arc<dyn DynamicAttributeProvider>,
}

impl StepFlow {
    pub fn new(attributes: Arc<dyn DynamicAttributeProvider>) -> Self {
        Self { attributes }
    }

    /// 完成一个可选字段步骤后推进
    pub fn advance(
        &self,
        session: &mut ReceivingSession,
        completed: ReceivingStep,
    ) -> HandlerResult<Response> {
        let next = StepSequencer::next(completed, &session.sequencer_flags());
        session.previous_step = Some(completed);
        session.current_step = next;

        let reqs = session.reqs();
        let mut resp = Response::ok(next);
        match next {
            ReceivingStep::Lot => {
                let mut f = FieldOverride::new("lot").max_length(reqs.scan_length);
                if reqs.asn_pallet && !session.lot_no.is_empty() {
                    f = f.default_value(session.lot_no.clone());
                }
                resp = resp
                    .with_field(f)
                    .with_keys(vec![FunctionKey::Exit, FunctionKey::SkipLot]);
            }
            ReceivingStep::CustomerLot => {
                resp = resp.with_field(FieldOverride::new("customer_lot").max_length(reqs.scan_length));
            }
            ReceivingStep::CodeDate => {
                let default = match session.date_kind {
                    crate::domain::types::DateKind::Julian => session.julian_date.clone(),
                    _ => session.code_date.clone(),
                };
                let mut f = FieldOverride::new("code_date");
                if !default.is_empty() {
                    f = f.default_value(default);
                }
                resp = resp
                    .with_field(f)
                    .with_keys(vec![FunctionKey::Exit, FunctionKey::SkipDate]);
            }
            ReceivingStep::Temperature => {
                let mut f = FieldOverride::new("temperature");
                if !session.temperature.is_empty() {
                    f = f.default_value(session.temperature.clone());
                }
                resp = resp.with_field(f);
            }
            ReceivingStep::SendPallet => {
                let summary = self.summary(session)?;
                resp = resp
                    .with_payload(summary)
                    .with_keys(vec![FunctionKey::Exit, FunctionKey::Dims]);
            }
            _ => {}
        }
        Ok(resp)
    }

    /// 托盘小结负载 (含动态属性附加字段)
    pub fn summary(&self, session: &ReceivingSession) -> HandlerResult<serde_json::Value> {
        let attributes = self
            .attributes
            .attributes_for(&session.customer_code, &session.product_code, &session.batch_id)?;
        let attributes: Vec<serde_json::Value> = attributes
            .into_iter()
            .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
            .collect();

        Ok(serde_json::json!({
            "pallet": session.pallet_id,
            "customer_pallet": session.customer_pallet_id,
            "product": session.product_code,
            "qty": session.quantity,
            "code_date": session.code_date,
            "lot": session.lot_no,
            "blast": session.is_blast,
            "hpp": session.is_hpp,
            "attributes": attributes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_batch() {
        assert_eq!(normalize_batch(" 1234 "), "0001234");
        assert_eq!(normalize_batch("0001234"), "0001234");
        assert_eq!(normalize_batch("ab12"), "AB12");
        assert_eq!(normalize_batch(""), "");
    }

    #[test]
    fn test_js_slice() {
        assert_eq!(js_slice("ABCDEFGH", 2, 1), "CDEFG");
        assert_eq!(js_slice("AB", 5, 0), "");
        assert_eq!(js_slice("ABCD", 0, 0), "ABCD");
    }

    #[test]
    fn test_right_chars() {
        assert_eq!(right_chars("ABCDEF", 3), "DEF");
        assert_eq!(right_chars("AB", 5), "AB");
        assert_eq!(right_chars("AB", 0), "AB");
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 批次步骤处理器
// ==========================================
// 拒绝优先级: 指派不符 -> 不存在 -> 他人扫描中 -> 已发运 -> 编辑中 -> 已收完
// 成功路径: 注意事项打断(一次) -> 清遗留 -> 盖扫描开始章 -> 装载客户要求
//           -> 推导快速收货/车对车/收货方交叉 -> 托盘 (或先采机台号)
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::HandlerResult;
use crate::api::handlers::common;
use crate::api::response::{FieldOverride, FunctionKey, Response};
use crate::config::FacilityContext;
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::services::InboundProcedures;
use crate::i18n;
use crate::repository::{
    BatchRepository, ConfirmationRepository, QuickReceiveRepository, RequirementRepository,
};

pub struct BatchHandler {
    batches: Arc<BatchRepository>,
    requirements: Arc<RequirementRepository>,
    quick: Arc<QuickReceiveRepository>,
    confirmations: Arc<ConfirmationRepository>,
    procedures: Arc<dyn InboundProcedures>,
    ctx: Arc<FacilityContext>,
}

impl BatchHandler {
    pub fn new(
        batches: Arc<BatchRepository>,
        requirements: Arc<RequirementRepository>,
        quick: Arc<QuickReceiveRepository>,
        confirmations: Arc<ConfirmationRepository>,
        procedures: Arc<dyn InboundProcedures>,
        ctx: Arc<FacilityContext>,
    ) -> Self {
        Self {
            batches,
            requirements,
            quick,
            confirmations,
            procedures,
            ctx,
        }
    }

    pub fn process(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let step = session.current_step;
        session.multi_receiver = self.ctx.config().allow_multiple_receivers;

        // ShowNotes 打断后的二次提交可以不带批次号
        let batch_no = {
            let scanned = common::normalize_batch(input);
            if scanned.is_empty() && step == ReceivingStep::ShowNotes {
                session.batch_id.clone()
            } else {
                scanned
            }
        };

        if !session.assigned_batch.is_empty() && !batch_no.is_empty()
            && batch_no != session.assigned_batch
        {
            return Ok(Response::error(step, i18n::t("receiving.batch_not_assigned")));
        }
        if batch_no.is_empty() {
            return Ok(Response::error(step, i18n::t("receiving.batch_empty")));
        }

        let batch = match self.batches.find(&batch_no)? {
            Some(b) => b,
            None => return Ok(Response::error(step, i18n::t("receiving.batch_not_found"))),
        };

        // 拒绝检查，顺序固定; 被拒绝时会话不变
        if batch.is_scanning() && !session.multi_receiver {
            return Ok(Response::error(step, i18n::t("receiving.batch_scanned")));
        }
        if batch.is_shipped() {
            return Ok(Response::error(step, i18n::t("receiving.batch_shipped")));
        }
        if batch.in_use == "Y" {
            return Ok(Response::error(step, i18n::t("receiving.batch_in_use")));
        }
        if batch.is_received() {
            return Ok(Response::error(step, i18n::t("receiving.batch_done")));
        }

        let quick_link = self.quick.find(&batch_no)?;

        // 一次性注意事项打断 (仅首次进入批次步骤时)
        if step == ReceivingStep::Batch {
            let mut note = self
                .procedures
                .customer_notes(&batch.customer_code, &batch.consignee_code)?;
            if note.is_none() {
                if let Some(link) = &quick_link {
                    note = match link.receive_type.as_str() {
                        "L" => Some(i18n::t("receiving.leave_on_truck")),
                        "D" => Some(i18n::t("receiving.store_on_dock")),
                        "S" => Some(i18n::t("receiving.store_in_freezer")),
                        _ => None,
                    };
                }
            }
            if let Some(text) = note {
                session.batch_id = batch_no;
                session.previous_step = Some(ReceivingStep::Batch);
                session.current_step = ReceivingStep::ShowNotes;
                return Ok(Response::ok(ReceivingStep::ShowNotes).with_payload(
                    serde_json::json!({ "label": i18n::t("receiving.notes_label"), "notes": text }),
                ));
            }
        }

        // 尚无扫描人时清除遗留的入库数据，再盖扫描开始章 (幂等)
        if batch.scan_operator.trim().is_empty() {
            self.batches.purge_inbound(&batch_no)?;
        }
        self.batches
            .mark_scan_start(&batch_no, &session.operator_id, self.ctx.now())?;

        // 关联确认单补开始时间 (已有值保留)
        let confirmation_no = batch.confirmation_no.trim();
        if !confirmation_no.is_empty() {
            self.confirmations
                .stamp_start(confirmation_no, self.ctx.now())?;
        }

        // 装载客户扫码要求
        let owner = if batch.owner_code.trim().is_empty() {
            batch.customer_code.clone()
        } else {
            batch.owner_code.trim().to_string()
        };
        let reqs = self.requirements.find(&batch.customer_code)?;
        debug!(
            batch = %batch_no,
            customer = %batch.customer_code,
            found = reqs.found,
            "装载客户扫码要求"
        );

        // 快速收货与车对车推导
        let mut quick_receive = false;
        let mut truck_to_truck = false;
        let mut truck_stage = false;
        let mut consignee_cross = false;
        let mut outbound_batch = String::new();
        let outbound = batch.outbound_batch.trim().to_string();
        if !outbound.is_empty() {
            if self.ctx.config().quick_batch {
                if let Some(link) = &quick_link {
                    if link.outbound_batch == outbound {
                        truck_to_truck = true;
                        if link.receive_type == "T" {
                            truck_stage = true;
                        }
                    }
                }
            }
            if self.quick.outbound_exists(&outbound)? {
                self.quick.stamp_outbound_scan(&outbound, self.ctx.now())?;
            }
            outbound_batch = outbound;
            quick_receive = true;
        } else if self.ctx.config().quick_batch {
            if let Some(link) = &quick_link {
                if link.receive_type == "C" {
                    consignee_cross = true;
                }
            }
        }

        // 会话落位
        session.batch_id = batch_no;
        session.customer_code = batch.customer_code.clone();
        session.owner_code = owner;
        session.quick_receive = quick_receive;
        session.quick_receive_type = quick_link
            .as_ref()
            .map(|l| l.receive_type.clone())
            .unwrap_or_default();
        session.outbound_batch = outbound_batch;
        session.truck_to_truck = truck_to_truck;
        session.truck_stage = truck_stage;
        session.consignee_cross = consignee_cross;
        session.dynamic_rail = !session.assigned_batch.is_empty();
        session.batch = Some(batch);
        session.requirements = Some(reqs.clone());

        // 车对车且机台号未知: 先采机台号
        if session.truck_to_truck && session.machine_id.is_empty() {
            session.previous_step = Some(ReceivingStep::MachineId);
            session.current_step = ReceivingStep::MachineId;
            return Ok(Response::ok(ReceivingStep::MachineId));
        }

        session.previous_step = Some(ReceivingStep::Batch);
        session.current_step = ReceivingStep::Pallet;
        session.pallet_id.clear();
        Ok(Response::ok(ReceivingStep::Pallet)
            .with_field(FieldOverride::new("pallet").max_length(reqs.scan_length))
            .with_keys(vec![FunctionKey::Exit, FunctionKey::Label]))
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 退出/关闭步骤族处理器
// ==========================================
// 退出键从任意步骤进入; 按多收货员状态分流到:
// 立即关闭 / 等待他人 / 已关闭确认 / 托盘合并询问
// 每条成功关闭路径都入队结算任务并重置会话
// ==========================================

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::error::HandlerResult;
use crate::api::handlers::common;
use crate::api::response::{
    FieldOverride, FunctionKey, Response, INFO_DYNAMIC_WAREHOUSE, INFO_MAIN_MENU,
    INFO_MERGE_PALLETS,
};
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::close_queue::CloseQueue;
use crate::engine::services::InboundProcedures;
use crate::i18n;
use crate::repository::{BatchRepository, PalletRepository, SessionStore};

/// 跨模块命名空间
const NS_DYNAMIC_WAREHOUSE: &str = "DYNAMIC_WAREHOUSE";
const NS_CATCH_WEIGHT: &str = "CATCHWEIGHT";
const NS_PALLET_MERGE: &str = "PALMERGE";

pub struct CloseHandler {
    batches: Arc<BatchRepository>,
    pallets: Arc<PalletRepository>,
    queue: Arc<CloseQueue>,
    sessions: Arc<dyn SessionStore>,
    procedures: Arc<dyn InboundProcedures>,
}

impl CloseHandler {
    pub fn new(
        batches: Arc<BatchRepository>,
        pallets: Arc<PalletRepository>,
        queue: Arc<CloseQueue>,
        sessions: Arc<dyn SessionStore>,
        procedures: Arc<dyn InboundProcedures>,
    ) -> Self {
        Self {
            batches,
            pallets,
            queue,
            sessions,
            procedures,
        }
    }

    // ==========================================
    // 退出 (F5, 任意步骤有效)
    // ==========================================
    pub fn process_exit(&self, session: &mut ReceivingSession) -> HandlerResult<Response> {
        session.previous_step = Some(session.current_step);
        session.current_step = ReceivingStep::Exit;
        let mut info_msg = String::new();

        if !session.batch_id.trim().is_empty() {
            // 零数量、未落位的占位托盘立即删除，不留孤行
            if !session.pallet_id.is_empty() {
                let deleted = self
                    .pallets
                    .delete_untracked_placeholder(&session.pallet_id)?;
                if deleted {
                    debug!(pallet = %session.pallet_id, "退出: 删除占位托盘");
                }
                info_msg = i18n::t("receiving.data_not_sent");
            }

            if let Some(status) = self.batches.scan_status(&session.batch_id)? {
                session.multi_scan_status = status;
            }
            session.current_step = if session.multi_receiver && session.multi_scan_status == "R" {
                ReceivingStep::CloseReceived
            } else if !session.multi_receiver {
                ReceivingStep::Close
            } else {
                // 多收货员且批次未关: 询问是否全部收完
                if self
                    .sessions
                    .has_namespace(&session.operator_id, NS_DYNAMIC_WAREHOUSE)?
                {
                    session.assigned_batch = session.batch_id.clone();
                    session.originator = NS_DYNAMIC_WAREHOUSE.to_string();
                }
                ReceivingStep::CloseAllReceived
            };
            if session.previous_step == Some(ReceivingStep::ShowNotes) {
                info_msg = i18n::t("receiving.data_not_sent");
            }

            let step = session.current_step;
            let label_key = match step {
                ReceivingStep::Close => "receiving.close_prompt",
                ReceivingStep::CloseAllReceived => "receiving.close_all_prompt",
                _ => "receiving.close_wait",
            };
            let mut resp = if info_msg.is_empty() {
                Response::ok(step)
            } else {
                Response::info(step, info_msg)
            };
            resp = resp.with_field(FieldOverride::new("close").label(i18n::t(label_key)));
            return Ok(resp);
        }

        // 无批次: 返回主菜单或动态仓上下文
        if self
            .sessions
            .has_namespace(&session.operator_id, NS_DYNAMIC_WAREHOUSE)?
        {
            session.current_step = ReceivingStep::Batch;
            return Ok(Response::info(ReceivingStep::Batch, INFO_DYNAMIC_WAREHOUSE));
        }
        self.sessions
            .delete_namespace(&session.operator_id, NS_CATCH_WEIGHT)?;
        session.end_session = true;
        Ok(Response::info(ReceivingStep::Exit, INFO_MAIN_MENU))
    }

    // ==========================================
    // 立即关闭确认 (单收货员)
    // ==========================================
    pub fn process_close(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        if common::is_yes(input) {
            return self.schedule_close_and_reset(session);
        }

        // 否: 回到托盘 (或机台号) 继续收
        let back = if session.previous_step == Some(ReceivingStep::MachineId) {
            ReceivingStep::MachineId
        } else {
            ReceivingStep::Pallet
        };
        let mut info_msg = String::new();
        if !session.pallet_id.trim().is_empty() {
            info_msg = i18n::t("receiving.data_not_sent");
            session.pallet_id.clear();
        }

        // 注意事项打断中退出后返回: 重新展示注意事项
        if session.previous_step == Some(ReceivingStep::ShowNotes) {
            let consignee = session
                .batch
                .as_ref()
                .map(|b| b.consignee_code.clone())
                .unwrap_or_default();
            if let Some(notes) = self
                .procedures
                .customer_notes(&session.customer_code, &consignee)?
            {
                session.current_step = ReceivingStep::ShowNotes;
                return Ok(Response::ok(ReceivingStep::ShowNotes).with_payload(
                    serde_json::json!({ "label": i18n::t("receiving.notes_label"), "notes": notes }),
                ));
            }
        }

        session.current_step = back;
        let resp = if info_msg.is_empty() {
            Response::ok(back)
        } else {
            Response::info(back, info_msg)
        };
        Ok(resp.with_keys(vec![FunctionKey::Exit, FunctionKey::Label]))
    }

    // ==========================================
    // 多收货员: 全部收完确认
    // ==========================================
    pub fn process_close_all_received(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let batch_id = session.batch_id.clone();
        if common::is_yes(input) {
            // 仍有未落位托盘的收货员在作业: 等待
            if self.pallets.count_by_track(&batch_id)? > 0 {
                session.current_step = ReceivingStep::CloseWait;
                return Ok(Response::ok(ReceivingStep::CloseWait).with_field(
                    FieldOverride::new("close").label(i18n::t("receiving.close_wait")),
                ));
            }
            return self.schedule_close_and_reset(session);
        }

        // 否: 不关批次，回到批次步骤 (其他人可能继续)
        let mut info_msg = String::new();
        if self
            .sessions
            .has_namespace(&session.operator_id, NS_DYNAMIC_WAREHOUSE)?
        {
            info_msg = INFO_DYNAMIC_WAREHOUSE.to_string();
        }
        session.reset_for_next_batch();
        if self.pallets.count_by_track(&batch_id)? > 0 {
            session.current_step = ReceivingStep::CloseWait;
        }
        let step = session.current_step;
        Ok(if info_msg.is_empty() {
            Response::ok(step)
        } else {
            Response::info(step, info_msg)
        })
    }

    /// 多收货员: 批次已被他人关闭的确认
    pub fn process_close_received(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        if input.trim().is_empty() {
            return Ok(Response::ok(session.current_step));
        }
        session.reset_for_next_batch();
        Ok(Response::ok(ReceivingStep::Batch))
    }

    /// 多收货员: 等待他人完成
    pub fn process_close_wait(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        if input.trim().is_empty() {
            return Ok(Response::ok(session.current_step));
        }
        let mut info_msg = String::new();
        if self
            .sessions
            .has_namespace(&session.operator_id, NS_DYNAMIC_WAREHOUSE)?
        {
            info_msg = INFO_DYNAMIC_WAREHOUSE.to_string();
        }
        session.reset_for_next_batch();
        Ok(if info_msg.is_empty() {
            Response::ok(ReceivingStep::Batch)
        } else {
            Response::info(ReceivingStep::Batch, info_msg)
        })
    }

    // ==========================================
    // 动态联动: 托盘合并询问
    // ==========================================
    pub fn process_pallet_merge(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        if common::is_yes(input) {
            session.merge_pallets = "Y".to_string();
            // 合并上下文交给出库合并模块
            self.sessions.put_namespace(
                &session.operator_id,
                NS_PALLET_MERGE,
                &serde_json::json!({
                    "step": ReceivingStep::Pallet.as_str(),
                    "originator": crate::SESSION_NAMESPACE,
                }),
            )?;
            session.reset_for_next_batch();
            return Ok(Response::info(ReceivingStep::Batch, INFO_MERGE_PALLETS));
        }
        if common::is_no(input) {
            session.merge_pallets = "N".to_string();
            self.sessions
                .delete_namespace(&session.operator_id, NS_CATCH_WEIGHT)?;
            session.current_step = ReceivingStep::Exit;
            return Ok(Response::info(ReceivingStep::Exit, INFO_DYNAMIC_WAREHOUSE));
        }
        Ok(Response::error(
            session.current_step,
            i18n::t("receiving.must_yn"),
        ))
    }

    // ==========================================
    // 机台号采集 (车对车直转)
    // ==========================================
    pub fn process_machine_id(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let scanned = input.trim().to_uppercase();
        if scanned.is_empty() {
            return Ok(Response::error(
                session.current_step,
                i18n::t("receiving.machine_blank"),
            ));
        }
        session.machine_id = scanned;
        session.previous_step = Some(ReceivingStep::MachineId);
        session.current_step = ReceivingStep::Pallet;
        let reqs = session.reqs();
        Ok(Response::ok(ReceivingStep::Pallet)
            .with_field(FieldOverride::new("pallet").max_length(reqs.scan_length))
            .with_keys(vec![FunctionKey::Exit, FunctionKey::Label]))
    }

    /// 入队结算并重置会话 (动态联动时先询问托盘合并)
    fn schedule_close_and_reset(
        &self,
        session: &mut ReceivingSession,
    ) -> HandlerResult<Response> {
        self.queue
            .enqueue(&session.batch_id, &session.operator_id)?;
        info!(batch = %session.batch_id, "批次关闭: 结算任务已入队");

        if !session.assigned_batch.is_empty() {
            session.merge_pallets = "N".to_string();
            session.current_step = ReceivingStep::PalletMerge;
            let label = format!(
                "{} {}",
                i18n::t("receiving.merge_prompt"),
                session.assigned_batch
            );
            return Ok(Response::ok(ReceivingStep::PalletMerge)
                .with_field(FieldOverride::new("merge").label(label)));
        }

        session.reset_for_next_batch();
        Ok(Response::ok(ReceivingStep::Batch))
    }
}

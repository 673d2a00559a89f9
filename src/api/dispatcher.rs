// ==========================================
// 冷链仓储入库收货系统 - 扫码分发器
// ==========================================
// 每次提交: 取会话 (无则新建) -> 全局打断 (F5 任意步骤 / F4 仅批号)
// -> 按当前步骤穷尽路由 -> 保存会话 (处理器重置则删除) -> 应答
// 红线: 会话是独占值; 一次请求只进一个处理器;
//       同步骤校验错误不落盘，保证被拒绝的提交不改会话
// ==========================================

use std::sync::Arc;
use tracing::debug;

use crate::api::error::HandlerResult;
use crate::api::handlers::{
    common, BatchHandler, BlastHandler, CloseHandler, DateHandler, PalletHandler, ProductHandler,
    QuantityHandler, RailHandler, ScalarHandler, SendPalletHandler,
};
use crate::api::response::{Response, ScanRequest};
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::engine::services::FieldMetadataProvider;
use crate::repository::SessionStore;

pub struct Dispatcher {
    sessions: Arc<dyn SessionStore>,
    fields_meta: Arc<dyn FieldMetadataProvider>,
    batch: Arc<BatchHandler>,
    pallet: Arc<PalletHandler>,
    product: Arc<ProductHandler>,
    quantity: Arc<QuantityHandler>,
    blast: Arc<BlastHandler>,
    dates: Arc<DateHandler>,
    scalars: Arc<ScalarHandler>,
    rail: Arc<RailHandler>,
    send_pallet: Arc<SendPalletHandler>,
    close: Arc<CloseHandler>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        fields_meta: Arc<dyn FieldMetadataProvider>,
        batch: Arc<BatchHandler>,
        pallet: Arc<PalletHandler>,
        product: Arc<ProductHandler>,
        quantity: Arc<QuantityHandler>,
        blast: Arc<BlastHandler>,
        dates: Arc<DateHandler>,
        scalars: Arc<ScalarHandler>,
        rail: Arc<RailHandler>,
        send_pallet: Arc<SendPalletHandler>,
        close: Arc<CloseHandler>,
    ) -> Self {
        Self {
            sessions,
            fields_meta,
            batch,
            pallet,
            product,
            quantity,
            blast,
            dates,
            scalars,
            rail,
            send_pallet,
            close,
        }
    }

    /// 处理一次扫码提交
    pub fn handle(
        &self,
        operator_id: &str,
        terminal_id: &str,
        request: &ScanRequest,
    ) -> HandlerResult<Response> {
        let mut session = self
            .sessions
            .get(operator_id)?
            .unwrap_or_else(|| ReceivingSession::new(operator_id));

        // 机台号先写先得
        if session.machine_id.is_empty() && !terminal_id.trim().is_empty() {
            session.machine_id = terminal_id.trim().to_string();
        }

        let input = request.input.as_str();
        let upper = input.trim().to_uppercase();
        let step_before = session.current_step;
        debug!(
            operator = operator_id,
            step = %session.current_step,
            "分发扫码提交"
        );

        // 全局打断: F5 退出 (任意步骤); F4 跳过批号 (仅批号步骤)
        let interrupt = upper == "F5"
            || (upper == "F4" && session.current_step == ReceivingStep::Lot);
        let mut response = if upper == "F5" {
            self.close.process_exit(&mut session)?
        } else if upper == "F4" && session.current_step == ReceivingStep::Lot {
            self.scalars.skip_lot(&mut session)?
        } else {
            self.route(&mut session, input)?
        };

        // 会话持久化: 处理器要求结束则删除;
        // 同步骤校验错误不落盘 (被拒绝的提交不改会话)
        if session.end_session {
            self.sessions.delete(operator_id)?;
        } else if response.error.is_none()
            || session.current_step != step_before
            || interrupt
        {
            self.sessions.put(operator_id, &session)?;
        }

        // 字段标签装饰 (元数据提供方只做装饰)
        for field in &mut response.fields {
            if field.label.is_none() {
                field.label = Some(self.fields_meta.label_for(&field.key));
            }
        }

        Ok(response)
    }

    /// 按当前步骤穷尽路由
    fn route(&self, session: &mut ReceivingSession, input: &str) -> HandlerResult<Response> {
        match session.current_step {
            ReceivingStep::Batch | ReceivingStep::ShowNotes => {
                self.batch.process(session, input)
            }
            ReceivingStep::MachineId => self.close.process_machine_id(session, input),
            ReceivingStep::Pallet => self.pallet.process(session, input),
            ReceivingStep::PalletRescan => self.pallet.process_rescan(session, input),
            ReceivingStep::CustomerPallet => {
                self.pallet.process_customer_pallet(session, input)
            }
            ReceivingStep::Product => self.product.process(session, input),
            ReceivingStep::CodeDate => self.dates.process_code_date(session, input),
            ReceivingStep::BestByDate | ReceivingStep::BestByJulian => {
                self.dates.process_best_by(session, input)
            }
            ReceivingStep::Quantity | ReceivingStep::QuantityConfirm => {
                self.quantity.process(session, input)
            }
            ReceivingStep::Blast => self.blast.process(session, input),
            ReceivingStep::Hpp => Ok(common::invalid_operation(session.current_step)),
            ReceivingStep::Lot => self.scalars.process_lot(session, input),
            ReceivingStep::CustomerLot => self.scalars.process_customer_lot(session, input),
            ReceivingStep::Establishment => {
                self.scalars.process_establishment(session, input)
            }
            ReceivingStep::ShipDate => self.scalars.process_ship_date(session, input),
            ReceivingStep::Reference => self.scalars.process_reference(session, input),
            ReceivingStep::Temperature => self.scalars.process_temperature(session, input),
            ReceivingStep::Consignee => self.scalars.process_consignee(session, input),
            ReceivingStep::BolQuantity => self.rail.process_bol_quantity(session, input),
            ReceivingStep::TieConfirm => self.rail.process_tie_confirm(session, input),
            ReceivingStep::Tie => self.rail.process_tie(session, input),
            ReceivingStep::High => self.rail.process_high(session, input),
            ReceivingStep::SendPallet => self.send_pallet.process(session, input),
            ReceivingStep::Close => self.close.process_close(session, input),
            ReceivingStep::CloseAllReceived => {
                self.close.process_close_all_received(session, input)
            }
            ReceivingStep::CloseReceived => self.close.process_close_received(session, input),
            ReceivingStep::CloseWait => self.close.process_close_wait(session, input),
            ReceivingStep::PalletMerge => self.close.process_pallet_merge(session, input),
            ReceivingStep::Exit => self.close.process_exit(session),
        }
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 托盘小结/发送处理器
// ==========================================
// 可选字段全部采完后: 展示小结 + 动态属性，确认后落账:
// 分配 (批次, 序列)、写托盘与配对交易行、建批号占位行，
// 然后回到托盘步骤收下一托盘
// ==========================================

use std::sync::Arc;
use tracing::info;

use crate::api::error::HandlerResult;
use crate::api::handlers::common::StepFlow;
use crate::api::response::{FieldOverride, FunctionKey, Response};
use crate::domain::session::ReceivingSession;
use crate::domain::types::ReceivingStep;
use crate::i18n;
use crate::repository::pallet_repo::FinalizePallet;
use crate::repository::{LotRepository, PalletRepository};

pub struct SendPalletHandler {
    pallets: Arc<PalletRepository>,
    lots: Arc<LotRepository>,
    flow: Arc<StepFlow>,
}

impl SendPalletHandler {
    pub fn new(
        pallets: Arc<PalletRepository>,
        lots: Arc<LotRepository>,
        flow: Arc<StepFlow>,
    ) -> Self {
        Self {
            pallets,
            lots,
            flow,
        }
    }

    pub fn process(
        &self,
        session: &mut ReceivingSession,
        input: &str,
    ) -> HandlerResult<Response> {
        let upper = input.trim().to_uppercase();

        // F7: 展示品种尺寸，停留在小结
        if upper == "F7" {
            let dims = session
                .product
                .as_ref()
                .map(|p| serde_json::json!({ "width": p.width, "height": p.height, "length": p.length }))
                .unwrap_or_else(|| serde_json::json!({}));
            return Ok(Response::ok(ReceivingStep::SendPallet)
                .with_payload(dims)
                .with_keys(vec![FunctionKey::Exit, FunctionKey::Dims]));
        }

        // 其余输入视为确认发送
        let qty = session.quantity.trim().parse::<i64>().unwrap_or(0);
        let sequence = self.lots.find_or_allocate_sequence(
            &session.batch_id,
            &session.product_code,
            &session.lot_no,
        )?;
        let track = format!("{}{}", session.batch_id, sequence);

        let serial = self
            .pallets
            .find_by_pallet_id(&session.pallet_id)?
            .map(|p| p.serial_no)
            .unwrap_or_default();

        self.pallets.finalize(&FinalizePallet {
            pallet_id: &session.pallet_id,
            track_id: &track,
            customer_pallet_id: &session.customer_pallet_id,
            qty,
            lot_no: &session.lot_no,
            customer_lot_no: &session.customer_lot_no,
            code_date: &session.code_date,
            best_by_date: &session.best_by_date,
            establishment_no: &session.establishment_no,
            ship_date: &session.ship_date,
            reference_no: &session.reference_no,
            temperature: &session.temperature,
        })?;
        self.pallets
            .upsert_transaction(&session.batch_id, &sequence, &track, &serial, qty)?;

        let product = session.product.clone();
        let (group, supplier) = product
            .as_ref()
            .map(|p| (p.product_group.clone(), p.supplier_product.clone()))
            .unwrap_or_default();
        self.lots.ensure_lot_rows(
            &session.batch_id,
            &sequence,
            &session.customer_code,
            &session.owner_code,
            &group,
            &session.product_code,
            &supplier,
            &session.lot_no,
        )?;

        info!(
            batch = %session.batch_id,
            pallet = %session.pallet_id,
            %track, qty, "托盘落账"
        );

        // 回到托盘步骤收下一托盘
        let summary = self.flow.summary(session)?;
        let reqs = session.reqs();
        session.clear_pallet_fields();
        session.previous_step = Some(ReceivingStep::SendPallet);
        session.current_step = ReceivingStep::Pallet;
        Ok(
            Response::info(ReceivingStep::Pallet, i18n::t("receiving.pallet_sent"))
                .with_payload(summary)
                .with_field(FieldOverride::new("pallet").max_length(reqs.scan_length))
                .with_keys(vec![FunctionKey::Exit, FunctionKey::Label]),
        )
    }
}

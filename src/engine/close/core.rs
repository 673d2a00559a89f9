use tracing::{debug, info, warn};

use super::{weights, CloseEngine, CloseError, CloseOutcome};
use crate::engine::services::{HoldAction, HoldScope};
use crate::repository::lot_repo::LotRecompute;

impl CloseEngine {
    /// 批次结算入口
    ///
    /// 步骤顺序固定; 每个子步骤独立提交，失败即终止后续步骤
    pub fn run(&self, batch_id: &str, operator_id: &str) -> Result<CloseOutcome, CloseError> {
        let batch = match self.batches.find(batch_id)? {
            Some(b) => b,
            None => {
                warn!(batch_id, "结算: 批次不存在");
                return Ok(CloseOutcome::NotFound);
            }
        };

        // 步骤 1: 已发运批次不再整算 (重复投递幂等)
        if batch.is_shipped() {
            info!(batch_id, "结算: 批次已发运，跳过");
            return Ok(CloseOutcome::AlreadyShipped);
        }

        let mut del_pallet_ids: Vec<i64> = Vec::new();
        let mut del_pallet_trn_ids: Vec<i64> = Vec::new();
        let mut del_lot_ids: Vec<i64> = Vec::new();
        let mut del_lot_trn_ids: Vec<i64> = Vec::new();
        let mut surviving_lots = 0usize;

        // 步骤 2-5: 逐批号整算
        let lots = self.lots.list_by_batch(batch_id)?;
        for lot in &lots {
            let lot_trn = match self.lots.find_transaction(batch_id, &lot.sequence_no)? {
                Some(t) => t,
                // 无交易行的汇总行不整算
                None => continue,
            };
            let track = lot.track_id();
            debug!(batch_id, %track, "结算: 整算批号");

            let pallets = self.pallets.list_by_track(&track)?;
            let mut qty: i64 = 0;
            let mut pallet_count: i64 = 0;
            let mut lot_has_hpp = false;

            for p in &pallets {
                qty += p.qty;
                if p.is_hpp {
                    lot_has_hpp = true;
                }
                let paired = self.pallets.find_transaction(
                    batch_id,
                    &lot.sequence_no,
                    &track,
                    &p.serial_no,
                )?;
                if let Some(trn) = paired {
                    if trn.qty == 0 && p.qty == 0 {
                        // 零数量托盘入删除队列，不计托盘数
                        del_pallet_ids.push(p.id);
                        del_pallet_trn_ids.push(trn.id);
                    } else {
                        pallet_count += 1;
                        // 配对行归一 (同事务)
                        self.pallets
                            .normalize_counts(p.id, trn.id, p.qty, p.pallet_count)?;
                    }
                }
            }

            // 步骤 3: 高压处理冻结传播
            let mut lot_hold = lot.hold_code.clone();
            if lot_has_hpp {
                for p in &pallets {
                    let check = self.procedures.check_hpp(
                        &p.customer_code,
                        &p.customer_pallet_id,
                        &p.pallet_id,
                    )?;
                    if check.use_stack_hold {
                        self.hold_service.apply_or_release(
                            &check.hold_code,
                            operator_id,
                            HoldAction::Hold,
                            HoldScope::Pallet,
                            &p.track_id,
                            &p.serial_no,
                        )?;
                    }
                    self.pallets.update_hpp(p.id, &check.hold_code)?;
                }
                if self.requirements.use_stack_hold(&lot.customer_code)? {
                    self.hold_service.apply_or_release(
                        "HPP",
                        operator_id,
                        HoldAction::Hold,
                        HoldScope::Lot,
                        &track,
                        "",
                    )?;
                } else {
                    lot_hold = "HPP".to_string();
                }
            }

            // 步骤 4: 重量整算
            let product = self.products.find_exact(
                &lot.customer_code,
                &lot.product_group,
                &lot.product_code,
                &lot.owner_code,
                &lot.supplier_product,
            )?;
            let detail_net = self.lots.detail_net_weight(batch_id, &lot.sequence_no)?;
            let (gross, net) = weights::lot_weights(product.as_ref(), detail_net, qty);
            debug!(batch_id, %track, qty, pallet_count, gross, net, "结算: 批号整算结果");

            // 步骤 5: 写回; 数量归零的批号入删除队列
            self.lots.apply_recompute(
                lot.id,
                batch_id,
                &lot.sequence_no,
                &lot_hold,
                LotRecompute {
                    qty,
                    pallet_count,
                    gross_weight: gross,
                    net_weight: net,
                },
            )?;
            if qty == 0 {
                del_lot_trn_ids.push(lot_trn.id);
                del_lot_ids.push(lot.id);
            } else {
                surviving_lots += 1;
            }
        }

        // 步骤 6: 批量删除零数量行
        if !del_pallet_ids.is_empty() {
            debug!(batch_id, count = del_pallet_ids.len(), "结算: 删除零数量托盘");
            self.pallets.delete_pallets(&del_pallet_ids)?;
        }
        if !del_pallet_trn_ids.is_empty() {
            self.pallets.delete_transactions(&del_pallet_trn_ids)?;
        }
        if !del_lot_trn_ids.is_empty() {
            self.lots.delete_transactions(&del_lot_trn_ids)?;
        }
        if !del_lot_ids.is_empty() {
            debug!(batch_id, count = del_lot_ids.len(), "结算: 删除零数量批号");
            self.lots.delete_aggregates(&del_lot_ids)?;
        }

        // 步骤 7: 批次点数与时间戳
        let (checked_qty, checked_gross) = self.lots.sum_for_batch(batch_id)?;
        let now = self.ctx.now();
        self.batches
            .mark_received(batch_id, checked_qty, checked_gross, now)?;
        info!(batch_id, checked_qty, checked_gross, "结算: 批次已标记收货完成");

        // 步骤 8: 确认单完成时间校准与级联
        let confirmation_no = batch.confirmation_no.trim();
        if !confirmation_no.is_empty() {
            if let Some(confirmation) = self.confirmations.find(confirmation_no)? {
                let finish = match confirmation.finish_at {
                    Some(existing) if existing >= now => existing,
                    _ => now,
                };
                self.confirmations.update_finish(confirmation_no, finish)?;

                for sibling in self
                    .batches
                    .list_by_confirmation_not_shipped(confirmation_no)?
                {
                    self.batches.update_finish(&sibling, finish)?;
                }

                if confirmation.needs_yard_move() {
                    self.yard_service.notify_yard_move(confirmation_no)?;
                }
                self.yard_service
                    .auto_receive_by_confirmation(batch_id, operator_id)?;
            }
        }

        // 步骤 9: 库存重量对账（无条件请求）
        self.procedures.reconcile_inventory_weights(batch_id)?;

        // 步骤 10: 快速收货的出库侧结算
        if !batch.outbound_batch.trim().is_empty() {
            self.procedures.outbound_close(batch_id)?;
        }

        Ok(CloseOutcome::Completed {
            surviving_lots,
            deleted_lots: del_lot_ids.len(),
            deleted_pallets: del_pallet_ids.len(),
        })
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 步骤决策引擎
// ==========================================
// 纯函数: (刚完成的步骤, 要求标志) -> 下一步骤
// 规则表有序评估，首个命中生效
// 红线: 各规则的来源步骤集合不可增减
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::ReceivingStep::*;
use crate::domain::types::{BestByKind, ReceivingStep};

/// 步骤决策输入标志
///
/// 由会话派生 (ReceivingSession::sequencer_flags)，决策期内只读
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SequencerFlags {
    pub require_lot: bool,           // 必采批号
    pub auto_date_for_lot: bool,     // 批号反推日期
    pub require_customer_lot: bool,  // 必采客户批号
    pub require_establishment: bool, // 必采厂号
    pub require_reference: bool,     // 必采参考号
    pub require_temperature: bool,   // 必采温度
    pub best_by_kind: BestByKind,    // 保质期类型
    pub best_by_date_empty: bool,    // 保质期日历值未采
    pub best_by_julian_empty: bool,  // 保质期儒略值未采
    pub consignee_cross: bool,       // 收货方交叉
    pub overridden: bool,            // 上托盘复制覆盖 (跳过二次采集)
}

/// 步骤决策引擎
pub struct StepSequencer;

impl StepSequencer {
    /// 计算下一步骤
    pub fn next(completed: ReceivingStep, flags: &SequencerFlags) -> ReceivingStep {
        // 规则 1: 数量/急冻族 + 必采批号 -> 批号
        if matches!(completed, QuantityConfirm | Quantity | Blast) && flags.require_lot {
            return Lot;
        }

        // 规则 2: 批号 + 批号反推日期 -> 日期
        if completed == Lot && flags.auto_date_for_lot && flags.require_lot {
            return CodeDate;
        }

        // 规则 3: 数量/批号/急冻族 + 必采客户批号 -> 客户批号
        if matches!(completed, QuantityConfirm | Quantity | Blast | Lot)
            && flags.require_customer_lot
        {
            return CustomerLot;
        }

        // 规则 4: (含日期) + 必采厂号 -> 厂号
        if matches!(
            completed,
            Quantity | QuantityConfirm | Lot | CustomerLot | CodeDate | Blast
        ) && flags.require_establishment
        {
            return Establishment;
        }

        // 规则 5: (不含数量族) + 必采厂号、无覆盖 -> 出厂日期
        if matches!(completed, Lot | CustomerLot | Establishment | CodeDate | Blast)
            && flags.require_establishment
            && !flags.overridden
        {
            return ShipDate;
        }

        // 规则 6: 必采参考号、无覆盖 -> 参考号
        if matches!(
            completed,
            Lot | CustomerLot | ShipDate | Blast | QuantityConfirm | CodeDate | Quantity
        ) && flags.require_reference
            && !flags.overridden
        {
            return Reference;
        }

        // 规则 7: 必采温度、无覆盖 -> 温度
        if matches!(
            completed,
            Lot | CustomerLot
                | Reference
                | Establishment
                | Blast
                | ShipDate
                | QuantityConfirm
                | CodeDate
                | Quantity
        ) && flags.require_temperature
            && !flags.overridden
        {
            return Temperature;
        }

        // 规则 8: 配置保质期、无覆盖、任一保质期值未采 -> 保质期
        if matches!(
            completed,
            Lot | Reference
                | CustomerLot
                | Temperature
                | Establishment
                | Blast
                | ShipDate
                | QuantityConfirm
                | Quantity
        ) && flags.best_by_kind.is_configured()
            && !flags.overridden
            && (flags.best_by_date_empty || flags.best_by_julian_empty)
        {
            return match flags.best_by_kind {
                BestByKind::Julian => BestByJulian,
                _ => BestByDate,
            };
        }

        // 规则 9: 收货方交叉 -> 收货方
        if matches!(
            completed,
            Lot | Reference
                | CustomerLot
                | Temperature
                | BestByDate
                | Blast
                | BestByJulian
                | Establishment
                | QuantityConfirm
                | ShipDate
        ) && flags.consignee_cross
        {
            return Consignee;
        }

        // 规则 10: 可选字段步骤全部完成 -> 托盘小结
        if matches!(
            completed,
            QuantityConfirm
                | Quantity
                | Lot
                | CustomerLot
                | Blast
                | BestByDate
                | BestByJulian
                | ShipDate
                | Establishment
                | Reference
                | Temperature
                | CodeDate
                | Consignee
        ) {
            return SendPallet;
        }

        // 规则 11: 兜底，保持原步骤
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags() -> SequencerFlags {
        SequencerFlags::default()
    }

    #[test]
    fn test_no_requirements_goes_straight_to_send() {
        let f = flags();
        assert_eq!(StepSequencer::next(Quantity, &f), SendPallet);
        assert_eq!(StepSequencer::next(QuantityConfirm, &f), SendPallet);
        assert_eq!(StepSequencer::next(Blast, &f), SendPallet);
        assert_eq!(StepSequencer::next(CodeDate, &f), SendPallet);
    }

    #[test]
    fn test_lot_required_after_quantity_family() {
        let f = SequencerFlags {
            require_lot: true,
            ..flags()
        };
        assert_eq!(StepSequencer::next(Quantity, &f), Lot);
        assert_eq!(StepSequencer::next(QuantityConfirm, &f), Lot);
        assert_eq!(StepSequencer::next(Blast, &f), Lot);
        // 批号完成后无其他要求 -> 小结
        assert_eq!(StepSequencer::next(Lot, &f), SendPallet);
    }

    #[test]
    fn test_auto_date_for_lot_inserts_date_after_lot() {
        let f = SequencerFlags {
            require_lot: true,
            auto_date_for_lot: true,
            ..flags()
        };
        assert_eq!(StepSequencer::next(Lot, &f), CodeDate);
        // 反推日期后客户批号不再回头采集
        let f2 = SequencerFlags {
            require_customer_lot: true,
            ..f
        };
        assert_eq!(StepSequencer::next(Lot, &f2), CodeDate);
        assert_eq!(StepSequencer::next(CodeDate, &f2), SendPallet);
    }

    #[test]
    fn test_establishment_then_ship_date() {
        let f = SequencerFlags {
            require_establishment: true,
            ..flags()
        };
        assert_eq!(StepSequencer::next(Quantity, &f), Establishment);
        assert_eq!(StepSequencer::next(Establishment, &f), ShipDate);
        assert_eq!(StepSequencer::next(ShipDate, &f), SendPallet);
        // 覆盖时跳过出厂日期
        let f2 = SequencerFlags {
            overridden: true,
            ..f
        };
        assert_eq!(StepSequencer::next(Establishment, &f2), SendPallet);
    }

    #[test]
    fn test_best_by_fires_only_when_value_missing() {
        let f = SequencerFlags {
            best_by_kind: BestByKind::Calendar,
            best_by_date_empty: true,
            best_by_julian_empty: true,
            ..flags()
        };
        assert_eq!(StepSequencer::next(Quantity, &f), BestByDate);

        let julian = SequencerFlags {
            best_by_kind: BestByKind::Julian,
            ..f
        };
        assert_eq!(StepSequencer::next(Quantity, &julian), BestByJulian);

        // 两个值都已采集则不再采集
        let filled = SequencerFlags {
            best_by_date_empty: false,
            best_by_julian_empty: false,
            ..f
        };
        assert_eq!(StepSequencer::next(Quantity, &filled), SendPallet);
    }

    #[test]
    fn test_consignee_cross_before_terminal() {
        let f = SequencerFlags {
            require_temperature: true,
            consignee_cross: true,
            ..flags()
        };
        assert_eq!(StepSequencer::next(Quantity, &f), Temperature);
        assert_eq!(StepSequencer::next(Temperature, &f), Consignee);
        assert_eq!(StepSequencer::next(Consignee, &f), SendPallet);
        // 数量直达收货方不成立 (规则 9 来源集不含数量)
        let only_cross = SequencerFlags {
            consignee_cross: true,
            ..flags()
        };
        assert_eq!(StepSequencer::next(Quantity, &only_cross), SendPallet);
    }

    #[test]
    fn test_fallback_keeps_step() {
        let f = flags();
        assert_eq!(StepSequencer::next(Batch, &f), Batch);
        assert_eq!(StepSequencer::next(Pallet, &f), Pallet);
        assert_eq!(StepSequencer::next(SendPallet, &f), SendPallet);
    }

    #[test]
    fn test_deterministic() {
        let f = SequencerFlags {
            require_lot: true,
            require_customer_lot: true,
            require_reference: true,
            ..flags()
        };
        let first = StepSequencer::next(Quantity, &f);
        for _ in 0..100 {
            assert_eq!(StepSequencer::next(Quantity, &f), first);
        }
    }

    #[test]
    fn test_converges_within_seven_for_all_requirement_combinations() {
        // 客户扫码要求的全组合: 批号/反推日期/客户批号/厂号/参考号/温度
        for mask in 0u32..64 {
            let f = SequencerFlags {
                require_lot: mask & 1 != 0,
                auto_date_for_lot: mask & 2 != 0,
                require_customer_lot: mask & 4 != 0,
                require_establishment: mask & 8 != 0,
                require_reference: mask & 16 != 0,
                require_temperature: mask & 32 != 0,
                ..flags()
            };
            let mut step = Quantity;
            let mut hops = 0;
            while step != SendPallet {
                let next = StepSequencer::next(step, &f);
                assert_ne!(next, step, "卡死在 {:?} (mask={})", step, mask);
                step = next;
                hops += 1;
                assert!(hops <= 7, "mask={} 超过 7 次迭代", mask);
            }
        }
    }

    #[test]
    fn test_terminates_with_best_by_and_consignee() {
        // 扩展标志 (保质期/收货方交叉) 下仍无环
        let f = SequencerFlags {
            require_lot: true,
            require_customer_lot: true,
            require_establishment: true,
            require_reference: true,
            require_temperature: true,
            best_by_kind: BestByKind::Calendar,
            best_by_date_empty: true,
            best_by_julian_empty: true,
            consignee_cross: true,
            ..flags()
        };
        let mut step = Quantity;
        let mut hops = 0;
        while step != SendPallet {
            step = StepSequencer::next(step, &f);
            hops += 1;
            assert!(hops <= 12, "未收敛");
        }
    }
}

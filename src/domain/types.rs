// ==========================================
// 冷链仓储入库收货系统 - 领域类型定义
// ==========================================
// 红线: 步骤是封闭枚举，路由必须穷尽匹配
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 收货步骤 (Receiving Step)
// ==========================================
// 每次扫码提交处于且仅处于一个步骤；
// 步骤迁移只能出现在步骤处理器与 StepSequencer 中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceivingStep {
    Batch,            // 扫批次
    ShowNotes,        // 客户/收货方注意事项（一次性提示）
    MachineId,        // 机台号采集（车对车直转）
    Pallet,           // 扫托盘
    PalletRescan,     // 重复托盘确认
    CustomerPallet,   // 客户托盘号
    Product,          // 扫品码
    CodeDate,         // 生产日期（日历或儒略，按品种日期类型）
    BestByDate,       // 保质期（日历）
    BestByJulian,     // 保质期（儒略）
    Quantity,         // 数量
    QuantityConfirm,  // 数量与码放不符确认 (Y/N)
    Blast,            // 急冻标志 (Y/N)
    Hpp,              // 高压处理标志（展示用）
    Lot,              // 批号
    CustomerLot,      // 客户批号
    Establishment,    // 厂号
    ShipDate,         // 出厂日期
    Reference,        // 参考号
    Temperature,      // 温度
    Consignee,        // 收货方
    BolQuantity,      // 动态轨道 BOL 数量
    TieConfirm,       // 动态轨道码放确认 (Y/N)
    Tie,              // 动态轨道每层数
    High,             // 动态轨道层数
    SendPallet,       // 托盘小结/发送
    Close,            // 批次关闭确认 (Y/N)
    CloseAllReceived, // 多收货员: 全部完成确认
    CloseReceived,    // 多收货员: 批次已被关闭提示
    CloseWait,        // 多收货员: 等待其他收货员
    PalletMerge,      // 动态联动: 托盘合并询问
    Exit,             // 退出
}

impl ReceivingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceivingStep::Batch => "BATCH",
            ReceivingStep::ShowNotes => "SHOW_NOTES",
            ReceivingStep::MachineId => "MACHINE_ID",
            ReceivingStep::Pallet => "PALLET",
            ReceivingStep::PalletRescan => "PALLET_RESCAN",
            ReceivingStep::CustomerPallet => "CUSTOMER_PALLET",
            ReceivingStep::Product => "PRODUCT",
            ReceivingStep::CodeDate => "CODE_DATE",
            ReceivingStep::BestByDate => "BEST_BY_DATE",
            ReceivingStep::BestByJulian => "BEST_BY_JULIAN",
            ReceivingStep::Quantity => "QUANTITY",
            ReceivingStep::QuantityConfirm => "QUANTITY_CONFIRM",
            ReceivingStep::Blast => "BLAST",
            ReceivingStep::Hpp => "HPP",
            ReceivingStep::Lot => "LOT",
            ReceivingStep::CustomerLot => "CUSTOMER_LOT",
            ReceivingStep::Establishment => "ESTABLISHMENT",
            ReceivingStep::ShipDate => "SHIP_DATE",
            ReceivingStep::Reference => "REFERENCE",
            ReceivingStep::Temperature => "TEMPERATURE",
            ReceivingStep::Consignee => "CONSIGNEE",
            ReceivingStep::BolQuantity => "BOL_QUANTITY",
            ReceivingStep::TieConfirm => "TIE_CONFIRM",
            ReceivingStep::Tie => "TIE",
            ReceivingStep::High => "HIGH",
            ReceivingStep::SendPallet => "SEND_PALLET",
            ReceivingStep::Close => "CLOSE",
            ReceivingStep::CloseAllReceived => "CLOSE_ALL_RECEIVED",
            ReceivingStep::CloseReceived => "CLOSE_RECEIVED",
            ReceivingStep::CloseWait => "CLOSE_WAIT",
            ReceivingStep::PalletMerge => "PALLET_MERGE",
            ReceivingStep::Exit => "EXIT",
        }
    }
}

impl fmt::Display for ReceivingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 日期类型 (Date Kind)
// ==========================================
// 来自品种主数据 date_type: '1'=儒略 '2'=日历 其他=无
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateKind {
    Julian,
    Calendar,
    #[default]
    None,
}

impl DateKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => DateKind::Julian,
            "2" => DateKind::Calendar,
            _ => DateKind::None,
        }
    }
}

impl fmt::Display for DateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateKind::Julian => write!(f, "JULIAN"),
            DateKind::Calendar => write!(f, "CALENDAR"),
            DateKind::None => write!(f, "NONE"),
        }
    }
}

// ==========================================
// 保质期日期类型 (Best-By Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BestByKind {
    Julian,
    Calendar,
    #[default]
    None,
}

impl BestByKind {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => BestByKind::Julian,
            "2" => BestByKind::Calendar,
            _ => BestByKind::None,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, BestByKind::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_roundtrip_serde() {
        let step = ReceivingStep::QuantityConfirm;
        let json = serde_json::to_string(&step).unwrap();
        assert_eq!(json, "\"QUANTITY_CONFIRM\"");
        let back: ReceivingStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_date_kind_from_code() {
        assert_eq!(DateKind::from_code("1"), DateKind::Julian);
        assert_eq!(DateKind::from_code("2"), DateKind::Calendar);
        assert_eq!(DateKind::from_code(""), DateKind::None);
        assert_eq!(DateKind::from_code("X"), DateKind::None);
    }
}

// ==========================================
// 冷链仓储入库收货系统 - ASN 预报托盘
// ==========================================
// 预先装载的 (批次, 托盘) 行，用于预填品码/日期/批号/数量
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsnPallet {
    pub batch_id: String,
    pub pallet_id: String,
    pub product_code: String,
    pub code_date: Option<NaiveDate>,
    pub qty: i64,
    pub lot_no: String,
}

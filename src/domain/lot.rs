// ==========================================
// 冷链仓储入库收货系统 - 批号汇总领域模型
// ==========================================
// 红线: 汇总行只能由结算引擎整算重写，不做增量编辑
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// LotAggregate - 批号汇总 (批次+序列)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotAggregate {
    pub id: i64,
    pub batch_id: String,         // 批次号
    pub sequence_no: String,      // 序列 (3位)
    pub customer_code: String,    // 客户编码
    pub owner_code: String,       // 货主编码
    pub product_group: String,    // 品组
    pub product_code: String,     // 品码
    pub supplier_product: String, // 供应商品码
    pub lot_no: String,           // 批号
    pub qty: i64,                 // 数量 (整算)
    pub pallet_count: i64,        // 托盘数 (整算)
    pub hold_code: String,        // 冻结代码
    pub gross_weight: f64,        // 毛重 (整算)
    pub net_weight: f64,          // 净重 (整算)
    pub orig_qty: i64,            // 原始快照
    pub orig_pallet_count: i64,
    pub orig_gross_weight: f64,
    pub orig_net_weight: f64,
}

impl LotAggregate {
    /// 汇总对应的 track 标识 (批次号+序列)
    pub fn track_id(&self) -> String {
        format!("{}{}", self.batch_id, self.sequence_no)
    }
}

// ==========================================
// LotTransaction - 批号交易行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotTransaction {
    pub id: i64,
    pub batch_id: String,
    pub sequence_no: String,
    pub qty: i64,
    pub pallet_count: i64,
    pub gross_weight: f64,
    pub net_weight: f64,
}

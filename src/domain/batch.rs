// ==========================================
// 冷链仓储入库收货系统 - 入库批次领域模型
// ==========================================
// 批次 = 一车待收货物; 扫批次时读取，开始扫描与关闭结算时更新
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// BatchHeader - 入库批次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchHeader {
    pub batch_id: String,          // 批次号 (7位)
    pub customer_code: String,     // 客户编码
    pub owner_code: String,        // 货主编码
    pub consignee_code: String,    // 收货方编码
    pub batch_date: Option<NaiveDate>, // 批次日期 (到货计划日)
    pub confirmation_no: String,   // 关联确认单号
    pub outbound_batch: String,    // 关联出库批次 (快速收货)
    pub scan_status: String,       // 扫描状态: ''=未开始 P=进行中 R=已收完
    pub ship_status: String,       // 发运状态: Y=已发运
    pub in_use: String,            // 是否在编辑中: Y/N
    pub scan_operator: String,     // 首个扫描收货员 (先写先得)
    pub scan_start_at: Option<NaiveDateTime>, // 扫描开始时间
    pub scan_end_at: Option<NaiveDateTime>,   // 扫描结束时间
    pub finish_at: Option<NaiveDateTime>,     // 结算完成时间
    pub checked_qty: i64,          // 点数数量 (结算重算)
    pub checked_gross: f64,        // 点数毛重 (结算重算)
    pub cancelled: bool,           // 是否取消
}

impl BatchHeader {
    /// 是否已发运（结算幂等保护用）
    pub fn is_shipped(&self) -> bool {
        self.ship_status == "Y"
    }

    /// 是否已被收货完成
    pub fn is_received(&self) -> bool {
        self.scan_status == "R"
    }

    /// 是否正在被扫描
    pub fn is_scanning(&self) -> bool {
        self.scan_status == "P"
    }
}

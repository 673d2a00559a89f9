// ==========================================
// 冷链仓储入库收货系统 - 托盘领域模型
// ==========================================
// 扫托盘时先插入占位行 (qty=0, track=批次号)，
// 各步骤完成后补齐属性; 结算时清理零数量行
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// PhysicalPallet - 实物托盘
// ==========================================
// 红线: track_id 前 7 位必须等于批次号（托盘只属于一个批次）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalPallet {
    pub id: i64,
    pub pallet_id: String,          // 托盘号
    pub customer_pallet_id: String, // 客户托盘号
    pub customer_code: String,      // 客户编码
    pub track_id: String,           // 批次号 或 批次号+序列 (落位后)
    pub serial_no: String,          // 行内序号
    pub qty: i64,                   // 数量
    pub pallet_count: i64,          // 托盘数 (结算归一为 1)
    pub orig_qty: i64,              // 原始数量快照
    pub orig_pallet_count: i64,     // 原始托盘数快照
    pub rec_type: String,           // 收货类型: X=入库 O=出库
    pub ship_status: String,        // 发运状态
    pub is_blast: bool,             // 急冻标志
    pub blast_hours: i64,           // 急冻小时数
    pub is_hpp: bool,               // 高压处理标志
    pub hold_code: String,          // 冻结代码
    pub merge_id: String,           // 合并标记
    pub status_code: String,        // 客户状态码快照
    pub lot_no: String,             // 批号
    pub customer_lot_no: String,    // 客户批号
    pub code_date: String,          // 生产日期 (MMDDYYYY)
    pub best_by_date: String,       // 保质期 (MMDDYYYY)
    pub establishment_no: String,   // 厂号
    pub ship_date: String,          // 出厂日期
    pub reference_no: String,       // 参考号
    pub temperature: String,        // 温度
    pub scanned_by: String,         // 扫描人
    pub scanned_at: Option<NaiveDateTime>,
    pub created_by: String,
    pub created_at: Option<NaiveDateTime>,
}

impl PhysicalPallet {
    /// 托盘所属批次（track 前 7 位）
    pub fn batch_prefix(&self) -> &str {
        if self.track_id.len() >= 7 {
            &self.track_id[..7]
        } else {
            &self.track_id
        }
    }

    /// 是否为未落位的占位托盘（track 仅批次号，未分配序列）
    pub fn is_untracked(&self) -> bool {
        self.track_id.len() <= 7 || self.track_id[7..].trim().is_empty()
    }
}

// ==========================================
// PalletTransaction - 托盘交易行
// ==========================================
// 与 physical_pallet 行配对; 配对标志更新必须同事务提交
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletTransaction {
    pub id: i64,
    pub batch_id: String,
    pub sequence_no: String,
    pub track_id: String,
    pub serial_no: String,
    pub qty: i64,
    pub pallet_count: i64,
}

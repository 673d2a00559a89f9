// ==========================================
// 冷链仓储入库收货系统 - 品种主数据快照
// ==========================================
// 扫品码命中后复制进会话，会话期内只读
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::{BestByKind, DateKind};

// ==========================================
// ProductSnapshot - 品种主数据快照
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub customer_code: String,    // 客户编码
    pub owner_code: String,       // 货主编码
    pub product_group: String,    // 品组
    pub product_code: String,     // 品码
    pub supplier_product: String, // 供应商品码
    pub catch_weight: String,     // 抓重模式: N=否 I=入库 B=双向
    pub net_weight: f64,          // 单件净重
    pub gross_weight: f64,        // 单件毛重
    pub tare_weight: f64,         // 单件皮重
    pub date_type: String,        // 日期类型码: 1=儒略 2=日历 其他=无
    pub best_by_type: String,     // 保质期类型码: 1=儒略 2=日历
    pub blast_room: String,       // 急冻间 (非空表示需急冻)
    pub blast_hours: i64,         // 急冻小时数 (0 按 72 处理)
    pub is_hpp: bool,             // 高压处理品种
    pub tie: i64,                 // 每层件数
    pub high: i64,                // 层数
    pub width: f64,               // 尺寸 (终端 F7 展示用)
    pub height: f64,
    pub length: f64,
}

impl ProductSnapshot {
    /// 是否抓重跟踪 (入库或双向)
    pub fn is_catch_weight(&self) -> bool {
        self.catch_weight == "I" || self.catch_weight == "B"
    }

    pub fn date_kind(&self) -> DateKind {
        DateKind::from_code(&self.date_type)
    }

    pub fn best_by_kind(&self) -> BestByKind {
        BestByKind::from_code(&self.best_by_type)
    }

    /// 急冻小时数，0 视为默认 72 小时
    pub fn effective_blast_hours(&self) -> i64 {
        if self.blast_hours == 0 {
            72
        } else {
            self.blast_hours
        }
    }

    /// 是否需急冻 (配置了急冻间)
    pub fn needs_blast(&self) -> bool {
        !self.blast_room.trim().is_empty()
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 客户扫码要求
// ==========================================
// 每客户一行，决定哪些可选步骤必采;
// 扫批次时装载进会话，会话期内只读
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// ScanRequirements - 客户扫码要求快照
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanRequirements {
    pub found: bool,                  // 客户是否配置了扫码要求行
    pub customer_status: String,      // 客户状态码 (落位到托盘)
    pub require_lot: bool,            // 必采批号
    pub require_customer_lot: bool,   // 必采客户批号
    pub require_establishment: bool,  // 必采厂号
    pub require_reference: bool,      // 必采参考号
    pub require_temperature: bool,    // 必采温度
    pub require_customer_pallet: bool, // 必采客户托盘号
    pub customer_pallet_same: bool,   // 客户托盘号与托盘号一致 (免采)
    pub customer_pallet_from: i64,    // 客户托盘截取起始
    pub customer_pallet_to: i64,      // 客户托盘截取结束
    pub customer_pid_length: i64,     // 客户托盘号右取长度
    pub has_blast: bool,              // 客户启用急冻
    pub capture_pallet_weight: bool,  // 采集托盘重量
    pub use_128_barcode: bool,        // GS1-128 扫码
    pub scan_length: i64,             // 扫码字段长度上限
    pub pallet_offset_from: i64,      // 托盘号截取起始偏移
    pub pallet_offset_to: i64,        // 托盘号截取末尾偏移
    pub yyww_cool_code: bool,         // YYWWD 冷码解析
    pub asn_pallet: bool,             // 按 ASN 预填
    pub asn_no_qty: bool,             // ASN 不预填数量
    pub calc_best_by: bool,           // 推算保质期
    pub auto_fill_consignee: bool,    // 自动填收货方
    pub auto_date_for_lot: bool,      // 批号反推日期
    pub gtin_validation: bool,        // GTIN 品码校验
    pub future_date_allowed: bool,    // 允许未来日期
    pub years_back: i32,              // 日期允许回溯年数 (1 或 2)
    pub pallet_max_length: i64,       // 托盘号最大长度
    pub validate_pallet_length: bool, // 校验托盘号长度
    pub hand_key_consignee: bool,     // 收货方交叉手工键入
    pub allow_putaway: bool,          // 收货员可直接上架
    pub use_stack_hold: bool,         // 使用堆垛冻结服务
    pub edi_blast_control: String,    // EDI 急冻控制: P=状态联动 其他=请求表
    pub batch_product_edi: bool,      // 批次+品种 EDI 状态
}

impl ScanRequirements {
    /// 未配置客户时的默认要求 (全部可选步骤免采)
    pub fn missing(customer_status: &str) -> Self {
        Self {
            found: false,
            customer_status: customer_status.to_string(),
            years_back: 1,
            ..Default::default()
        }
    }
}

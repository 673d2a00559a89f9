// ==========================================
// 冷链仓储入库收货系统 - 收货会话
// ==========================================
// 一个收货员一个会话; 扫批次时建立，退出/关闭时重置
// 红线: 会话是被分发器独占持有的值，处理器以 &mut 接收，禁止共享别名
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::batch::BatchHeader;
use crate::domain::product::ProductSnapshot;
use crate::domain::requirements::ScanRequirements;
use crate::domain::types::{BestByKind, DateKind, ReceivingStep};
use crate::engine::sequencer::SequencerFlags;

// ==========================================
// ReceivingSession - 收货会话聚合
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivingSession {
    // ===== 身份 =====
    pub operator_id: String,     // 收货员
    pub machine_id: String,      // 机台号 (先写先得)

    // ===== 步骤 =====
    pub current_step: ReceivingStep,
    pub previous_step: Option<ReceivingStep>,

    // ===== 批次上下文 =====
    pub batch_id: String,          // 当前批次号
    pub assigned_batch: String,    // 动态联动指派批次 (为空表示无指派)
    pub originator: String,        // 动态联动来源标记
    pub customer_code: String,     // 客户编码
    pub owner_code: String,        // 货主编码
    pub batch: Option<BatchHeader>,          // 批次头快照
    pub requirements: Option<ScanRequirements>, // 客户扫码要求快照

    // ===== 工作模式 =====
    pub multi_receiver: bool,      // 多收货员模式
    pub multi_scan_status: String, // 多收货员下批次扫描状态缓存
    pub quick_receive: bool,       // 快速收货 (直连出库)
    pub quick_receive_type: String, // 快速收货类型 L/D/S/T/C
    pub outbound_batch: String,    // 关联出库批次
    pub truck_to_truck: bool,      // 车对车直转
    pub truck_stage: bool,         // 车对车经月台
    pub consignee_cross: bool,     // 收货方交叉
    pub dynamic_rail: bool,        // 动态轨道模式
    pub merge_pallets: String,     // 托盘合并应答缓存 Y/N

    // ===== 当前托盘 =====
    pub pallet_id: String,          // 托盘号 (规范化后)
    pub working_pallet_id: String,  // 交换前原始扫码
    pub customer_pallet_id: String, // 客户托盘号
    pub product_code: String,       // 品码
    pub previous_product: String,   // 上一托盘品码 (复制功能)
    pub current_scan_product: String, // 本托盘最初扫码值 (动态轨道比对)
    pub product: Option<ProductSnapshot>, // 品种快照

    // ===== 扫码字段 =====
    pub code_date: String,     // 生产日期 MMDDYYYY
    pub julian_date: String,   // 生产日期 YYYYDDD
    pub best_by_date: String,  // 保质期 MMDDYYYY
    pub best_by_julian: String, // 保质期 YYYYDDD
    pub cool_code: String,     // YYWWD 冷码
    pub quantity: String,      // 数量 (终端原样字符串)
    pub expected_asn_qty: i64, // ASN 预期数量
    pub unmatched_asn_qty: bool, // 数量与 ASN 不符标记 (不阻断)
    pub lot_no: String,
    pub previous_lot: String,
    pub customer_lot_no: String,
    pub establishment_no: String,
    pub ship_date: String,
    pub reference_no: String,
    pub temperature: String,
    pub consignee: String,

    // ===== 品种派生 =====
    pub catch_weight: bool,    // 抓重品种
    pub unit_net_weight: f64,  // 单件净重
    pub date_kind: DateKind,
    pub best_by_kind: BestByKind,
    pub tie: i64,
    pub high: i64,
    pub bol_quantity: i64,     // 动态轨道 BOL 数量

    // ===== 急冻 / 高压 =====
    pub is_blast: String,        // Y/N
    pub blast_initial: String,   // 进入急冻步骤前的推导值
    pub blast_hours: i64,
    pub is_hpp: String,          // Y/N
    pub hpp_product: bool,       // 品种为高压处理
    pub edi_batch_product: String, // EDI 急冻键: 批次+品码
    pub blast_request_key: String, // 急冻请求键: 批次+品组+品码

    // ===== 覆盖/交互状态 =====
    pub used_copy: bool,      // 使用了上托盘复制 (跳过二次采集)
    pub lot_skip_presses: u8, // 批号跳过键按压计数

    // ===== 生命周期 =====
    #[serde(skip)]
    pub end_session: bool, // 本次应答后删除会话存储 (处理器重置信号)
}

impl Default for ReceivingSession {
    fn default() -> Self {
        Self {
            operator_id: String::new(),
            machine_id: String::new(),
            current_step: ReceivingStep::Batch,
            previous_step: None,
            batch_id: String::new(),
            assigned_batch: String::new(),
            originator: String::new(),
            customer_code: String::new(),
            owner_code: String::new(),
            batch: None,
            requirements: None,
            multi_receiver: false,
            multi_scan_status: String::new(),
            quick_receive: false,
            quick_receive_type: String::new(),
            outbound_batch: String::new(),
            truck_to_truck: false,
            truck_stage: false,
            consignee_cross: false,
            dynamic_rail: false,
            merge_pallets: String::new(),
            pallet_id: String::new(),
            working_pallet_id: String::new(),
            customer_pallet_id: String::new(),
            product_code: String::new(),
            previous_product: String::new(),
            current_scan_product: String::new(),
            product: None,
            code_date: String::new(),
            julian_date: String::new(),
            best_by_date: String::new(),
            best_by_julian: String::new(),
            cool_code: String::new(),
            quantity: String::new(),
            expected_asn_qty: 0,
            unmatched_asn_qty: false,
            lot_no: String::new(),
            previous_lot: String::new(),
            customer_lot_no: String::new(),
            establishment_no: String::new(),
            ship_date: String::new(),
            reference_no: String::new(),
            temperature: String::new(),
            consignee: String::new(),
            catch_weight: false,
            unit_net_weight: 0.0,
            date_kind: DateKind::None,
            best_by_kind: BestByKind::None,
            tie: 0,
            high: 0,
            bol_quantity: 0,
            is_blast: "N".to_string(),
            blast_initial: "N".to_string(),
            blast_hours: 0,
            is_hpp: "N".to_string(),
            hpp_product: false,
            edi_batch_product: String::new(),
            blast_request_key: String::new(),
            used_copy: false,
            lot_skip_presses: 0,
            end_session: false,
        }
    }
}

impl ReceivingSession {
    pub fn new(operator_id: &str) -> Self {
        Self {
            operator_id: operator_id.to_string(),
            ..Default::default()
        }
    }

    /// 客户扫码要求（未装载时取默认）
    pub fn reqs(&self) -> ScanRequirements {
        self.requirements.clone().unwrap_or_default()
    }

    /// 扫新托盘前清空上一托盘的采集字段
    pub fn clear_pallet_fields(&mut self) {
        self.pallet_id.clear();
        self.working_pallet_id.clear();
        self.customer_pallet_id.clear();
        self.product_code.clear();
        self.current_scan_product.clear();
        self.code_date.clear();
        self.julian_date.clear();
        self.best_by_date.clear();
        self.best_by_julian.clear();
        self.cool_code.clear();
        self.quantity.clear();
        self.expected_asn_qty = 0;
        self.unmatched_asn_qty = false;
        self.lot_no.clear();
        self.customer_lot_no.clear();
        self.establishment_no.clear();
        self.ship_date.clear();
        self.reference_no.clear();
        self.temperature.clear();
        self.consignee.clear();
        self.catch_weight = false;
        self.unit_net_weight = 0.0;
        self.date_kind = DateKind::None;
        self.tie = 0;
        self.high = 0;
        self.is_blast = "N".to_string();
        self.is_hpp = "N".to_string();
        self.hpp_product = false;
        self.used_copy = false;
        self.lot_skip_presses = 0;
    }

    /// 批次关闭后重置会话
    ///
    /// 仅在快速收货车对车场景保留机台号
    pub fn reset_for_next_batch(&mut self) {
        let operator = self.operator_id.clone();
        let keep_machine = if self.quick_receive && !self.machine_id.is_empty() {
            self.machine_id.clone()
        } else {
            String::new()
        };
        *self = ReceivingSession::new(&operator);
        self.machine_id = keep_machine;
        self.current_step = ReceivingStep::Batch;
    }

    /// 派生 StepSequencer 的输入标志
    pub fn sequencer_flags(&self) -> SequencerFlags {
        let reqs = self.reqs();
        SequencerFlags {
            require_lot: reqs.require_lot,
            auto_date_for_lot: reqs.auto_date_for_lot,
            require_customer_lot: reqs.require_customer_lot,
            require_establishment: reqs.require_establishment,
            require_reference: reqs.require_reference,
            require_temperature: reqs.require_temperature,
            best_by_kind: self.best_by_kind,
            best_by_date_empty: self.best_by_date.trim().is_empty(),
            best_by_julian_empty: self.best_by_julian.trim().is_empty(),
            consignee_cross: self.consignee_cross,
            overridden: self.used_copy,
        }
    }

    /// 上托盘复制: 复用品码/批号/急冻等字段，数量重新采集
    pub fn apply_copy_forward(&mut self) {
        self.product_code = self.previous_product.clone();
        self.current_scan_product = self.previous_product.clone();
        self.lot_no = self.previous_lot.clone();
        self.used_copy = true;
        self.current_step = ReceivingStep::Quantity;
    }
}

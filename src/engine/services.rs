// ==========================================
// 冷链仓储入库收货系统 - 外部协作服务接口
// ==========================================
// 冻结服务 / 场内调度 / 入库过程调用 / 动态属性 / 字段元数据
// 核心只消费返回值，不关心对端实现
// ==========================================

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::types::ReceivingStep;
use crate::i18n;

/// 外部服务错误（对核心是致命错误，原样上抛）
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("外部服务不可用: {0}")]
    Unavailable(String),

    #[error("外部服务调用失败: {0}")]
    Failed(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ==========================================
// 冻结服务
// ==========================================

/// 冻结动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldAction {
    Hold,
    Release,
}

/// 冻结范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldScope {
    Pallet,
    Lot,
}

impl HoldScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldScope::Pallet => "P",
            HoldScope::Lot => "L",
        }
    }
}

/// 堆垛冻结服务
pub trait HoldService: Send + Sync {
    fn apply_or_release(
        &self,
        hold_code: &str,
        entered_by: &str,
        action: HoldAction,
        scope: HoldScope,
        track_id: &str,
        serial_no: &str,
    ) -> ServiceResult<()>;
}

/// 默认实现: 记录调用并放行（对接方在部署环境注入真实实现）
pub struct TracingHoldService;

impl HoldService for TracingHoldService {
    fn apply_or_release(
        &self,
        hold_code: &str,
        entered_by: &str,
        action: HoldAction,
        scope: HoldScope,
        track_id: &str,
        serial_no: &str,
    ) -> ServiceResult<()> {
        info!(
            hold_code,
            entered_by,
            ?action,
            scope = scope.as_str(),
            track_id,
            serial_no,
            "堆垛冻结服务调用"
        );
        Ok(())
    }
}

// ==========================================
// 场内调度服务
// ==========================================

pub trait YardService: Send + Sync {
    /// 甩挂确认单的场内移车通知
    fn notify_yard_move(&self, confirmation_no: &str) -> ServiceResult<()>;

    /// 按确认单自动收货
    fn auto_receive_by_confirmation(&self, batch_id: &str, operator_id: &str)
        -> ServiceResult<()>;
}

pub struct TracingYardService;

impl YardService for TracingYardService {
    fn notify_yard_move(&self, confirmation_no: &str) -> ServiceResult<()> {
        info!(confirmation_no, "场内移车通知");
        Ok(())
    }

    fn auto_receive_by_confirmation(
        &self,
        batch_id: &str,
        operator_id: &str,
    ) -> ServiceResult<()> {
        info!(batch_id, operator_id, "按确认单自动收货请求");
        Ok(())
    }
}

// ==========================================
// 入库过程调用
// ==========================================

/// 托盘号重命名结果
#[derive(Debug, Clone, Default)]
pub struct RenameOutcome {
    pub resolved_id: Option<String>, // 重命名后的托盘号
    pub message: String,             // 对端应答: NOT SHIPPED = 托盘在库未发运
}

/// 高压处理检查结果
#[derive(Debug, Clone)]
pub struct HppCheck {
    pub use_stack_hold: bool,
    pub hold_code: String,
}

/// 批号反推日期结果 (空串表示对端未提供)
#[derive(Debug, Clone, Default)]
pub struct LotDates {
    pub code_date: String,
    pub julian_date: String,
    pub best_by_date: String,
    pub best_by_julian: String,
}

/// 入库相关过程调用集合
pub trait InboundProcedures: Send + Sync {
    /// 托盘号解析/重命名
    fn rename_pallet(&self, pallet_id: &str) -> ServiceResult<RenameOutcome>;

    /// 高压处理冻结检查
    fn check_hpp(
        &self,
        customer_code: &str,
        customer_pallet_id: &str,
        pallet_id: &str,
    ) -> ServiceResult<HppCheck>;

    /// 批号反推日期
    fn dates_from_product_lot(
        &self,
        batch_id: &str,
        product_code: &str,
        lot_no: &str,
    ) -> ServiceResult<LotDates>;

    /// 下一个 SSCC 标签号
    fn next_sscc_label(&self, customer_code: &str, consignee: &str)
        -> ServiceResult<Option<String>>;

    /// 客户/收货方注意事项
    fn customer_notes(&self, customer_code: &str, consignee: &str)
        -> ServiceResult<Option<String>>;

    /// 登记动态轨道码放
    #[allow(clippy::too_many_arguments)]
    fn register_dynamic_rail(
        &self,
        batch_id: &str,
        product_code: &str,
        tie: i64,
        high: i64,
        bol_qty: i64,
        operator_id: &str,
    ) -> ServiceResult<()>;

    /// 库存重量对账 (按批次)
    fn reconcile_inventory_weights(&self, batch_id: &str) -> ServiceResult<()>;

    /// 快速收货的出库侧结算
    fn outbound_close(&self, batch_id: &str) -> ServiceResult<()>;
}

/// 本地实现: 可在库内推导的走 SQLite，纯外部动作记录后放行
pub struct LocalProcedures {
    conn: Arc<Mutex<Connection>>,
}

impl LocalProcedures {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> ServiceResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ServiceError::Unavailable(e.to_string()))
    }
}

impl InboundProcedures for LocalProcedures {
    fn rename_pallet(&self, pallet_id: &str) -> ServiceResult<RenameOutcome> {
        let conn = self.lock()?;
        let ship_status: Option<String> = conn
            .query_row(
                "SELECT ship_status FROM physical_pallet WHERE pallet_id = ?1 ORDER BY pallet_id LIMIT 1",
                params![pallet_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ServiceError::Failed(e.to_string()))?;
        let message = match ship_status {
            Some(ref s) if s != "Y" => "NOT SHIPPED".to_string(),
            _ => String::new(),
        };
        Ok(RenameOutcome {
            resolved_id: None,
            message,
        })
    }

    fn check_hpp(
        &self,
        customer_code: &str,
        customer_pallet_id: &str,
        pallet_id: &str,
    ) -> ServiceResult<HppCheck> {
        debug!(customer_code, customer_pallet_id, pallet_id, "HPP 检查");
        let conn = self.lock()?;
        let use_stack_hold: Option<i64> = conn
            .query_row(
                "SELECT use_stack_hold FROM customer_requirement WHERE customer_code = ?1",
                params![customer_code],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ServiceError::Failed(e.to_string()))?;
        Ok(HppCheck {
            use_stack_hold: use_stack_hold.unwrap_or(0) != 0,
            hold_code: "HPP".to_string(),
        })
    }

    fn dates_from_product_lot(
        &self,
        batch_id: &str,
        product_code: &str,
        lot_no: &str,
    ) -> ServiceResult<LotDates> {
        // 同批同批号已落位的托盘可复用其日期
        let conn = self.lock()?;
        let like = format!("{}%", batch_id);
        let found: Option<(String, String)> = conn
            .query_row(
                r#"SELECT code_date, best_by_date FROM physical_pallet
                   WHERE track_id LIKE ?1 AND lot_no = ?2 AND code_date != ''
                   ORDER BY id LIMIT 1"#,
                params![like, lot_no],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| ServiceError::Failed(e.to_string()))?;
        debug!(batch_id, product_code, lot_no, hit = found.is_some(), "批号反推日期");

        let mut dates = LotDates::default();
        if let Some((code_date, best_by_date)) = found {
            dates.julian_date = crate::domain::dates::parse_code_date(&code_date)
                .map(crate::domain::dates::to_julian_date)
                .unwrap_or_default();
            dates.best_by_julian = crate::domain::dates::parse_code_date(&best_by_date)
                .map(crate::domain::dates::to_julian_date)
                .unwrap_or_default();
            dates.code_date = code_date;
            dates.best_by_date = best_by_date;
        }
        Ok(dates)
    }

    fn next_sscc_label(
        &self,
        customer_code: &str,
        consignee: &str,
    ) -> ServiceResult<Option<String>> {
        debug!(customer_code, consignee, "SSCC 标签请求");
        Ok(None)
    }

    fn customer_notes(
        &self,
        customer_code: &str,
        consignee: &str,
    ) -> ServiceResult<Option<String>> {
        let conn = self.lock()?;
        let consignee = consignee.trim().replace('/', "");
        let note: Option<String> = conn
            .query_row(
                r#"SELECT note FROM customer_note
                   WHERE customer_code = ?1 AND consignee = ?2 AND note_type = 'RECV'
                   ORDER BY id LIMIT 1"#,
                params![customer_code, consignee],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ServiceError::Failed(e.to_string()))?;
        Ok(note.map(|n| n.replace('\n', " ").trim().to_string()).filter(|n| !n.is_empty()))
    }

    fn register_dynamic_rail(
        &self,
        batch_id: &str,
        product_code: &str,
        tie: i64,
        high: i64,
        bol_qty: i64,
        operator_id: &str,
    ) -> ServiceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"INSERT INTO dynamic_rail (batch_id, product_code, tie, high, bol_qty, created_by)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![batch_id, product_code, tie, high, bol_qty, operator_id],
        )
        .map_err(|e| ServiceError::Failed(e.to_string()))?;
        Ok(())
    }

    fn reconcile_inventory_weights(&self, batch_id: &str) -> ServiceResult<()> {
        info!(batch_id, "库存重量对账请求");
        Ok(())
    }

    fn outbound_close(&self, batch_id: &str) -> ServiceResult<()> {
        info!(batch_id, "出库侧结算请求");
        Ok(())
    }
}

// ==========================================
// 动态属性提供方（对核心是不透明附加字段）
// ==========================================

pub trait DynamicAttributeProvider: Send + Sync {
    fn attributes_for(
        &self,
        customer_code: &str,
        product_code: &str,
        batch_id: &str,
    ) -> ServiceResult<Vec<(String, String)>>;
}

pub struct NoopDynamicAttributes;

impl DynamicAttributeProvider for NoopDynamicAttributes {
    fn attributes_for(
        &self,
        _customer_code: &str,
        _product_code: &str,
        _batch_id: &str,
    ) -> ServiceResult<Vec<(String, String)>> {
        Ok(Vec::new())
    }
}

// ==========================================
// 字段元数据提供方（仅装饰，核心不读内部结构）
// ==========================================

pub trait FieldMetadataProvider: Send + Sync {
    /// 步骤主输入字段键
    fn field_key(&self, step: ReceivingStep) -> String;

    /// 字段标签文本
    fn label_for(&self, key: &str) -> String;
}

/// 静态实现: 字段键取步骤标识，标签走 i18n
pub struct StaticFieldProvider;

impl FieldMetadataProvider for StaticFieldProvider {
    fn field_key(&self, step: ReceivingStep) -> String {
        step.as_str().to_lowercase()
    }

    fn label_for(&self, key: &str) -> String {
        i18n::t(&format!("receiving.label_{}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_rename_pallet_reports_not_shipped() {
        let conn = setup();
        {
            let guard = conn.lock().unwrap();
            guard.execute(
                "INSERT INTO physical_pallet (pallet_id, customer_code, track_id, ship_status) VALUES ('PAL001', 'C', '0001234', 'N')",
                [],
            )
            .unwrap();
        }
        let proc = LocalProcedures::new(conn);
        assert_eq!(proc.rename_pallet("PAL001").unwrap().message, "NOT SHIPPED");
        assert_eq!(proc.rename_pallet("PALX").unwrap().message, "");
    }

    #[test]
    fn test_customer_notes() {
        let conn = setup();
        {
            let guard = conn.lock().unwrap();
            guard.execute(
                "INSERT INTO customer_note (customer_code, consignee, note_type, note) VALUES ('CUST01', '', 'RECV', '  先收冻品\n后收鲜品 ')",
                [],
            )
            .unwrap();
        }
        let proc = LocalProcedures::new(conn);
        let note = proc.customer_notes("CUST01", "").unwrap().unwrap();
        assert_eq!(note, "先收冻品 后收鲜品");
        assert!(proc.customer_notes("NOBODY", "").unwrap().is_none());
    }
}

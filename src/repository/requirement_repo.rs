// ==========================================
// 冷链仓储入库收货系统 - 客户扫码要求仓储
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::requirements::ScanRequirements;
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct RequirementRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RequirementRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ScanRequirements> {
        let flag = |v: i64| v != 0;
        Ok(ScanRequirements {
            found: true,
            customer_status: row.get("customer_status")?,
            require_lot: flag(row.get("require_lot")?),
            require_customer_lot: flag(row.get("require_customer_lot")?),
            require_establishment: flag(row.get("require_establishment")?),
            require_reference: flag(row.get("require_reference")?),
            require_temperature: flag(row.get("require_temperature")?),
            require_customer_pallet: flag(row.get("require_customer_pallet")?),
            customer_pallet_same: flag(row.get("customer_pallet_same")?),
            customer_pallet_from: row.get("customer_pallet_from")?,
            customer_pallet_to: row.get("customer_pallet_to")?,
            customer_pid_length: row.get("customer_pid_length")?,
            has_blast: flag(row.get("has_blast")?),
            capture_pallet_weight: flag(row.get("capture_pallet_weight")?),
            use_128_barcode: flag(row.get("use_128_barcode")?),
            scan_length: row.get("scan_length")?,
            pallet_offset_from: row.get("pallet_offset_from")?,
            pallet_offset_to: row.get("pallet_offset_to")?,
            yyww_cool_code: flag(row.get("yyww_cool_code")?),
            asn_pallet: flag(row.get("asn_pallet")?),
            asn_no_qty: flag(row.get("asn_no_qty")?),
            calc_best_by: flag(row.get("calc_best_by")?),
            auto_fill_consignee: flag(row.get("auto_fill_consignee")?),
            auto_date_for_lot: flag(row.get("auto_date_for_lot")?),
            gtin_validation: flag(row.get("gtin_validation")?),
            future_date_allowed: flag(row.get("future_date_allowed")?),
            years_back: if flag(row.get("two_years_back")?) { 2 } else { 1 },
            pallet_max_length: row.get("pallet_max_length")?,
            validate_pallet_length: flag(row.get("validate_pallet_length")?),
            hand_key_consignee: flag(row.get("hand_key_consignee")?),
            allow_putaway: flag(row.get("allow_putaway")?),
            use_stack_hold: flag(row.get("use_stack_hold")?),
            edi_blast_control: row.get("edi_blast_control")?,
            batch_product_edi: flag(row.get("batch_product_edi")?),
        })
    }

    /// 按客户查询扫码要求（未配置返回默认: 全部免采）
    pub fn find(&self, customer_code: &str) -> RepositoryResult<ScanRequirements> {
        let conn = self.get_conn()?;
        let reqs = conn
            .query_row(
                "SELECT * FROM customer_requirement WHERE customer_code = ?1",
                params![customer_code],
                Self::map_row,
            )
            .optional()?;
        Ok(reqs.unwrap_or_else(|| ScanRequirements::missing("")))
    }

    /// 客户是否使用堆垛冻结服务 (结算批号级冻结用)
    pub fn use_stack_hold(&self, customer_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let v: Option<i64> = conn
            .query_row(
                "SELECT use_stack_hold FROM customer_requirement WHERE customer_code = ?1",
                params![customer_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(v.unwrap_or(0) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> RequirementRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO customer_requirement
                   (customer_code, require_lot, require_temperature, two_years_back, scan_length)
               VALUES ('CUST01', 1, 1, 1, 20)"#,
            [],
        )
        .unwrap();
        RequirementRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_find_configured() {
        let repo = setup();
        let reqs = repo.find("CUST01").unwrap();
        assert!(reqs.found);
        assert!(reqs.require_lot);
        assert!(reqs.require_temperature);
        assert!(!reqs.require_reference);
        assert_eq!(reqs.years_back, 2);
        assert_eq!(reqs.scan_length, 20);
    }

    #[test]
    fn test_find_missing_defaults() {
        let repo = setup();
        let reqs = repo.find("NOBODY").unwrap();
        assert!(!reqs.found);
        assert!(!reqs.require_lot);
        assert_eq!(reqs.years_back, 1);
    }
}

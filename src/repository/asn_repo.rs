// ==========================================
// 冷链仓储入库收货系统 - ASN 预报仓储
// ==========================================

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::asn::AsnPallet;
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct AsnPalletRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AsnPalletRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<AsnPallet> {
        Ok(AsnPallet {
            batch_id: row.get("batch_id")?,
            pallet_id: row.get("pallet_id")?,
            product_code: row.get("product_code")?,
            code_date: row
                .get::<_, Option<String>>("code_date")?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            qty: row.get("qty")?,
            lot_no: row.get("lot_no")?,
        })
    }

    /// 按 (批次, 托盘号) 查询预报行
    pub fn find(&self, batch_id: &str, pallet_id: &str) -> RepositoryResult<Option<AsnPallet>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                r#"SELECT * FROM asn_pallet WHERE batch_id = ?1 AND pallet_id = ?2
                   ORDER BY batch_id, pallet_id LIMIT 1"#,
                params![batch_id, pallet_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO asn_pallet (batch_id, pallet_id, product_code, code_date, qty, lot_no)
               VALUES ('0001234', 'PAL001', 'PROD1', '2025-05-20', 48, 'LOTA')"#,
            [],
        )
        .unwrap();
        let repo = AsnPalletRepository::new(Arc::new(Mutex::new(conn)));

        let asn = repo.find("0001234", "PAL001").unwrap().unwrap();
        assert_eq!(asn.product_code, "PROD1");
        assert_eq!(asn.qty, 48);
        assert_eq!(asn.code_date, NaiveDate::from_ymd_opt(2025, 5, 20));
        assert!(repo.find("0001234", "PALX").unwrap().is_none());
    }
}

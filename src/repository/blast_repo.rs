// ==========================================
// 冷链仓储入库收货系统 - 急冻控制仓储
// ==========================================
// 数量步骤入急冻前的推导查询:
// - blast_status: 客户急冻联动状态
// - edi_blast_log: 批次+品码 EDI 状态
// - blast_request: 急冻请求键
// ==========================================

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct BlastControlRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BlastControlRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 客户急冻联动状态码
    pub fn customer_status(&self, customer_code: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let status = conn
            .query_row(
                r#"SELECT status_code FROM blast_status WHERE customer_code = ?1
                   ORDER BY customer_code, status_code LIMIT 1"#,
                params![customer_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    /// 批次+品码的 EDI 状态码
    pub fn edi_status(&self, batch_product: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let status = conn
            .query_row(
                "SELECT status_code FROM edi_blast_log WHERE batch_product = ?1 LIMIT 1",
                params![batch_product],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status)
    }

    /// 急冻请求键是否存在
    pub fn request_exists(&self, blast_key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM blast_request WHERE blast_key = ?1 LIMIT 1",
                params![blast_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO blast_status (customer_code, status_code) VALUES ('CUST01', 'BL')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO edi_blast_log (batch_product, status_code) VALUES ('0001234PROD1', 'BL')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO blast_request (blast_key) VALUES ('0001234GRP PROD1')",
            [],
        )
        .unwrap();
        let repo = BlastControlRepository::new(Arc::new(Mutex::new(conn)));

        assert_eq!(repo.customer_status("CUST01").unwrap().as_deref(), Some("BL"));
        assert_eq!(repo.edi_status("0001234PROD1").unwrap().as_deref(), Some("BL"));
        assert!(repo.request_exists("0001234GRP PROD1").unwrap());
        assert!(!repo.request_exists("nothing").unwrap());
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 动态轨道/装车暂存仓储
// ==========================================

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct RailRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RailRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 批次+品种是否已登记动态轨道
    pub fn rail_exists(&self, batch_id: &str, product_code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM dynamic_rail WHERE batch_id = ?1 AND product_code = ?2 LIMIT 1",
                params![batch_id, product_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// 快速收货: 托盘是否已装车
    pub fn staged_pallet_loaded(&self, pallet_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let loaded: Option<Option<String>> = conn
            .query_row(
                "SELECT loaded_at FROM staged_pallet WHERE pallet_id = ?1",
                params![pallet_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(matches!(loaded, Some(Some(_))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rail_exists_and_staged() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO dynamic_rail (batch_id, product_code, tie, high) VALUES ('0001234', 'PROD1', 4, 3)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO staged_pallet (pallet_id, loaded_at) VALUES ('PAL001', '2025-06-01'), ('PAL002', NULL)",
            [],
        )
        .unwrap();
        let repo = RailRepository::new(Arc::new(Mutex::new(conn)));

        assert!(repo.rail_exists("0001234", "PROD1").unwrap());
        assert!(!repo.rail_exists("0001234", "PROD2").unwrap());
        assert!(repo.staged_pallet_loaded("PAL001").unwrap());
        assert!(!repo.staged_pallet_loaded("PAL002").unwrap());
        assert!(!repo.staged_pallet_loaded("PALX").unwrap());
    }
}

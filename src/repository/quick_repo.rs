// ==========================================
// 冷链仓储入库收货系统 - 快速收货联动仓储
// ==========================================
// quick_receive: 入库批次 -> 出库批次 联动与收货类型
// outbound_load: 车对车直转时的出库扫描时间戳
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::error::{RepositoryError, RepositoryResult};

/// 快速收货联动行
#[derive(Debug, Clone, Default)]
pub struct QuickReceiveLink {
    pub receive_type: String,   // L/D/S/T/C
    pub outbound_batch: String, // 关联出库批次
}

pub struct QuickReceiveRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QuickReceiveRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 入库批次的快速收货联动行
    pub fn find(&self, batch_id: &str) -> RepositoryResult<Option<QuickReceiveLink>> {
        let conn = self.get_conn()?;
        let link = conn
            .query_row(
                "SELECT receive_type, outbound_batch FROM quick_receive WHERE batch_id = ?1",
                params![batch_id],
                |row| {
                    Ok(QuickReceiveLink {
                        receive_type: row.get::<_, String>(0)?.trim().to_string(),
                        outbound_batch: row.get::<_, String>(1)?.trim().to_string(),
                    })
                },
            )
            .optional()?;
        Ok(link)
    }

    /// 车对车直转: 出库批次盖扫描时间戳（已有值保留）
    pub fn stamp_outbound_scan(
        &self,
        outbound_batch: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE outbound_load SET
                   scan_status = 'S',
                   scan_start_tm = COALESCE(scan_start_tm, ?2),
                   scan_end_dt = COALESCE(scan_end_dt, ?3)
               WHERE batch_id = ?1"#,
            params![
                outbound_batch,
                now.format("%H:%M").to_string(),
                now.format("%Y-%m-%d").to_string()
            ],
        )?;
        Ok(())
    }

    /// 出库批次是否存在
    pub fn outbound_exists(&self, outbound_batch: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM outbound_load WHERE batch_id = ?1",
                params![outbound_batch],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_find_and_stamp() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO quick_receive (batch_id, receive_type, outbound_batch) VALUES ('0001234', 'T', '0009876')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO outbound_load (batch_id) VALUES ('0009876')",
            [],
        )
        .unwrap();
        let repo = QuickReceiveRepository::new(Arc::new(Mutex::new(conn)));

        let link = repo.find("0001234").unwrap().unwrap();
        assert_eq!(link.receive_type, "T");
        assert_eq!(link.outbound_batch, "0009876");

        let now = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        repo.stamp_outbound_scan("0009876", now).unwrap();
        // 已有值不再覆盖
        let later = now + chrono::Duration::hours(2);
        repo.stamp_outbound_scan("0009876", later).unwrap();

        let guard = repo.conn.lock().unwrap();
        let (status, tm): (String, String) = guard
            .query_row(
                "SELECT scan_status, scan_start_tm FROM outbound_load WHERE batch_id = '0009876'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "S");
        assert_eq!(tm, "08:30");
    }
}

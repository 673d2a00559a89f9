// ==========================================
// 冷链仓储入库收货系统 - 发运确认单仓储
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::confirmation::ShipmentConfirmation;
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct ConfirmationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ConfirmationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ShipmentConfirmation> {
        Ok(ShipmentConfirmation {
            confirmation_no: row.get("confirmation_no")?,
            start_at: parse_dt(row.get::<_, Option<String>>("start_at")?),
            finish_at: parse_dt(row.get::<_, Option<String>>("finish_at")?),
            live_drop: row.get::<_, String>("live_drop")?.trim().to_string(),
            reuse_trailer: row.get::<_, i64>("reuse_trailer")? != 0,
        })
    }

    pub fn find(&self, confirmation_no: &str) -> RepositoryResult<Option<ShipmentConfirmation>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT * FROM shipment_confirmation WHERE confirmation_no = ?1",
                params![confirmation_no],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// 写入开始时间（已有值保留）
    pub fn stamp_start(&self, confirmation_no: &str, start: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE shipment_confirmation SET start_at = COALESCE(start_at, ?2) WHERE confirmation_no = ?1",
            params![confirmation_no, fmt_dt(start)],
        )?;
        Ok(())
    }

    /// 结算: 写入校准后的完成时间
    pub fn update_finish(
        &self,
        confirmation_no: &str,
        finish: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE shipment_confirmation SET finish_at = ?2 WHERE confirmation_no = ?1",
            params![confirmation_no, fmt_dt(finish)],
        )?;
        Ok(())
    }
}

fn fmt_dt(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_dt(raw: Option<String>) -> Option<NaiveDateTime> {
    raw.and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_find_and_update_finish() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO shipment_confirmation (confirmation_no, live_drop, reuse_trailer)
               VALUES ('CONF01', 'D', 0)"#,
            [],
        )
        .unwrap();
        let repo = ConfirmationRepository::new(Arc::new(Mutex::new(conn)));

        let c = repo.find("CONF01").unwrap().unwrap();
        assert!(c.needs_yard_move());
        assert!(c.finish_at.is_none());

        let finish = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        repo.update_finish("CONF01", finish).unwrap();
        let c = repo.find("CONF01").unwrap().unwrap();
        assert_eq!(c.finish_at, Some(finish));
    }
}

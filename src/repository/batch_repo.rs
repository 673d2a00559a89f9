// ==========================================
// 冷链仓储入库收货系统 - 入库批次仓储
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::batch::BatchHeader;
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<BatchHeader> {
        Ok(BatchHeader {
            batch_id: row.get("batch_id")?,
            customer_code: row.get("customer_code")?,
            owner_code: row.get("owner_code")?,
            consignee_code: row.get("consignee_code")?,
            batch_date: row
                .get::<_, Option<String>>("batch_date")?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            confirmation_no: row.get("confirmation_no")?,
            outbound_batch: row.get("outbound_batch")?,
            scan_status: row.get("scan_status")?,
            ship_status: row.get("ship_status")?,
            in_use: row.get("in_use")?,
            scan_operator: row.get("scan_operator")?,
            scan_start_at: parse_dt(row.get::<_, Option<String>>("scan_start_at")?),
            scan_end_at: parse_dt(row.get::<_, Option<String>>("scan_end_at")?),
            finish_at: parse_dt(row.get::<_, Option<String>>("finish_at")?),
            checked_qty: row.get("checked_qty")?,
            checked_gross: row.get("checked_gross")?,
            cancelled: row.get::<_, i64>("cancelled")? != 0,
        })
    }

    /// 按批次号查询
    pub fn find(&self, batch_id: &str) -> RepositoryResult<Option<BatchHeader>> {
        let conn = self.get_conn()?;
        let header = conn
            .query_row(
                "SELECT * FROM inbound_batch WHERE batch_id = ?1",
                params![batch_id],
                Self::map_row,
            )
            .optional()?;
        Ok(header)
    }

    /// 读取扫描状态（多收货员复核用）
    pub fn scan_status(&self, batch_id: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let status = conn
            .query_row(
                "SELECT scan_status FROM inbound_batch WHERE batch_id = ?1",
                params![batch_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(status)
    }

    /// 标记扫描开始（幂等: 收货员先写先得，开始时间只写一次）
    pub fn mark_scan_start(
        &self,
        batch_id: &str,
        operator_id: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE inbound_batch SET
                   scan_status = 'P',
                   scan_operator = CASE WHEN trim(scan_operator) = '' THEN ?2 ELSE scan_operator END,
                   scan_start_at = COALESCE(scan_start_at, ?3)
               WHERE batch_id = ?1"#,
            params![batch_id, operator_id, fmt_dt(now)],
        )?;
        Ok(())
    }

    /// 结算: 标记批次已收货并写入点数汇总与结束时间
    pub fn mark_received(
        &self,
        batch_id: &str,
        checked_qty: i64,
        checked_gross: f64,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE inbound_batch SET
                   scan_status = 'R',
                   checked_qty = ?2,
                   checked_gross = ?3,
                   scan_end_at = ?4,
                   finish_at = ?4
               WHERE batch_id = ?1"#,
            params![batch_id, checked_qty, checked_gross, fmt_dt(now)],
        )?;
        Ok(())
    }

    /// 同确认单未发运的兄弟批次
    pub fn list_by_confirmation_not_shipped(
        &self,
        confirmation_no: &str,
    ) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT batch_id FROM inbound_batch WHERE confirmation_no = ?1 AND ship_status != 'Y'",
        )?;
        let ids = stmt
            .query_map(params![confirmation_no], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// 级联写入完成时间
    pub fn update_finish(&self, batch_id: &str, finish: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE inbound_batch SET finish_at = ?2 WHERE batch_id = ?1",
            params![batch_id, fmt_dt(finish)],
        )?;
        Ok(())
    }

    /// 批次重扫前清除遗留的入库数据
    ///
    /// 约束: 仅在批次尚无扫描收货员时调用
    pub fn purge_inbound(&self, batch_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let like = format!("{}%", batch_id);
        tx.execute(
            "DELETE FROM physical_pallet WHERE track_id LIKE ?1",
            params![like],
        )?;
        tx.execute(
            "DELETE FROM pallet_transaction WHERE batch_id = ?1",
            params![batch_id],
        )?;
        tx.execute(
            "DELETE FROM lot_aggregate WHERE batch_id = ?1",
            params![batch_id],
        )?;
        tx.execute(
            "DELETE FROM lot_transaction WHERE batch_id = ?1",
            params![batch_id],
        )?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
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

    fn setup() -> BatchRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO inbound_batch (batch_id, customer_code, owner_code, batch_date)
               VALUES ('0001234', 'CUST01', 'CUST01', '2025-06-01')"#,
            [],
        )
        .unwrap();
        BatchRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_find() {
        let repo = setup();
        let header = repo.find("0001234").unwrap().unwrap();
        assert_eq!(header.customer_code, "CUST01");
        assert_eq!(header.batch_date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert!(repo.find("9999999").unwrap().is_none());
    }

    #[test]
    fn test_mark_scan_start_first_write_wins() {
        let repo = setup();
        let now = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        repo.mark_scan_start("0001234", "OP01", now).unwrap();
        let later = now + chrono::Duration::hours(1);
        repo.mark_scan_start("0001234", "OP02", later).unwrap();

        let header = repo.find("0001234").unwrap().unwrap();
        assert_eq!(header.scan_operator, "OP01");
        assert_eq!(header.scan_start_at, Some(now));
        assert_eq!(header.scan_status, "P");
    }

    #[test]
    fn test_mark_received() {
        let repo = setup();
        let now = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        repo.mark_received("0001234", 120, 960.5, now).unwrap();
        let header = repo.find("0001234").unwrap().unwrap();
        assert_eq!(header.scan_status, "R");
        assert_eq!(header.checked_qty, 120);
        assert_eq!(header.finish_at, Some(now));
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 托盘仓储
// ==========================================
// physical_pallet 与 pallet_transaction 配对维护;
// 配对标志更新必须在同一事务内
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::pallet::{PalletTransaction, PhysicalPallet};
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct PalletRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 新托盘占位行参数
#[derive(Debug, Clone)]
pub struct NewPallet<'a> {
    pub pallet_id: &'a str,
    pub customer_code: &'a str,
    pub batch_id: &'a str,
    pub status_code: &'a str,
    pub operator_id: &'a str,
    pub now: NaiveDateTime,
}

/// 托盘落位参数（发送托盘时写入）
#[derive(Debug, Clone)]
pub struct FinalizePallet<'a> {
    pub pallet_id: &'a str,
    pub track_id: &'a str,
    pub customer_pallet_id: &'a str,
    pub qty: i64,
    pub lot_no: &'a str,
    pub customer_lot_no: &'a str,
    pub code_date: &'a str,
    pub best_by_date: &'a str,
    pub establishment_no: &'a str,
    pub ship_date: &'a str,
    pub reference_no: &'a str,
    pub temperature: &'a str,
}

impl PalletRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<PhysicalPallet> {
        Ok(PhysicalPallet {
            id: row.get("id")?,
            pallet_id: row.get("pallet_id")?,
            customer_pallet_id: row.get("customer_pallet_id")?,
            customer_code: row.get("customer_code")?,
            track_id: row.get("track_id")?,
            serial_no: row.get("serial_no")?,
            qty: row.get("qty")?,
            pallet_count: row.get("pallet_count")?,
            orig_qty: row.get("orig_qty")?,
            orig_pallet_count: row.get("orig_pallet_count")?,
            rec_type: row.get("rec_type")?,
            ship_status: row.get("ship_status")?,
            is_blast: row.get::<_, i64>("is_blast")? != 0,
            blast_hours: row.get("blast_hours")?,
            is_hpp: row.get::<_, i64>("is_hpp")? != 0,
            hold_code: row.get("hold_code")?,
            merge_id: row.get("merge_id")?,
            status_code: row.get("status_code")?,
            lot_no: row.get("lot_no")?,
            customer_lot_no: row.get("customer_lot_no")?,
            code_date: row.get("code_date")?,
            best_by_date: row.get("best_by_date")?,
            establishment_no: row.get("establishment_no")?,
            ship_date: row.get("ship_date")?,
            reference_no: row.get("reference_no")?,
            temperature: row.get("temperature")?,
            scanned_by: row.get("scanned_by")?,
            scanned_at: parse_dt(row.get::<_, Option<String>>("scanned_at")?),
            created_by: row.get("created_by")?,
            created_at: parse_dt(row.get::<_, Option<String>>("created_at")?),
        })
    }

    /// 按托盘号查询（最早一行）
    pub fn find_by_pallet_id(&self, pallet_id: &str) -> RepositoryResult<Option<PhysicalPallet>> {
        let conn = self.get_conn()?;
        let pallet = conn
            .query_row(
                "SELECT * FROM physical_pallet WHERE pallet_id = ?1 ORDER BY pallet_id LIMIT 1",
                params![pallet_id],
                Self::map_row,
            )
            .optional()?;
        Ok(pallet)
    }

    /// 插入占位行 (qty=0, track=批次号, rec_type='X')
    pub fn insert_placeholder(&self, p: &NewPallet<'_>) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO physical_pallet
                   (pallet_id, customer_code, track_id, qty, pallet_count, orig_pallet_count,
                    rec_type, ship_status, status_code, scanned_by, scanned_at, created_by, created_at)
               VALUES (?1, ?2, ?3, 0, 1, 1, 'X', 'N', ?4, ?5, ?6, ?5, ?6)"#,
            params![
                p.pallet_id,
                p.customer_code,
                p.batch_id,
                p.status_code,
                p.operator_id,
                fmt_dt(p.now)
            ],
        )?;
        let id = conn.last_insert_rowid();
        // serial_no 取行号，保证批内唯一
        conn.execute(
            "UPDATE physical_pallet SET serial_no = CAST(id AS TEXT) WHERE id = ?1",
            params![id],
        )?;
        Ok(id)
    }

    /// 清除重复托盘的合并标记
    pub fn clear_merge_flag(&self, pallet_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE physical_pallet SET merge_id = '' WHERE merge_id = 'MP' AND pallet_id = ?1",
            params![pallet_id],
        )?;
        Ok(())
    }

    /// 更新急冻标志
    pub fn update_blast(
        &self,
        pallet_id: &str,
        is_blast: bool,
        blast_hours: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE physical_pallet SET is_blast = ?2, blast_hours = ?3 WHERE pallet_id = ?1",
            params![pallet_id, is_blast as i64, blast_hours],
        )?;
        Ok(())
    }

    /// 更新高压处理标志与冻结代码
    pub fn update_hpp(&self, id: i64, hold_code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE physical_pallet SET is_hpp = 1, hold_code = ?2 WHERE id = ?1",
            params![id, hold_code],
        )?;
        Ok(())
    }

    /// 托盘落位: 写入 track 与采集字段
    pub fn finalize(&self, f: &FinalizePallet<'_>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"UPDATE physical_pallet SET
                   track_id = ?2, customer_pallet_id = ?3, qty = ?4, orig_qty = ?4,
                   lot_no = ?5, customer_lot_no = ?6, code_date = ?7, best_by_date = ?8,
                   establishment_no = ?9, ship_date = ?10, reference_no = ?11, temperature = ?12
               WHERE pallet_id = ?1"#,
            params![
                f.pallet_id,
                f.track_id,
                f.customer_pallet_id,
                f.qty,
                f.lot_no,
                f.customer_lot_no,
                f.code_date,
                f.best_by_date,
                f.establishment_no,
                f.ship_date,
                f.reference_no,
                f.temperature
            ],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "physical_pallet".to_string(),
                id: f.pallet_id.to_string(),
            });
        }
        Ok(())
    }

    /// 按 track 查询（结算整算用）
    pub fn list_by_track(&self, track_id: &str) -> RepositoryResult<Vec<PhysicalPallet>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT * FROM physical_pallet WHERE track_id = ?1")?;
        let pallets = stmt
            .query_map(params![track_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pallets)
    }

    /// 批次下未落位托盘计数 (track 仍为裸批次号)
    pub fn count_by_track(&self, track_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT count(id) FROM physical_pallet WHERE track_id = ?1",
            params![track_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// 退出时删除零数量、未落位的占位托盘
    ///
    /// # 返回
    /// - true: 删除了占位行
    pub fn delete_untracked_placeholder(&self, pallet_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            r#"DELETE FROM physical_pallet
               WHERE pallet_id = ?1 AND qty = 0 AND length(trim(track_id)) <= 7"#,
            params![pallet_id],
        )?;
        Ok(deleted > 0)
    }

    /// 结算: 归一配对行的托盘数并落原始快照（同事务）
    pub fn normalize_counts(
        &self,
        pallet_row_id: i64,
        transaction_row_id: i64,
        qty: i64,
        pallet_count: i64,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE physical_pallet SET pallet_count = 1, orig_qty = ?2, orig_pallet_count = ?3 WHERE id = ?1",
            params![pallet_row_id, qty, pallet_count],
        )?;
        tx.execute(
            "UPDATE pallet_transaction SET pallet_count = 1 WHERE id = ?1",
            params![transaction_row_id],
        )?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 批量删除托盘行
    pub fn delete_pallets(&self, ids: &[i64]) -> RepositoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("DELETE FROM physical_pallet WHERE id IN ({})", placeholders);
        conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
        Ok(())
    }

    // ==========================================
    // pallet_transaction - 配对交易行
    // ==========================================

    fn map_trn(row: &Row<'_>) -> rusqlite::Result<PalletTransaction> {
        Ok(PalletTransaction {
            id: row.get("id")?,
            batch_id: row.get("batch_id")?,
            sequence_no: row.get("sequence_no")?,
            track_id: row.get("track_id")?,
            serial_no: row.get("serial_no")?,
            qty: row.get("qty")?,
            pallet_count: row.get("pallet_count")?,
        })
    }

    /// 查询托盘配对交易行
    pub fn find_transaction(
        &self,
        batch_id: &str,
        sequence_no: &str,
        track_id: &str,
        serial_no: &str,
    ) -> RepositoryResult<Option<PalletTransaction>> {
        let conn = self.get_conn()?;
        let trn = conn
            .query_row(
                r#"SELECT * FROM pallet_transaction
                   WHERE batch_id = ?1 AND sequence_no = ?2 AND track_id = ?3 AND serial_no = ?4"#,
                params![batch_id, sequence_no, track_id, serial_no],
                Self::map_trn,
            )
            .optional()?;
        Ok(trn)
    }

    /// 落位时写入/更新交易行
    pub fn upsert_transaction(
        &self,
        batch_id: &str,
        sequence_no: &str,
        track_id: &str,
        serial_no: &str,
        qty: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"UPDATE pallet_transaction SET qty = ?5, track_id = ?3
               WHERE batch_id = ?1 AND sequence_no = ?2 AND serial_no = ?4"#,
            params![batch_id, sequence_no, track_id, serial_no, qty],
        )?;
        if updated == 0 {
            conn.execute(
                r#"INSERT INTO pallet_transaction (batch_id, sequence_no, track_id, serial_no, qty, pallet_count)
                   VALUES (?1, ?2, ?3, ?4, ?5, 1)"#,
                params![batch_id, sequence_no, track_id, serial_no, qty],
            )?;
        }
        Ok(())
    }

    /// 批量删除交易行
    pub fn delete_transactions(&self, ids: &[i64]) -> RepositoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!(
            "DELETE FROM pallet_transaction WHERE id IN ({})",
            placeholders
        );
        conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
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

    fn setup() -> PalletRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        PalletRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_insert_placeholder_and_find() {
        let repo = setup();
        repo.insert_placeholder(&NewPallet {
            pallet_id: "PAL001",
            customer_code: "CUST01",
            batch_id: "0001234",
            status_code: "OK",
            operator_id: "OP01",
            now: now(),
        })
        .unwrap();

        let p = repo.find_by_pallet_id("PAL001").unwrap().unwrap();
        assert_eq!(p.track_id, "0001234");
        assert_eq!(p.qty, 0);
        assert_eq!(p.rec_type, "X");
        assert!(p.is_untracked());
        assert!(!p.serial_no.is_empty());
    }

    #[test]
    fn test_delete_untracked_placeholder_only_when_empty() {
        let repo = setup();
        repo.insert_placeholder(&NewPallet {
            pallet_id: "PAL001",
            customer_code: "CUST01",
            batch_id: "0001234",
            status_code: "",
            operator_id: "OP01",
            now: now(),
        })
        .unwrap();

        assert!(repo.delete_untracked_placeholder("PAL001").unwrap());
        assert!(repo.find_by_pallet_id("PAL001").unwrap().is_none());

        // 已落位的托盘不应被删除
        repo.insert_placeholder(&NewPallet {
            pallet_id: "PAL002",
            customer_code: "CUST01",
            batch_id: "0001234",
            status_code: "",
            operator_id: "OP01",
            now: now(),
        })
        .unwrap();
        repo.finalize(&FinalizePallet {
            pallet_id: "PAL002",
            track_id: "0001234001",
            customer_pallet_id: "",
            qty: 10,
            lot_no: "L1",
            customer_lot_no: "",
            code_date: "06012025",
            best_by_date: "",
            establishment_no: "",
            ship_date: "",
            reference_no: "",
            temperature: "",
        })
        .unwrap();
        assert!(!repo.delete_untracked_placeholder("PAL002").unwrap());
        assert!(repo.find_by_pallet_id("PAL002").unwrap().is_some());
    }

    #[test]
    fn test_paired_transaction_roundtrip() {
        let repo = setup();
        repo.upsert_transaction("0001234", "001", "0001234001", "7", 10)
            .unwrap();
        let trn = repo
            .find_transaction("0001234", "001", "0001234001", "7")
            .unwrap()
            .unwrap();
        assert_eq!(trn.qty, 10);

        repo.upsert_transaction("0001234", "001", "0001234001", "7", 12)
            .unwrap();
        let trn = repo
            .find_transaction("0001234", "001", "0001234001", "7")
            .unwrap()
            .unwrap();
        assert_eq!(trn.qty, 12);
    }
}

// ==========================================
// 冷链仓储入库收货系统 - 批号汇总仓储
// ==========================================
// 红线: 汇总数量/重量只能由结算引擎整算写入
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::lot::{LotAggregate, LotTransaction};
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct LotRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 结算整算结果（写回汇总行）
#[derive(Debug, Clone, Copy)]
pub struct LotRecompute {
    pub qty: i64,
    pub pallet_count: i64,
    pub gross_weight: f64,
    pub net_weight: f64,
}

impl LotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<LotAggregate> {
        Ok(LotAggregate {
            id: row.get("id")?,
            batch_id: row.get("batch_id")?,
            sequence_no: row.get("sequence_no")?,
            customer_code: row.get("customer_code")?,
            owner_code: row.get("owner_code")?,
            product_group: row.get("product_group")?,
            product_code: row.get("product_code")?,
            supplier_product: row.get("supplier_product")?,
            lot_no: row.get("lot_no")?,
            qty: row.get("qty")?,
            pallet_count: row.get("pallet_count")?,
            hold_code: row.get("hold_code")?,
            gross_weight: row.get("gross_weight")?,
            net_weight: row.get("net_weight")?,
            orig_qty: row.get("orig_qty")?,
            orig_pallet_count: row.get("orig_pallet_count")?,
            orig_gross_weight: row.get("orig_gross_weight")?,
            orig_net_weight: row.get("orig_net_weight")?,
        })
    }

    fn map_trn(row: &Row<'_>) -> rusqlite::Result<LotTransaction> {
        Ok(LotTransaction {
            id: row.get("id")?,
            batch_id: row.get("batch_id")?,
            sequence_no: row.get("sequence_no")?,
            qty: row.get("qty")?,
            pallet_count: row.get("pallet_count")?,
            gross_weight: row.get("gross_weight")?,
            net_weight: row.get("net_weight")?,
        })
    }

    /// 批次下全部汇总行
    pub fn list_by_batch(&self, batch_id: &str) -> RepositoryResult<Vec<LotAggregate>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare("SELECT * FROM lot_aggregate WHERE batch_id = ?1 ORDER BY sequence_no")?;
        let lots = stmt
            .query_map(params![batch_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lots)
    }

    /// 查询批号交易行
    pub fn find_transaction(
        &self,
        batch_id: &str,
        sequence_no: &str,
    ) -> RepositoryResult<Option<LotTransaction>> {
        let conn = self.get_conn()?;
        let trn = conn
            .query_row(
                "SELECT * FROM lot_transaction WHERE batch_id = ?1 AND sequence_no = ?2",
                params![batch_id, sequence_no],
                Self::map_trn,
            )
            .optional()?;
        Ok(trn)
    }

    /// 同品同批号已有序列，或分配下一序列 (3位零填充)
    pub fn find_or_allocate_sequence(
        &self,
        batch_id: &str,
        product_code: &str,
        lot_no: &str,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let existing: Option<String> = conn
            .query_row(
                r#"SELECT sequence_no FROM lot_aggregate
                   WHERE batch_id = ?1 AND product_code = ?2 AND lot_no = ?3"#,
                params![batch_id, product_code, lot_no],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(seq) = existing {
            return Ok(seq);
        }

        let max_seq: Option<String> = conn
            .query_row(
                "SELECT MAX(sequence_no) FROM lot_aggregate WHERE batch_id = ?1",
                params![batch_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let next = max_seq
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(0)
            + 1;
        Ok(format!("{:03}", next))
    }

    /// 落位时建立汇总与交易占位行 (数量由结算整算)
    pub fn ensure_lot_rows(
        &self,
        batch_id: &str,
        sequence_no: &str,
        customer_code: &str,
        owner_code: &str,
        product_group: &str,
        product_code: &str,
        supplier_product: &str,
        lot_no: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO lot_aggregate
                   (batch_id, sequence_no, customer_code, owner_code, product_group,
                    product_code, supplier_product, lot_no)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
               ON CONFLICT (batch_id, sequence_no) DO NOTHING"#,
            params![
                batch_id,
                sequence_no,
                customer_code,
                owner_code,
                product_group,
                product_code,
                supplier_product,
                lot_no
            ],
        )?;
        conn.execute(
            r#"INSERT INTO lot_transaction (batch_id, sequence_no)
               VALUES (?1, ?2)
               ON CONFLICT (batch_id, sequence_no) DO NOTHING"#,
            params![batch_id, sequence_no],
        )?;
        Ok(())
    }

    /// 结算: 写回汇总行与交易行 (含原始快照)
    pub fn apply_recompute(
        &self,
        lot_id: i64,
        batch_id: &str,
        sequence_no: &str,
        hold_code: &str,
        r: LotRecompute,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE lot_aggregate SET
                   qty = ?2, pallet_count = ?3, hold_code = ?4,
                   gross_weight = ?5, net_weight = ?6,
                   orig_qty = ?2, orig_pallet_count = ?3,
                   orig_gross_weight = ?5, orig_net_weight = ?6
               WHERE id = ?1"#,
            params![
                lot_id,
                r.qty,
                r.pallet_count,
                hold_code,
                r.gross_weight,
                r.net_weight
            ],
        )?;
        conn.execute(
            r#"UPDATE lot_transaction SET
                   qty = ?3, pallet_count = ?4, gross_weight = ?5, net_weight = ?6
               WHERE batch_id = ?1 AND sequence_no = ?2"#,
            params![
                batch_id,
                sequence_no,
                r.qty,
                r.pallet_count,
                r.gross_weight,
                r.net_weight
            ],
        )?;
        Ok(())
    }

    /// 批量删除汇总行
    pub fn delete_aggregates(&self, ids: &[i64]) -> RepositoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("DELETE FROM lot_aggregate WHERE id IN ({})", placeholders);
        conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
        Ok(())
    }

    /// 批量删除交易行
    pub fn delete_transactions(&self, ids: &[i64]) -> RepositoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("DELETE FROM lot_transaction WHERE id IN ({})", placeholders);
        conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
        Ok(())
    }

    /// 批次存量汇总 (数量, 毛重) — 结算写回批次点数
    pub fn sum_for_batch(&self, batch_id: &str) -> RepositoryResult<(i64, f64)> {
        let conn = self.get_conn()?;
        let sums = conn.query_row(
            r#"SELECT COALESCE(SUM(qty), 0), COALESCE(SUM(gross_weight), 0)
               FROM lot_aggregate WHERE batch_id = ?1"#,
            params![batch_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
        )?;
        Ok(sums)
    }

    /// 抓重明细净重合计（无明细行返回 None）
    pub fn detail_net_weight(
        &self,
        batch_id: &str,
        sequence_no: &str,
    ) -> RepositoryResult<Option<f64>> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT count(id) FROM pallet_detail WHERE batch_id = ?1 AND sequence_no = ?2",
            params![batch_id, sequence_no],
            |row| row.get(0),
        )?;
        if n == 0 {
            return Ok(None);
        }
        let sum: f64 = conn.query_row(
            "SELECT COALESCE(SUM(net_weight), 0) FROM pallet_detail WHERE batch_id = ?1 AND sequence_no = ?2",
            params![batch_id, sequence_no],
            |row| row.get(0),
        )?;
        Ok(Some(sum))
    }
}

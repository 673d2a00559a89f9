// ==========================================
// 冷链仓储入库收货系统 - 品种主数据仓储
// ==========================================
// 扫码匹配: 品码 / 供应商品码 / GTIN 别名 (客户开启校验时)
// 范围: 客户 + 货主，且 active = 'Y'
// ==========================================

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::product::ProductSnapshot;
use crate::repository::error::{RepositoryError, RepositoryResult};

pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ProductSnapshot> {
        Ok(ProductSnapshot {
            customer_code: row.get("customer_code")?,
            owner_code: row.get("owner_code")?,
            product_group: row.get("product_group")?,
            product_code: row.get("product_code")?,
            supplier_product: row.get("supplier_product")?,
            catch_weight: row.get("catch_weight")?,
            net_weight: row.get("net_weight")?,
            gross_weight: row.get("gross_weight")?,
            tare_weight: row.get("tare_weight")?,
            date_type: row.get("date_type")?,
            best_by_type: row.get("best_by_type")?,
            blast_room: row.get("blast_room")?,
            blast_hours: row.get("blast_hours")?,
            is_hpp: row.get::<_, i64>("is_hpp")? != 0,
            tie: row.get("tie")?,
            high: row.get("high")?,
            width: row.get("width")?,
            height: row.get("height")?,
            length: row.get("length")?,
        })
    }

    /// 按扫码匹配有效品种
    ///
    /// # 参数
    /// - scanned: 已转大写的扫码文本
    /// - gtin_enabled: 客户是否开启 GTIN 品码校验
    pub fn find_active(
        &self,
        customer_code: &str,
        owner_code: &str,
        scanned: &str,
        gtin_enabled: bool,
    ) -> RepositoryResult<Option<ProductSnapshot>> {
        let conn = self.get_conn()?;

        let direct = conn
            .query_row(
                r#"SELECT * FROM product_master
                   WHERE customer_code = ?1 AND owner_code = ?2 AND active = 'Y'
                     AND (UPPER(product_code) = ?3 OR UPPER(supplier_product) = ?3)
                   ORDER BY id LIMIT 1"#,
                params![customer_code, owner_code, scanned],
                Self::map_row,
            )
            .optional()?;
        if direct.is_some() {
            return Ok(direct);
        }
        if !gtin_enabled {
            return Ok(None);
        }

        // GTIN 别名命中后再回到主数据
        let product_code: Option<String> = conn
            .query_row(
                r#"SELECT product_code FROM product_gtin
                   WHERE customer_code = ?1 AND owner_code = ?2
                     AND (UPPER(case_gtin) = ?3 OR UPPER(pallet_gtin) = ?3 OR UPPER(gln) = ?3)
                   ORDER BY id LIMIT 1"#,
                params![customer_code, owner_code, scanned],
                |row| row.get(0),
            )
            .optional()?;

        match product_code {
            Some(code) => {
                let snapshot = conn
                    .query_row(
                        r#"SELECT * FROM product_master
                           WHERE customer_code = ?1 AND owner_code = ?2 AND active = 'Y'
                             AND product_code = ?3
                           ORDER BY id LIMIT 1"#,
                        params![customer_code, owner_code, code],
                        Self::map_row,
                    )
                    .optional()?;
                Ok(snapshot)
            }
            None => Ok(None),
        }
    }

    /// 结算: 按汇总行键精确定位品种 (算重量)
    pub fn find_exact(
        &self,
        customer_code: &str,
        product_group: &str,
        product_code: &str,
        owner_code: &str,
        supplier_product: &str,
    ) -> RepositoryResult<Option<ProductSnapshot>> {
        let conn = self.get_conn()?;
        let snapshot = conn
            .query_row(
                r#"SELECT * FROM product_master
                   WHERE customer_code = ?1 AND product_group = ?2 AND product_code = ?3
                     AND owner_code = ?4 AND supplier_product = ?5
                   ORDER BY id LIMIT 1"#,
                params![
                    customer_code,
                    product_group,
                    product_code,
                    owner_code,
                    supplier_product
                ],
                Self::map_row,
            )
            .optional()?;
        Ok(snapshot)
    }

    /// 快速收货: 批次+品种是否存在预期发票行
    pub fn expected_invoice_exists(
        &self,
        batch_id: &str,
        product_code: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM expected_invoice WHERE batch_id = ?1 AND product_code = ?2 LIMIT 1",
                params![batch_id, product_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ProductRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO product_master
                   (customer_code, owner_code, product_code, supplier_product, active,
                    catch_weight, net_weight, gross_weight, tare_weight, date_type, tie, high)
               VALUES ('CUST01', 'CUST01', 'PROD1', 'SUP-9', 'Y', 'I', 9.0, 10.0, 1.0, '2', 4, 3),
                      ('CUST01', 'CUST01', 'PROD2', '', 'N', 'N', 0, 0, 0, '', 0, 0)"#,
            [],
        )
        .unwrap();
        conn.execute(
            r#"INSERT INTO product_gtin (customer_code, owner_code, product_code, case_gtin)
               VALUES ('CUST01', 'CUST01', 'PROD1', '00012345678905')"#,
            [],
        )
        .unwrap();
        ProductRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_find_active_by_code_and_supplier() {
        let repo = setup();
        let p = repo
            .find_active("CUST01", "CUST01", "PROD1", false)
            .unwrap()
            .unwrap();
        assert_eq!(p.tie, 4);

        let p = repo
            .find_active("CUST01", "CUST01", "SUP-9", false)
            .unwrap()
            .unwrap();
        assert_eq!(p.product_code, "PROD1");

        // 非有效品种不命中
        assert!(repo
            .find_active("CUST01", "CUST01", "PROD2", false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_find_active_by_gtin_requires_flag() {
        let repo = setup();
        assert!(repo
            .find_active("CUST01", "CUST01", "00012345678905", false)
            .unwrap()
            .is_none());
        let p = repo
            .find_active("CUST01", "CUST01", "00012345678905", true)
            .unwrap()
            .unwrap();
        assert_eq!(p.product_code, "PROD1");
    }
}

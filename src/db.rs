// ==========================================
// 冷链仓储入库收货系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 集中建表语句，测试与终端模拟器共用同一份 schema
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 约束: 所有表名/列名与 repository 层一致；此处是 schema 的唯一出处
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id    TEXT NOT NULL,
            key         TEXT NOT NULL,
            value       TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS session_state (
            operator_id TEXT NOT NULL,
            namespace   TEXT NOT NULL,
            payload     TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (operator_id, namespace)
        );

        CREATE TABLE IF NOT EXISTS inbound_batch (
            batch_id        TEXT PRIMARY KEY,
            customer_code   TEXT NOT NULL,
            owner_code      TEXT NOT NULL DEFAULT '',
            consignee_code  TEXT NOT NULL DEFAULT '',
            batch_date      TEXT,
            confirmation_no TEXT NOT NULL DEFAULT '',
            outbound_batch  TEXT NOT NULL DEFAULT '',
            scan_status     TEXT NOT NULL DEFAULT '',
            ship_status     TEXT NOT NULL DEFAULT 'N',
            in_use          TEXT NOT NULL DEFAULT 'N',
            scan_operator   TEXT NOT NULL DEFAULT '',
            scan_start_at   TEXT,
            scan_end_at     TEXT,
            finish_at       TEXT,
            checked_qty     INTEGER NOT NULL DEFAULT 0,
            checked_gross   REAL NOT NULL DEFAULT 0,
            cancelled       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS physical_pallet (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            pallet_id          TEXT NOT NULL,
            customer_pallet_id TEXT NOT NULL DEFAULT '',
            customer_code      TEXT NOT NULL,
            track_id           TEXT NOT NULL,
            serial_no          TEXT NOT NULL DEFAULT '',
            qty                INTEGER NOT NULL DEFAULT 0,
            pallet_count       INTEGER NOT NULL DEFAULT 1,
            orig_qty           INTEGER NOT NULL DEFAULT 0,
            orig_pallet_count  INTEGER NOT NULL DEFAULT 1,
            rec_type           TEXT NOT NULL DEFAULT 'X',
            ship_status        TEXT NOT NULL DEFAULT 'N',
            is_blast           INTEGER NOT NULL DEFAULT 0,
            blast_hours        INTEGER NOT NULL DEFAULT 0,
            is_hpp             INTEGER NOT NULL DEFAULT 0,
            hold_code          TEXT NOT NULL DEFAULT '',
            merge_id           TEXT NOT NULL DEFAULT '',
            status_code        TEXT NOT NULL DEFAULT '',
            lot_no             TEXT NOT NULL DEFAULT '',
            customer_lot_no    TEXT NOT NULL DEFAULT '',
            code_date          TEXT NOT NULL DEFAULT '',
            best_by_date       TEXT NOT NULL DEFAULT '',
            establishment_no   TEXT NOT NULL DEFAULT '',
            ship_date          TEXT NOT NULL DEFAULT '',
            reference_no       TEXT NOT NULL DEFAULT '',
            temperature        TEXT NOT NULL DEFAULT '',
            scanned_by         TEXT NOT NULL DEFAULT '',
            scanned_at         TEXT,
            created_by         TEXT NOT NULL DEFAULT '',
            created_at         TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_physical_pallet_pallet_id ON physical_pallet (pallet_id);
        CREATE INDEX IF NOT EXISTS idx_physical_pallet_track ON physical_pallet (track_id);

        CREATE TABLE IF NOT EXISTS pallet_transaction (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id     TEXT NOT NULL,
            sequence_no  TEXT NOT NULL,
            track_id     TEXT NOT NULL,
            serial_no    TEXT NOT NULL DEFAULT '',
            qty          INTEGER NOT NULL DEFAULT 0,
            pallet_count INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_pallet_transaction_batch ON pallet_transaction (batch_id, sequence_no);

        CREATE TABLE IF NOT EXISTS lot_aggregate (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id         TEXT NOT NULL,
            sequence_no      TEXT NOT NULL,
            customer_code    TEXT NOT NULL,
            owner_code       TEXT NOT NULL DEFAULT '',
            product_group    TEXT NOT NULL DEFAULT '',
            product_code     TEXT NOT NULL,
            supplier_product TEXT NOT NULL DEFAULT '',
            lot_no           TEXT NOT NULL DEFAULT '',
            qty              INTEGER NOT NULL DEFAULT 0,
            pallet_count     INTEGER NOT NULL DEFAULT 0,
            hold_code        TEXT NOT NULL DEFAULT '',
            gross_weight     REAL NOT NULL DEFAULT 0,
            net_weight       REAL NOT NULL DEFAULT 0,
            orig_qty         INTEGER NOT NULL DEFAULT 0,
            orig_pallet_count INTEGER NOT NULL DEFAULT 0,
            orig_gross_weight REAL NOT NULL DEFAULT 0,
            orig_net_weight   REAL NOT NULL DEFAULT 0,
            UNIQUE (batch_id, sequence_no)
        );

        CREATE TABLE IF NOT EXISTS lot_transaction (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id     TEXT NOT NULL,
            sequence_no  TEXT NOT NULL,
            qty          INTEGER NOT NULL DEFAULT 0,
            pallet_count INTEGER NOT NULL DEFAULT 0,
            gross_weight REAL NOT NULL DEFAULT 0,
            net_weight   REAL NOT NULL DEFAULT 0,
            UNIQUE (batch_id, sequence_no)
        );

        CREATE TABLE IF NOT EXISTS pallet_detail (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id    TEXT NOT NULL,
            sequence_no TEXT NOT NULL,
            net_weight  REAL NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS product_master (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_code    TEXT NOT NULL,
            owner_code       TEXT NOT NULL DEFAULT '',
            product_group    TEXT NOT NULL DEFAULT '',
            product_code     TEXT NOT NULL,
            supplier_product TEXT NOT NULL DEFAULT '',
            active           TEXT NOT NULL DEFAULT 'Y',
            catch_weight     TEXT NOT NULL DEFAULT 'N',
            net_weight       REAL NOT NULL DEFAULT 0,
            gross_weight     REAL NOT NULL DEFAULT 0,
            tare_weight      REAL NOT NULL DEFAULT 0,
            date_type        TEXT NOT NULL DEFAULT '',
            best_by_type     TEXT NOT NULL DEFAULT '',
            blast_room       TEXT NOT NULL DEFAULT '',
            blast_hours      INTEGER NOT NULL DEFAULT 0,
            is_hpp           INTEGER NOT NULL DEFAULT 0,
            tie              INTEGER NOT NULL DEFAULT 0,
            high             INTEGER NOT NULL DEFAULT 0,
            width            REAL NOT NULL DEFAULT 0,
            height           REAL NOT NULL DEFAULT 0,
            length           REAL NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_product_master_customer ON product_master (customer_code, owner_code);

        CREATE TABLE IF NOT EXISTS product_gtin (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_code TEXT NOT NULL,
            owner_code    TEXT NOT NULL DEFAULT '',
            product_code  TEXT NOT NULL,
            case_gtin     TEXT NOT NULL DEFAULT '',
            pallet_gtin   TEXT NOT NULL DEFAULT '',
            gln           TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS customer_requirement (
            customer_code          TEXT PRIMARY KEY,
            customer_status        TEXT NOT NULL DEFAULT '',
            require_lot            INTEGER NOT NULL DEFAULT 0,
            require_customer_lot   INTEGER NOT NULL DEFAULT 0,
            require_establishment  INTEGER NOT NULL DEFAULT 0,
            require_reference      INTEGER NOT NULL DEFAULT 0,
            require_temperature    INTEGER NOT NULL DEFAULT 0,
            require_customer_pallet INTEGER NOT NULL DEFAULT 0,
            customer_pallet_same   INTEGER NOT NULL DEFAULT 0,
            customer_pallet_from   INTEGER NOT NULL DEFAULT 0,
            customer_pallet_to     INTEGER NOT NULL DEFAULT 0,
            customer_pid_length    INTEGER NOT NULL DEFAULT 0,
            has_blast              INTEGER NOT NULL DEFAULT 0,
            capture_pallet_weight  INTEGER NOT NULL DEFAULT 0,
            use_128_barcode        INTEGER NOT NULL DEFAULT 0,
            scan_length            INTEGER NOT NULL DEFAULT 0,
            pallet_offset_from     INTEGER NOT NULL DEFAULT 0,
            pallet_offset_to       INTEGER NOT NULL DEFAULT 0,
            yyww_cool_code         INTEGER NOT NULL DEFAULT 0,
            asn_pallet             INTEGER NOT NULL DEFAULT 0,
            asn_no_qty             INTEGER NOT NULL DEFAULT 0,
            calc_best_by           INTEGER NOT NULL DEFAULT 0,
            auto_fill_consignee    INTEGER NOT NULL DEFAULT 0,
            auto_date_for_lot      INTEGER NOT NULL DEFAULT 0,
            gtin_validation        INTEGER NOT NULL DEFAULT 0,
            future_date_allowed    INTEGER NOT NULL DEFAULT 0,
            two_years_back         INTEGER NOT NULL DEFAULT 0,
            pallet_max_length      INTEGER NOT NULL DEFAULT 0,
            validate_pallet_length INTEGER NOT NULL DEFAULT 0,
            hand_key_consignee     INTEGER NOT NULL DEFAULT 0,
            allow_putaway          INTEGER NOT NULL DEFAULT 0,
            use_stack_hold         INTEGER NOT NULL DEFAULT 0,
            edi_blast_control      TEXT NOT NULL DEFAULT '',
            batch_product_edi      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS customer_note (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_code TEXT NOT NULL,
            consignee     TEXT NOT NULL DEFAULT '',
            note_type     TEXT NOT NULL DEFAULT 'RECV',
            note          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS asn_pallet (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id     TEXT NOT NULL,
            pallet_id    TEXT NOT NULL,
            product_code TEXT NOT NULL DEFAULT '',
            code_date    TEXT,
            qty          INTEGER NOT NULL DEFAULT 0,
            lot_no       TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_asn_pallet_batch ON asn_pallet (batch_id, pallet_id);

        CREATE TABLE IF NOT EXISTS expected_invoice (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id     TEXT NOT NULL,
            product_code TEXT NOT NULL,
            owner_code   TEXT NOT NULL DEFAULT '',
            lot_no       TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS quick_receive (
            batch_id       TEXT PRIMARY KEY,
            receive_type   TEXT NOT NULL DEFAULT '',
            outbound_batch TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS outbound_load (
            batch_id      TEXT PRIMARY KEY,
            scan_status   TEXT NOT NULL DEFAULT '',
            scan_start_tm TEXT,
            scan_end_dt   TEXT
        );

        CREATE TABLE IF NOT EXISTS shipment_confirmation (
            confirmation_no TEXT PRIMARY KEY,
            start_at        TEXT,
            finish_at       TEXT,
            live_drop       TEXT NOT NULL DEFAULT '',
            reuse_trailer   INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS dynamic_rail (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id     TEXT NOT NULL,
            product_code TEXT NOT NULL,
            tie          INTEGER NOT NULL DEFAULT 0,
            high         INTEGER NOT NULL DEFAULT 0,
            bol_qty      INTEGER NOT NULL DEFAULT 0,
            created_by   TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS staged_pallet (
            pallet_id TEXT PRIMARY KEY,
            loaded_at TEXT
        );

        CREATE TABLE IF NOT EXISTS blast_status (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_code TEXT NOT NULL,
            status_code   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS edi_blast_log (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_product TEXT NOT NULL,
            status_code   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS blast_request (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            blast_key TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS close_task (
            task_id       TEXT PRIMARY KEY,
            batch_id      TEXT NOT NULL,
            operator_id   TEXT NOT NULL,
            status        TEXT NOT NULL,
            retry_count   INTEGER NOT NULL DEFAULT 0,
            max_retries   INTEGER NOT NULL DEFAULT 3,
            created_at    TEXT NOT NULL,
            started_at    TEXT,
            completed_at  TEXT,
            error_message TEXT
        );
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        // 再次执行不应报错
        ensure_schema(&conn).unwrap();

        let n: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='inbound_batch'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(n, 1);
    }
}

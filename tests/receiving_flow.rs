// ==========================================
// 冷链仓储入库收货系统 - 收货流程集成测试
// ==========================================
// 驱动完整分发器: 批次 -> 托盘 -> 品码 -> 日期 -> 数量 -> 批号
// -> 托盘小结 -> 退出/关闭 -> 结算
// ==========================================

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use cold_chain_receiving::api::{Response, ScanRequest};
use cold_chain_receiving::app::AppState;
use cold_chain_receiving::domain::types::ReceivingStep;

struct Harness {
    conn: Arc<Mutex<Connection>>,
    state: AppState,
}

fn harness() -> Harness {
    let conn = Connection::open_in_memory().unwrap();
    cold_chain_receiving::db::configure_sqlite_connection(&conn).unwrap();
    cold_chain_receiving::db::ensure_schema(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));
    let state = AppState::from_connection(":memory:", conn.clone()).unwrap();
    Harness { conn, state }
}

impl Harness {
    fn exec(&self, sql: &str) {
        self.conn.lock().unwrap().execute(sql, []).unwrap();
    }

    fn count(&self, sql: &str) -> i64 {
        self.conn
            .lock()
            .unwrap()
            .query_row(sql, [], |row| row.get(0))
            .unwrap()
    }

    fn scan(&self, input: &str) -> Response {
        self.state
            .dispatcher
            .handle("OP01", "T01", &ScanRequest::new(input))
            .unwrap()
    }

    /// 标准场景: 批次 + 必采批号客户 + 日历日期品种 (码放 4x3)
    fn seed(&self) {
        self.exec(
            "INSERT INTO inbound_batch (batch_id, customer_code, owner_code) VALUES ('0001234', 'CUST01', 'CUST01')",
        );
        self.exec(
            "INSERT INTO customer_requirement (customer_code, require_lot, scan_length) VALUES ('CUST01', 1, 20)",
        );
        self.exec(
            r#"INSERT INTO product_master
                   (customer_code, owner_code, product_code, active, catch_weight,
                    net_weight, gross_weight, tare_weight, date_type, tie, high)
               VALUES ('CUST01', 'CUST01', 'PROD1', 'Y', 'N', 9.0, 10.0, 1.0, '2', 4, 3)"#,
        );
    }
}

fn today_code_date() -> String {
    let d = Utc::now().date_naive();
    format!("{:02}{:02}{:04}", d.month(), d.day(), d.year())
}

/// 走到数量步骤
fn walk_to_quantity(h: &Harness) {
    assert_eq!(h.scan("1234").step, ReceivingStep::Pallet);
    assert_eq!(h.scan("PAL100").step, ReceivingStep::Product);
    assert_eq!(h.scan("PROD1").step, ReceivingStep::CodeDate);
    assert_eq!(h.scan(&today_code_date()).step, ReceivingStep::Quantity);
}

#[test]
fn test_full_flow_scan_to_close_and_reconcile() {
    let h = harness();
    h.seed();

    walk_to_quantity(&h);

    // 12 = 4 X 3, 不触发码放确认; 必采批号 -> 批号步骤
    let resp = h.scan("12");
    assert!(resp.error.is_none());
    assert_eq!(resp.step, ReceivingStep::Lot);

    let resp = h.scan("LOTA");
    assert_eq!(resp.step, ReceivingStep::SendPallet);
    let payload = resp.payload.expect("托盘小结负载");
    assert_eq!(payload["pallet"], "PAL100");
    assert_eq!(payload["qty"], "12");

    // 确认发送: 托盘落账并回到托盘步骤
    let resp = h.scan("");
    assert_eq!(resp.step, ReceivingStep::Pallet);
    assert!(resp.info.is_some());
    assert_eq!(
        h.count("SELECT qty FROM physical_pallet WHERE pallet_id='PAL100'"),
        12
    );
    assert_eq!(
        h.count("SELECT count(*) FROM physical_pallet WHERE track_id='0001234001'"),
        1
    );
    assert_eq!(
        h.count("SELECT count(*) FROM lot_aggregate WHERE batch_id='0001234' AND lot_no='LOTA'"),
        1
    );

    // 退出 -> 单收货员立即关闭确认
    let resp = h.scan("F5");
    assert_eq!(resp.step, ReceivingStep::Close);
    let resp = h.scan("Y");
    assert_eq!(resp.step, ReceivingStep::Batch);

    // 结算任务入队并消费
    assert_eq!(h.state.close_queue.run_pending_once().unwrap(), 1);
    assert_eq!(
        h.count("SELECT checked_qty FROM inbound_batch WHERE batch_id='0001234'"),
        12
    );
    let status: String = h
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT scan_status FROM inbound_batch WHERE batch_id='0001234'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(status, "R");
    assert_eq!(
        h.count("SELECT qty FROM lot_aggregate WHERE sequence_no='001'"),
        12
    );
    // 批号汇总重量: 12 × 毛10
    let gross: f64 = h
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT gross_weight FROM lot_aggregate WHERE sequence_no='001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(gross, 120.0);
}

#[test]
fn test_shipped_batch_always_rejected_and_session_unmutated() {
    let h = harness();
    h.seed();
    h.exec(
        "INSERT INTO inbound_batch (batch_id, customer_code, owner_code, ship_status) VALUES ('0009999', 'CUST01', 'CUST01', 'Y')",
    );

    let first = h.scan("9999");
    assert!(first.error.is_some());
    for _ in 0..2 {
        let resp = h.scan("9999");
        assert_eq!(resp.step, ReceivingStep::Batch);
        // 每次都是同一个不可收货错误
        assert_eq!(resp.error, first.error);
    }

    // 被拒绝的提交不落盘: 会话批次字段未被污染
    assert_eq!(
        h.count("SELECT count(*) FROM session_state WHERE namespace='RECEIVING'"),
        0
    );

    // 正常批次仍可收货，会话才建立
    assert_eq!(h.scan("1234").step, ReceivingStep::Pallet);
    let payload: String = h
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT payload FROM session_state WHERE operator_id='OP01' AND namespace='RECEIVING'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let session: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(session["batch_id"], "0001234");
}

#[test]
fn test_duplicate_pallet_rejected_without_new_row() {
    let h = harness();
    h.seed();
    // 其他批次的在库托盘
    h.exec(
        "INSERT INTO physical_pallet (pallet_id, customer_code, track_id, serial_no, ship_status) VALUES ('PAL900', 'CUST01', '7777777001', '9', 'N')",
    );

    assert_eq!(h.scan("1234").step, ReceivingStep::Pallet);
    let resp = h.scan("PAL900");
    assert!(resp.error.is_some());
    assert_eq!(resp.step, ReceivingStep::Pallet);
    assert_eq!(
        h.count("SELECT count(*) FROM physical_pallet WHERE pallet_id='PAL900'"),
        1
    );
}

#[test]
fn test_quantity_tie_high_confirmation() {
    let h = harness();
    h.seed();
    walk_to_quantity(&h);

    // 11 != 4 X 3: 转 Y/N 确认，提示 4 X 3
    let resp = h.scan("11");
    assert_eq!(resp.step, ReceivingStep::QuantityConfirm);
    let field = &resp.fields[0];
    assert_eq!(field.value.as_deref(), Some("4 X 3"));
    assert!(field.label.as_ref().unwrap().contains("4 X 3"));

    // N: 清数量重新采集
    let resp = h.scan("N");
    assert_eq!(resp.step, ReceivingStep::Quantity);

    // 再次 11 + Y: 接受并按必采批号前进
    assert_eq!(h.scan("11").step, ReceivingStep::QuantityConfirm);
    let resp = h.scan("Y");
    assert_eq!(resp.step, ReceivingStep::Lot);

    let payload: String = h
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT payload FROM session_state WHERE operator_id='OP01' AND namespace='RECEIVING'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let session: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(session["quantity"], "11");
}

#[test]
fn test_exit_with_placeholder_pallet_deletes_and_reports() {
    let h = harness();
    h.seed();

    assert_eq!(h.scan("1234").step, ReceivingStep::Pallet);
    assert_eq!(h.scan("PAL100").step, ReceivingStep::Product);
    assert_eq!(
        h.count("SELECT count(*) FROM physical_pallet WHERE pallet_id='PAL100'"),
        1
    );

    // 托盘仍是零数量占位行时退出: 删除占位行并提示数据未发送
    let resp = h.scan("F5");
    assert_eq!(resp.step, ReceivingStep::Close);
    assert!(resp.info.is_some());
    assert_eq!(
        h.count("SELECT count(*) FROM physical_pallet WHERE pallet_id='PAL100'"),
        0
    );

    // 否: 回到托盘继续收
    let resp = h.scan("N");
    assert_eq!(resp.step, ReceivingStep::Pallet);
}

#[test]
fn test_exit_without_batch_returns_to_menu() {
    let h = harness();
    h.seed();
    let resp = h.scan("F5");
    assert_eq!(resp.step, ReceivingStep::Exit);
    assert_eq!(resp.info.as_deref(), Some("RFINBOUNDMAINMENU"));
    // 会话已删除
    assert_eq!(
        h.count("SELECT count(*) FROM session_state WHERE namespace='RECEIVING'"),
        0
    );
}

#[test]
fn test_multi_receiver_exit_goes_to_all_received_prompt() {
    let h = harness();
    h.seed();
    h.exec(
        "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', 'allow_multiple_receivers', '1')",
    );
    // 配置在装配时加载: 重新装配
    let state = AppState::from_connection(":memory:", h.conn.clone()).unwrap();
    let scan = |input: &str| {
        state
            .dispatcher
            .handle("OP01", "T01", &ScanRequest::new(input))
            .unwrap()
    };

    assert_eq!(scan("1234").step, ReceivingStep::Pallet);
    let resp = scan("F5");
    assert_eq!(resp.step, ReceivingStep::CloseAllReceived);

    // 全部收完: 无在作业托盘 -> 入队结算并回到批次
    let resp = scan("Y");
    assert_eq!(resp.step, ReceivingStep::Batch);
    assert_eq!(
        h.count("SELECT count(*) FROM close_task WHERE status='PENDING'"),
        1
    );
}

#[test]
fn test_lot_skip_requires_double_press() {
    let h = harness();
    h.seed();
    walk_to_quantity(&h);
    assert_eq!(h.scan("12").step, ReceivingStep::Lot);

    // 第一次 F4: 报批号不能为空
    let resp = h.scan("F4");
    assert_eq!(resp.step, ReceivingStep::Lot);
    assert!(resp.error.is_some());

    // 第二次 F4: 清批号并前进
    let resp = h.scan("F4");
    assert!(resp.error.is_none());
    assert_eq!(resp.step, ReceivingStep::SendPallet);
}

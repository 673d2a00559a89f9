use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use super::{CloseEngine, CloseOutcome};
use crate::config::{FacilityConfig, FacilityContext};
use crate::engine::services::{
    HoldAction, HoldScope, HoldService, LocalProcedures, ServiceResult, TracingYardService,
};
use crate::repository::{
    BatchRepository, ConfirmationRepository, LotRepository, PalletRepository, ProductRepository,
    RequirementRepository,
};

// ==========================================
// 测试辅助
// ==========================================

/// 记录式冻结服务
#[derive(Default)]
struct RecordingHoldService {
    calls: Mutex<Vec<(String, String, String)>>, // (hold_code, scope, track)
}

impl HoldService for RecordingHoldService {
    fn apply_or_release(
        &self,
        hold_code: &str,
        _entered_by: &str,
        _action: HoldAction,
        scope: HoldScope,
        track_id: &str,
        _serial_no: &str,
    ) -> ServiceResult<()> {
        self.calls.lock().unwrap().push((
            hold_code.to_string(),
            scope.as_str().to_string(),
            track_id.to_string(),
        ));
        Ok(())
    }
}

struct Fixture {
    conn: Arc<Mutex<Connection>>,
    engine: CloseEngine,
    holds: Arc<RecordingHoldService>,
}

fn fixture() -> Fixture {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::ensure_schema(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));

    let holds = Arc::new(RecordingHoldService::default());
    let engine = CloseEngine::new(
        Arc::new(BatchRepository::new(conn.clone())),
        Arc::new(PalletRepository::new(conn.clone())),
        Arc::new(LotRepository::new(conn.clone())),
        Arc::new(ProductRepository::new(conn.clone())),
        Arc::new(RequirementRepository::new(conn.clone())),
        Arc::new(ConfirmationRepository::new(conn.clone())),
        holds.clone(),
        Arc::new(TracingYardService),
        Arc::new(LocalProcedures::new(conn.clone())),
        Arc::new(FacilityContext::new(FacilityConfig::default())),
    );
    Fixture {
        conn,
        engine,
        holds,
    }
}

fn exec(fx: &Fixture, sql: &str) {
    fx.conn.lock().unwrap().execute(sql, []).unwrap();
}

fn count(fx: &Fixture, sql: &str) -> i64 {
    fx.conn
        .lock()
        .unwrap()
        .query_row(sql, [], |row| row.get(0))
        .unwrap()
}

/// 标准场景: 一个批次、两个批号
/// 001: 两块有数量托盘 (12+8); 002: 一块零数量托盘
fn seed_standard_batch(fx: &Fixture) {
    exec(
        fx,
        "INSERT INTO inbound_batch (batch_id, customer_code, owner_code, scan_status) VALUES ('0001234', 'CUST01', 'CUST01', 'P')",
    );
    exec(
        fx,
        r#"INSERT INTO product_master
               (customer_code, owner_code, product_group, product_code, supplier_product, active,
                catch_weight, net_weight, gross_weight, tare_weight)
           VALUES ('CUST01', 'CUST01', '', 'PROD1', '', 'Y', 'N', 9.0, 10.0, 1.0)"#,
    );
    exec(
        fx,
        r#"INSERT INTO lot_aggregate (batch_id, sequence_no, customer_code, owner_code, product_group, product_code, supplier_product, lot_no)
           VALUES ('0001234', '001', 'CUST01', 'CUST01', '', 'PROD1', '', 'LOTA'),
                  ('0001234', '002', 'CUST01', 'CUST01', '', 'PROD1', '', 'LOTB')"#,
    );
    exec(
        fx,
        r#"INSERT INTO lot_transaction (batch_id, sequence_no) VALUES ('0001234', '001'), ('0001234', '002')"#,
    );
    exec(
        fx,
        r#"INSERT INTO physical_pallet (pallet_id, customer_code, track_id, serial_no, qty)
           VALUES ('PAL001', 'CUST01', '0001234001', '1', 12),
                  ('PAL002', 'CUST01', '0001234001', '2', 8),
                  ('PAL003', 'CUST01', '0001234002', '3', 0)"#,
    );
    exec(
        fx,
        r#"INSERT INTO pallet_transaction (batch_id, sequence_no, track_id, serial_no, qty)
           VALUES ('0001234', '001', '0001234001', '1', 12),
                  ('0001234', '001', '0001234001', '2', 8),
                  ('0001234', '002', '0001234002', '3', 0)"#,
    );
}

// ==========================================
// 结算场景测试
// ==========================================

#[test]
fn test_recompute_and_zero_lot_deletion() {
    let fx = fixture();
    seed_standard_batch(&fx);

    let outcome = fx.engine.run("0001234", "OP01").unwrap();
    assert_eq!(
        outcome,
        CloseOutcome::Completed {
            surviving_lots: 1,
            deleted_lots: 1,
            deleted_pallets: 1,
        }
    );

    // 存活批号数量 = 托盘数量之和
    let qty = count(
        &fx,
        "SELECT qty FROM lot_aggregate WHERE batch_id='0001234' AND sequence_no='001'",
    );
    assert_eq!(qty, 20);
    let pals = count(
        &fx,
        "SELECT pallet_count FROM lot_aggregate WHERE batch_id='0001234' AND sequence_no='001'",
    );
    assert_eq!(pals, 2);

    // 零数量批号/托盘被清理
    assert_eq!(
        count(&fx, "SELECT count(*) FROM lot_aggregate WHERE sequence_no='002'"),
        0
    );
    assert_eq!(
        count(&fx, "SELECT count(*) FROM lot_transaction WHERE sequence_no='002'"),
        0
    );
    assert_eq!(
        count(&fx, "SELECT count(*) FROM physical_pallet WHERE pallet_id='PAL003'"),
        0
    );

    // 没有数量为零的存活批号
    assert_eq!(
        count(&fx, "SELECT count(*) FROM lot_aggregate WHERE qty = 0"),
        0
    );

    // 批次点数与状态
    assert_eq!(
        count(&fx, "SELECT checked_qty FROM inbound_batch WHERE batch_id='0001234'"),
        20
    );
    let status: String = fx
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

    // 主数据重量: 20 件 × 毛 10 / 净 9
    let gross: f64 = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT gross_weight FROM lot_aggregate WHERE sequence_no='001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(gross, 200.0);
}

#[test]
fn test_already_shipped_batch_is_noop_twice() {
    let fx = fixture();
    seed_standard_batch(&fx);
    exec(
        &fx,
        "UPDATE inbound_batch SET ship_status = 'Y' WHERE batch_id = '0001234'",
    );

    for _ in 0..2 {
        let outcome = fx.engine.run("0001234", "OP01").unwrap();
        assert_eq!(outcome, CloseOutcome::AlreadyShipped);
        // 任何行都未被改动
        assert_eq!(
            count(&fx, "SELECT count(*) FROM physical_pallet"),
            3
        );
        assert_eq!(count(&fx, "SELECT count(*) FROM lot_aggregate"), 2);
        assert_eq!(
            count(&fx, "SELECT qty FROM lot_aggregate WHERE sequence_no='001'"),
            0
        );
        assert_eq!(
            count(&fx, "SELECT checked_qty FROM inbound_batch WHERE batch_id='0001234'"),
            0
        );
    }
}

#[test]
fn test_catch_weight_uses_detail_rows() {
    let fx = fixture();
    seed_standard_batch(&fx);
    exec(
        &fx,
        "UPDATE product_master SET catch_weight = 'I' WHERE product_code = 'PROD1'",
    );
    exec(
        &fx,
        r#"INSERT INTO pallet_detail (batch_id, sequence_no, net_weight)
           VALUES ('0001234', '001', 100.0), ('0001234', '001', 70.0)"#,
    );

    fx.engine.run("0001234", "OP01").unwrap();

    let (gross, net): (f64, f64) = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT gross_weight, net_weight FROM lot_aggregate WHERE sequence_no='001'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    // 净重 = 170, 毛重 = 170 + 皮重1.0 × 20
    assert_eq!(net, 170.0);
    assert_eq!(gross, 190.0);
}

#[test]
fn test_hpp_hold_propagation_direct() {
    let fx = fixture();
    seed_standard_batch(&fx);
    // 客户未启用堆垛冻结 -> 直接落 HPP 冻结代码
    exec(
        &fx,
        "UPDATE physical_pallet SET is_hpp = 1 WHERE pallet_id = 'PAL001'",
    );

    fx.engine.run("0001234", "OP01").unwrap();

    let hold: String = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT hold_code FROM lot_aggregate WHERE sequence_no='001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(hold, "HPP");
    // 未启用堆垛冻结时不应有冻结服务调用
    assert!(fx.holds.calls.lock().unwrap().is_empty());
    // 批号下托盘都打上 HPP 标志
    assert_eq!(
        count(
            &fx,
            "SELECT count(*) FROM physical_pallet WHERE track_id='0001234001' AND is_hpp=1 AND hold_code='HPP'"
        ),
        2
    );
}

#[test]
fn test_hpp_hold_propagation_stack_hold() {
    let fx = fixture();
    seed_standard_batch(&fx);
    exec(
        &fx,
        "INSERT INTO customer_requirement (customer_code, use_stack_hold) VALUES ('CUST01', 1)",
    );
    exec(
        &fx,
        "UPDATE physical_pallet SET is_hpp = 1 WHERE pallet_id = 'PAL001'",
    );

    fx.engine.run("0001234", "OP01").unwrap();

    let calls = fx.holds.calls.lock().unwrap();
    // 托盘级 (每块托盘一次) + 批号级一次
    assert!(calls
        .iter()
        .any(|(code, scope, track)| code == "HPP" && scope == "P" && track == "0001234001"));
    assert!(calls
        .iter()
        .any(|(code, scope, track)| code == "HPP" && scope == "L" && track == "0001234001"));
    drop(calls);

    // 堆垛冻结模式下批号冻结代码保持原值
    let hold: String = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT hold_code FROM lot_aggregate WHERE sequence_no='001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(hold, "");
}

#[test]
fn test_confirmation_finish_clamp_and_cascade() {
    let fx = fixture();
    seed_standard_batch(&fx);
    exec(
        &fx,
        "UPDATE inbound_batch SET confirmation_no = 'CONF01' WHERE batch_id = '0001234'",
    );
    exec(
        &fx,
        r#"INSERT INTO inbound_batch (batch_id, customer_code, owner_code, confirmation_no, ship_status)
           VALUES ('0005678', 'CUST01', 'CUST01', 'CONF01', 'N'),
                  ('0005679', 'CUST01', 'CUST01', 'CONF01', 'Y')"#,
    );
    // 确认单完成时间在过去 -> 被钳制到批次完成时间
    exec(
        &fx,
        r#"INSERT INTO shipment_confirmation (confirmation_no, finish_at, live_drop, reuse_trailer)
           VALUES ('CONF01', '2000-01-01 00:00:00', '', 0)"#,
    );

    fx.engine.run("0001234", "OP01").unwrap();

    let finish: String = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT finish_at FROM shipment_confirmation WHERE confirmation_no='CONF01'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(!finish.starts_with("2000-"));

    // 未发运兄弟批次被级联完成时间; 已发运的不动
    let sibling: Option<String> = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT finish_at FROM inbound_batch WHERE batch_id='0005678'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(sibling.is_some());
    let shipped: Option<String> = fx
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT finish_at FROM inbound_batch WHERE batch_id='0005679'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(shipped.is_none());
}

#[test]
fn test_batch_not_found() {
    let fx = fixture();
    assert_eq!(
        fx.engine.run("9999999", "OP01").unwrap(),
        CloseOutcome::NotFound
    );
}

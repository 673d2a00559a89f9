// ==========================================
// 冷链仓储入库收货系统 - 应用状态
// ==========================================
// 职责: 初始化数据库连接，装配 Repository / Engine / Handler / Dispatcher
// ==========================================

use anyhow::{anyhow, Context};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::handlers::{
    BatchHandler, BlastHandler, CloseHandler, DateHandler, PalletHandler, ProductHandler,
    QuantityHandler, RailHandler, ScalarHandler, SendPalletHandler, StepFlow,
};
use crate::api::Dispatcher;
use crate::config::FacilityContext;
use crate::engine::close::CloseEngine;
use crate::engine::close_queue::CloseQueue;
use crate::engine::services::{
    DynamicAttributeProvider, FieldMetadataProvider, HoldService, InboundProcedures,
    LocalProcedures, NoopDynamicAttributes, StaticFieldProvider, TracingHoldService,
    TracingYardService, YardService,
};
use crate::repository::{
    AsnPalletRepository, BatchRepository, BlastControlRepository, CloseTaskRepository,
    ConfirmationRepository, LotRepository, PalletRepository, ProductRepository,
    QuickReceiveRepository, RailRepository, RequirementRepository, SessionStore,
    SqliteSessionStore,
};

/// 应用状态
///
/// 持有分发器与结算队列; 在终端入口作为共享状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 扫码分发器
    pub dispatcher: Arc<Dispatcher>,

    /// 批次结算队列
    pub close_queue: Arc<CloseQueue>,
}

impl AppState {
    /// 打开数据库并装配全部组件
    pub fn new(db_path: &str) -> anyhow::Result<Self> {
        tracing::info!("初始化 AppState，数据库路径: {}", db_path);
        let conn = crate::db::open_sqlite_connection(db_path)
            .with_context(|| format!("无法打开数据库: {}", db_path))?;
        crate::db::ensure_schema(&conn).context("建表失败")?;
        let conn = Arc::new(Mutex::new(conn));
        Self::from_connection(db_path, conn)
    }

    /// 从已有连接装配 (测试与嵌入场景)
    pub fn from_connection(
        db_path: &str,
        conn: Arc<Mutex<Connection>>,
    ) -> anyhow::Result<Self> {
        // ==========================================
        // 配置与外部服务
        // ==========================================
        let ctx = Arc::new(
            FacilityContext::load(&conn).map_err(|e| anyhow!("加载库区配置失败: {}", e))?,
        );
        let hold_service: Arc<dyn HoldService> = Arc::new(TracingHoldService);
        let yard_service: Arc<dyn YardService> = Arc::new(TracingYardService);
        let procedures: Arc<dyn InboundProcedures> =
            Arc::new(LocalProcedures::new(conn.clone()));
        let attributes: Arc<dyn DynamicAttributeProvider> = Arc::new(NoopDynamicAttributes);
        let fields_meta: Arc<dyn FieldMetadataProvider> = Arc::new(StaticFieldProvider);

        // ==========================================
        // Repository 层
        // ==========================================
        let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(conn.clone()));
        let batches = Arc::new(BatchRepository::new(conn.clone()));
        let pallets = Arc::new(PalletRepository::new(conn.clone()));
        let lots = Arc::new(LotRepository::new(conn.clone()));
        let products = Arc::new(ProductRepository::new(conn.clone()));
        let requirements = Arc::new(RequirementRepository::new(conn.clone()));
        let quick = Arc::new(QuickReceiveRepository::new(conn.clone()));
        let asn = Arc::new(AsnPalletRepository::new(conn.clone()));
        let rail = Arc::new(RailRepository::new(conn.clone()));
        let blast_control = Arc::new(BlastControlRepository::new(conn.clone()));
        let confirmations = Arc::new(ConfirmationRepository::new(conn.clone()));
        let close_tasks = Arc::new(CloseTaskRepository::new(conn.clone()));

        // ==========================================
        // Engine 层
        // ==========================================
        let close_engine = Arc::new(CloseEngine::new(
            batches.clone(),
            pallets.clone(),
            lots.clone(),
            products.clone(),
            requirements.clone(),
            confirmations.clone(),
            hold_service.clone(),
            yard_service.clone(),
            procedures.clone(),
            ctx.clone(),
        ));
        let close_queue = CloseQueue::new(close_tasks, close_engine, ctx.clone());
        let flow = Arc::new(StepFlow::new(attributes));

        // ==========================================
        // Handler 层与分发器
        // ==========================================
        let batch_handler = Arc::new(BatchHandler::new(
            batches.clone(),
            requirements.clone(),
            quick.clone(),
            confirmations.clone(),
            procedures.clone(),
            ctx.clone(),
        ));
        let pallet_handler = Arc::new(PalletHandler::new(
            pallets.clone(),
            batches.clone(),
            asn,
            procedures.clone(),
            ctx.clone(),
        ));
        let product_handler = Arc::new(ProductHandler::new(
            products.clone(),
            rail.clone(),
            ctx.clone(),
        ));
        let quantity_handler = Arc::new(QuantityHandler::new(
            blast_control,
            rail,
            pallets.clone(),
            procedures.clone(),
            hold_service.clone(),
            flow.clone(),
        ));
        let blast_handler = Arc::new(BlastHandler::new(
            pallets.clone(),
            procedures.clone(),
            hold_service,
            flow.clone(),
        ));
        let date_handler = Arc::new(DateHandler::new(flow.clone(), ctx.clone()));
        let scalar_handler = Arc::new(ScalarHandler::new(procedures.clone(), flow.clone()));
        let rail_handler = Arc::new(RailHandler::new(procedures.clone(), ctx.clone()));
        let send_pallet_handler = Arc::new(SendPalletHandler::new(
            pallets.clone(),
            lots,
            flow,
        ));
        let close_handler = Arc::new(CloseHandler::new(
            batches,
            pallets,
            close_queue.clone(),
            sessions.clone(),
            procedures,
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            sessions,
            fields_meta,
            batch_handler,
            pallet_handler,
            product_handler,
            quantity_handler,
            blast_handler,
            date_handler,
            scalar_handler,
            rail_handler,
            send_pallet_handler,
            close_handler,
        ));

        Ok(Self {
            db_path: db_path.to_string(),
            dispatcher,
            close_queue,
        })
    }
}

/// 默认数据库路径: <数据目录>/cold-chain-receiving/receiving.db
pub fn get_default_db_path() -> String {
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
    let dir = base.join("cold-chain-receiving");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!("创建数据目录失败({}), 回退当前目录", e);
        return "receiving.db".to_string();
    }
    dir.join("receiving.db").to_string_lossy().to_string()
}

// ==========================================
// 冷链仓储入库收货系统 - 批次结算任务队列
// ==========================================
// 职责: 管理结算任务队列，后台工作线程消费
// 投递语义: 至少一次; 重复投递由结算引擎已发运保护兜底
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::FacilityContext;
use crate::engine::close::{CloseEngine, CloseOutcome};
use crate::repository::close_task_repo::{CloseTaskRepository, CloseTaskStatus};
use crate::repository::error::RepositoryResult;

/// 队列轮询间隔（毫秒）
const POLL_INTERVAL_MS: u64 = 500;

/// 批次结算任务队列
pub struct CloseQueue {
    tasks: Arc<CloseTaskRepository>,
    engine: Arc<CloseEngine>,
    ctx: Arc<FacilityContext>,
    shutdown: AtomicBool,
}

impl CloseQueue {
    pub fn new(
        tasks: Arc<CloseTaskRepository>,
        engine: Arc<CloseEngine>,
        ctx: Arc<FacilityContext>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tasks,
            engine,
            ctx,
            shutdown: AtomicBool::new(false),
        })
    }

    /// 入队结算任务（请求侧不等待执行）
    pub fn enqueue(&self, batch_id: &str, operator_id: &str) -> RepositoryResult<String> {
        let task_id = self.tasks.enqueue(batch_id, operator_id, self.ctx.now())?;
        info!(batch_id, operator_id, %task_id, "结算任务入队");
        Ok(task_id)
    }

    /// 同步消费当前全部待执行任务
    ///
    /// # 返回
    /// - 本次处理的任务数
    pub fn run_pending_once(&self) -> RepositoryResult<usize> {
        let mut processed = 0usize;
        while let Some(task) = self.tasks.claim_next(self.ctx.now())? {
            processed += 1;
            match self.engine.run(&task.batch_id, &task.operator_id) {
                Ok(outcome) => {
                    if let CloseOutcome::Completed {
                        surviving_lots,
                        deleted_lots,
                        deleted_pallets,
                    } = &outcome
                    {
                        info!(
                            batch_id = %task.batch_id,
                            surviving_lots, deleted_lots, deleted_pallets, "结算完成"
                        );
                    }
                    self.tasks.mark_completed(&task.task_id, self.ctx.now())?;
                }
                Err(e) => {
                    // 部分整算是可接受状态: 已提交子步骤保留，重试重新触发
                    error!(
                        batch_id = %task.batch_id,
                        task_id = %task.task_id,
                        error = %e,
                        "结算失败"
                    );
                    let status =
                        self.tasks
                            .mark_failed(&task.task_id, &e.to_string(), self.ctx.now())?;
                    if status == CloseTaskStatus::Failed {
                        warn!(batch_id = %task.batch_id, "结算任务达到重试上限");
                    }
                }
            }
        }
        Ok(processed)
    }

    /// 启动后台工作任务
    pub fn spawn_worker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            info!("结算队列工作线程启动");
            while !queue.shutdown.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                let q = Arc::clone(&queue);
                let result = tokio::task::spawn_blocking(move || q.run_pending_once()).await;
                match result {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!(error = %e, "结算队列轮询失败"),
                    Err(e) => error!(error = %e, "结算队列工作任务异常"),
                }
            }
            info!("结算队列工作线程退出");
        })
    }

    /// 请求停止后台工作任务
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FacilityConfig;
    use crate::engine::services::{LocalProcedures, TracingHoldService, TracingYardService};
    use crate::repository::{
        BatchRepository, ConfirmationRepository, LotRepository, PalletRepository,
        ProductRepository, RequirementRepository,
    };
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn setup() -> (Arc<Mutex<Connection>>, Arc<CloseQueue>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let ctx = Arc::new(FacilityContext::new(FacilityConfig::default()));
        let engine = Arc::new(CloseEngine::new(
            Arc::new(BatchRepository::new(conn.clone())),
            Arc::new(PalletRepository::new(conn.clone())),
            Arc::new(LotRepository::new(conn.clone())),
            Arc::new(ProductRepository::new(conn.clone())),
            Arc::new(RequirementRepository::new(conn.clone())),
            Arc::new(ConfirmationRepository::new(conn.clone())),
            Arc::new(TracingHoldService),
            Arc::new(TracingYardService),
            Arc::new(LocalProcedures::new(conn.clone())),
            ctx.clone(),
        ));
        let queue = CloseQueue::new(
            Arc::new(CloseTaskRepository::new(conn.clone())),
            engine,
            ctx,
        );
        (conn, queue)
    }

    #[test]
    fn test_enqueue_and_drain() {
        let (conn, queue) = setup();
        {
            let guard = conn.lock().unwrap();
            guard
                .execute(
                    "INSERT INTO inbound_batch (batch_id, customer_code, owner_code, scan_status) VALUES ('0001234', 'CUST01', 'CUST01', 'P')",
                    [],
                )
                .unwrap();
        }
        queue.enqueue("0001234", "OP01").unwrap();
        assert_eq!(queue.run_pending_once().unwrap(), 1);
        assert_eq!(queue.run_pending_once().unwrap(), 0);

        let status: String = conn
            .lock()
            .unwrap()
            .query_row("SELECT status FROM close_task", [], |row| row.get(0))
            .unwrap();
        assert_eq!(status, "COMPLETED");
    }

    #[test]
    fn test_duplicate_tasks_are_idempotent() {
        let (conn, queue) = setup();
        {
            let guard = conn.lock().unwrap();
            guard
                .execute(
                    "INSERT INTO inbound_batch (batch_id, customer_code, owner_code, scan_status) VALUES ('0001234', 'CUST01', 'CUST01', 'P')",
                    [],
                )
                .unwrap();
        }
        // 多收货员并发关闭同批次: 两个任务，第二个由已发运/已整算保护兜底
        queue.enqueue("0001234", "OP01").unwrap();
        queue.enqueue("0001234", "OP02").unwrap();
        assert_eq!(queue.run_pending_once().unwrap(), 2);

        let completed: i64 = conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT count(*) FROM close_task WHERE status='COMPLETED'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(completed, 2);
    }
}

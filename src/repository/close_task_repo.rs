// ==========================================
// 冷链仓储入库收货系统 - 批次结算任务仓储
// ==========================================
// 职责: 结算任务队列的持久化 (至少一次投递)
// 约束: 重复投递由结算引擎的已发运保护兜底
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::repository::error::{RepositoryError, RepositoryResult};

/// 结算任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTaskStatus {
    /// 等待中
    Pending,
    /// 执行中
    Running,
    /// 已完成
    Completed,
    /// 失败
    Failed,
}

impl CloseTaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseTaskStatus::Pending => "PENDING",
            CloseTaskStatus::Running => "RUNNING",
            CloseTaskStatus::Completed => "COMPLETED",
            CloseTaskStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => CloseTaskStatus::Pending,
            "RUNNING" => CloseTaskStatus::Running,
            "COMPLETED" => CloseTaskStatus::Completed,
            _ => CloseTaskStatus::Failed,
        }
    }
}

/// 结算任务
#[derive(Debug, Clone)]
pub struct CloseTask {
    pub task_id: String,
    pub batch_id: String,
    pub operator_id: String,
    pub status: CloseTaskStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
}

pub struct CloseTaskRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CloseTaskRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<CloseTask> {
        Ok(CloseTask {
            task_id: row.get("task_id")?,
            batch_id: row.get("batch_id")?,
            operator_id: row.get("operator_id")?,
            status: CloseTaskStatus::parse(&row.get::<_, String>("status")?),
            retry_count: row.get("retry_count")?,
            max_retries: row.get("max_retries")?,
            error_message: row.get("error_message")?,
        })
    }

    /// 入队新任务
    pub fn enqueue(
        &self,
        batch_id: &str,
        operator_id: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<String> {
        let task_id = Uuid::new_v4().to_string();
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO close_task (task_id, batch_id, operator_id, status, created_at)
               VALUES (?1, ?2, ?3, 'PENDING', ?4)"#,
            params![task_id, batch_id, operator_id, fmt_dt(now)],
        )?;
        Ok(task_id)
    }

    /// 取最早的待执行任务并标记执行中
    pub fn claim_next(&self, now: NaiveDateTime) -> RepositoryResult<Option<CloseTask>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let task = tx
            .query_row(
                "SELECT * FROM close_task WHERE status = 'PENDING' ORDER BY created_at LIMIT 1",
                [],
                Self::map_row,
            )
            .optional()?;
        if let Some(ref t) = task {
            tx.execute(
                "UPDATE close_task SET status = 'RUNNING', started_at = ?2 WHERE task_id = ?1",
                params![t.task_id, fmt_dt(now)],
            )?;
        }
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(task)
    }

    /// 标记完成
    pub fn mark_completed(&self, task_id: &str, now: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE close_task SET status = 'COMPLETED', completed_at = ?2 WHERE task_id = ?1",
            params![task_id, fmt_dt(now)],
        )?;
        Ok(())
    }

    /// 标记失败; 未达重试上限时回到待执行
    pub fn mark_failed(
        &self,
        task_id: &str,
        error: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<CloseTaskStatus> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"UPDATE close_task SET
                   retry_count = retry_count + 1,
                   error_message = ?2,
                   completed_at = ?3,
                   status = CASE WHEN retry_count + 1 < max_retries THEN 'PENDING' ELSE 'FAILED' END
               WHERE task_id = ?1"#,
            params![task_id, error, fmt_dt(now)],
        )?;
        let status: String = conn.query_row(
            "SELECT status FROM close_task WHERE task_id = ?1",
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(CloseTaskStatus::parse(&status))
    }

    /// 待执行任务数
    pub fn pending_count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT count(*) FROM close_task WHERE status = 'PENDING'",
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

fn fmt_dt(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

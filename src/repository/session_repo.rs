// ==========================================
// 冷链仓储入库收货系统 - 会话存储
// ==========================================
// 按 (操作员, 命名空间) 存储 JSON 负载;
// 收货会话存于 RECEIVING 命名空间，其他模块各用各的命名空间
// ==========================================

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::session::ReceivingSession;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::SESSION_NAMESPACE;

/// 会话存储接口
///
/// 分发器只通过该接口读写会话
pub trait SessionStore: Send + Sync {
    /// 读取收货会话
    fn get(&self, operator_id: &str) -> RepositoryResult<Option<ReceivingSession>>;

    /// 写入收货会话
    fn put(&self, operator_id: &str, session: &ReceivingSession) -> RepositoryResult<()>;

    /// 删除收货会话
    fn delete(&self, operator_id: &str) -> RepositoryResult<()>;

    /// 删除操作员的某个命名空间 (跨模块上下文清理)
    fn delete_namespace(&self, operator_id: &str, namespace: &str) -> RepositoryResult<()>;

    /// 写入操作员的某个命名空间 (跨模块上下文传递)
    fn put_namespace(
        &self,
        operator_id: &str,
        namespace: &str,
        payload: &serde_json::Value,
    ) -> RepositoryResult<()>;

    /// 命名空间是否存在
    fn has_namespace(&self, operator_id: &str, namespace: &str) -> RepositoryResult<bool>;
}

// ==========================================
// SqliteSessionStore - SQLite 会话存储
// ==========================================
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn write_payload(
        &self,
        operator_id: &str,
        namespace: &str,
        payload: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO session_state (operator_id, namespace, payload, updated_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT (operator_id, namespace) DO UPDATE SET payload = ?3, updated_at = ?4"#,
            params![operator_id, namespace, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn get(&self, operator_id: &str) -> RepositoryResult<Option<ReceivingSession>> {
        let conn = self.get_conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM session_state WHERE operator_id = ?1 AND namespace = ?2",
                params![operator_id, SESSION_NAMESPACE],
                |row| row.get(0),
            )
            .optional()?;
        drop(conn);

        match payload {
            Some(raw) => {
                let session: ReceivingSession = serde_json::from_str(&raw)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn put(&self, operator_id: &str, session: &ReceivingSession) -> RepositoryResult<()> {
        let payload = serde_json::to_string(session)?;
        self.write_payload(operator_id, SESSION_NAMESPACE, &payload)
    }

    fn delete(&self, operator_id: &str) -> RepositoryResult<()> {
        self.delete_namespace(operator_id, SESSION_NAMESPACE)
    }

    fn delete_namespace(&self, operator_id: &str, namespace: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM session_state WHERE operator_id = ?1 AND namespace = ?2",
            params![operator_id, namespace],
        )?;
        Ok(())
    }

    fn put_namespace(
        &self,
        operator_id: &str,
        namespace: &str,
        payload: &serde_json::Value,
    ) -> RepositoryResult<()> {
        self.write_payload(operator_id, namespace, &payload.to_string())
    }

    fn has_namespace(&self, operator_id: &str, namespace: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM session_state WHERE operator_id = ?1 AND namespace = ?2",
                params![operator_id, namespace],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ReceivingStep;

    fn setup() -> SqliteSessionStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        SqliteSessionStore::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = setup();
        assert!(store.get("OP01").unwrap().is_none());

        let mut session = ReceivingSession::new("OP01");
        session.current_step = ReceivingStep::Pallet;
        session.batch_id = "0001234".to_string();
        store.put("OP01", &session).unwrap();

        let loaded = store.get("OP01").unwrap().unwrap();
        assert_eq!(loaded.current_step, ReceivingStep::Pallet);
        assert_eq!(loaded.batch_id, "0001234");
    }

    #[test]
    fn test_delete_and_namespaces() {
        let store = setup();
        let session = ReceivingSession::new("OP01");
        store.put("OP01", &session).unwrap();
        store
            .put_namespace("OP01", "PALLET_MERGE", &serde_json::json!({"step": "PALLET"}))
            .unwrap();

        assert!(store.has_namespace("OP01", "PALLET_MERGE").unwrap());
        store.delete_namespace("OP01", "PALLET_MERGE").unwrap();
        assert!(!store.has_namespace("OP01", "PALLET_MERGE").unwrap());

        store.delete("OP01").unwrap();
        assert!(store.get("OP01").unwrap().is_none());
    }
}

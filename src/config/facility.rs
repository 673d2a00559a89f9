// ==========================================
// 冷链仓储入库收货系统 - 库区配置
// ==========================================
// 职责: 从 config_kv 表加载库区配置，装配后只读
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 库区配置
///
/// 一次加载，随 FacilityContext 注入各组件，之后只读
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    /// 本地时区相对 UTC 的分钟偏移
    pub utc_offset_minutes: i32,

    /// 是否允许多收货员同时收一个批次
    pub allow_multiple_receivers: bool,

    /// 是否启用快速收货（入库直连出库批次）
    pub quick_batch: bool,

    /// 日期显示是否使用国际格式
    pub international_date: bool,

    /// 是否启用上托盘复制（同品复制上一托盘字段）
    pub copy_forward_enabled: bool,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 480, // 东八区
            allow_multiple_receivers: false,
            quick_batch: false,
            international_date: false,
            copy_forward_enabled: false,
        }
    }
}

/// 库区上下文
///
/// 持有配置与当前时间访问；时间统一取库区本地时间
pub struct FacilityContext {
    config: FacilityConfig,
    offset: FixedOffset,
}

impl FacilityContext {
    pub fn new(config: FacilityConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self { config, offset }
    }

    /// 从 config_kv 表加载（scope_id='global'，缺失项取默认值）
    pub fn load(conn: &Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        let guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut config = FacilityConfig::default();

        if let Some(v) = read_value(&guard, "utc_offset_minutes")? {
            config.utc_offset_minutes = v.parse().unwrap_or(config.utc_offset_minutes);
        }
        if let Some(v) = read_value(&guard, "allow_multiple_receivers")? {
            config.allow_multiple_receivers = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = read_value(&guard, "quick_batch")? {
            config.quick_batch = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = read_value(&guard, "international_date")? {
            config.international_date = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = read_value(&guard, "copy_forward_enabled")? {
            config.copy_forward_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        drop(guard);

        Ok(Self::new(config))
    }

    pub fn config(&self) -> &FacilityConfig {
        &self.config
    }

    /// 库区本地当前时间
    pub fn now(&self) -> NaiveDateTime {
        let utc: DateTime<Utc> = Utc::now();
        utc.with_timezone(&self.offset).naive_local()
    }

    /// 库区本地当前日期
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<String>, Box<dyn Error>> {
    let v = conn
        .query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_load_defaults_when_empty() {
        let conn = setup();
        let ctx = FacilityContext::load(&conn).unwrap();
        assert!(!ctx.config().allow_multiple_receivers);
        assert_eq!(ctx.config().utc_offset_minutes, 480);
    }

    #[test]
    fn test_load_overrides() {
        let conn = setup();
        {
            let guard = conn.lock().unwrap();
            guard
                .execute(
                    "INSERT INTO config_kv (scope_id, key, value) VALUES ('global','allow_multiple_receivers','1'), ('global','utc_offset_minutes','0')",
                    [],
                )
                .unwrap();
        }
        let ctx = FacilityContext::load(&conn).unwrap();
        assert!(ctx.config().allow_multiple_receivers);
        assert_eq!(ctx.config().utc_offset_minutes, 0);
    }
}

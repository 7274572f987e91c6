//! SeaORM 直连后端
//!
//! 表结构由外部系统维护，这里不做迁移，也没有实体定义。
//! 所有列统一 `CAST(.. AS TEXT)` 读取，在 Rust 侧解析，
//! 这样 SQLite 与 PostgreSQL 的列类型差异不会影响结果。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, FromQueryResult,
    Statement,
};
use serde_json::Value;
use tracing::{debug, error};

use crate::config::DatastoreConfig;
use crate::errors::{FunnelError, Result};
use crate::storage::FunnelStore;
use crate::storage::models::{
    CodeInputEvent, CodeOpen, ContactRecord, ContactTable, FieldsFilledSnapshot, RawSubmission,
    RowId, Table,
};
use crate::utils::TimeParser;

/// SQL 方言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
}

impl SqlDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::Postgres => "postgres",
        }
    }
}

/// 从数据库 URL 推断方言
pub fn infer_dialect_from_url(database_url: &str) -> Result<SqlDialect> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok(SqlDialect::Sqlite)
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
    {
        Ok(SqlDialect::Postgres)
    } else {
        Err(FunnelError::datastore_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, postgres://",
            database_url
        )))
    }
}

// ============ 查询结果类型 ============

#[derive(Debug, FromQueryResult)]
struct ContactRow {
    code: Option<String>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct OpenRow {
    code: Option<String>,
    opened_at: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct InputEventRow {
    id: Option<String>,
    code: Option<String>,
    field_name: Option<String>,
    input_value: Option<String>,
    changed_at: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct FieldsFilledRow {
    id: Option<String>,
    code: Option<String>,
    filled_at: Option<String>,
    field_snapshot: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct SubmissionRow {
    id: Option<String>,
    code: Option<String>,
    submitted_at: Option<String>,
    submission_snapshot: Option<String>,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    from_zip: Option<String>,
    to_zip: Option<String>,
    move_date: Option<String>,
    move_size: Option<String>,
    has_discount: Option<String>,
}

const CONTACT_COLUMNS: &[&str] = &["code", "name", "email", "phone"];
const OPEN_COLUMNS: &[&str] = &["code", "opened_at"];
const INPUT_EVENT_COLUMNS: &[&str] = &["id", "code", "field_name", "input_value", "changed_at"];
const FIELDS_FILLED_COLUMNS: &[&str] = &["id", "code", "filled_at", "field_snapshot"];
const SUBMISSION_COLUMNS: &[&str] = &[
    "id",
    "code",
    "submitted_at",
    "submission_snapshot",
    "name",
    "email",
    "phone",
    "from_zip",
    "to_zip",
    "move_date",
    "move_size",
    "has_discount",
];

/// 生成只读查询，事件表按时间戳倒序
fn select_sql(table: Table, columns: &[&str]) -> String {
    let projection = columns
        .iter()
        .map(|c| format!("CAST({c} AS TEXT) AS {c}"))
        .collect::<Vec<_>>()
        .join(", ");

    let name = table.name();
    match table.newest_first_column() {
        Some(column) => format!(
            "SELECT {} FROM {} ORDER BY {}.{} DESC",
            projection, name, name, column
        ),
        None => format!("SELECT {} FROM {}", projection, name),
    }
}

// ============ 列值转换 ============

fn timestamp_column(table: Table, column: &str, raw: Option<String>) -> Result<DateTime<Utc>> {
    let raw = raw.unwrap_or_default();
    TimeParser::parse_timestamp(&raw).ok_or_else(|| {
        FunnelError::serialization(format!(
            "{}.{}: unrecognized timestamp '{}'",
            table, column, raw
        ))
    })
}

fn id_column(raw: Option<String>) -> RowId {
    RowId::from_text(raw.unwrap_or_default())
}

/// JSON 文本列：能解析则返回解析结果，否则保留原文
fn json_column(raw: Option<String>) -> Value {
    match raw {
        Some(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        None => Value::Null,
    }
}

fn bool_column(raw: Option<String>) -> Option<Value> {
    raw.map(|text| match text.trim().to_lowercase().as_str() {
        "true" | "t" | "1" => Value::Bool(true),
        "false" | "f" | "0" => Value::Bool(false),
        _ => Value::String(text),
    })
}

pub struct SqlStore {
    db: DatabaseConnection,
    dialect: SqlDialect,
}

impl SqlStore {
    /// 按 URL 连接数据库
    pub async fn connect(database_url: &str, config: &DatastoreConfig) -> Result<Self> {
        if database_url.trim().is_empty() {
            return Err(FunnelError::datastore_config("datastore.url is empty"));
        }

        let dialect = infer_dialect_from_url(database_url)?;
        let db = match dialect {
            SqlDialect::Sqlite => connect_sqlite(database_url).await?,
            SqlDialect::Postgres => connect_postgres(database_url, config).await?,
        };

        debug!("{} datastore connected", dialect.as_str().to_uppercase());
        Ok(Self { db, dialect })
    }

    /// 复用已有连接（测试中使用）
    pub fn from_connection(db: DatabaseConnection) -> Result<Self> {
        let dialect = match db.get_database_backend() {
            DbBackend::Sqlite => SqlDialect::Sqlite,
            DbBackend::Postgres => SqlDialect::Postgres,
            other => {
                return Err(FunnelError::datastore_config(format!(
                    "Unsupported database backend: {:?}",
                    other
                )));
            }
        };
        Ok(Self { db, dialect })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    async fn query<T: FromQueryResult>(&self, table: Table, columns: &[&str]) -> Result<Vec<T>> {
        let stmt = Statement::from_string(self.db.get_database_backend(), select_sql(table, columns));
        T::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to read table {}: {}", table, e);
                FunnelError::datastore_query(format!("{}: {}", table, e))
            })
    }
}

/// 只读连接 SQLite，文件不存在时报错而不是创建
async fn connect_sqlite(database_url: &str) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::SqlitePool;
    use sea_orm::sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    let opt = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| FunnelError::datastore_config(format!("Invalid SQLite URL: {}", e)))?
        .create_if_missing(false)
        .read_only(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePool::connect_with(opt).await.map_err(|e| {
        FunnelError::datastore_connection(format!("Cannot open SQLite database: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

async fn connect_postgres(
    database_url: &str,
    config: &DatastoreConfig,
) -> Result<DatabaseConnection> {
    let timeout = std::time::Duration::from_secs(config.timeout_secs.max(1));
    let pool_size = config.pool_size.max(1);

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool_size)
        .min_connections(pool_size.min(2))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(std::time::Duration::from_secs(300))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        FunnelError::datastore_connection(format!("Cannot connect to PostgreSQL: {}", e))
    })
}

#[async_trait]
impl FunnelStore for SqlStore {
    async fn contacts(&self, table: ContactTable) -> Result<Vec<ContactRecord>> {
        let rows: Vec<ContactRow> = self.query(table.table(), CONTACT_COLUMNS).await?;
        Ok(rows
            .into_iter()
            .map(|r| ContactRecord {
                code: r.code.unwrap_or_default(),
                name: r.name,
                email: r.email,
                phone: r.phone,
            })
            .collect())
    }

    async fn code_opens(&self) -> Result<Vec<CodeOpen>> {
        let table = Table::CodeOpens;
        let rows: Vec<OpenRow> = self.query(table, OPEN_COLUMNS).await?;
        rows.into_iter()
            .map(|r| {
                Ok(CodeOpen {
                    code: r.code.unwrap_or_default(),
                    opened_at: timestamp_column(table, "opened_at", r.opened_at)?,
                })
            })
            .collect()
    }

    async fn input_events(&self) -> Result<Vec<CodeInputEvent>> {
        let table = Table::CodeInputEvents;
        let rows: Vec<InputEventRow> = self.query(table, INPUT_EVENT_COLUMNS).await?;
        rows.into_iter()
            .map(|r| {
                Ok(CodeInputEvent {
                    id: id_column(r.id),
                    code: r.code.unwrap_or_default(),
                    field_name: r.field_name.unwrap_or_default(),
                    input_value: r.input_value,
                    changed_at: timestamp_column(table, "changed_at", r.changed_at)?,
                })
            })
            .collect()
    }

    async fn fields_filled(&self) -> Result<Vec<FieldsFilledSnapshot>> {
        let table = Table::CodeAllFieldsFilled;
        let rows: Vec<FieldsFilledRow> = self.query(table, FIELDS_FILLED_COLUMNS).await?;
        rows.into_iter()
            .map(|r| {
                Ok(FieldsFilledSnapshot {
                    id: id_column(r.id),
                    code: r.code.unwrap_or_default(),
                    filled_at: timestamp_column(table, "filled_at", r.filled_at)?,
                    field_snapshot: json_column(r.field_snapshot),
                })
            })
            .collect()
    }

    async fn form_submissions(&self) -> Result<Vec<RawSubmission>> {
        let table = Table::FormSubmissions;
        let rows: Vec<SubmissionRow> = self.query(table, SUBMISSION_COLUMNS).await?;
        rows.into_iter()
            .map(|r| {
                Ok(RawSubmission {
                    id: id_column(r.id),
                    code: r.code.unwrap_or_default(),
                    submitted_at: timestamp_column(table, "submitted_at", r.submitted_at)?,
                    // 保留原文，由 enrichment 统一解析
                    submission_snapshot: r.submission_snapshot.map(Value::String),
                    name: r.name,
                    email: r.email,
                    phone: r.phone,
                    from_zip: r.from_zip.map(Value::String),
                    to_zip: r.to_zip.map(Value::String),
                    move_date: r.move_date.map(Value::String),
                    move_size: r.move_size.map(Value::String),
                    has_discount: bool_column(r.has_discount),
                })
            })
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        self.dialect.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_dialect_from_url() {
        assert_eq!(
            infer_dialect_from_url("sqlite://funnel.db").unwrap(),
            SqlDialect::Sqlite
        );
        assert_eq!(infer_dialect_from_url("data/funnel.sqlite").unwrap(), SqlDialect::Sqlite);
        assert_eq!(
            infer_dialect_from_url("postgresql://u:p@localhost/db").unwrap(),
            SqlDialect::Postgres
        );
        assert!(infer_dialect_from_url("mysql://localhost/db").is_err());
    }

    #[test]
    fn test_select_sql_orders_event_tables() {
        assert_eq!(
            select_sql(Table::CodeOpens, OPEN_COLUMNS),
            "SELECT CAST(code AS TEXT) AS code, CAST(opened_at AS TEXT) AS opened_at \
             FROM code_opens ORDER BY code_opens.opened_at DESC"
        );
        assert!(!select_sql(Table::Discount, CONTACT_COLUMNS).contains("ORDER BY"));
    }

    #[test]
    fn test_column_conversions() {
        assert_eq!(json_column(Some(r#"{"a":1}"#.to_string())), json!({"a": 1}));
        assert_eq!(json_column(Some("oops".to_string())), json!("oops"));
        assert_eq!(json_column(None), Value::Null);

        assert_eq!(bool_column(Some("1".to_string())), Some(json!(true)));
        assert_eq!(bool_column(Some("false".to_string())), Some(json!(false)));
        assert_eq!(bool_column(Some("maybe".to_string())), Some(json!("maybe")));
        assert_eq!(bool_column(None), None);
    }

    #[test]
    fn test_timestamp_column_reports_table() {
        let err = timestamp_column(Table::CodeOpens, "opened_at", None).unwrap_err();
        assert!(err.message().starts_with("code_opens.opened_at"));
    }
}

//! 数据源后端
//!
//! - `postgrest`: 托管数据库的 REST 接口（`<url>/rest/v1/<table>`），ureq 同步客户端
//! - `sql`: 通过 SeaORM 直连 SQLite / PostgreSQL，只读查询

mod postgrest;
mod sql;

pub use postgrest::PostgrestStore;
pub use sql::{SqlDialect, SqlStore, infer_dialect_from_url};

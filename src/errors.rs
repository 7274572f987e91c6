use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum FunnelError {
    DatastoreConfig(String),
    DatastoreConnection(String),
    DatastoreQuery(String),
    Serialization(String),
    Validation(String),
    DateParse(String),
    Internal(String),
}

impl FunnelError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            FunnelError::DatastoreConfig(_) => "E001",
            FunnelError::DatastoreConnection(_) => "E002",
            FunnelError::DatastoreQuery(_) => "E003",
            FunnelError::Serialization(_) => "E004",
            FunnelError::Validation(_) => "E005",
            FunnelError::DateParse(_) => "E006",
            FunnelError::Internal(_) => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            FunnelError::DatastoreConfig(_) => "Datastore Configuration Error",
            FunnelError::DatastoreConnection(_) => "Datastore Connection Error",
            FunnelError::DatastoreQuery(_) => "Datastore Query Error",
            FunnelError::Serialization(_) => "Serialization Error",
            FunnelError::Validation(_) => "Validation Error",
            FunnelError::DateParse(_) => "Date Parse Error",
            FunnelError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            FunnelError::DatastoreConfig(msg)
            | FunnelError::DatastoreConnection(msg)
            | FunnelError::DatastoreQuery(msg)
            | FunnelError::Serialization(msg)
            | FunnelError::Validation(msg)
            | FunnelError::DateParse(msg)
            | FunnelError::Internal(msg) => msg,
        }
    }

    /// HTTP 状态码映射：调用方输入错误为 400，其余均为 500
    pub fn http_status(&self) -> StatusCode {
        match self {
            FunnelError::Validation(_) | FunnelError::DateParse(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for FunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for FunnelError {}

// 便捷的构造函数
impl FunnelError {
    pub fn datastore_config<T: Into<String>>(msg: T) -> Self {
        FunnelError::DatastoreConfig(msg.into())
    }

    pub fn datastore_connection<T: Into<String>>(msg: T) -> Self {
        FunnelError::DatastoreConnection(msg.into())
    }

    pub fn datastore_query<T: Into<String>>(msg: T) -> Self {
        FunnelError::DatastoreQuery(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        FunnelError::Serialization(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        FunnelError::Validation(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        FunnelError::DateParse(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        FunnelError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for FunnelError {
    fn from(err: sea_orm::DbErr) -> Self {
        FunnelError::DatastoreQuery(err.to_string())
    }
}

impl From<std::io::Error> for FunnelError {
    fn from(err: std::io::Error) -> Self {
        FunnelError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for FunnelError {
    fn from(err: serde_json::Error) -> Self {
        FunnelError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for FunnelError {
    fn from(err: chrono::ParseError) -> Self {
        FunnelError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FunnelError>;

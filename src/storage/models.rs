//! 数据源中的六类记录
//!
//! 所有记录均由外部系统写入，这里只读。`code` 是跨表的关联键，
//! 但在事件表中并不唯一。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::AsRefStr;

use crate::utils::time_parser::{deserialize_nullable_string, deserialize_timestamp};

/// 数据源中的表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Discount,
    Referral,
    CodeOpens,
    CodeInputEvents,
    CodeAllFieldsFilled,
    FormSubmissions,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Discount => "discount",
            Table::Referral => "referral",
            Table::CodeOpens => "code_opens",
            Table::CodeInputEvents => "code_input_events",
            Table::CodeAllFieldsFilled => "code_all_fields_filled",
            Table::FormSubmissions => "form_submissions",
        }
    }

    /// 读取的列（REST select 语法）
    pub fn columns(&self) -> &'static str {
        match self {
            Table::Discount | Table::Referral => "code,name,email,phone",
            Table::CodeOpens => "code,opened_at",
            Table::CodeInputEvents => "id,code,field_name,input_value,changed_at",
            Table::CodeAllFieldsFilled => "id,code,filled_at,field_snapshot",
            // 提交表的列随部署不同而变化
            Table::FormSubmissions => "*",
        }
    }

    /// 事件表按自身时间戳倒序读取
    pub fn newest_first_column(&self) -> Option<&'static str> {
        match self {
            Table::Discount | Table::Referral => None,
            Table::CodeOpens => Some("opened_at"),
            Table::CodeInputEvents => Some("changed_at"),
            Table::CodeAllFieldsFilled => Some("filled_at"),
            Table::FormSubmissions => Some("submitted_at"),
        }
    }

    /// 分页读取时的完整排序（REST order 语法）
    ///
    /// OFFSET 分页要求全序，时间戳相同的行再按唯一列排序。
    pub fn page_order(&self) -> &'static str {
        match self {
            Table::Discount | Table::Referral => "code.asc",
            Table::CodeOpens => "opened_at.desc,code.asc",
            Table::CodeInputEvents => "changed_at.desc,id.desc",
            Table::CodeAllFieldsFilled => "filled_at.desc,id.desc",
            Table::FormSubmissions => "submitted_at.desc,id.desc",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 联系人表（discount / referral）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactTable {
    Discount,
    Referral,
}

impl ContactTable {
    pub fn table(&self) -> Table {
        match self {
            ContactTable::Discount => Table::Discount,
            ContactTable::Referral => Table::Referral,
        }
    }
}

/// 行主键：整数或文本（uuid），对本系统不透明
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl RowId {
    /// 从 SQL 文本列还原
    pub fn from_text(raw: String) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(RowId::Int)
            .unwrap_or(RowId::Text(raw))
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{}", id),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

/// 以 code 为关联键的记录
pub trait CodeKeyed {
    fn code(&self) -> &str;
}

/// 带事件时间戳的记录
pub trait Timestamped: CodeKeyed {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl<T: CodeKeyed + ?Sized> CodeKeyed for &T {
    fn code(&self) -> &str {
        (**self).code()
    }
}

impl<T: Timestamped + ?Sized> Timestamped for &T {
    fn timestamp(&self) -> DateTime<Utc> {
        (**self).timestamp()
    }
}

/// discount / referral 表中的联系人记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// code 落地页的一次打开
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeOpen {
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub code: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub opened_at: DateTime<Utc>,
}

/// 单个表单字段的一次变更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeInputEvent {
    pub id: RowId,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub code: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub field_name: String,
    #[serde(default)]
    pub input_value: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub changed_at: DateTime<Utc>,
}

/// 所有必填字段均已填写时的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldsFilledSnapshot {
    pub id: RowId,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub code: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub filled_at: DateTime<Utc>,
    #[serde(default)]
    pub field_snapshot: Value,
}

/// form_submissions 表中的原始行
///
/// `submission_snapshot` 可能是 JSON 对象，也可能是序列化后的 JSON 字符串。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSubmission {
    pub id: RowId,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub code: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub submission_snapshot: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub from_zip: Option<Value>,
    #[serde(default)]
    pub to_zip: Option<Value>,
    #[serde(default)]
    pub move_date: Option<Value>,
    #[serde(default)]
    pub move_size: Option<Value>,
    #[serde(default)]
    pub has_discount: Option<Value>,
}

impl CodeKeyed for ContactRecord {
    fn code(&self) -> &str {
        &self.code
    }
}

impl CodeKeyed for CodeOpen {
    fn code(&self) -> &str {
        &self.code
    }
}

impl CodeKeyed for CodeInputEvent {
    fn code(&self) -> &str {
        &self.code
    }
}

impl CodeKeyed for FieldsFilledSnapshot {
    fn code(&self) -> &str {
        &self.code
    }
}

impl CodeKeyed for RawSubmission {
    fn code(&self) -> &str {
        &self.code
    }
}

impl Timestamped for CodeOpen {
    fn timestamp(&self) -> DateTime<Utc> {
        self.opened_at
    }
}

impl Timestamped for CodeInputEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.changed_at
    }
}

impl Timestamped for FieldsFilledSnapshot {
    fn timestamp(&self) -> DateTime<Utc> {
        self.filled_at
    }
}

impl Timestamped for RawSubmission {
    fn timestamp(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

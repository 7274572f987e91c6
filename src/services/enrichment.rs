//! code → 联系人 关联
//!
//! 联系人只在 discount / referral 两张表中有权威记录。
//! 每个请求用本次读取到的两张表构建一份不可变的 [`ContactDirectory`]，
//! 再把 name / email / phone / source 附加到事件行上。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::storage::models::{CodeKeyed, ContactRecord, RawSubmission, RowId};
use crate::utils::non_empty;

/// 缺失字段的默认值
pub const UNKNOWN: &str = "Unknown";
/// 提交记录在目录中找不到 code 时的 source
pub const SUBMISSION_SOURCE: &str = "submission";

/// 联系人来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactSource {
    Discount,
    Referral,
}

impl ContactSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactSource::Discount => "discount",
            ContactSource::Referral => "referral",
        }
    }
}

/// 目录中的一条联系人，空串已归一化为 None
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: ContactSource,
}

impl ContactEntry {
    fn from_record(record: &ContactRecord, source: ContactSource) -> Self {
        let owned = |v: &Option<String>| non_empty(v.as_deref()).map(String::from);
        Self {
            name: owned(&record.name),
            email: owned(&record.email),
            phone: owned(&record.phone),
            source,
        }
    }
}

/// code → 联系人
#[derive(Debug, Clone, Default)]
pub struct ContactDirectory {
    entries: HashMap<String, ContactEntry>,
}

impl ContactDirectory {
    /// 先插入 discount，再插入 referral；同一 code 以后插入者为准
    pub fn build(discounts: &[ContactRecord], referrals: &[ContactRecord]) -> Self {
        let mut entries = HashMap::with_capacity(discounts.len() + referrals.len());

        let tagged = discounts
            .iter()
            .map(|r| (r, ContactSource::Discount))
            .chain(referrals.iter().map(|r| (r, ContactSource::Referral)));

        for (record, source) in tagged {
            entries.insert(record.code.clone(), ContactEntry::from_record(record, source));
        }

        Self { entries }
    }

    pub fn get(&self, code: &str) -> Option<&ContactEntry> {
        self.entries.get(code)
    }

    /// 事件行使用的联系人字段：缺失一律为 "Unknown"
    pub fn contact_fields(&self, code: &str) -> ContactFields {
        match self.get(code) {
            Some(entry) => ContactFields {
                name: entry.name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                email: entry.email.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                phone: entry.phone.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                source: entry.source.as_str().to_string(),
            },
            None => ContactFields::unknown(),
        }
    }
}

/// 附加到每一行上的四个字段，均非空
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub source: String,
}

impl ContactFields {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            email: UNKNOWN.to_string(),
            phone: UNKNOWN.to_string(),
            source: UNKNOWN.to_string(),
        }
    }
}

/// 原始行 + 联系人字段，序列化时平铺为同一个对象
#[derive(Debug, Clone, Serialize)]
pub struct Enriched<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(flatten)]
    pub contact: ContactFields,
}

/// opens / input events / fields-filled 共用
pub fn enrich_rows<T>(rows: Vec<T>, directory: &ContactDirectory) -> Vec<Enriched<T>>
where
    T: CodeKeyed,
{
    rows.into_iter()
        .map(|record| {
            let contact = directory.contact_fields(record.code());
            Enriched { record, contact }
        })
        .collect()
}

/// 对外返回的提交记录
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedSubmission {
    pub id: RowId,
    pub code: String,
    pub submitted_at: DateTime<Utc>,
    pub submission_data: Map<String, Value>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub source: String,
}

pub fn enrich_submissions(
    rows: Vec<RawSubmission>,
    directory: &ContactDirectory,
) -> Vec<EnrichedSubmission> {
    rows.into_iter()
        .map(|row| enrich_submission(row, directory))
        .collect()
}

fn enrich_submission(row: RawSubmission, directory: &ContactDirectory) -> EnrichedSubmission {
    let submission_data = submission_data(&row);
    let entry = directory.get(&row.code);

    // 目录 > 行自身的列 > Unknown
    let pick = |from_directory: Option<&String>, own: &Option<String>| {
        from_directory
            .map(String::as_str)
            .or_else(|| non_empty(own.as_deref()))
            .unwrap_or(UNKNOWN)
            .to_string()
    };

    let name = pick(entry.and_then(|e| e.name.as_ref()), &row.name);
    let email = pick(entry.and_then(|e| e.email.as_ref()), &row.email);
    let phone = pick(entry.and_then(|e| e.phone.as_ref()), &row.phone);
    let source = entry
        .map(|e| e.source.as_str())
        .unwrap_or(SUBMISSION_SOURCE)
        .to_string();

    EnrichedSubmission {
        id: row.id,
        code: row.code,
        submitted_at: row.submitted_at,
        submission_data,
        name,
        email,
        phone,
        source,
    }
}

/// 解析快照，再把直接列合并上去（直接列优先，缺失写 null）
pub fn submission_data(row: &RawSubmission) -> Map<String, Value> {
    let mut data = parse_snapshot(&row.id, row.submission_snapshot.as_ref());

    let text = |v: &Option<String>| v.clone().map(Value::String).unwrap_or(Value::Null);
    let value = |v: &Option<Value>| v.clone().unwrap_or(Value::Null);

    data.insert("name".to_string(), text(&row.name));
    data.insert("email".to_string(), text(&row.email));
    data.insert("phone".to_string(), text(&row.phone));
    data.insert("from_zip".to_string(), value(&row.from_zip));
    data.insert("to_zip".to_string(), value(&row.to_zip));
    data.insert("move_date".to_string(), value(&row.move_date));
    data.insert("move_size".to_string(), value(&row.move_size));
    data.insert("has_discount".to_string(), value(&row.has_discount));

    data
}

fn parse_snapshot(id: &RowId, snapshot: Option<&Value>) -> Map<String, Value> {
    match snapshot {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("submission {}: snapshot is not a JSON object, ignored", id);
                Map::new()
            }
            Err(e) => {
                warn!("submission {}: malformed snapshot JSON ({}), ignored", id, e);
                Map::new()
            }
        },
        Some(_) => {
            warn!("submission {}: snapshot is not a JSON object, ignored", id);
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact(code: &str, name: &str) -> ContactRecord {
        ContactRecord {
            code: code.to_string(),
            name: Some(name.to_string()),
            email: None,
            phone: Some(String::new()),
        }
    }

    #[test]
    fn test_contact_fields_default_to_unknown() {
        let dir = ContactDirectory::build(&[contact("A", "Ann")], &[]);
        let fields = dir.contact_fields("A");
        assert_eq!(fields.name, "Ann");
        assert_eq!(fields.email, UNKNOWN);
        // 空串视为缺失
        assert_eq!(fields.phone, UNKNOWN);
        assert_eq!(fields.source, "discount");

        assert_eq!(dir.contact_fields("missing"), ContactFields::unknown());
    }

    #[test]
    fn test_parse_snapshot_variants() {
        let id = RowId::Int(1);
        assert_eq!(
            parse_snapshot(&id, Some(&json!({"full_name": "Ann"}))),
            json!({"full_name": "Ann"}).as_object().cloned().unwrap()
        );
        assert_eq!(
            parse_snapshot(&id, Some(&json!("{\"phone_number\":\"555\"}")))["phone_number"],
            json!("555")
        );
        assert!(parse_snapshot(&id, Some(&json!("{not json"))).is_empty());
        assert!(parse_snapshot(&id, Some(&json!("[1,2]"))).is_empty());
        assert!(parse_snapshot(&id, Some(&json!(42))).is_empty());
        assert!(parse_snapshot(&id, Some(&json!(""))).is_empty());
        assert!(parse_snapshot(&id, None).is_empty());
    }

    #[test]
    fn test_enriched_serializes_flat() {
        let dir = ContactDirectory::default();
        let rows = enrich_rows(
            vec![crate::storage::models::CodeOpen {
                code: "A".to_string(),
                opened_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            }],
            &dir,
        );
        let value = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(value["code"], json!("A"));
        assert_eq!(value["source"], json!(UNKNOWN));
        assert!(value.get("record").is_none());
    }
}

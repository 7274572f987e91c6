//! 看板视图
//!
//! 输入是一次并发读取得到的六个数据集（每个都可能单独失败），
//! 输出是指标、完成率、按天序列和各表的显示行。纯函数，不做 IO。

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::enrichment::submission_data;
use super::filter::{DashboardFilter, DashboardQuery, TextFilter};
use super::funnel::{
    CodeActivity, CompletionRate, DaySeries, FunnelRates, completion_rate, count_recent,
    day_series, top_active_codes, unique_codes,
};
use crate::config::DashboardConfig;
use crate::errors::Result;
use crate::storage::models::{
    CodeInputEvent, CodeOpen, ContactRecord, FieldsFilledSnapshot, RawSubmission, RowId,
};
use crate::utils::{TimeParser, non_empty};

/// 单个数据集的读取结果；失败时为空并带上错误信息
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    pub rows: Vec<T>,
    pub error: Option<String>,
}

impl<T> Dataset<T> {
    pub fn ok(rows: Vec<T>) -> Self {
        Self { rows, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn from_result(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(rows) => Self::ok(rows),
            Err(e) => Self::failed(e.message()),
        }
    }
}

impl<T> Default for Dataset<T> {
    fn default() -> Self {
        Self::ok(Vec::new())
    }
}

/// 一次请求读取到的全部数据
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub discounts: Dataset<ContactRecord>,
    pub referrals: Dataset<ContactRecord>,
    pub opens: Dataset<CodeOpen>,
    pub input_events: Dataset<CodeInputEvent>,
    pub fields_filled: Dataset<FieldsFilledSnapshot>,
    pub submissions: Dataset<RawSubmission>,
}

/// 计算参数
#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    pub offset: FixedOffset,
    pub row_limit: usize,
    pub top_codes: usize,
    pub recent_window: Duration,
}

impl DashboardSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            offset: TimeParser::offset_from_minutes(config.utc_offset_minutes),
            row_limit: config.row_limit,
            top_codes: config.top_codes,
            recent_window: Duration::hours(config.recent_window_hours.max(0)),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}

// ============ 联系人映射 ============

/// 看板中显示的联系人，字段可缺失
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl DisplayContact {
    fn overwrite_with(&mut self, other: DisplayContact) {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.email.is_some() {
            self.email = other.email;
        }
        if other.phone.is_some() {
            self.phone = other.phone;
        }
    }

    fn fill_missing(&mut self, other: DisplayContact) {
        if self.name.is_none() {
            self.name = other.name;
        }
        if self.email.is_none() {
            self.email = other.email;
        }
        if self.phone.is_none() {
            self.phone = other.phone;
        }
    }

    fn from_record(record: &ContactRecord) -> Self {
        let owned = |v: &Option<String>| non_empty(v.as_deref()).map(String::from);
        Self {
            name: owned(&record.name),
            email: owned(&record.email),
            phone: owned(&record.phone),
        }
    }

    /// 提交数据中的联系人：name / full_name，email，phone / phone_number
    fn from_submission_data(data: &Map<String, Value>) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| non_empty(data.get(*k).and_then(Value::as_str)))
                .map(String::from)
        };
        Self {
            name: text(&["name", "full_name"]),
            email: text(&["email"]),
            phone: text(&["phone", "phone_number"]),
        }
    }
}

/// discount → referral（非空值覆盖）→ 提交数据（只补缺失字段）
pub fn build_contact_map(
    discounts: &[ContactRecord],
    referrals: &[ContactRecord],
    submissions: &[(String, Map<String, Value>)],
) -> HashMap<String, DisplayContact> {
    let mut map: HashMap<String, DisplayContact> = HashMap::new();

    for record in discounts.iter().chain(referrals) {
        map.entry(record.code.clone())
            .or_default()
            .overwrite_with(DisplayContact::from_record(record));
    }

    for (code, data) in submissions {
        map.entry(code.clone())
            .or_default()
            .fill_missing(DisplayContact::from_submission_data(data));
    }

    map
}

// ============ 输出 ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub unique_codes: usize,
    pub total_opens: usize,
    pub total_input_events: usize,
    pub total_fields_filled: usize,
    pub total_submissions: usize,
    pub total_discounts: usize,
    pub total_referrals: usize,
    #[serde(flatten)]
    pub rates: FunnelRates,
    pub recent_opens: usize,
    pub top_codes: Vec<CodeActivity>,
}

/// 一张显示表：`total` 为过滤后、截断前的行数
#[derive(Debug, Clone, Serialize)]
pub struct TableView<T> {
    pub rows: Vec<T>,
    pub total: usize,
    pub error: Option<String>,
}

impl<T> TableView<T> {
    fn build<I>(matching: I, limit: usize, error: Option<String>) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut rows = Vec::new();
        let mut total = 0;
        for row in matching {
            if total < limit {
                rows.push(row);
            }
            total += 1;
        }
        Self { rows, total, error }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenRow {
    pub code: String,
    pub opened_at: DateTime<Utc>,
    #[serde(flatten)]
    pub contact: DisplayContact,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputEventRow {
    pub id: RowId,
    pub code: String,
    pub field_name: String,
    pub input_value: Option<String>,
    pub changed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub contact: DisplayContact,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionRow {
    pub id: RowId,
    pub code: String,
    pub submitted_at: DateTime<Utc>,
    pub submission_data: Map<String, Value>,
    #[serde(flatten)]
    pub contact: DisplayContact,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTables {
    pub opens: TableView<OpenRow>,
    pub input_events: TableView<InputEventRow>,
    pub submissions: TableView<SubmissionRow>,
    pub discounts: TableView<ContactRecord>,
    pub referrals: TableView<ContactRecord>,
}

/// 各数据集的读取错误，没有错误的不出现
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opens: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_events: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_filled: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submissions: Option<String>,
}

impl DatasetErrors {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub utc_offset_minutes: i32,
    pub filters: DashboardQuery,
    pub metrics: DashboardMetrics,
    pub completion: CompletionRate,
    pub series: DaySeries,
    pub tables: DashboardTables,
    pub errors: DatasetErrors,
}

/// 由快照、过滤条件和当前时间计算看板
pub fn build_dashboard(
    snapshot: &DashboardSnapshot,
    query: &DashboardQuery,
    filter: &DashboardFilter,
    settings: &DashboardSettings,
    now: DateTime<Utc>,
) -> DashboardView {
    let limit = query.limit.unwrap_or(settings.row_limit);

    // 全局过滤（日期 + code）
    let opens: Vec<&CodeOpen> = snapshot
        .opens
        .rows
        .iter()
        .filter(|o| filter.matches_global(&o.code, o.opened_at))
        .collect();
    let events: Vec<&CodeInputEvent> = snapshot
        .input_events
        .rows
        .iter()
        .filter(|e| filter.matches_global(&e.code, e.changed_at))
        .collect();
    let filled_count = snapshot
        .fields_filled
        .rows
        .iter()
        .filter(|f| filter.matches_global(&f.code, f.filled_at))
        .count();
    let subs: Vec<&RawSubmission> = snapshot
        .submissions
        .rows
        .iter()
        .filter(|s| filter.matches_global(&s.code, s.submitted_at))
        .collect();
    let discounts: Vec<&ContactRecord> = snapshot
        .discounts
        .rows
        .iter()
        .filter(|d| filter.code.matches(&d.code))
        .collect();
    let referrals: Vec<&ContactRecord> = snapshot
        .referrals
        .rows
        .iter()
        .filter(|r| filter.code.matches(&r.code))
        .collect();

    // 联系人映射基于未过滤的数据
    let submission_blobs: Vec<(String, Map<String, Value>)> = snapshot
        .submissions
        .rows
        .iter()
        .map(|s| (s.code.clone(), submission_data(s)))
        .collect();
    let contacts = build_contact_map(
        &snapshot.discounts.rows,
        &snapshot.referrals.rows,
        &submission_blobs,
    );
    let contact_of = |code: &str| contacts.get(code).cloned().unwrap_or_default();

    let metrics = DashboardMetrics {
        unique_codes: unique_codes(&opens),
        total_opens: opens.len(),
        total_input_events: events.len(),
        total_fields_filled: filled_count,
        total_submissions: subs.len(),
        total_discounts: discounts.len(),
        total_referrals: referrals.len(),
        rates: FunnelRates::from_counts(opens.len(), filled_count, subs.len()),
        // 不受过滤条件影响
        recent_opens: count_recent(&snapshot.opens.rows, now, settings.recent_window),
        top_codes: top_active_codes(&events, settings.top_codes),
    };

    let tables = DashboardTables {
        opens: TableView::build(
            opens.iter().filter_map(|o| {
                let contact = contact_of(&o.code);
                matches_contact(&filter.opens, &o.code, &contact, &[]).then(|| OpenRow {
                    code: o.code.clone(),
                    opened_at: o.opened_at,
                    contact,
                })
            }),
            limit,
            snapshot.opens.error.clone(),
        ),
        input_events: TableView::build(
            events.iter().filter_map(|e| {
                let contact = contact_of(&e.code);
                let extra = [Some(e.field_name.as_str()), e.input_value.as_deref()];
                matches_contact(&filter.events, &e.code, &contact, &extra).then(|| {
                    InputEventRow {
                        id: e.id.clone(),
                        code: e.code.clone(),
                        field_name: e.field_name.clone(),
                        input_value: e.input_value.clone(),
                        changed_at: e.changed_at,
                        contact,
                    }
                })
            }),
            limit,
            snapshot.input_events.error.clone(),
        ),
        submissions: TableView::build(
            subs.iter().filter_map(|s| {
                let data = submission_data(s);
                let mut contact = contact_of(&s.code);
                contact.fill_missing(DisplayContact::from_submission_data(&data));
                matches_contact(&filter.submissions, &s.code, &contact, &[]).then(|| {
                    SubmissionRow {
                        id: s.id.clone(),
                        code: s.code.clone(),
                        submitted_at: s.submitted_at,
                        submission_data: data,
                        contact,
                    }
                })
            }),
            limit,
            snapshot.submissions.error.clone(),
        ),
        discounts: TableView::build(
            discounts
                .iter()
                .filter(|d| matches_record(&filter.discounts, d))
                .map(|d| (*d).clone()),
            limit,
            snapshot.discounts.error.clone(),
        ),
        referrals: TableView::build(
            referrals
                .iter()
                .filter(|r| matches_record(&filter.referrals, r))
                .map(|r| (*r).clone()),
            limit,
            snapshot.referrals.error.clone(),
        ),
    };

    DashboardView {
        generated_at: now,
        utc_offset_minutes: settings.offset.local_minus_utc() / 60,
        filters: query.clone(),
        completion: completion_rate(&opens, &subs),
        series: day_series(&opens, &subs, settings.offset),
        metrics,
        tables,
        errors: DatasetErrors {
            discounts: snapshot.discounts.error.clone(),
            referrals: snapshot.referrals.error.clone(),
            opens: snapshot.opens.error.clone(),
            input_events: snapshot.input_events.error.clone(),
            fields_filled: snapshot.fields_filled.error.clone(),
            submissions: snapshot.submissions.error.clone(),
        },
    }
}

fn matches_contact(
    filter: &TextFilter,
    code: &str,
    contact: &DisplayContact,
    extra: &[Option<&str>],
) -> bool {
    filter.matches_any(
        [
            Some(code),
            contact.name.as_deref(),
            contact.email.as_deref(),
            contact.phone.as_deref(),
        ]
        .into_iter()
        .chain(extra.iter().copied()),
    )
}

fn matches_record(filter: &TextFilter, record: &ContactRecord) -> bool {
    filter.matches_any([
        Some(record.code.as_str()),
        record.name.as_deref(),
        record.email.as_deref(),
        record.phone.as_deref(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(code: &str, name: Option<&str>, email: Option<&str>) -> ContactRecord {
        ContactRecord {
            code: code.to_string(),
            name: name.map(String::from),
            email: email.map(String::from),
            phone: None,
        }
    }

    #[test]
    fn test_contact_map_precedence() {
        let blob = json!({"full_name": "Blob Name", "email": "blob@x.io", "phone_number": "555"});
        let map = build_contact_map(
            &[record("A", Some("Disc"), Some("disc@x.io"))],
            &[record("A", Some("Ref"), None)],
            &[("A".to_string(), blob.as_object().cloned().unwrap())],
        );
        let a = &map["A"];
        assert_eq!(a.name.as_deref(), Some("Ref"));
        // referral 的空值不会覆盖 discount
        assert_eq!(a.email.as_deref(), Some("disc@x.io"));
        // 只有缺失字段由提交数据补全
        assert_eq!(a.phone.as_deref(), Some("555"));
    }

    #[test]
    fn test_submission_data_contact_prefers_name_over_full_name() {
        let data = json!({"name": null, "full_name": "Ann", "phone": "", "phone_number": "1"});
        let contact = DisplayContact::from_submission_data(data.as_object().unwrap());
        assert_eq!(contact.name.as_deref(), Some("Ann"));
        assert_eq!(contact.phone.as_deref(), Some("1"));
        assert_eq!(contact.email, None);
    }

    #[test]
    fn test_table_view_counts_before_truncation() {
        let view = TableView::build(0..7, 3, None);
        assert_eq!(view.rows, vec![0, 1, 2]);
        assert_eq!(view.total, 7);
    }

    #[test]
    fn test_dataset_from_result() {
        let failed: Dataset<CodeOpen> =
            Dataset::from_result(Err(crate::errors::FunnelError::datastore_query("boom")));
        assert!(failed.rows.is_empty());
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}

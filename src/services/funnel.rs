//! 漏斗指标
//!
//! Open → Fields Filled → Submission。所有函数都是纯函数。

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

use crate::storage::models::{CodeKeyed, ContactRecord, Timestamped};
use crate::utils::TimeParser;

/// 一位小数的百分比；分母为 0 时为 "0.0"
pub fn format_percent(numerator: usize, denominator: usize) -> String {
    format_ratio(numerator as f64 * 100.0, denominator)
}

/// 一位小数的比值；分母为 0 时为 "0.0"
pub fn format_ratio(numerator: f64, denominator: usize) -> String {
    if denominator == 0 {
        return "0.0".to_string();
    }
    // 一位小数，x.x5 向上进位
    let rounded = (numerator / denominator as f64 * 10.0).round() / 10.0;
    format!("{:.1}", rounded)
}

/// 事件级转化率
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelRates {
    pub open_to_filled_rate: String,
    pub filled_to_submit_rate: String,
}

impl FunnelRates {
    pub fn from_counts(opens: usize, filled: usize, submissions: usize) -> Self {
        Self {
            open_to_filled_rate: format_percent(filled, opens),
            filled_to_submit_rate: format_percent(submissions, filled),
        }
    }
}

/// 按 code 去重的完成率：|opened ∩ submitted| / |opened|
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRate {
    pub opened_codes_count: usize,
    pub success_codes_count: usize,
    pub rate_percent: String,
}

pub fn completion_rate<O, S>(opens: &[O], submissions: &[S]) -> CompletionRate
where
    O: CodeKeyed,
    S: CodeKeyed,
{
    let opened: HashSet<&str> = opens.iter().map(CodeKeyed::code).collect();
    let submitted: HashSet<&str> = submissions.iter().map(CodeKeyed::code).collect();
    let success = opened.intersection(&submitted).count();

    CompletionRate {
        opened_codes_count: opened.len(),
        success_codes_count: success,
        rate_percent: format_percent(success, opened.len()),
    }
}

/// 活跃 code 及其输入事件数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeActivity {
    pub code: String,
    pub count: usize,
}

/// 按输入事件数取前 N 个 code；计数相同时保持首次出现的顺序
pub fn top_active_codes<T: CodeKeyed>(events: &[T], n: usize) -> Vec<CodeActivity> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<CodeActivity> = Vec::new();

    for event in events {
        let code = event.code();
        match index.get(code) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(code, counts.len());
                counts.push(CodeActivity {
                    code: code.to_string(),
                    count: 1,
                });
            }
        }
    }

    // sort_by 是稳定排序
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts
}

/// 单日计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub value: usize,
}

/// 按本地日期分组的 opens / submissions 序列，日期为两者并集并补零
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaySeries {
    pub days: Vec<String>,
    pub opens: Vec<DayCount>,
    pub submissions: Vec<DayCount>,
}

pub fn bucket_by_day<T: Timestamped>(rows: &[T], offset: FixedOffset) -> BTreeMap<String, usize> {
    let mut buckets = BTreeMap::new();
    for row in rows {
        *buckets
            .entry(TimeParser::day_key(row.timestamp(), offset))
            .or_insert(0) += 1;
    }
    buckets
}

pub fn day_series<O, S>(opens: &[O], submissions: &[S], offset: FixedOffset) -> DaySeries
where
    O: Timestamped,
    S: Timestamped,
{
    let open_days = bucket_by_day(opens, offset);
    let submission_days = bucket_by_day(submissions, offset);

    // YYYY-MM-DD 零填充，字典序即时间序
    let days: BTreeSet<&String> = open_days.keys().chain(submission_days.keys()).collect();

    let series = |buckets: &BTreeMap<String, usize>| {
        days.iter()
            .map(|day| DayCount {
                day: (*day).clone(),
                value: buckets.get(*day).copied().unwrap_or(0),
            })
            .collect::<Vec<_>>()
    };

    DaySeries {
        opens: series(&open_days),
        submissions: series(&submission_days),
        days: days.iter().map(|d| (*d).clone()).collect(),
    }
}

/// 最近窗口内的打开次数：`now - t < window`
pub fn count_recent<T: Timestamped>(rows: &[T], now: DateTime<Utc>, window: Duration) -> usize {
    rows.iter()
        .filter(|row| now.signed_duration_since(row.timestamp()) < window)
        .count()
}

/// 不同 code 的数量
pub fn unique_codes<T: CodeKeyed>(rows: &[T]) -> usize {
    rows.iter().map(CodeKeyed::code).collect::<HashSet<_>>().len()
}

// ============ /analytics ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTotals {
    pub total_generated_codes: usize,
    pub total_discount_codes: usize,
    pub total_referral_codes: usize,
    pub total_unique_opens: usize,
    pub total_opens_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConversions {
    pub discount_opens: usize,
    pub referral_opens: usize,
    pub discount_conversion_rate: String,
    pub referral_conversion_rate: String,
    pub overall_conversion_rate: String,
    pub opens_per_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub totals: AnalyticsTotals,
    pub conversions: AnalyticsConversions,
}

/// 汇总 discount / referral 的生成数与打开情况
pub fn analytics_summary<O: CodeKeyed>(
    discounts: &[ContactRecord],
    referrals: &[ContactRecord],
    opens: &[O],
) -> AnalyticsSummary {
    let opened: HashSet<&str> = opens.iter().map(CodeKeyed::code).collect();
    let distinct_opened = |records: &[ContactRecord]| {
        records
            .iter()
            .map(|r| r.code.as_str())
            .filter(|code| opened.contains(code))
            .collect::<HashSet<_>>()
            .len()
    };

    let discount_opens = distinct_opened(discounts);
    let referral_opens = distinct_opened(referrals);
    let total_generated = discounts.len() + referrals.len();
    let unique_opens = opened.len();
    let total_opens = opens.len();

    AnalyticsSummary {
        totals: AnalyticsTotals {
            total_generated_codes: total_generated,
            total_discount_codes: discounts.len(),
            total_referral_codes: referrals.len(),
            total_unique_opens: unique_opens,
            total_opens_count: total_opens,
        },
        conversions: AnalyticsConversions {
            discount_opens,
            referral_opens,
            discount_conversion_rate: format!(
                "{}%",
                format_percent(discount_opens, discounts.len())
            ),
            referral_conversion_rate: format!(
                "{}%",
                format_percent(referral_opens, referrals.len())
            ),
            overall_conversion_rate: format!(
                "{}%",
                format_percent(unique_opens, total_generated)
            ),
            opens_per_code: format_ratio(total_opens as f64, unique_opens),
        },
    }
}

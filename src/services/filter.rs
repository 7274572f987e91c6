//! 看板过滤条件
//!
//! 过滤只作用于内存中的完整快照，不会下推到数据源。

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FunnelError, Result};
use crate::utils::{TimeParser, contains_lowercase, non_empty};

/// 日期区间：起点为 `from` 当天 00:00:00.000，终点包含 `to` 当天 23:59:59.999，
/// 均按配置的本地偏移计算。任一端可缺省。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<DateTime<Utc>>,
    /// 次日 00:00，不包含
    end_exclusive: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// 解析 YYYY-MM-DD；空串视为缺省。`from > to` 合法，结果为空集。
    pub fn parse(from: Option<&str>, to: Option<&str>, offset: FixedOffset) -> Result<Self> {
        let from = non_empty(from).map(|s| parse_bound("from", s)).transpose()?;
        let to = non_empty(to).map(|s| parse_bound("to", s)).transpose()?;
        Self::from_days(from, to, offset)
    }

    pub fn from_days(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        offset: FixedOffset,
    ) -> Result<Self> {
        let start = from
            .map(|day| local_midnight(day, offset))
            .transpose()?;
        let end_exclusive = to
            .map(|day| {
                let next = day
                    .checked_add_signed(Duration::days(1))
                    .ok_or_else(|| FunnelError::date_parse(format!("date out of range: {}", day)))?;
                local_midnight(next, offset)
            })
            .transpose()?;

        Ok(Self {
            start,
            end_exclusive,
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| ts >= start)
            && self.end_exclusive.is_none_or(|end| ts < end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end_exclusive.is_none()
    }
}

fn parse_bound(label: &str, raw: &str) -> Result<NaiveDate> {
    TimeParser::parse_day(raw).map_err(|e| {
        FunnelError::date_parse(format!(
            "Invalid '{}' date '{}': {} (expected YYYY-MM-DD)",
            label, raw, e
        ))
    })
}

fn local_midnight(day: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    TimeParser::start_of_day(day, offset)
        .ok_or_else(|| FunnelError::date_parse(format!("date out of range: {}", day)))
}

/// code 子串查询（大小写不敏感）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeQuery(Option<String>);

impl CodeQuery {
    pub fn new(raw: Option<&str>) -> Self {
        Self(non_empty(raw).map(|s| s.trim().to_lowercase()))
    }

    pub fn matches(&self, code: &str) -> bool {
        match &self.0 {
            Some(needle) => contains_lowercase(code, needle),
            None => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

/// 单张表的自由文本过滤（去空白、大小写不敏感）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFilter(Option<String>);

impl TextFilter {
    pub fn new(raw: Option<&str>) -> Self {
        Self(non_empty(raw).map(|s| s.trim().to_lowercase()))
    }

    /// 任一字段包含即命中；未设置时总是命中
    pub fn matches_any<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        match &self.0 {
            Some(needle) => fields
                .into_iter()
                .flatten()
                .any(|field| contains_lowercase(field, needle)),
            None => true,
        }
    }
}

/// HTTP / CLI 传入的原始过滤参数
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub code: Option<String>,
    pub opens_filter: Option<String>,
    pub events_filter: Option<String>,
    pub subs_filter: Option<String>,
    pub discount_filter: Option<String>,
    pub referral_filter: Option<String>,
    /// 每张表的显示行数，缺省使用配置值
    pub limit: Option<usize>,
}

/// 解析后的过滤条件
#[derive(Debug, Clone, Default)]
pub struct DashboardFilter {
    pub range: DateRange,
    pub code: CodeQuery,
    pub opens: TextFilter,
    pub events: TextFilter,
    pub submissions: TextFilter,
    pub discounts: TextFilter,
    pub referrals: TextFilter,
}

impl DashboardFilter {
    pub fn from_query(query: &DashboardQuery, offset: FixedOffset) -> Result<Self> {
        Ok(Self {
            range: DateRange::parse(query.from.as_deref(), query.to.as_deref(), offset)?,
            code: CodeQuery::new(query.code.as_deref()),
            opens: TextFilter::new(query.opens_filter.as_deref()),
            events: TextFilter::new(query.events_filter.as_deref()),
            submissions: TextFilter::new(query.subs_filter.as_deref()),
            discounts: TextFilter::new(query.discount_filter.as_deref()),
            referrals: TextFilter::new(query.referral_filter.as_deref()),
        })
    }

    /// 全局过滤：日期 + code
    pub fn matches_global(&self, code: &str, ts: DateTime<Utc>) -> bool {
        self.range.contains(ts) && self.code.matches(code)
    }
}

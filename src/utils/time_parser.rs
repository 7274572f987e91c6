use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

/// 时间解析与格式化工具
pub struct TimeParser;

/// 带时区偏移的文本格式（PostgreSQL 的 timestamptz 文本输出即为此类）
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// 无时区信息的格式，按 UTC 处理
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl TimeParser {
    /// 解析数据源返回的时间戳，支持：
    /// - RFC3339：2024-01-01T23:59:00Z / 2024-01-01T23:59:00.123+08:00
    /// - PostgreSQL 文本：2024-01-01 23:59:00.123456+00
    /// - 无时区：2024-01-01 23:59:00（视为 UTC）
    pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(dt.with_timezone(&Utc));
        }

        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(input, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }

        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
                return Some(naive.and_utc());
            }
        }

        None
    }

    /// 解析 YYYY-MM-DD 日期
    pub fn parse_day(input: &str) -> Result<NaiveDate, chrono::ParseError> {
        NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
    }

    /// 由分钟数构造固定时区偏移，超出范围时退回 UTC
    pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
        FixedOffset::east_opt(minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// 本地日期键（零填充 YYYY-MM-DD）
    pub fn day_key(ts: DateTime<Utc>, offset: FixedOffset) -> String {
        ts.with_timezone(&offset).format("%Y-%m-%d").to_string()
    }

    /// 本地某天 00:00:00.000 对应的 UTC 时刻
    pub fn start_of_day(day: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
        let midnight = day.and_hms_opt(0, 0, 0)?;
        offset
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// 格式化运行时长为人类可读格式
    pub fn format_duration_human(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let duration = end.signed_duration_since(start).max(Duration::zero());
        let days = duration.num_days();
        let hours = duration.num_hours() % 24;
        let minutes = duration.num_minutes() % 60;
        let seconds = duration.num_seconds() % 60;

        if days > 0 {
            format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
        } else if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

/// serde 辅助：宽松解析时间戳字段
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    TimeParser::parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: '{}'", raw)))
}

/// serde 辅助：null 或缺失的字符串视为空串
pub fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

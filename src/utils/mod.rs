pub mod time_parser;

pub use time_parser::TimeParser;

/// 空白字符串视为缺失
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// 大小写不敏感的子串匹配，needle 需预先转为小写
pub fn contains_lowercase(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

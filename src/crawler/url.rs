//! 爬取地址工具

use once_cell::sync::Lazy;
use regex::Regex;

// 可选协议 + 至少含一个点的主机名 + 合法 URL 字符
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:http(s)?://)?[\w.-]+(?:\.[\w.-]+)+[\w\-._~:/?#\[\]@!$&'()*+,;=]+$").unwrap()
});

/// 粗略校验地址格式
pub fn validate_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

/// 去掉末尾斜杠，作为访问集合的键
pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

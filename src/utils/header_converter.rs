//! Header格式转换工具
//! 响应头 -> 小写键多值表，Set-Cookie -> Cookie 表

use std::collections::HashMap;
use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

/// Header转换工具
pub struct HeaderConverter;

impl HeaderConverter {
    /// 将HeaderMap转换为HashMap<String, Vec<String>>，键统一小写
    pub fn to_hashmap(header_map: &HeaderMap) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();

        for (key, value) in header_map.iter() {
            let value_str = String::from_utf8_lossy(value.as_bytes()).into_owned();
            map.entry(key.as_str().to_lowercase())
                .or_default()
                .push(value_str);
        }

        debug!("Header转换完成，生成{}条记录", map.len());
        map
    }

    /// 从所有 Set-Cookie 头中提取 Cookie（名称小写，取每个头的第一个键值对）
    pub fn cookies(header_map: &HeaderMap) -> HashMap<String, String> {
        header_map
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(Self::parse_set_cookie)
            .collect()
    }

    /// 解析单个 Set-Cookie 值的 `name=value` 部分
    pub fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
        let first = raw.split(';').next()?.trim();
        let (name, value) = first.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name.to_lowercase(), value.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_to_hashmap_lowercases_and_keeps_all_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-powered-by", HeaderValue::from_static("PHP/8.2"));
        headers.append("vary", HeaderValue::from_static("Accept"));
        headers.append("vary", HeaderValue::from_static("Cookie"));

        let map = HeaderConverter::to_hashmap(&headers);
        assert_eq!(map["x-powered-by"], vec!["PHP/8.2"]);
        assert_eq!(map["vary"], vec!["Accept", "Cookie"]);
    }

    #[test]
    fn test_cookies_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("PHPSESSID=abc123; path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("_ga=GA1.2.3"));
        headers.append(SET_COOKIE, HeaderValue::from_static("broken"));

        let cookies = HeaderConverter::cookies(&headers);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies["phpsessid"], "abc123");
        assert_eq!(cookies["_ga"], "GA1.2.3");
    }
}

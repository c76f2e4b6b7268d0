//! 站内链接提取
//! 从 `body a[href]` 中提取同主机链接，解析相对地址，去掉查询串、锚点和末尾斜杠

use scraper::{Html, Selector};
use url::{Position, Url};

/// 站内链接提取器
pub struct LinkExtractor;

impl LinkExtractor {
    /// 提取页面中的同主机链接（按出现顺序去重）
    pub fn extract(html: &str, page_url: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        let Ok(selector) = Selector::parse("body a[href]") else {
            return Vec::new();
        };

        let mut links: Vec<String> = Vec::new();
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(link) = Self::resolve(href, page_url) {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
        links
    }

    /// 解析单个 href；跨主机、非 http(s) 或无法解析的链接返回 None
    ///
    /// 同主机的判定只比较主机名与显式写出的端口，协议不同（http/https）仍视为同站。
    pub fn resolve(href: &str, page_url: &Url) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }

        let resolved = page_url.join(href).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }
        if resolved.host_str() != page_url.host_str() || resolved.port() != page_url.port() {
            return None;
        }

        Some(Self::normalize(&resolved))
    }

    /// `scheme://host[:port]/path`，去掉末尾斜杠
    pub fn normalize(url: &Url) -> String {
        format!(
            "{}://{}{}",
            url.scheme(),
            &url[Position::BeforeHost..Position::AfterPort],
            url.path().trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/blog/post/").unwrap()
    }

    #[test]
    fn test_resolve_relative_forms() {
        let page = page();
        assert_eq!(
            LinkExtractor::resolve("/about/", &page).as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(
            LinkExtractor::resolve("next?page=2#top", &page).as_deref(),
            Some("https://example.com/blog/post/next")
        );
        assert_eq!(
            LinkExtractor::resolve("//example.com/contact", &page).as_deref(),
            Some("https://example.com/contact")
        );
        assert_eq!(
            LinkExtractor::resolve("https://example.com/", &page).as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_discard_foreign_links() {
        let page = page();
        assert_eq!(LinkExtractor::resolve("https://other.com/x", &page), None);
        assert_eq!(LinkExtractor::resolve("https://example.com:8443/x", &page), None);
        assert_eq!(LinkExtractor::resolve("mailto:me@example.com", &page), None);
        assert_eq!(LinkExtractor::resolve("javascript:void(0)", &page), None);
        assert_eq!(LinkExtractor::resolve("  ", &page), None);
    }

    #[test]
    fn test_other_scheme_on_same_host_is_kept() {
        let page = Url::parse("http://example.com/").unwrap();
        assert_eq!(
            LinkExtractor::resolve("https://example.com/login/", &page).as_deref(),
            Some("https://example.com/login")
        );
        assert_eq!(
            LinkExtractor::resolve("https://example.com", &page).as_deref(),
            Some("https://example.com")
        );
        assert_eq!(LinkExtractor::resolve("https://example.com:8443/", &page), None);
    }

    #[test]
    fn test_extract_from_body() {
        let html = r#"
            <html><head><link href="/style.css"></head>
            <body>
              <a href="/a">A</a>
              <a href="/a/">A again</a>
              <a href="https://cdn.other.net/lib.js">cdn</a>
              <a href="b">B</a>
              <a>no href</a>
            </body></html>
        "#;
        let page = Url::parse("http://example.com:8080/").unwrap();

        assert_eq!(
            LinkExtractor::extract(html, &page),
            vec!["http://example.com:8080/a", "http://example.com:8080/b"]
        );
    }
}

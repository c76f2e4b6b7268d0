//! 抓取模块：页面抓取抽象与后端实现
//! 引擎只依赖 `Fetcher` trait；HTTP 后端用于真实站点，内存后端用于测试与嵌入
pub mod cert;
pub mod dns;
pub mod http;
pub mod memory;
pub mod robots;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::GlobalConfig;
use crate::error::{RswResult, RswapcrawlError};
use crate::extractor::HtmlExtractor;
use crate::rule::ScrapedUrl;

pub use self::dns::DnsCollector;
pub use self::http::HttpFetcher;
pub use self::memory::MemoryFetcher;
pub use self::robots::RobotsCache;

/// 一次页面抓取得到的全部证据
#[derive(Debug, Clone, Default)]
pub struct ScrapedEvidence {
    /// 最终地址（跟随跳转后）与状态码
    pub url: ScrapedUrl,
    pub html: String,
    /// 响应头，键小写
    pub headers: HashMap<String, Vec<String>>,
    /// Cookie，名称小写
    pub cookies: HashMap<String, String>,
    /// script-src 列表
    pub scripts: Vec<String>,
    /// meta 多值表，键小写
    pub meta: HashMap<String, Vec<String>>,
    /// DNS 记录，键为 NS/MX/TXT/CNAME
    pub dns: HashMap<String, Vec<String>>,
    /// 证书颁发者组织名
    pub cert_issuer: Vec<String>,
}

impl ScrapedEvidence {
    /// 从原始HTML构建证据（状态码 200，scripts/meta 由提取器填充）
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let (scripts, meta) = HtmlExtractor::new().extract(&html).into_parts();
        Self {
            url: ScrapedUrl {
                url: url.into(),
                status: 200,
            },
            html,
            scripts,
            meta,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_dns(mut self, record_type: &str, value: impl Into<String>) -> Self {
        self.dns
            .entry(record_type.to_uppercase())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_cert_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.cert_issuer.push(issuer.into());
        self
    }

    /// 标记为跳转后的最终地址
    pub fn with_final_url(mut self, url: impl Into<String>) -> Self {
        self.url.url = url.into();
        self
    }
}

/// 页面抓取抽象
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 初始化（创建客户端等），失败时整个分析器无法创建
    async fn init(&self) -> RswResult<()>;

    /// 是否能执行页面内 JS
    fn can_render_js(&self) -> bool;

    /// 抓取页面并收集证据
    async fn scrape(&self, url: &str) -> RswResult<ScrapedEvidence>;

    /// 在最近一次抓取的页面中求值属性表达式
    async fn eval_in_page(&self, expression: &str) -> RswResult<Option<Value>>;

    /// 通知当前爬取深度
    fn set_depth(&self, depth: u32);
}

/// 可选的抓取后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherBackend {
    Http,
}

impl FromStr for FetcherBackend {
    type Err = RswapcrawlError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            other => Err(RswapcrawlError::UnknownBackend(other.to_string())),
        }
    }
}

/// 按配置中的后端名称创建抓取器（尚未初始化）
pub fn build_fetcher(config: &GlobalConfig) -> RswResult<Arc<dyn Fetcher>> {
    match config.backend.parse::<FetcherBackend>()? {
        FetcherBackend::Http => Ok(Arc::new(HttpFetcher::new(config.clone()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigManager;

    #[test]
    fn test_backend_selection() {
        assert_eq!("http".parse::<FetcherBackend>().unwrap(), FetcherBackend::Http);
        assert_eq!(" HTTP ".parse::<FetcherBackend>().unwrap(), FetcherBackend::Http);

        let config = ConfigManager::custom().backend("chrome").build();
        let err = build_fetcher(&config).err().unwrap();
        assert!(matches!(err, RswapcrawlError::UnknownBackend(name) if name == "chrome"));
    }

    #[test]
    fn test_evidence_from_html() {
        let evidence = ScrapedEvidence::from_html(
            "https://example.com",
            r#"<meta name="generator" content="TiddlyWiki"><script src="/tw.js"></script>"#,
        )
        .with_header("X-Powered-By", "Express")
        .with_dns("txt", "v=spf1");

        assert_eq!(evidence.url.status, 200);
        assert_eq!(evidence.meta["generator"], vec!["TiddlyWiki"]);
        assert_eq!(evidence.scripts, vec!["/tw.js"]);
        assert_eq!(evidence.headers["x-powered-by"], vec!["Express"]);
        assert_eq!(evidence.dns["TXT"], vec!["v=spf1"]);
    }
}

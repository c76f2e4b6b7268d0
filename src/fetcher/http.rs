//! 纯 HTTP 抓取后端
//! 基于 reqwest 抓取页面，不执行 JS；深层爬取时遵守 robots.txt

use std::sync::atomic::{AtomicU32, Ordering};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::{cert, DnsCollector, Fetcher, RobotsCache, ScrapedEvidence};
use crate::config::GlobalConfig;
use crate::error::{RswResult, RswapcrawlError};
use crate::extractor::HtmlExtractor;
use crate::rule::ScrapedUrl;
use crate::utils::HeaderConverter;

pub struct HttpFetcher {
    config: GlobalConfig,
    client: OnceCell<Client>,
    dns: OnceCell<DnsCollector>,
    robots: RobotsCache,
    depth: AtomicU32,
}

impl HttpFetcher {
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            dns: OnceCell::new(),
            robots: RobotsCache::new(),
            depth: AtomicU32::new(0),
        }
    }

    fn client(&self) -> RswResult<&Client> {
        self.client
            .get()
            .ok_or_else(|| RswapcrawlError::FetchError("HTTP抓取器尚未初始化".to_string()))
    }

    fn build_client(config: &GlobalConfig) -> RswResult<Client> {
        Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout())
            .danger_accept_invalid_certs(true)
            .tls_info(true)
            .build()
            .map_err(|e| RswapcrawlError::FetcherInitError(format!("HTTP客户端创建失败：{}", e)))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn init(&self) -> RswResult<()> {
        info!("初始化HTTP抓取器，超时{}秒，加载超时{}秒", self.config.timeout_secs, self.config.loading_timeout_secs);
        if self.client.get().is_none() {
            let client = Self::build_client(&self.config)?;
            let _ = self.client.set(client);
        }
        if self.config.resolve_dns && self.dns.get().is_none() {
            let _ = self.dns.set(DnsCollector::new());
        }
        Ok(())
    }

    fn can_render_js(&self) -> bool {
        false
    }

    async fn scrape(&self, url: &str) -> RswResult<ScrapedEvidence> {
        let client = self.client()?;
        let requested = Url::parse(url)
            .map_err(|e| RswapcrawlError::InvalidUrl(format!("{}：{}", url, e)))?;

        // 1. 深层页面遵守 robots.txt
        if self.depth.load(Ordering::Relaxed) > 0
            && !self
                .robots
                .allowed(client, &requested, &self.config.user_agent, self.config.timeout())
                .await
        {
            return Err(RswapcrawlError::FetchError(format!("robots.txt 禁止抓取：{}", url)));
        }

        // 2. 发送请求
        let response = tokio::time::timeout(self.config.timeout(), client.get(requested.clone()).send())
            .await
            .map_err(|_| RswapcrawlError::FetchError(format!("请求超时：{}", url)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(RswapcrawlError::FetchError(format!("{} 返回状态码 {}", url, status)));
        }
        let final_url = response.url().clone();
        let headers = HeaderConverter::to_hashmap(response.headers());
        let cookies = HeaderConverter::cookies(response.headers());
        let cert_issuer = cert::response_issuers(&response);

        // 3. 读取页面内容
        let html = tokio::time::timeout(self.config.loading_timeout(), response.text())
            .await
            .map_err(|_| RswapcrawlError::FetchError(format!("页面加载超时：{}", url)))??;
        let (scripts, meta) = HtmlExtractor::new().extract(&html).into_parts();

        // 4. DNS 证据
        let dns = match self.dns.get() {
            Some(collector) => collector.collect(&final_url).await,
            None => Default::default(),
        };

        debug!(
            "抓取完成：{} -> {}，状态码{}，Header{}个，Script{}个，Meta{}个",
            url,
            final_url,
            status.as_u16(),
            headers.len(),
            scripts.len(),
            meta.len()
        );

        Ok(ScrapedEvidence {
            url: ScrapedUrl {
                url: final_url.to_string(),
                status: status.as_u16(),
            },
            html,
            headers,
            cookies,
            scripts,
            meta,
            dns,
            cert_issuer,
        })
    }

    async fn eval_in_page(&self, expression: &str) -> RswResult<Option<Value>> {
        Err(RswapcrawlError::EvalError(format!("HTTP抓取器不支持执行JS：{}", expression)))
    }

    fn set_depth(&self, depth: u32) {
        self.depth.store(depth, Ordering::Relaxed);
    }
}

//! 内存抓取后端
//! 按 URL 返回预置的证据或错误，可预置 JS 求值结果，供测试与嵌入场景使用

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;
use serde_json::Value;

use super::{Fetcher, ScrapedEvidence};
use crate::error::{RswResult, RswapcrawlError};

#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, Result<ScrapedEvidence, String>>,
    js_values: HashMap<String, Value>,
    render_js: bool,
    depth: AtomicU32,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(url: &str) -> String {
        url.trim_end_matches('/').to_string()
    }

    /// 预置页面证据
    pub fn with_page(mut self, url: &str, evidence: ScrapedEvidence) -> Self {
        self.pages.insert(Self::key(url), Ok(evidence));
        self
    }

    /// 预置页面HTML（状态码 200）
    pub fn with_html(self, url: &str, html: &str) -> Self {
        let evidence = ScrapedEvidence::from_html(url, html);
        self.with_page(url, evidence)
    }

    /// 预置抓取失败
    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.pages.insert(Self::key(url), Err(reason.to_string()));
        self
    }

    /// 预置 JS 属性求值结果
    pub fn with_js(mut self, expression: &str, value: Value) -> Self {
        self.js_values.insert(expression.to_string(), value);
        self
    }

    pub fn with_rendering(mut self, render_js: bool) -> Self {
        self.render_js = render_js;
        self
    }

    /// 最近一次通知的爬取深度
    pub fn last_depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    /// 按顺序记录的抓取请求
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn init(&self) -> RswResult<()> {
        Ok(())
    }

    fn can_render_js(&self) -> bool {
        self.render_js
    }

    async fn scrape(&self, url: &str) -> RswResult<ScrapedEvidence> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        match self.pages.get(&Self::key(url)) {
            Some(Ok(evidence)) => Ok(evidence.clone()),
            Some(Err(reason)) => Err(RswapcrawlError::FetchError(reason.clone())),
            None => Err(RswapcrawlError::FetchError(format!("未预置页面：{}", url))),
        }
    }

    async fn eval_in_page(&self, expression: &str) -> RswResult<Option<Value>> {
        if !self.render_js {
            return Err(RswapcrawlError::EvalError(format!("未开启JS渲染：{}", expression)));
        }
        Ok(self.js_values.get(expression).cloned())
    }

    fn set_depth(&self, depth: u32) {
        self.depth.store(depth, Ordering::Relaxed);
    }
}

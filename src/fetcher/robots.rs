//! robots.txt 缓存与判定
//! 按源站缓存 robots.txt 内容，无法获取时视为全部允许

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use tracing::debug;
use url::{Position, Url};

#[derive(Debug, Default)]
pub struct RobotsCache {
    // 源站 -> robots.txt 内容（None 表示无法获取）
    entries: Mutex<HashMap<String, Option<String>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 判断 user agent 是否允许抓取该地址
    pub async fn allowed(&self, client: &Client, url: &Url, user_agent: &str, timeout: Duration) -> bool {
        let origin = url[..Position::BeforePath].to_string();

        let cached = self
            .entries
            .lock()
            .map(|entries| entries.get(&origin).cloned())
            .unwrap_or(None);
        let content = match cached {
            Some(content) => content,
            None => {
                let content = Self::fetch(client, &origin, timeout).await;
                if let Ok(mut entries) = self.entries.lock() {
                    entries.insert(origin, content.clone());
                }
                content
            }
        };

        match content {
            Some(body) => Self::is_allowed(&body, user_agent, url.as_str()),
            None => true,
        }
    }

    /// 纯判定逻辑
    pub fn is_allowed(robots_body: &str, user_agent: &str, url: &str) -> bool {
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(robots_body, user_agent, url)
    }

    async fn fetch(client: &Client, origin: &str, timeout: Duration) -> Option<String> {
        let robots_url = format!("{}/robots.txt", origin);
        let response = match tokio::time::timeout(timeout, client.get(&robots_url).send()).await {
            Ok(Ok(response)) if response.status().is_success() => response,
            Ok(Ok(response)) => {
                debug!("robots.txt 不可用：{}，状态码：{}", robots_url, response.status());
                return None;
            }
            Ok(Err(e)) => {
                debug!("robots.txt 请求失败：{}，错误：{}", robots_url, e);
                return None;
            }
            Err(_) => {
                debug!("robots.txt 请求超时：{}", robots_url);
                return None;
            }
        };
        match tokio::time::timeout(timeout, response.text()).await {
            Ok(Ok(body)) => Some(body),
            Ok(Err(e)) => {
                debug!("robots.txt 读取失败：{}，错误：{}", robots_url, e);
                None
            }
            Err(_) => {
                debug!("robots.txt 读取超时：{}", robots_url);
                None
            }
        }
    }
}

//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

/// 默认 User-Agent（桌面版 Chrome）
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 指纹规则库路径（technologies.json 格式）
    pub rules_path: PathBuf,
    // 连接/导航超时（单位：秒）
    pub timeout_secs: u64,
    // 页面加载超时（单位：秒）
    pub loading_timeout_secs: u64,
    // 最大爬取深度，0 表示只分析起始页
    pub max_depth: u32,
    // 最多访问的页面数
    pub max_visited_links: u32,
    // 两次请求之间的间隔（单位：毫秒）
    pub delay_ms: u64,
    // 抓取后端名称
    pub backend: String,
    pub user_agent: String,
    // 是否采集 DNS 记录
    pub resolve_dns: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("technologies.json"),
            timeout_secs: 3,
            loading_timeout_secs: 3,
            max_depth: 0,
            max_visited_links: 10,
            delay_ms: 100,
            backend: "http".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            resolve_dns: true,
        }
    }
}

impl GlobalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn loading_timeout(&self) -> Duration {
        Duration::from_secs(self.loading_timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_path = path.into();
        self
    }

    pub fn timeout_secs(mut self, timeout: u64) -> Self {
        self.config.timeout_secs = timeout;
        self
    }

    pub fn loading_timeout_secs(mut self, timeout: u64) -> Self {
        self.config.loading_timeout_secs = timeout;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn max_visited_links(mut self, max: u32) -> Self {
        self.config.max_visited_links = max;
        self
    }

    pub fn delay_ms(mut self, delay: u64) -> Self {
        self.config.delay_ms = delay;
        self
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.config.backend = backend.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn resolve_dns(mut self, resolve: bool) -> Self {
        self.config.resolve_dns = resolve;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ConfigManager::custom()
            .max_depth(2)
            .max_visited_links(3)
            .delay_ms(0)
            .resolve_dns(false)
            .build();

        assert_eq!(config.max_depth, 2);
        assert_eq!(config.max_visited_links, 3);
        assert_eq!(config.delay(), Duration::ZERO);
        assert!(!config.resolve_dns);
        // 未覆盖的字段保持默认值
        assert_eq!(config.backend, "http");
        assert_eq!(config.timeout_secs, 3);
    }
}

//! 站点爬取编排
//! 按深度逐层访问同站页面，受最大深度与最大访问页数约束，检测结果在整次爬取内累积

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::url::{normalize_url, validate_url};
use crate::config::GlobalConfig;
use crate::detector::TechDetector;
use crate::error::{RswResult, RswapcrawlError};
use crate::extractor::LinkExtractor;
use crate::fetcher::{build_fetcher, Fetcher};
use crate::rule::{AnalysisOutput, Catalog, RuleLoader, ScrapedUrl};
use crate::utils::DetectionSet;

/// 地址无效或抓取失败的页面记录的状态码
pub const FAILED_STATUS: u16 = 400;

/// 爬取状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CrawlState {
    Depth(u32),
    Done,
    Failed,
}

/// 站点分析器：持有规则目录与抓取器，可重复调用 `analyze`
pub struct SiteAnalyzer {
    config: GlobalConfig,
    fetcher: Arc<dyn Fetcher>,
    detector: TechDetector,
}

impl SiteAnalyzer {
    /// 按配置创建：选择并初始化抓取后端，加载规则库
    pub async fn new(config: GlobalConfig) -> RswResult<Self> {
        let fetcher = build_fetcher(&config)?;
        fetcher.init().await.map_err(|e| match e {
            RswapcrawlError::FetcherInitError(_) => e,
            other => RswapcrawlError::FetcherInitError(other.to_string()),
        })?;
        let catalog = RuleLoader::load(&config).await?;
        info!("规则库加载完成，共{}个技术", catalog.len());

        Ok(Self::with_parts(Arc::new(catalog), fetcher, config))
    }

    /// 使用现成的目录与（已初始化的）抓取器创建
    pub fn with_parts(catalog: Arc<Catalog>, fetcher: Arc<dyn Fetcher>, config: GlobalConfig) -> Self {
        let detector = TechDetector::new(catalog, Arc::clone(&fetcher));
        Self {
            config,
            fetcher,
            detector,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.detector.catalog()
    }

    /// 分析站点：至少一个页面成功时返回结果，否则返回 `AllPagesFailed`
    pub async fn analyze(&self, url: &str) -> RswResult<AnalysisOutput> {
        CrawlSession::new(self).run(url).await
    }
}

/// 单次 `analyze` 调用的全部可变状态
struct CrawlSession<'a> {
    analyzer: &'a SiteAnalyzer,
    detections: Arc<DetectionSet>,
    // 已访问或已入队的地址
    visit_set: HashSet<String>,
    visited: Vec<ScrapedUrl>,
    visited_count: u32,
    succeeded: bool,
    budget_exhausted: bool,
}

impl<'a> CrawlSession<'a> {
    fn new(analyzer: &'a SiteAnalyzer) -> Self {
        Self {
            analyzer,
            detections: Arc::new(DetectionSet::new()),
            visit_set: HashSet::new(),
            visited: Vec::new(),
            visited_count: 0,
            succeeded: false,
            budget_exhausted: false,
        }
    }

    async fn run(mut self, url: &str) -> RswResult<AnalysisOutput> {
        let max_depth = self.analyzer.config.max_depth;
        let start = normalize_url(url);
        self.visit_set.insert(start.clone());
        let mut level = vec![start];

        let mut state = CrawlState::Depth(0);
        loop {
            state = match state {
                CrawlState::Depth(depth) => {
                    info!("开始爬取第{}层，共{}个地址", depth, level.len());
                    self.analyzer.fetcher.set_depth(depth);
                    let links = self.crawl_level(&level).await;

                    if self.budget_exhausted || depth >= max_depth {
                        self.finish_state()
                    } else {
                        level = self.enqueue(links);
                        if level.is_empty() {
                            self.finish_state()
                        } else {
                            CrawlState::Depth(depth + 1)
                        }
                    }
                }
                CrawlState::Done => {
                    return Ok(AnalysisOutput {
                        urls: self.visited,
                        technologies: self.detections.results(),
                    });
                }
                CrawlState::Failed => return Err(RswapcrawlError::AllPagesFailed),
            };
        }
    }

    fn finish_state(&self) -> CrawlState {
        if self.succeeded {
            CrawlState::Done
        } else {
            CrawlState::Failed
        }
    }

    /// 下一层 = 本层发现的链接 - 访问集合
    fn enqueue(&mut self, links: Vec<String>) -> Vec<String> {
        links
            .into_iter()
            .filter(|link| self.visit_set.insert(link.clone()))
            .collect()
    }

    /// 顺序处理一层地址，返回本层发现的链接（按发现顺序去重）
    async fn crawl_level(&mut self, urls: &[String]) -> Vec<String> {
        let max_visited = self.analyzer.config.max_visited_links;
        let delay = self.analyzer.config.delay();
        let mut discovered: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for url in urls {
            let (visit, links) = self.analyze_page(url).await;
            self.visited.push(visit);
            for link in links {
                if seen.insert(link.clone()) {
                    discovered.push(link);
                }
            }

            self.visited_count += 1;
            if self.visited_count >= max_visited {
                info!("已达到最大访问页数：{}", max_visited);
                self.budget_exhausted = true;
                break;
            }
            tokio::time::sleep(delay).await;
        }

        discovered
    }

    /// 分析单个页面，返回访问记录与站内链接；失败的页面记录为 400
    async fn analyze_page(&mut self, url: &str) -> (ScrapedUrl, Vec<String>) {
        info!("分析页面：{}", url);
        let failed = || ScrapedUrl {
            url: url.to_string(),
            status: FAILED_STATUS,
        };

        if !validate_url(url) {
            warn!("地址无效：{}", url);
            return (failed(), Vec::new());
        }
        let evidence = match self.analyzer.fetcher.scrape(url).await {
            Ok(evidence) => evidence,
            Err(e) => {
                warn!("页面抓取失败：{}，错误：{}", url, e);
                return (failed(), Vec::new());
            }
        };

        // 1. 站内链接
        let links = match Url::parse(url) {
            Ok(page_url) => {
                let mut links = LinkExtractor::extract(&evidence.html, &page_url);
                // 跳转后的最终地址也作为待访问链接（仅限同站）
                let final_url = normalize_url(&evidence.url.url);
                if final_url != normalize_url(url) {
                    debug!("页面发生跳转：{} -> {}", url, final_url);
                    if let Some(redirected) = LinkExtractor::resolve(&final_url, &page_url) {
                        links.push(redirected);
                    }
                }
                links
            }
            Err(e) => {
                debug!("页面地址无法解析，跳过链接提取：{}，错误：{}", url, e);
                Vec::new()
            }
        };

        // 2. 技术检测
        let visit = ScrapedUrl {
            url: url.to_string(),
            status: evidence.url.status,
        };
        self.analyzer
            .detector
            .detect(url, Arc::new(evidence), &self.detections)
            .await;
        self.succeeded = true;

        (visit, links)
    }
}

//! 检测器核心：对单个页面并发执行各通道分析器，汇总到共享结果集
use std::sync::Arc;
use scraper::Html;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::analyzer::{
    CertIssuerAnalyzer, CookieAnalyzer, DnsAnalyzer, DomAnalyzer, HeaderAnalyzer, HtmlAnalyzer,
    JsAnalyzer, MetaAnalyzer, ScriptAnalyzer, UrlAnalyzer,
};
use crate::fetcher::{Fetcher, ScrapedEvidence};
use crate::rule::{Catalog, Technology, TechnologyResult};
use crate::utils::{DetectionSet, ImplicationResolver};

/// 技术检测器
#[derive(Clone)]
pub struct TechDetector {
    catalog: Arc<Catalog>,
    fetcher: Arc<dyn Fetcher>,
}

impl TechDetector {
    /// 创建检测器
    pub fn new(catalog: Arc<Catalog>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { catalog, fetcher }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 分析一个页面，结果写入 `detections`
    ///
    /// 每个技术一个任务执行非 DOM 通道；DOM 通道在当前任务上同步执行
    /// （解析后的文档不能跨线程）；全部任务结束后执行 excludes / implies 推导。
    pub async fn detect(
        &self,
        page_url: &str,
        evidence: Arc<ScrapedEvidence>,
        detections: &Arc<DetectionSet>,
    ) {
        let render_js = self.fetcher.can_render_js();
        let page_url: Arc<str> = Arc::from(page_url);

        // 1. 非 DOM 通道：每个技术一个任务
        let mut tasks = JoinSet::new();
        for tech in self.catalog.technologies.values() {
            let tech = Arc::clone(tech);
            let evidence = Arc::clone(&evidence);
            let detections = Arc::clone(detections);
            let fetcher = Arc::clone(&self.fetcher);
            let page_url = Arc::clone(&page_url);
            tasks.spawn(async move {
                Self::analyze_technology(&tech, &page_url, &evidence, fetcher.as_ref(), render_js, &detections)
                    .await;
            });
        }

        // 2. DOM 通道
        Self::analyze_dom(&self.catalog, &evidence.html, detections);

        // 3. 等待全部任务
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("技术检测任务异常：{}", e);
            }
        }

        // 4. 关联推导
        ImplicationResolver::resolve(&self.catalog, detections);
        debug!("页面分析完成：{}，累计检测到{}个技术", page_url, detections.len());
    }

    /// 单页检测，返回按名称排序的结果
    pub async fn detect_page(&self, page_url: &str, evidence: ScrapedEvidence) -> Vec<TechnologyResult> {
        let detections = Arc::new(DetectionSet::new());
        self.detect(page_url, Arc::new(evidence), &detections).await;
        detections.results()
    }

    async fn analyze_technology(
        tech: &Arc<Technology>,
        page_url: &str,
        evidence: &ScrapedEvidence,
        fetcher: &dyn Fetcher,
        render_js: bool,
        detections: &DetectionSet,
    ) {
        UrlAnalyzer::analyze(tech, page_url, detections);
        if render_js && !tech.js.is_empty() {
            JsAnalyzer::analyze(tech, fetcher, detections).await;
        }
        HtmlAnalyzer::analyze(tech, &evidence.html, detections);
        HeaderAnalyzer::analyze(tech, &evidence.headers, detections);
        CookieAnalyzer::analyze(tech, &evidence.cookies, detections);
        ScriptAnalyzer::analyze(tech, &evidence.scripts, detections);
        MetaAnalyzer::analyze(tech, &evidence.meta, detections);
        DnsAnalyzer::analyze(tech, &evidence.dns, detections);
        CertIssuerAnalyzer::analyze(tech, &evidence.cert_issuer, detections);
    }

    fn analyze_dom(catalog: &Catalog, html: &str, detections: &DetectionSet) {
        let document = Html::parse_document(html);
        for tech in catalog.technologies.values() {
            if !tech.dom.is_empty() {
                DomAnalyzer::analyze(tech, &document, detections);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MemoryFetcher;
    use crate::rule::RuleLoader;
    use serde_json::json;

    fn detector(fetcher: MemoryFetcher) -> TechDetector {
        let rules = r#"{
            "categories": {"1": {"name": "CMS"}, "2": {"name": "Programming languages"}},
            "technologies": {
                "WordPress": {
                    "cats": [1],
                    "meta": {"generator": "^WordPress ?([\\d.]+)?\\;version:\\1"},
                    "dom": "link[href*='wp-content']",
                    "implies": "PHP"
                },
                "PHP": {
                    "cats": [2],
                    "headers": {"X-Powered-By": "php/?([\\d.]+)?\\;version:\\1"},
                    "cookies": {"PHPSESSID": ""}
                },
                "React": {"cats": [1], "js": {"React.version": "([\\d.]+)\\;version:\\1"}}
            }
        }"#;
        let catalog = RuleLoader::from_slice(rules.as_bytes()).unwrap();
        TechDetector::new(Arc::new(catalog), Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_detect_page_with_implies() {
        let detector = detector(MemoryFetcher::new());
        let evidence = ScrapedEvidence::from_html(
            "https://example.com",
            r#"<html><head><meta name="generator" content="WordPress 6.4.2"></head><body></body></html>"#,
        );

        let results = detector.detect_page("https://example.com", evidence).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "PHP");
        assert_eq!(results[1].name, "WordPress");
        assert_eq!(results[1].version, "6.4.2");
        assert_eq!(results[1].confidence, 100);
    }

    #[tokio::test]
    async fn test_dom_and_headers_share_one_set() {
        let detector = detector(MemoryFetcher::new());
        let evidence = ScrapedEvidence::from_html(
            "https://example.com",
            r#"<html><head><link href="/wp-content/style.css"></head><body></body></html>"#,
        )
        .with_header("X-Powered-By", "PHP/8.2.1");

        let results = detector.detect_page("https://example.com", evidence).await;

        let php = results.iter().find(|tech| tech.name == "PHP").unwrap();
        assert_eq!(php.version, "8.2.1");
        assert!(results.iter().any(|tech| tech.name == "WordPress"));
    }

    #[tokio::test]
    async fn test_js_channel_needs_rendering() {
        let evidence = ScrapedEvidence::from_html("https://example.com", "<body></body>");

        let static_only = detector(MemoryFetcher::new().with_js("React.version", json!("18.2.0")));
        assert!(static_only.detect_page("https://example.com", evidence.clone()).await.is_empty());

        let rendering = detector(
            MemoryFetcher::new()
                .with_rendering(true)
                .with_js("React.version", json!("18.2.0")),
        );
        let results = rendering.detect_page("https://example.com", evidence).await;
        assert_eq!(results[0].name, "React");
        assert_eq!(results[0].version, "18.2.0");
    }

    #[tokio::test]
    async fn test_cookie_presence() {
        let detector = detector(MemoryFetcher::new());
        let evidence = ScrapedEvidence::from_html("https://example.com", "<body></body>")
            .with_cookie("PHPSESSID", "9f86d081");

        let results = detector.detect_page("https://example.com", evidence).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "PHP");
        assert_eq!(results[0].version, "");
        assert_eq!(results[0].confidence, 100);
    }
}

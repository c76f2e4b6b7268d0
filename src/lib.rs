//! rswapcrawl - 基于 Wappalyzer 指纹规则的站点技术栈识别与有限深度爬取

// 导出全局错误类型
pub use self::error::{RswapcrawlError, RswResult};

// 导出配置模块
pub use self::config::{GlobalConfig, ConfigManager, CustomConfigBuilder, DEFAULT_USER_AGENT};

// 导出规则模块核心接口
pub use self::rule::{
    AnalysisOutput, Catalog, Category, RuleLoader, ScrapedUrl, Technology, TechnologyResult,
};

// 导出编译模块核心接口
pub use self::compiler::{CompiledPattern, PatternCompiler, DomCompiler};

// 导出提取模块核心接口
pub use self::extractor::{HtmlExtractor, LinkExtractor};

// 导出工具模块核心接口
pub use self::utils::{VersionExtractor, HeaderConverter, DetectionSet, ImplicationResolver};

// 导出抓取模块核心接口
pub use self::fetcher::{
    build_fetcher, Fetcher, FetcherBackend, HttpFetcher, MemoryFetcher, ScrapedEvidence,
};

// 导出检测与爬取核心接口
pub use self::detector::TechDetector;
pub use self::crawler::{SiteAnalyzer, FAILED_STATUS};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod compiler;
pub mod extractor;
pub mod utils;
pub mod fetcher;
pub mod detector;
pub mod crawler;

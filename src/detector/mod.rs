//! 检测模块：技术检测核心逻辑
pub mod analyzer;
pub mod detector;

// 导出核心接口
pub use self::analyzer::{
    CertIssuerAnalyzer, CookieAnalyzer, DnsAnalyzer, DomAnalyzer, HeaderAnalyzer, HtmlAnalyzer,
    JsAnalyzer, MetaAnalyzer, ScriptAnalyzer, UrlAnalyzer,
};
pub use self::detector::TechDetector;

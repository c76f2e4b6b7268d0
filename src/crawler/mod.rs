//! 爬取模块：有限深度、有限页数的同站爬取
pub mod crawler;
pub mod url;

pub use self::crawler::{SiteAnalyzer, FAILED_STATUS};
pub use self::url::{normalize_url, validate_url};

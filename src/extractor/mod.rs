//! 提取模块：HTML标签提取、站内链接提取
pub mod html_extractor;
pub mod link_extractor;

pub use self::html_extractor::HtmlExtractor;
pub use self::link_extractor::LinkExtractor;

//! 工具模块：版本提取、检测结果合并、Header转换、slug 生成
pub mod version_extractor;
pub mod detection_updater;
pub mod header_converter;
pub mod slug;

pub use self::version_extractor::VersionExtractor;
pub use self::detection_updater::{Detection, DetectionSet, ImplicationResolver};
pub use self::header_converter::HeaderConverter;
pub use self::slug::slugify;

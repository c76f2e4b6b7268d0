//! 规则模块：负责规则的加载、数据模型定义
pub mod model;
pub mod loader;

// 导出核心接口
pub use self::model::{
    AnalysisOutput, Catalog, Category, CategoryRule, RuleLibrary, ScrapedUrl, SignatureSpec,
    SignatureValue, TechRule, Technology, TechnologyResult,
};
pub use self::loader::RuleLoader;

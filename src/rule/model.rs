//! 规则数据模型定义
//! 原始规则库结构（反序列化用）、内存目录结构与分析结果结构

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::compiler::{DomRule, PatternMap};

/// 签名描述：字符串 | 字符串列表 | 键 -> (字符串 | 字符串列表)
/// 加载时一次性解码，匹配阶段不再做运行时类型判断
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SignatureSpec {
    Single(String),
    List(Vec<String>),
    Keyed(HashMap<String, SignatureValue>),
    Unsupported(serde_json::Value),
}

/// 键值形式签名中的取值
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SignatureValue {
    Single(String),
    List(Vec<String>),
    Unsupported(serde_json::Value),
}

/// 技术规则定义（从 technologies.json 解析）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TechRule {
    #[serde(default)]
    pub cats: Vec<u32>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,

    // 检测规则
    #[serde(default)]
    pub url: Option<SignatureSpec>,
    #[serde(default)]
    pub html: Option<SignatureSpec>,
    #[serde(default)]
    pub scripts: Option<SignatureSpec>,
    #[serde(default)]
    pub cookies: Option<SignatureSpec>,
    #[serde(default)]
    pub headers: Option<SignatureSpec>,
    #[serde(default)]
    pub meta: Option<SignatureSpec>,
    #[serde(default)]
    pub dom: Option<serde_json::Value>,
    #[serde(default)]
    pub js: Option<SignatureSpec>,
    #[serde(default)]
    pub dns: Option<SignatureSpec>,
    #[serde(rename = "certIssuer", default)]
    pub cert_issuer: Option<String>,

    // 关联规则
    #[serde(default)]
    pub excludes: Option<SignatureSpec>,
    #[serde(default)]
    pub implies: Option<SignatureSpec>,
}

/// 分类规则定义（从 technologies.json 解析）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: i32,
}

/// 原始规则库文件
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleLibrary {
    #[serde(default)]
    pub categories: HashMap<String, CategoryRule>,
    #[serde(default)]
    pub technologies: HashMap<String, TechRule>,
}

/// 分类（目录内与结果中共用）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Category {
    pub id: u32,
    pub slug: String,
    pub name: String,
    #[serde(skip)]
    pub priority: i32,
}

/// 加载后的技术定义：签名均已编译，只读共享
#[derive(Debug, Clone)]
pub struct Technology {
    pub name: String,
    pub slug: String,
    pub categories: Vec<Category>,
    pub icon: String,
    pub website: String,
    pub cpe: String,

    pub url: PatternMap,
    pub headers: PatternMap,
    pub cookies: PatternMap,
    pub html: PatternMap,
    pub scripts: PatternMap,
    pub meta: PatternMap,
    pub dom: Vec<DomRule>,
    pub js: PatternMap,
    pub dns: PatternMap,
    pub cert_issuer: Option<String>,

    pub excludes: PatternMap,
    pub implies: PatternMap,
}

/// 技术/分类目录
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub technologies: HashMap<String, Arc<Technology>>,
    pub categories: HashMap<u32, Category>,
}

impl Catalog {
    pub fn get(&self, name: &str) -> Option<&Arc<Technology>> {
        self.technologies.get(name)
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}

/// 已访问页面及其状态码
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ScrapedUrl {
    pub url: String,
    pub status: u16,
}

/// 技术检测结果
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TechnologyResult {
    pub slug: String,
    pub name: String,
    pub confidence: u32,
    pub version: String,
    pub icon: String,
    pub website: String,
    pub cpe: String,
    pub categories: Vec<Category>,
}

impl fmt::Display for TechnologyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.version)
        }
    }
}

/// 整站分析结果
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisOutput {
    pub urls: Vec<ScrapedUrl>,
    pub technologies: Vec<TechnologyResult>,
}

impl AnalysisOutput {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn technology(&self, name: &str) -> Option<&TechnologyResult> {
        self.technologies.iter().find(|tech| tech.name == name)
    }
}

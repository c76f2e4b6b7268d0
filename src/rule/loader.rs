//! 规则库加载器
//! 负责将原始 technologies.json 构建为内存中的技术/分类目录

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::model::{Catalog, Category, RuleLibrary, SignatureSpec, TechRule, Technology};
use crate::compiler::{CompileStats, DomCompiler, PatternCompiler};
use crate::config::GlobalConfig;
use crate::error::{RswResult, RswapcrawlError};
use crate::utils::slugify;

/// 规则库加载器
pub struct RuleLoader;

impl RuleLoader {
    /// 按配置中的路径加载规则库
    pub async fn load(config: &GlobalConfig) -> RswResult<Catalog> {
        Self::from_path(&config.rules_path).await
    }

    /// 从本地文件加载规则库
    pub async fn from_path(path: &Path) -> RswResult<Catalog> {
        info!("加载规则库文件：{}", path.display());
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            RswapcrawlError::RuleLoadError(format!("读取规则库文件{}失败：{}", path.display(), e))
        })?;
        Self::from_slice(&bytes)
    }

    /// 从内存字节加载规则库
    pub fn from_slice(bytes: &[u8]) -> RswResult<Catalog> {
        let rule_lib: RuleLibrary = serde_json::from_slice(bytes)
            .map_err(|e| RswapcrawlError::RuleLoadError(format!("规则库JSON解析失败：{}", e)))?;
        Self::build_catalog(rule_lib)
    }

    /// 构建目录：生成 slug、解析分类引用、编译所有签名
    pub fn build_catalog(rule_lib: RuleLibrary) -> RswResult<Catalog> {
        let start = Instant::now();

        // 1. 分类：键必须是数字ID
        let mut categories = HashMap::with_capacity(rule_lib.categories.len());
        for (key, cat_rule) in rule_lib.categories {
            let Ok(id) = key.parse::<u32>() else {
                warn!("分类ID不是数字，已跳过：{}", key);
                continue;
            };
            categories.insert(
                id,
                Category {
                    id,
                    slug: slugify(&cat_rule.name),
                    name: cat_rule.name,
                    priority: cat_rule.priority,
                },
            );
        }
        if categories.is_empty() {
            return Err(RswapcrawlError::RuleLoadError("规则库中未找到任何分类".to_string()));
        }

        // 2. 技术：解析分类引用并编译签名
        let mut stats = CompileStats::default();
        let mut technologies = HashMap::with_capacity(rule_lib.technologies.len());
        for (name, tech_rule) in rule_lib.technologies {
            let technology = Self::build_technology(&name, tech_rule, &categories, &mut stats)?;
            technologies.insert(name, Arc::new(technology));
        }
        if technologies.is_empty() {
            return Err(RswapcrawlError::RuleLoadError("规则库中未找到任何技术".to_string()));
        }

        debug!("✅ 规则库构建完成，耗时{:?}", start.elapsed());
        debug!(
            "📊 编译统计：技术{}个、分类{}个；URL{}条、HTML{}条、Script{}条、Header{}条、Cookie{}条、Meta{}条、JS{}条、DNS{}条、DOM选择器{}个",
            technologies.len(),
            categories.len(),
            stats.get("url"),
            stats.get("html"),
            stats.get("scripts"),
            stats.get("headers"),
            stats.get("cookies"),
            stats.get("meta"),
            stats.get("js"),
            stats.get("dns"),
            stats.get("dom"),
        );

        Ok(Catalog {
            technologies,
            categories,
        })
    }

    fn build_technology(
        name: &str,
        rule: TechRule,
        categories: &HashMap<u32, Category>,
        stats: &mut CompileStats,
    ) -> RswResult<Technology> {
        let mut tech_categories = Vec::with_capacity(rule.cats.len());
        for cat_id in &rule.cats {
            let category = categories.get(cat_id).ok_or_else(|| {
                RswapcrawlError::RuleLoadError(format!("技术[{}]引用了不存在的分类ID：{}", name, cat_id))
            })?;
            tech_categories.push(category.clone());
        }

        let mut compile = |spec: Option<&SignatureSpec>, channel: &'static str| {
            let patterns = PatternCompiler::compile(spec, channel);
            stats.add(channel, PatternCompiler::count(&patterns));
            patterns
        };

        let url = compile(rule.url.as_ref(), "url");
        let headers = compile(rule.headers.as_ref(), "headers");
        let cookies = compile(rule.cookies.as_ref(), "cookies");
        let html = compile(rule.html.as_ref(), "html");
        let scripts = compile(rule.scripts.as_ref(), "scripts");
        let meta = compile(rule.meta.as_ref(), "meta");
        let js = compile(rule.js.as_ref(), "js");
        let dns = compile(rule.dns.as_ref(), "dns");
        let excludes = compile(rule.excludes.as_ref(), "excludes");
        let implies = compile(rule.implies.as_ref(), "implies");

        let dom = DomCompiler::compile(rule.dom.as_ref());
        stats.add("dom", dom.len());

        Ok(Technology {
            name: name.to_string(),
            slug: slugify(name),
            categories: tech_categories,
            icon: rule.icon.unwrap_or_default(),
            website: rule.website.unwrap_or_default(),
            cpe: rule.cpe.unwrap_or_default(),
            url,
            headers,
            cookies,
            html,
            scripts,
            meta,
            dom,
            js,
            dns,
            cert_issuer: rule.cert_issuer.filter(|issuer| !issuer.is_empty()),
            excludes,
            implies,
        })
    }
}

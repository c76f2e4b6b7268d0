//! 检测结果更新工具
//! 负责合并检测结果（提升置信度、保留首个版本）以及 excludes / implies 推导

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::rule::{Catalog, Technology, TechnologyResult};

/// 单个技术的检测状态
#[derive(Debug, Clone)]
pub struct Detection {
    pub technology: Arc<Technology>,
    pub version: String,
    pub confidence: u32,
}

impl From<Detection> for TechnologyResult {
    fn from(detection: Detection) -> Self {
        let tech = detection.technology;
        TechnologyResult {
            slug: tech.slug.clone(),
            name: tech.name.clone(),
            confidence: detection.confidence,
            version: detection.version,
            icon: tech.icon.clone(),
            website: tech.website.clone(),
            cpe: tech.cpe.clone(),
            categories: tech.categories.clone(),
        }
    }
}

/// 一次分析共享的检测结果集，可被多个并发任务同时写入
#[derive(Debug, Default)]
pub struct DetectionSet {
    detected: Mutex<HashMap<String, Detection>>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, Detection>> {
        // 持锁期间不会 panic，中毒时直接沿用内部数据
        self.detected.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 记录一次命中
    /// 首次出现直接插入；已存在时只在版本为空时补版本，置信度只升不降
    pub fn add_detection(&self, technology: &Arc<Technology>, version: &str, confidence: u32) {
        let mut detected = self.guard();
        match detected.entry(technology.name.clone()) {
            Entry::Vacant(entry) => {
                debug!("命中技术：{}，版本：{:?}，置信度：{}", technology.name, version, confidence);
                entry.insert(Detection {
                    technology: Arc::clone(technology),
                    version: version.to_string(),
                    confidence,
                });
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.version.is_empty() && !version.is_empty() {
                    existing.version = version.to_string();
                }
                if confidence > existing.confidence {
                    existing.confidence = confidence;
                }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guard().contains_key(name)
    }

    pub fn remove(&self, name: &str) -> bool {
        self.guard().remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Detection> {
        self.guard().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// 当前已检测技术名（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.guard().keys().cloned().collect();
        names.sort();
        names
    }

    /// 按技术名排序的结果列表
    pub fn results(&self) -> Vec<TechnologyResult> {
        let mut results: Vec<TechnologyResult> =
            self.guard().values().cloned().map(TechnologyResult::from).collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }
}

/// excludes / implies 推导
pub struct ImplicationResolver;

impl ImplicationResolver {
    /// 对当前结果集执行一轮推导
    /// 按技术名顺序处理快照；已被前面的 excludes 移除的技术跳过
    pub fn resolve(catalog: &Catalog, detections: &DetectionSet) {
        for name in detections.names() {
            if !detections.contains(&name) {
                continue;
            }
            let Some(tech) = catalog.get(&name) else {
                continue;
            };

            // 1. excludes：移除互斥技术
            for pattern in tech.excludes.values().flatten() {
                if detections.remove(&pattern.literal) {
                    debug!("{} 排除了 {}", name, pattern.literal);
                }
            }

            // 2. implies：递归补充隐含技术
            let mut resolving = HashSet::from([name.clone()]);
            Self::apply_implies(catalog, detections, tech, &mut resolving);
        }
    }

    fn apply_implies(
        catalog: &Catalog,
        detections: &DetectionSet,
        tech: &Technology,
        resolving: &mut HashSet<String>,
    ) {
        for pattern in tech.implies.values().flatten() {
            let implied_name = &pattern.literal;
            let Some(implied) = catalog.get(implied_name) else {
                debug!("{} 隐含的技术不在规则库中：{}", tech.name, implied_name);
                continue;
            };
            if detections.contains(implied_name) {
                continue;
            }

            debug!("{} 隐含 {}", tech.name, implied_name);
            detections.add_detection(implied, &pattern.version_template, pattern.confidence);

            if resolving.insert(implied_name.clone()) {
                Self::apply_implies(catalog, detections, implied, resolving);
            }
        }
    }
}

//! DOM 规则编译
//! 支持三种写法：单个选择器、选择器列表（均为存在性检查），
//! 以及 `选择器 -> 检查方式 -> 签名` 的完整形式

use serde_json::Value;
use tracing::warn;

use super::compiler::PatternCompiler;
use super::pattern::{DomCheck, DomMode, DomRule, PatternMap, MAIN_KEY};
use crate::rule::model::SignatureSpec;

pub struct DomCompiler;

impl DomCompiler {
    pub fn compile(value: Option<&Value>) -> Vec<DomRule> {
        let Some(value) = value else {
            return Vec::new();
        };

        match value {
            Value::String(selector) => vec![Self::exists_rule(selector)],
            Value::Array(selectors) => selectors
                .iter()
                .filter_map(|item| match item {
                    Value::String(selector) => Some(Self::exists_rule(selector)),
                    other => {
                        warn!("DOM选择器类型不支持：{}", other);
                        None
                    }
                })
                .collect(),
            Value::Object(selectors) => selectors
                .iter()
                .filter_map(|(selector, modes)| Self::compile_selector(selector, modes))
                .collect(),
            other => {
                warn!("DOM规则类型不支持：{}", other);
                Vec::new()
            }
        }
    }

    fn compile_selector(selector: &str, modes: &Value) -> Option<DomRule> {
        let Value::Object(modes) = modes else {
            warn!("DOM选择器[{}]的检查项类型不支持：{}", selector, modes);
            return None;
        };

        let mut checks = Vec::with_capacity(modes.len());
        for (mode_name, spec) in modes {
            let Some(mode) = DomMode::parse(mode_name) else {
                warn!("DOM选择器[{}]的检查方式未知：{}", selector, mode_name);
                continue;
            };
            let spec: SignatureSpec = serde_json::from_value(spec.clone())
                .unwrap_or_else(|_| SignatureSpec::Unsupported(spec.clone()));
            checks.push(DomCheck {
                mode,
                patterns: PatternCompiler::compile(Some(&spec), "dom"),
            });
        }

        Some(DomRule {
            selector: selector.to_string(),
            checks,
        })
    }

    /// 简写形式：只要元素存在即命中
    fn exists_rule(selector: &str) -> DomRule {
        let mut patterns = PatternMap::new();
        patterns.insert(MAIN_KEY.to_string(), vec![PatternCompiler::compile_signature("")]);
        DomRule {
            selector: selector.to_string(),
            checks: vec![DomCheck {
                mode: DomMode::Exists,
                patterns,
            }],
        }
    }
}

//! 签名编译器核心
//! 负责将原始签名（字符串/列表/键值表）编译为可执行的模式

use std::collections::HashMap;
use regex::RegexBuilder;
use tracing::{debug, warn};

use super::pattern::{CompiledPattern, PatternMap, DEFAULT_CONFIDENCE, MAIN_KEY};
use crate::rule::model::{SignatureSpec, SignatureValue};

/// DSL 中签名段之间的分隔符
const SEGMENT_SEPARATOR: &str = r"\;";

/// 签名编译器
pub struct PatternCompiler;

impl PatternCompiler {
    /// 编译一个通道的签名描述
    /// 非键值形式统一挂在 `main` 键下；不支持的取值形态只记录日志，返回空表
    pub fn compile(spec: Option<&SignatureSpec>, channel: &str) -> PatternMap {
        let mut compiled = PatternMap::new();
        let Some(spec) = spec else {
            return compiled;
        };

        match spec {
            SignatureSpec::Single(raw) => {
                compiled.insert(MAIN_KEY.to_string(), vec![Self::compile_signature(raw)]);
            }
            SignatureSpec::List(list) => {
                let patterns = list.iter().map(|raw| Self::compile_signature(raw)).collect();
                compiled.insert(MAIN_KEY.to_string(), patterns);
            }
            SignatureSpec::Keyed(keyed) => {
                for (key, value) in keyed {
                    match value {
                        SignatureValue::Single(raw) => {
                            compiled
                                .entry(key.clone())
                                .or_insert_with(Vec::new)
                                .push(Self::compile_signature(raw));
                        }
                        SignatureValue::List(list) => {
                            compiled
                                .entry(key.clone())
                                .or_insert_with(Vec::new)
                                .extend(list.iter().map(|raw| Self::compile_signature(raw)));
                        }
                        SignatureValue::Unsupported(other) => {
                            warn!("{}签名键[{}]取值类型不支持：{}", channel, key, other);
                        }
                    }
                }
            }
            SignatureSpec::Unsupported(other) => {
                warn!("{}签名类型不支持：{}", channel, other);
            }
        }

        compiled
    }

    /// 编译单条签名：`literal(\;name:value)*`
    pub fn compile_signature(raw: &str) -> CompiledPattern {
        let mut pattern = CompiledPattern {
            literal: String::new(),
            regex: None,
            version_template: String::new(),
            confidence: DEFAULT_CONFIDENCE,
        };

        for (index, segment) in raw.split(SEGMENT_SEPARATOR).enumerate() {
            if segment.is_empty() {
                continue;
            }

            if index == 0 {
                pattern.literal = segment.to_string();
                let source = Self::unescape_literal(segment);
                match RegexBuilder::new(&source).case_insensitive(true).build() {
                    Ok(regex) => pattern.regex = Some(regex),
                    Err(e) => debug!("签名正则编译失败，仅保留字面量：{}，错误：{}", segment, e),
                }
                continue;
            }

            // 修饰段：按第一个冒号切分，无法切分的段直接丢弃
            let Some((name, value)) = segment.split_once(':') else {
                continue;
            };
            match name {
                "version" => pattern.version_template = value.to_string(),
                "confidence" => {
                    if let Ok(confidence) = value.trim().parse::<u32>() {
                        pattern.confidence = confidence;
                    }
                }
                _ => {}
            }
        }

        pattern
    }

    /// 还原字面量中的转义斜杠与反斜杠
    fn unescape_literal(literal: &str) -> String {
        literal.replace(r"\/", "/").replace(r"\\", r"\")
    }

    /// 统计编译出的签名条数
    pub fn count(patterns: &PatternMap) -> usize {
        patterns.values().map(Vec::len).sum()
    }
}

/// 按通道统计签名数量（仅用于加载日志）
#[derive(Debug, Clone, Default)]
pub struct CompileStats {
    counts: HashMap<&'static str, usize>,
}

impl CompileStats {
    pub fn add(&mut self, channel: &'static str, count: usize) {
        *self.counts.entry(channel).or_insert(0) += count;
    }

    pub fn get(&self, channel: &str) -> usize {
        self.counts.get(channel).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_with_version_and_confidence() {
        let pattern = PatternCompiler::compile_signature(r"foo\;version:\1\;confidence:50");

        assert_eq!(pattern.literal, "foo");
        assert_eq!(pattern.version_template, r"\1");
        assert_eq!(pattern.confidence, 50);
        assert!(pattern.is_match("xxFOOxx"));
        assert!(!pattern.is_match("bar"));
    }

    #[test]
    fn test_bare_signature_defaults() {
        let pattern = PatternCompiler::compile_signature("jquery");

        assert_eq!(pattern.confidence, 100);
        assert!(pattern.version_template.is_empty());
        assert!(!pattern.is_presence());
    }

    #[test]
    fn test_invalid_modifiers_are_ignored() {
        let pattern = PatternCompiler::compile_signature(r"foo\;confidence:high\;nocolon\;other:1");

        assert_eq!(pattern.confidence, 100);
        assert!(pattern.version_template.is_empty());
    }

    #[test]
    fn test_empty_literal_is_presence_check() {
        let pattern = PatternCompiler::compile_signature(r"\;confidence:25");

        assert!(pattern.is_presence());
        assert!(pattern.regex.is_none());
        assert!(pattern.matches_keyed("anything"));
        assert_eq!(pattern.confidence, 25);
    }

    #[test]
    fn test_escaped_slash_is_unescaped() {
        let pattern = PatternCompiler::compile_signature(r"\/wp-content\/");
        assert!(pattern.is_match("https://example.com/wp-content/themes"));
    }

    #[test]
    fn test_invalid_regex_keeps_literal() {
        let pattern = PatternCompiler::compile_signature("foo(?=bar)");
        assert!(pattern.regex.is_none());
        assert!(!pattern.is_match("foobar"));
        assert_eq!(pattern.literal, "foo(?=bar)");
    }

    #[test]
    fn test_compile_shapes() {
        let single = SignatureSpec::Single("a".to_string());
        let list = SignatureSpec::List(vec!["a".to_string(), "b".to_string()]);
        let keyed: SignatureSpec =
            serde_json::from_str(r#"{"X-Powered-By": "PHP", "Server": ["nginx", "apache"]}"#).unwrap();

        assert_eq!(PatternCompiler::compile(Some(&single), "html")[MAIN_KEY].len(), 1);
        assert_eq!(PatternCompiler::compile(Some(&list), "html")[MAIN_KEY].len(), 2);

        let keyed = PatternCompiler::compile(Some(&keyed), "headers");
        assert_eq!(keyed["X-Powered-By"].len(), 1);
        assert_eq!(keyed["Server"].len(), 2);
        assert_eq!(PatternCompiler::count(&keyed), 3);
    }

    #[test]
    fn test_unsupported_shape_yields_nothing() {
        let spec: SignatureSpec = serde_json::from_str("42").unwrap();
        assert!(PatternCompiler::compile(Some(&spec), "html").is_empty());
        assert!(PatternCompiler::compile(None, "html").is_empty());
    }
}

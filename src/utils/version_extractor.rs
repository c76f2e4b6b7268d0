//! 版本提取工具模块
//! 根据签名的版本模板，从正则匹配结果中生成版本号
//! 模板支持 `\N` 分组引用以及 `\N?A:B` 三元写法（分组非空取 A，否则取 B）

use regex::{Captures, NoExpand, Regex};
use tracing::debug;

use crate::compiler::CompiledPattern;

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 对输入值执行签名正则，返回所有匹配中字典序最大的非空版本
    ///
    /// 未声明版本模板或没有任何匹配时返回空串。
    /// 注意比较是按字符串进行的，所以 "9.0" 会被视为大于 "10.0"。
    pub fn detect(pattern: &CompiledPattern, value: &str) -> String {
        if pattern.version_template.is_empty() {
            return String::new();
        }
        let Some(regex) = &pattern.regex else {
            return String::new();
        };

        let mut best = String::new();
        for captures in regex.captures_iter(value) {
            let version = Self::render(&pattern.version_template, &captures);
            if !version.is_empty() && version > best {
                best = version;
            }
        }
        best
    }

    /// 用一次匹配的分组结果渲染版本模板
    pub fn render(template: &str, captures: &Captures) -> String {
        let mut version = template.to_string();

        for group_index in 0..captures.len() {
            let matched = captures.get(group_index).map_or("", |m| m.as_str());

            // 1. 先处理三元写法 \N?A:B
            version = Self::resolve_ternary(&version, group_index, matched);
            // 2. 再替换普通分组引用，未参与匹配的分组替换为空
            version = version.replace(&format!("\\{}", group_index), matched);
        }

        version
    }

    fn resolve_ternary(template: &str, group_index: usize, matched: &str) -> String {
        let ternary = match Regex::new(&format!(r"\\{}\?([^:]+):(.*)$", group_index)) {
            Ok(regex) => regex,
            Err(e) => {
                debug!("三元版本模板正则构建失败：{}", e);
                return template.to_string();
            }
        };

        let Some(parts) = ternary.captures(template) else {
            return template.to_string();
        };
        let chosen = if matched.is_empty() {
            parts.get(2).map_or("", |m| m.as_str())
        } else {
            parts.get(1).map_or("", |m| m.as_str())
        };
        ternary.replace(template, NoExpand(chosen)).into_owned()
    }
}

// 单元测试
#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PatternCompiler;

    #[test]
    fn test_extract_version_from_group() {
        let pattern = PatternCompiler::compile_signature(r"app-([\d.]+)\.js\;version:\1");
        assert_eq!(VersionExtractor::detect(&pattern, "/static/app-1.2.3.js"), "1.2.3");
    }

    #[test]
    fn test_ternary_template() {
        let pattern = PatternCompiler::compile_signature(r"shop(-pro)?\;version:\1?Pro:Free");

        assert_eq!(VersionExtractor::detect(&pattern, "shop-pro"), "Pro");
        assert_eq!(VersionExtractor::detect(&pattern, "shop"), "Free");
    }

    #[test]
    fn test_greatest_candidate_is_lexicographic() {
        let pattern = PatternCompiler::compile_signature(r"v([\d.]+)\;version:\1");
        // 字符串比较下 "9.0" > "10.0"
        assert_eq!(VersionExtractor::detect(&pattern, "v10.0 v9.0"), "9.0");
        assert_eq!(VersionExtractor::detect(&pattern, "v1.0 v1.2"), "1.2");
    }

    #[test]
    fn test_no_template_or_no_match() {
        let bare = PatternCompiler::compile_signature(r"app-([\d.]+)\.js");
        assert_eq!(VersionExtractor::detect(&bare, "app-1.2.3.js"), "");

        let versioned = PatternCompiler::compile_signature(r"app-([\d.]+)\.js\;version:\1");
        assert_eq!(VersionExtractor::detect(&versioned, "nothing here"), "");
    }

    #[test]
    fn test_unmatched_group_renders_empty() {
        let pattern = PatternCompiler::compile_signature(r"nginx(?:/([\d.]+))?\;version:\1");
        assert_eq!(VersionExtractor::detect(&pattern, "nginx"), "");
        assert_eq!(VersionExtractor::detect(&pattern, "nginx/1.21.6"), "1.21.6");
    }

    #[test]
    fn test_rendered_version_keeps_surrounding_text() {
        let pattern = PatternCompiler::compile_signature(r"cms(?:/(\d+))?\;version:\1 beta");
        assert_eq!(VersionExtractor::detect(&pattern, "cms"), " beta");
        assert_eq!(VersionExtractor::detect(&pattern, "cms/4"), "4 beta");
    }

    #[test]
    fn test_constant_template() {
        let pattern = PatternCompiler::compile_signature(r"legacy-build\;version:2");
        assert_eq!(VersionExtractor::detect(&pattern, "legacy-build"), "2");
    }
}

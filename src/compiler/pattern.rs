//! 编译后模式模型
//! 签名DSL编译后的结构

use std::collections::HashMap;
use regex::Regex;

/// 非键值形式的签名统一使用的通道键
pub const MAIN_KEY: &str = "main";
/// 未显式声明 confidence 时的默认置信度
pub const DEFAULT_CONFIDENCE: u32 = 100;

/// 编译后的单条签名
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// 原始字面量（`\;` 之前的部分）
    pub literal: String,
    /// 忽略大小写的正则；字面量为空或编译失败时为 None
    pub regex: Option<Regex>,
    /// 版本模板（如 `\1`、`\1?Pro:Free`），未声明时为空
    pub version_template: String,
    pub confidence: u32,
}

impl CompiledPattern {
    /// 空字面量只做存在性判断
    pub fn is_presence(&self) -> bool {
        self.literal.is_empty()
    }

    /// 正则匹配（无正则时恒为 false）
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.as_ref().is_some_and(|regex| regex.is_match(value))
    }

    /// 键值型通道的匹配规则：存在性签名直接命中，否则走正则
    pub fn matches_keyed(&self, value: &str) -> bool {
        self.is_presence() || self.is_match(value)
    }

    /// 规则描述，用于日志
    pub fn describe(&self) -> &str {
        match &self.regex {
            Some(regex) => regex.as_str(),
            None => "exists",
        }
    }
}

/// 通道键 -> 签名列表
pub type PatternMap = HashMap<String, Vec<CompiledPattern>>;

/// DOM 检查方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomMode {
    Text,
    Exists,
    Attributes,
    // 需要浏览器上下文读取元素属性，静态 DOM 上恒不命中
    Properties,
}

impl DomMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "exists" => Some(Self::Exists),
            "attributes" => Some(Self::Attributes),
            "properties" => Some(Self::Properties),
            _ => None,
        }
    }
}

/// 单个选择器下的一种检查
#[derive(Debug, Clone)]
pub struct DomCheck {
    pub mode: DomMode,
    /// attributes 模式下键为属性名，其余模式下键为 `main`
    pub patterns: PatternMap,
}

/// 编译后的 DOM 规则
#[derive(Debug, Clone)]
pub struct DomRule {
    pub selector: String,
    pub checks: Vec<DomCheck>,
}

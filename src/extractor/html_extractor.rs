//! HTML标签提取器
//! 基于 html5ever 分词器，从HTML中提取 script-src 和 meta 标签

use std::cell::RefCell;
use std::collections::HashMap;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use markup5ever::interface::Attribute;
use tendril::StrTendril;

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    script_srcs: RefCell<Vec<String>>,
    meta_tags: RefCell<HashMap<String, Vec<String>>>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        {
            match name.as_ref() {
                "script" => self.extract_script_src(&attrs),
                "meta" => self.extract_meta_tag(&attrs),
                _ => {}
            }
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取标签
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    /// 提取script-src（跳过空值）
    fn extract_script_src(&self, attrs: &[Attribute]) {
        if let Some(src) = attrs
            .iter()
            .find(|attr| attr.name.local.as_ref() == "src")
            .map(|attr| attr.value.trim().to_string())
            .filter(|src| !src.is_empty())
        {
            self.script_srcs.borrow_mut().push(src);
        }
    }

    /// 提取meta标签：键取 name，没有 name 时取 property（如 og:*），统一小写
    fn extract_meta_tag(&self, attrs: &[Attribute]) {
        let mut name = None;
        let mut property = None;
        let mut content = None;

        for attr in attrs {
            match attr.name.local.as_ref() {
                "name" => name = Some(attr.value.to_lowercase()),
                "property" => property = Some(attr.value.to_lowercase()),
                "content" => content = Some(attr.value.to_string()),
                _ => {}
            }
        }

        if let (Some(key), Some(content)) = (name.or(property), content) {
            self.meta_tags
                .borrow_mut()
                .entry(key)
                .or_default()
                .push(content);
        }
    }

    /// 消费提取器，取出 (script-src列表, meta多值表)
    pub fn into_parts(self) -> (Vec<String>, HashMap<String, Vec<String>>) {
        (self.script_srcs.into_inner(), self.meta_tags.into_inner())
    }
}

//! 名称 -> slug 转换

use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"--+").unwrap());
static EDGE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^-|-$)").unwrap());

/// 小写化，非 `[a-z0-9-]` 字符替换为 `-`，合并连续 `-`，去掉首尾 `-`
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let replaced = NON_SLUG_CHARS.replace_all(&lower, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");
    EDGE_DASHES.replace_all(&collapsed, "").into_owned()
}

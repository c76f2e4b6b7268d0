//! 检测分析器：每个证据通道一个分析器
//! 所有分析器只通过 `DetectionSet::add_detection` 写入结果，可在多个任务中并发执行
use std::collections::HashMap;
use std::sync::Arc;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::compiler::{CompiledPattern, DomMode, PatternMap};
use crate::fetcher::Fetcher;
use crate::rule::Technology;
use crate::utils::{DetectionSet, VersionExtractor};

/// 命中后提取版本并写入结果
fn record(
    tech: &Arc<Technology>,
    pattern: &CompiledPattern,
    value: &str,
    channel: &str,
    detections: &DetectionSet,
) {
    let version = VersionExtractor::detect(pattern, value);
    debug!(
        "{}匹配成功：技术={}，版本={:?}，规则={}",
        channel,
        tech.name,
        version,
        pattern.describe()
    );
    detections.add_detection(tech, &version, pattern.confidence);
}

/// 单值通道：所有键下的签名都用正则匹配同一个输入
fn analyze_text(
    tech: &Arc<Technology>,
    patterns: &PatternMap,
    values: &[&str],
    channel: &str,
    detections: &DetectionSet,
) {
    for pattern in patterns.values().flatten() {
        if pattern.regex.is_none() {
            continue;
        }
        for value in values {
            if pattern.is_match(value) {
                record(tech, pattern, value, channel, detections);
            }
        }
    }
}

/// 键值通道：按键取出证据，每条签名依次匹配该键下的每个值
fn analyze_keyed(
    tech: &Arc<Technology>,
    patterns: &PatternMap,
    evidence: &HashMap<String, Vec<String>>,
    normalize_key: fn(&str) -> String,
    channel: &str,
    detections: &DetectionSet,
) {
    for (key, key_patterns) in patterns {
        let Some(values) = evidence.get(&normalize_key(key)) else {
            continue;
        };
        for pattern in key_patterns {
            for value in values {
                if pattern.matches_keyed(value) {
                    record(tech, pattern, value, channel, detections);
                }
            }
        }
    }
}

/// URL分析器
pub struct UrlAnalyzer;

impl UrlAnalyzer {
    pub fn analyze(tech: &Arc<Technology>, url: &str, detections: &DetectionSet) {
        analyze_text(tech, &tech.url, &[url], "URL", detections);
    }
}

/// Script分析器（script-src）
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn analyze(tech: &Arc<Technology>, scripts: &[String], detections: &DetectionSet) {
        if scripts.is_empty() {
            return;
        }
        let scripts: Vec<&str> = scripts.iter().map(String::as_str).collect();
        analyze_text(tech, &tech.scripts, &scripts, "Script", detections);
    }
}

/// HTML分析器
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    pub fn analyze(tech: &Arc<Technology>, html: &str, detections: &DetectionSet) {
        analyze_text(tech, &tech.html, &[html], "HTML", detections);
    }
}

/// Header分析器
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    pub fn analyze(
        tech: &Arc<Technology>,
        headers: &HashMap<String, Vec<String>>,
        detections: &DetectionSet,
    ) {
        analyze_keyed(tech, &tech.headers, headers, str::to_lowercase, "Header", detections);
    }
}

/// Cookie分析器
pub struct CookieAnalyzer;

impl CookieAnalyzer {
    pub fn analyze(tech: &Arc<Technology>, cookies: &HashMap<String, String>, detections: &DetectionSet) {
        for (name, patterns) in &tech.cookies {
            let Some(value) = cookies.get(&name.to_lowercase()) else {
                continue;
            };
            for pattern in patterns {
                if pattern.matches_keyed(value) {
                    record(tech, pattern, value, "Cookie", detections);
                }
            }
        }
    }
}

/// Meta分析器
pub struct MetaAnalyzer;

impl MetaAnalyzer {
    pub fn analyze(
        tech: &Arc<Technology>,
        meta: &HashMap<String, Vec<String>>,
        detections: &DetectionSet,
    ) {
        analyze_keyed(tech, &tech.meta, meta, str::to_lowercase, "Meta", detections);
    }
}

/// DNS分析器（记录类型大写）
pub struct DnsAnalyzer;

impl DnsAnalyzer {
    pub fn analyze(
        tech: &Arc<Technology>,
        dns: &HashMap<String, Vec<String>>,
        detections: &DetectionSet,
    ) {
        analyze_keyed(tech, &tech.dns, dns, str::to_uppercase, "DNS", detections);
    }
}

/// 证书颁发者分析器：子串包含即命中
pub struct CertIssuerAnalyzer;

impl CertIssuerAnalyzer {
    pub fn analyze(tech: &Arc<Technology>, issuers: &[String], detections: &DetectionSet) {
        let Some(expected) = tech.cert_issuer.as_deref() else {
            return;
        };
        for issuer in issuers {
            if issuer.contains(expected) {
                debug!("证书颁发者匹配成功：技术={}，颁发者={}", tech.name, issuer);
                detections.add_detection(tech, "", 100);
            }
        }
    }
}

/// JS分析器：借助抓取器在页面内求值属性表达式
pub struct JsAnalyzer;

impl JsAnalyzer {
    pub async fn analyze(tech: &Arc<Technology>, fetcher: &dyn Fetcher, detections: &DetectionSet) {
        for (expression, patterns) in &tech.js {
            let value = match fetcher.eval_in_page(expression).await {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    debug!("JS求值失败：技术={}，表达式={}，错误：{}", tech.name, expression, e);
                    continue;
                }
            };
            // 只匹配字符串和数字
            let value = match value {
                Value::String(text) => text,
                Value::Number(number) => number.to_string(),
                _ => continue,
            };
            for pattern in patterns {
                if pattern.matches_keyed(&value) {
                    record(tech, pattern, &value, "JS", detections);
                }
            }
        }
    }
}

/// DOM分析器：在静态HTML上执行CSS选择器，每个选择器只检查第一个元素
pub struct DomAnalyzer;

impl DomAnalyzer {
    pub fn analyze(tech: &Arc<Technology>, document: &Html, detections: &DetectionSet) {
        for rule in &tech.dom {
            let selector = match Selector::parse(&rule.selector) {
                Ok(selector) => selector,
                Err(e) => {
                    debug!("DOM选择器无效：技术={}，选择器={}，错误：{:?}", tech.name, rule.selector, e);
                    continue;
                }
            };
            let Some(element) = document.select(&selector).next() else {
                continue;
            };

            for check in &rule.checks {
                match check.mode {
                    DomMode::Text | DomMode::Exists => {
                        let text: String = element.text().collect();
                        for pattern in check.patterns.values().flatten() {
                            if pattern.matches_keyed(&text) {
                                record(tech, pattern, &text, "DOM", detections);
                            }
                        }
                    }
                    DomMode::Attributes => {
                        for (attribute, patterns) in &check.patterns {
                            let Some(value) = element.value().attr(attribute) else {
                                continue;
                            };
                            for pattern in patterns {
                                if pattern.matches_keyed(value) {
                                    record(tech, pattern, value, "DOM", detections);
                                }
                            }
                        }
                    }
                    DomMode::Properties => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MAIN_KEY;
    use crate::fetcher::MemoryFetcher;
    use crate::rule::{Catalog, RuleLoader};
    use serde_json::json;

    fn catalog() -> Catalog {
        let rules = r##"{
            "categories": {"1": {"name": "Misc"}},
            "technologies": {
                "Nginx": {"cats": [1], "headers": {"Server": "nginx(?:/([\\d.]+))?\\;version:\\1"}},
                "PHP": {"cats": [1], "cookies": {"PHPSESSID": ""}},
                "jQuery": {
                    "cats": [1],
                    "scripts": "jquery-([\\d.]+)\\.min\\.js\\;version:\\1",
                    "js": {"jQuery.fn.jquery": "([\\d.]+)\\;version:\\1", "jQuery.ready": ""}
                },
                "Shop": {"cats": [1], "url": "/shop\\;confidence:40", "html": "<div id=\"shop\""},
                "Gen": {"cats": [1], "meta": {"Generator": "^Gen ([\\d.]+)\\;version:\\1"}},
                "Google Cloud": {"cats": [1], "dns": {"ns": "googledomains\\.com"}},
                "Let's Encrypt": {"cats": [1], "certIssuer": "Let's Encrypt"},
                "Amazon": {
                    "cats": [1],
                    "dom": {"a.buy": {"attributes": {"href": "amzn\\.to/(\\w+)\\;version:\\1"}, "properties": {"x": ""}}}
                },
                "Banner": {"cats": [1], "dom": {"#banner": {"text": "Powered by Banner ([\\d.]+)\\;version:\\1"}}},
                "Widget": {"cats": [1], "dom": ["#widget", "#missing"]}
            }
        }"##;
        RuleLoader::from_slice(rules.as_bytes()).unwrap()
    }

    #[test]
    fn test_keyed_channels() {
        let catalog = catalog();
        let set = DetectionSet::new();

        let mut headers = HashMap::new();
        headers.insert("server".to_string(), vec!["nginx/1.25.3".to_string()]);
        HeaderAnalyzer::analyze(catalog.get("Nginx").unwrap(), &headers, &set);

        let mut cookies = HashMap::new();
        cookies.insert("phpsessid".to_string(), "abc".to_string());
        CookieAnalyzer::analyze(catalog.get("PHP").unwrap(), &cookies, &set);

        let mut meta = HashMap::new();
        meta.insert("generator".to_string(), vec!["Other".to_string(), "Gen 4.1".to_string()]);
        MetaAnalyzer::analyze(catalog.get("Gen").unwrap(), &meta, &set);

        let mut dns = HashMap::new();
        dns.insert("NS".to_string(), vec!["ns1.googledomains.com.".to_string()]);
        DnsAnalyzer::analyze(catalog.get("Google Cloud").unwrap(), &dns, &set);

        assert_eq!(set.get("Nginx").unwrap().version, "1.25.3");
        assert!(set.contains("PHP"));
        assert_eq!(set.get("Gen").unwrap().version, "4.1");
        assert!(set.contains("Google Cloud"));
    }

    #[test]
    fn test_text_channels() {
        let catalog = catalog();
        let set = DetectionSet::new();
        let shop = catalog.get("Shop").unwrap();

        UrlAnalyzer::analyze(shop, "https://example.com/shop/cart", &set);
        assert_eq!(set.get("Shop").unwrap().confidence, 40);

        HtmlAnalyzer::analyze(shop, r#"<div id="shop">"#, &set);
        assert_eq!(set.get("Shop").unwrap().confidence, 100);

        let scripts = vec!["/js/jquery-3.6.0.min.js".to_string()];
        ScriptAnalyzer::analyze(catalog.get("jQuery").unwrap(), &scripts, &set);
        assert_eq!(set.get("jQuery").unwrap().version, "3.6.0");
    }

    #[test]
    fn test_cert_issuer() {
        let catalog = catalog();
        let set = DetectionSet::new();
        let issuers = vec!["Let's Encrypt Authority X3".to_string()];

        CertIssuerAnalyzer::analyze(catalog.get("Let's Encrypt").unwrap(), &issuers, &set);
        CertIssuerAnalyzer::analyze(catalog.get("Nginx").unwrap(), &issuers, &set);

        let detection = set.get("Let's Encrypt").unwrap();
        assert_eq!(detection.confidence, 100);
        assert!(detection.version.is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_dom_modes() {
        let catalog = catalog();
        let set = DetectionSet::new();
        let document = Html::parse_document(
            r#"<body>
                <a class="buy" href="https://amzn.to/abc">Buy</a>
                <a class="buy" href="https://amzn.to/zzz">Buy again</a>
                <div id="banner">Powered by Banner 2.5</div>
                <span id="widget"></span>
            </body>"#,
        );

        for name in ["Amazon", "Banner", "Widget"] {
            DomAnalyzer::analyze(catalog.get(name).unwrap(), &document, &set);
        }

        // 只检查第一个元素
        assert_eq!(set.get("Amazon").unwrap().version, "abc");
        assert_eq!(set.get("Banner").unwrap().version, "2.5");
        assert!(set.contains("Widget"));
    }

    #[tokio::test]
    async fn test_js_only_matches_strings_and_numbers() {
        let catalog = catalog();
        let jquery = catalog.get("jQuery").unwrap();

        let fetcher = MemoryFetcher::new()
            .with_rendering(true)
            .with_js("jQuery.fn.jquery", json!(3.5))
            .with_js("jQuery.ready", json!({"fn": true}));
        let set = DetectionSet::new();
        JsAnalyzer::analyze(jquery, &fetcher, &set).await;
        assert_eq!(set.get("jQuery").unwrap().version, "3.5");

        let fetcher = MemoryFetcher::new()
            .with_rendering(true)
            .with_js("jQuery.ready", json!(true));
        let set = DetectionSet::new();
        JsAnalyzer::analyze(jquery, &fetcher, &set).await;
        assert!(set.is_empty());
    }

    #[test]
    fn test_main_key_for_plain_patterns() {
        let catalog = catalog();
        assert!(catalog.get("Shop").unwrap().url.contains_key(MAIN_KEY));
    }
}

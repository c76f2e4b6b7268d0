//! DNS 证据采集
//! 对主机名的最后两段查询 NS / MX / TXT / CNAME 记录，查询失败只记日志

use std::collections::HashMap;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;
use tracing::debug;
use url::Url;

const RECORD_TYPES: [RecordType; 4] = [
    RecordType::NS,
    RecordType::MX,
    RecordType::TXT,
    RecordType::CNAME,
];

/// DNS 记录采集器
pub struct DnsCollector {
    resolver: TokioAsyncResolver,
}

impl DnsCollector {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }

    /// 取主机名最后两段作为查询域名；IP 或单段主机名返回 None
    pub fn lookup_domain(url: &Url) -> Option<String> {
        let host = url.domain()?;
        let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
        if labels.len() < 2 {
            return None;
        }
        Some(labels[labels.len() - 2..].join("."))
    }

    /// 采集页面所在域名的 DNS 记录，键为记录类型（大写）
    pub async fn collect(&self, url: &Url) -> HashMap<String, Vec<String>> {
        let mut records = HashMap::new();
        let Some(domain) = Self::lookup_domain(url) else {
            return records;
        };

        for record_type in RECORD_TYPES {
            let values = match self.resolver.lookup(domain.as_str(), record_type).await {
                Ok(lookup) => lookup
                    .iter()
                    .filter_map(|rdata| Self::rdata_to_string(rdata, record_type))
                    .collect::<Vec<String>>(),
                Err(e) => {
                    debug!("{}记录查询失败：{}，错误：{}", record_type, domain, e);
                    continue;
                }
            };
            if !values.is_empty() {
                records.insert(record_type.to_string(), values);
            }
        }

        records
    }

    fn rdata_to_string(rdata: &RData, wanted: RecordType) -> Option<String> {
        match (rdata, wanted) {
            (RData::NS(ns), RecordType::NS) => Some(ns.0.to_utf8()),
            (RData::MX(mx), RecordType::MX) => Some(mx.exchange().to_utf8()),
            (RData::TXT(txt), RecordType::TXT) => Some(
                txt.iter()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    .collect::<Vec<String>>()
                    .join(""),
            ),
            (RData::CNAME(cname), RecordType::CNAME) => Some(cname.0.to_utf8()),
            _ => None,
        }
    }
}

impl Default for DnsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_domain() {
        let url = Url::parse("https://www.blog.example.com/path").unwrap();
        assert_eq!(DnsCollector::lookup_domain(&url).as_deref(), Some("example.com"));

        let ip = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(DnsCollector::lookup_domain(&ip), None);

        let single = Url::parse("http://localhost/").unwrap();
        assert_eq!(DnsCollector::lookup_domain(&single), None);
    }
}

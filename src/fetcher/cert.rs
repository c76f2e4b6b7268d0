//! 证书颁发者提取
//! 从 TLS 对端证书（DER）中读取颁发者的组织名（O）

use reqwest::tls::TlsInfo;
use reqwest::Response;
use tracing::debug;

/// 响应对应连接的证书颁发者组织名；明文 HTTP 或未取到证书时为空
pub fn response_issuers(response: &Response) -> Vec<String> {
    response
        .extensions()
        .get::<TlsInfo>()
        .and_then(|info| info.peer_certificate())
        .map(issuer_organizations)
        .unwrap_or_default()
}

/// 解析 DER 证书，返回颁发者的全部组织名
pub fn issuer_organizations(der: &[u8]) -> Vec<String> {
    let cert = match x509_parser::parse_x509_certificate(der) {
        Ok((_, cert)) => cert,
        Err(e) => {
            debug!("证书解析失败：{}", e);
            return Vec::new();
        }
    };

    cert.issuer()
        .iter_organization()
        .filter_map(|attr| attr.as_str().ok())
        .map(str::to_string)
        .collect()
}

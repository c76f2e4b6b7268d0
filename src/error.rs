//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;

#[derive(Error, Debug)]
pub enum RswapcrawlError {
    // 规则库相关错误（初始化阶段，致命）
    #[error("规则加载失败：{0}")]
    RuleLoadError(String),

    // 抓取后端相关错误
    #[error("未知的抓取后端：{0}")]
    UnknownBackend(String),
    #[error("抓取后端初始化失败：{0}")]
    FetcherInitError(String),

    // 单页面错误（不中断爬取）
    #[error("无效URL：{0}")]
    InvalidUrl(String),
    #[error("页面抓取失败：{0}")]
    FetchError(String),
    #[error("页面内脚本求值失败：{0}")]
    EvalError(String),

    // 整体分析失败：所有页面均未成功
    #[error("所有页面分析均失败")]
    AllPagesFailed,

    // 网络相关错误
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),
}

// 全局Result类型
pub type RswResult<T> = Result<T, RswapcrawlError>;

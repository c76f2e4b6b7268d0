//! rswapcrawl 命令行入口
//! 分析站点技术栈，结果以 JSON 输出到标准输出

use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use rswapcrawl::{ConfigManager, SiteAnalyzer, DEFAULT_USER_AGENT};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 基于 Wappalyzer 指纹规则的站点技术栈识别工具
#[derive(Parser, Debug)]
#[command(name = "rswapcrawl", version, about, long_about = None)]
struct Cli {
    /// 指纹规则库文件（technologies.json 格式）
    #[arg(long, value_name = "PATH", default_value = "technologies.json")]
    file: PathBuf,

    /// 抓取后端
    #[arg(long, default_value = "http")]
    backend: String,

    /// User-Agent
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    useragent: String,

    /// 请求超时（秒）
    #[arg(long, default_value_t = 3)]
    timeout: u64,

    /// 页面加载超时（秒）
    #[arg(long, default_value_t = 3)]
    loadtimeout: u64,

    /// 最大爬取深度，0 表示只分析起始页
    #[arg(long, default_value_t = 0)]
    depth: u32,

    /// 最多访问的页面数
    #[arg(long, default_value_t = 5)]
    maxlinks: u32,

    /// 两次请求之间的间隔（毫秒）
    #[arg(long, default_value_t = 100)]
    delay: u64,

    /// 不采集 DNS 记录
    #[arg(long)]
    no_dns: bool,

    /// 格式化输出 JSON
    #[arg(long)]
    pretty: bool,

    /// 待分析的起始地址
    url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ConfigManager::custom()
        .rules_path(cli.file)
        .backend(cli.backend)
        .user_agent(cli.useragent)
        .timeout_secs(cli.timeout)
        .loading_timeout_secs(cli.loadtimeout)
        .max_depth(cli.depth)
        .max_visited_links(cli.maxlinks)
        .delay_ms(cli.delay)
        .resolve_dns(!cli.no_dns)
        .build();

    let analyzer = SiteAnalyzer::new(config)
        .await
        .context("初始化失败")?;
    let output = analyzer
        .analyze(&cli.url)
        .await
        .with_context(|| format!("分析失败：{}", cli.url))?;

    let json = if cli.pretty {
        output.to_pretty_json()?
    } else {
        output.to_json()?
    };
    println!("{}", json);
    Ok(())
}

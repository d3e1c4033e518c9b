//! 应用程序入口 (Application Entrypoint)
//!
//! 负责 CLI 指令解析、遥测层初始化、依赖注入及系统生命周期管理。

use std::sync::Arc;

use clap::{Parser, Subcommand};
use submux::core::config::AppConfig;
use submux::dispatch::{self, AppState};
use submux::emit::{EmitOptions, Target};
use submux::storage::Storage;
use submux::storage::file::FileStorage;
use submux::storage::memory::MemoryStorage;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动 HTTP 订阅分发与管理服务
    Serve,
    /// 一次性转换：从本地文件读取订阅内容并输出到给定格式
    Convert {
        /// 订阅正文来源文件路径
        #[arg(short, long)]
        input: String,
        /// 目标格式 (clash/clashmeta/mihomo/stash/singbox/surge/surfboard/loon/quanx/shadowrocket/uri/base64/v2ray)
        #[arg(short, long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let config = Arc::new(AppConfig::load()?);
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Convert { input, target } => convert(&input, &target).await,
    }
}

async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let bind = config.bind.clone();
    let storage: Arc<dyn Storage> = match config.storage.backend {
        submux::core::config::StorageBackend::D1 => {
            tracing::warn!("D1 backend requested but not wired in this build, falling back to file storage");
            Arc::new(FileStorage::open("submux-data.json").await?)
        }
        submux::core::config::StorageBackend::Kv => {
            if std::env::var("SUBMUX_PERSIST_TO_DISK").is_ok() {
                Arc::new(FileStorage::open("submux-data.json").await?)
            } else {
                Arc::new(MemoryStorage::new())
            }
        }
    };

    let settings = match storage.get(submux::storage::KEY_SETTINGS).await {
        Ok(Some(raw)) => {
            serde_json::from_str::<submux::core::config::SubSettings>(&raw).unwrap_or_else(|_| config.settings.clone())
        }
        _ => config.settings.clone(),
    };
    let state = AppState {
        storage,
        client: reqwest::Client::new(),
        config,
        settings: Arc::new(parking_lot::RwLock::new(settings)),
    };
    let app = dispatch::router(state);

    tracing::info!(%bind, "listening");
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

async fn convert(input: &str, target: &str) -> anyhow::Result<()> {
    let body = tokio::fs::read_to_string(input).await?;
    let target =
        Target::parse_query(target).ok_or_else(|| anyhow::anyhow!("unknown target format: {target}"))?;
    let nodes: Vec<_> = submux::parse::parse_body(&body)
        .into_iter()
        .map(submux::normalize::normalize)
        .collect();
    let nodes = submux::process::process(nodes, &submux::process::ProcessOptions::default());
    let output = submux::emit::emit(target, &nodes, &EmitOptions::default())?;
    println!("{output}");
    Ok(())
}

//! aria2-watch - 打印 aria2 任务生命周期事件
//!
//! 环境变量：
//! - `ARIA2_URI`: RPC 地址（默认 http://localhost:6800/jsonrpc）
//! - `ARIA2_TOKEN`: RPC secret

use aria2_rpc::{Client, ClientConfig, EventKind, Tasks};
use anyhow::Result;
use futures_util::future::join_all;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("aria2_rpc=info".parse()?))
        .init();

    let config = ClientConfig::from_env().with_notify(true);
    tracing::info!("🚀 aria2-watch v{} → {}", env!("CARGO_PKG_VERSION"), config.uri);

    let client = Client::new(config).await?;
    match client.get_version().await {
        Ok(version) => tracing::info!("aria2 version: {}", version.version),
        Err(e) => tracing::warn!("Failed to query aria2 version: {}", e),
    }

    let notify = client.notify_listener().await?;

    let mut tasks = Tasks::new();
    for kind in EventKind::ALL {
        tasks.insert(
            kind,
            Box::new(move |gid: String| tracing::info!("{:?}: {}", kind, gid)),
        );
    }
    let handles = notify.listen_multiple(tasks);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("收到中断信号，准备退出...");
        }
        _ = join_all(handles) => {
            tracing::warn!("Notification stream ended");
        }
    }

    notify.close().await;
    client.close().await;

    let dropped = notify.stats().total_dropped();
    if dropped > 0 {
        tracing::warn!("{} events were dropped", dropped);
    }

    tracing::info!("👋 aria2-watch exiting");
    Ok(())
}

use anyhow::Context;
use table_server::{Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志) 并加载配置
    let config = setup_environment();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        work_dir = %config.work_dir,
        "Table server starting..."
    );

    // 2. 初始化服务器状态 (存储 + Hub)
    let state = ServerState::initialize(&config).context("failed to initialize server state")?;

    // 3. 启动 HTTP / WebSocket 服务
    let server = Server::new(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    Ok(())
}

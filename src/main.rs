//! domain-market 主入口
//! 连接钱包并持续同步账户变化，Ctrl-C 退出

use anyhow::{Context, Result};
use domain_market::{
    app_state::AppState, config::Config, domain::SessionEvent,
    infrastructure::logging::init_logging, utils::AddressValidator,
};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    // ✅ 1. 加载环境变量
    dotenvy::dotenv().ok();

    // ✅ 2. 加载配置（CONFIG_PATH 指向的 TOML 优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())
        .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // ✅ 3. 初始化日志
    init_logging(&config.logging).context("Failed to initialize logging")?;
    tracing::info!(
        contract = %config.contract.address,
        confirmations = config.contract.confirmations,
        "Starting domain-market"
    );

    // ✅ 4. 组装上下文并挂载监听
    let app = AppState::from_config(&config)?;
    let mut events = app.session.subscribe_events();
    if !app.mount() {
        tracing::warn!("No wallet detected; set WALLET_RPC_URL to connect");
        return Ok(());
    }

    // ✅ 5. 首次连接
    match app.connect_wallet().await {
        Some(account) => tracing::info!(
            account = %AddressValidator::to_checksum(&account),
            "Connected account"
        ),
        None => tracing::warn!("Wallet connection failed, waiting for account changes"),
    }

    // ✅ 6. 跟随钱包账户变化，直到退出
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SessionEvent::Connected { account }) => tracing::info!(
                    account = %AddressValidator::to_checksum(&account),
                    "Session updated"
                ),
                Ok(SessionEvent::Reset) => tracing::info!("Session cleared"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Session events lagged")
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    app.teardown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

use tokio::signal;
use tracing::{info, warn};

/// 等待 Ctrl+C；只读服务没有需要落盘的状态，收到信号即返回
pub async fn listen_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping server...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{RoutesConfig, StaticConfig};
use crate::services::{DashboardService, DashboardSettings};
use crate::storage::StoreFactory;

pub struct StartupContext {
    pub dashboard_service: Arc<DashboardService>,
    pub route_config: RoutesConfig,
}

/// 创建数据源并组装 `DashboardService`，server 与 report 共用
pub async fn build_dashboard_service(config: &StaticConfig) -> Result<Arc<DashboardService>> {
    let store = StoreFactory::create(&config.datastore)
        .await
        .context("Failed to create datastore backend")?;

    let settings = DashboardSettings::from_config(&config.dashboard);
    debug!(
        "Dashboard settings: offset={}, row_limit={}, top_codes={}, recent_window={}h",
        settings.offset,
        settings.row_limit,
        settings.top_codes,
        settings.recent_window.num_hours()
    );

    Ok(Arc::new(DashboardService::new(store, settings)))
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let dashboard_service = build_dashboard_service(config).await?;
    info!("Using datastore backend: {}", dashboard_service.backend_name());

    let route_config = config.routes.clone();
    if route_config.enable_frontend {
        info!("Dashboard UI available at: /");
    } else {
        warn!("Dashboard UI is disabled (routes.enable_frontend = false)");
    }
    info!("JSON API available at: {}", route_config.api_prefix);
    info!("Health API available at: {}", route_config.health_prefix);

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        dashboard_service,
        route_config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_startup_without_datastore_settings() {
        let config = StaticConfig::default();
        let ctx = prepare_server_startup(&config).await.unwrap();
        assert_eq!(ctx.dashboard_service.backend_name(), "unconfigured");
        assert_eq!(ctx.route_config.api_prefix, config.routes.api_prefix);
    }
}

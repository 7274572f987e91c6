use actix_web::{HttpResponse, Result};
use rust_embed::Embed;
use tracing::{trace, warn};

// 看板页面在编译时嵌入
#[derive(Embed)]
#[folder = "frontend/"]
struct FrontendAssets;

pub struct FrontendService;

impl FrontendService {
    /// 渲染看板页面，替换其中的路由占位符
    pub fn render_index(api_prefix: &str, health_prefix: &str) -> Option<String> {
        let content = FrontendAssets::get("index.html")?;
        let html = String::from_utf8_lossy(&content.data);
        Some(
            html.replace("%API_PREFIX%", api_prefix.trim_end_matches('/'))
                .replace("%HEALTH_PREFIX%", health_prefix)
                .replace("%FUNNELBOARD_VERSION%", env!("CARGO_PKG_VERSION")),
        )
    }

    pub async fn handle_index() -> Result<HttpResponse> {
        trace!("Serving dashboard page");

        let config = crate::config::get_config();
        match Self::render_index(&config.routes.api_prefix, &config.routes.health_prefix) {
            Some(html) => Ok(HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(html)),
            None => {
                warn!("Embedded index.html is missing");
                Ok(HttpResponse::NotFound().body("Dashboard page not found"))
            }
        }
    }
}

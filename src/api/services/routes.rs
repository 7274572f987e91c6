use actix_web::web;

use super::analytics::AnalyticsService;
use super::dashboard::DashboardApi;
use super::frontend::FrontendService;
use super::health::health_routes;
use super::helpers::query_config;
use super::records::RecordsService;
use crate::config::RoutesConfig;

/// 只读 JSON 路由
pub fn api_routes(prefix: &str) -> actix_web::Scope {
    web::scope(prefix)
        .app_data(query_config())
        .route("/analytics", web::get().to(AnalyticsService::summary))
        .route("/discount", web::get().to(RecordsService::discount))
        .route("/referral", web::get().to(RecordsService::referral))
        .route("/code_opens", web::get().to(RecordsService::code_opens))
        .route(
            "/code_input_events",
            web::get().to(RecordsService::code_input_events),
        )
        .route(
            "/code_all_fields_filled",
            web::get().to(RecordsService::code_all_fields_filled),
        )
        .route(
            "/form_submissions",
            web::get().to(RecordsService::form_submissions),
        )
        .route("/dashboard", web::get().to(DashboardApi::view))
}

/// 注册全部路由；调用方负责提供 `DashboardService` 与 `AppStartTime`
pub fn configure_routes(cfg: &mut web::ServiceConfig, routes: &RoutesConfig) {
    cfg.service(health_routes(&routes.health_prefix))
        .service(api_routes(&routes.api_prefix));

    if routes.enable_frontend {
        cfg.route("/", web::get().to(FrontendService::handle_index));
    }
}

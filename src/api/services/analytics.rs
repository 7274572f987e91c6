use actix_web::http::StatusCode;
use actix_web::{Responder, web};
use tracing::error;

use super::helpers::{error_response, success_response};
use crate::services::DashboardService;

/// 对外只暴露固定的错误信息，细节写日志
pub const ANALYTICS_ERROR: &str = "Failed to fetch analytics";

pub struct AnalyticsService;

impl AnalyticsService {
    pub async fn summary(service: web::Data<DashboardService>) -> impl Responder {
        match service.analytics().await {
            Ok(summary) => success_response(&summary),
            Err(e) => {
                error!("{}: {}", ANALYTICS_ERROR, e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, ANALYTICS_ERROR)
            }
        }
    }
}

use actix_web::{Responder, web};
use tracing::debug;

use super::helpers::api_result;
use crate::services::{DashboardQuery, DashboardService};

pub struct DashboardApi;

impl DashboardApi {
    /// 看板视图；日期参数无效时返回 400
    pub async fn view(
        service: web::Data<DashboardService>,
        query: web::Query<DashboardQuery>,
    ) -> impl Responder {
        debug!("Dashboard requested with {:?}", query);
        api_result(service.dashboard(&query).await)
    }
}

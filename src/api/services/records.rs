//! 单表读取路由
//!
//! discount / referral 原样返回；事件表附加联系人字段。

use actix_web::{Responder, web};
use tracing::trace;

use super::helpers::api_result;
use crate::services::DashboardService;
use crate::storage::ContactTable;

pub struct RecordsService;

impl RecordsService {
    pub async fn discount(service: web::Data<DashboardService>) -> impl Responder {
        trace!("Listing discount codes");
        api_result(service.contacts(ContactTable::Discount).await)
    }

    pub async fn referral(service: web::Data<DashboardService>) -> impl Responder {
        trace!("Listing referral codes");
        api_result(service.contacts(ContactTable::Referral).await)
    }

    pub async fn code_opens(service: web::Data<DashboardService>) -> impl Responder {
        api_result(service.code_opens().await)
    }

    pub async fn code_input_events(service: web::Data<DashboardService>) -> impl Responder {
        api_result(service.input_events().await)
    }

    pub async fn code_all_fields_filled(service: web::Data<DashboardService>) -> impl Responder {
        api_result(service.fields_filled().await)
    }

    pub async fn form_submissions(service: web::Data<DashboardService>) -> impl Responder {
        api_result(service.form_submissions().await)
    }
}

//! API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::FunnelError;

/// 失败时的响应体：`{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: &T) -> HttpResponse {
    HttpResponse::Ok()
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(data)
}

/// 构建错误响应
pub fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ErrorBody {
            error: message.into(),
        })
}

/// 从 FunnelError 构建错误响应（自动映射 HTTP 状态码）
pub fn error_from_funnel(err: &FunnelError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        error!("{} {}: {}", err.code(), err.error_type(), err.message());
    } else {
        warn!("{} {}: {}", err.code(), err.error_type(), err.message());
    }
    error_response(status, err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: Result<T, FunnelError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(&data),
        Err(e) => error_from_funnel(&e),
    }
}

/// 查询参数解析失败时同样返回 JSON 错误体
pub fn query_config() -> actix_web::web::QueryConfig {
    actix_web::web::QueryConfig::default().error_handler(|err, _req| {
        let response = error_response(StatusCode::BAD_REQUEST, err.to_string());
        actix_web::error::InternalError::from_response(err, response).into()
    })
}

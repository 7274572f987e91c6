//! HTTP 接口：只读 JSON 路由、健康检查与内嵌看板页面

pub mod middleware;
pub mod services;

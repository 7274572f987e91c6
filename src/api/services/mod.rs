pub mod analytics;
pub mod dashboard;
pub mod frontend;
pub mod health;
pub mod helpers;
pub mod records;
mod routes;

pub use analytics::AnalyticsService;
pub use dashboard::DashboardApi;
pub use frontend::FrontendService;
pub use health::{AppStartTime, HealthService, health_routes};
pub use helpers::ErrorBody;
pub use records::RecordsService;
pub use routes::{api_routes, configure_routes};

//! Service layer for business logic
//!
//! The pure transformations (`enrichment`, `filter`, `funnel`, `dashboard`)
//! never touch the datastore; `dashboard_service` performs the reads and is
//! shared between the HTTP API and the CLI report.

pub mod dashboard;
mod dashboard_service;
pub mod enrichment;
pub mod filter;
pub mod funnel;

pub use dashboard::{DashboardSettings, DashboardSnapshot, DashboardView, Dataset};
pub use dashboard_service::DashboardService;
pub use enrichment::{ContactDirectory, ContactSource, Enriched, EnrichedSubmission};
pub use filter::{CodeQuery, DashboardFilter, DashboardQuery, DateRange, TextFilter};
pub use funnel::{AnalyticsSummary, CompletionRate, FunnelRates};

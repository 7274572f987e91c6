//! Funnelboard - read-only marketing funnel analytics
//!
//! This library reads discount / referral contacts and code funnel events
//! from a hosted datastore, enriches every event with contact details and
//! serves conversion metrics as JSON plus an embedded dashboard page.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//! - **cli**: `report` and `config generate` commands
//!
//! # Architecture
//! - `storage`: Datastore backends (PostgREST over HTTP, SQL via sea-orm)
//! - `services`: Enrichment, filtering and funnel metrics
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;

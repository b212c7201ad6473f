//! rotta — request-time redirect resolution and cached XML sitemap serving.
//!
//! The crate is split into four layers:
//!
//! - [`domain`]: pure types and invariants (path normalization, rule
//!   patterns, status codes, persisted records)
//! - [`application`]: services and repository traits (resolver,
//!   auto-redirector, rule writes, sitemap generation)
//! - [`cache`]: the two-tier sitemap document cache and its background
//!   rebuild scheduling
//! - [`infra`]: Postgres adapters, HTTP routers, telemetry

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

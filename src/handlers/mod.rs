//! HTTP endpoint handlers for the service.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/sysinfo`: Process listing, termination and kill-list actions
//! - `/health`: Health check endpoint
//! - `/metrics`: Prometheus metrics endpoint
//! - `/html/`: Interactive dashboard driving `/sysinfo`
//! - `/`: Landing page

pub mod health;
pub mod html;
pub mod metrics;
pub mod root;
pub mod sysinfo;

// Re-export handlers
pub use health::health_handler;
pub use html::html_dashboard_handler;
pub use metrics::metrics_handler;
pub use root::root_handler;
pub use sysinfo::{sysinfo_get_handler, sysinfo_post_handler};

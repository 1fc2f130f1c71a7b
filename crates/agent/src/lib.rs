//! vSphere collector agent
//!
//! Runs the periodic collection loop and serves health, Prometheus and
//! on-demand collection endpoints.

pub mod api;
pub mod config;

//! Workflow and access-control engine for bank guarantee applications.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

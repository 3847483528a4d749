//! Employee intake: rule-script validation, remote registration and
//! configuration-driven notification for submitted employee records.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

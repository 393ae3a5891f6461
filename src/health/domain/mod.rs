//! Health domain types.

mod config;
mod record;
mod status;

pub use config::HealthMonitorConfig;
pub use record::{HealthRecord, HealthSnapshot, HealthSummary};
pub use status::{HealthStatus, ParseHealthStatusError};

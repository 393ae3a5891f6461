//! Health monitor service.

mod monitor;

pub use monitor::HealthMonitor;

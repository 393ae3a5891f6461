//! In-memory orchestrator integration tests.
//!
//! Tests are organized into modules by functionality:
//! - `session_tests`: Acceptance, serialisation, bounded history, closing
//! - `recovery_tests`: Journal replay after a crash
//! - `health_tests`: Health monitor resilience through the façade
//! - `facade_tests`: Session id policy, batches, error mapping

mod in_memory {
    pub mod helpers;

    mod facade_tests;
    mod health_tests;
    mod recovery_tests;
    mod session_tests;
}

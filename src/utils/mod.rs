//! Pure utility functions.
//!
//! Logging bootstrap and retry policies shared by provider implementations.

pub mod bootstrap;
pub mod retry;

pub use bootstrap::init_tracing;

//! Base types: configuration and error definitions.
//!
//! Provides the foundational pieces the rest of the pipeline threads
//! through explicitly:
//! - [`FetchError`]: the single failure currency of the crate
//! - [`FetchConfig`]: timeout budgets and the streaming threshold

pub mod config;
pub mod error;

pub use config::FetchConfig;
pub use error::{FetchError, TimeoutDomain};

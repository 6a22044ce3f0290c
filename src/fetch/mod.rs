//! The request pipeline: executor, stream coordinator, promises, and
//! abort controllers.
//!
//! Each request runs as its own spawned unit of work behind a
//! [`Promise`]; responses above the streaming threshold cross through a
//! [`StreamCoordinator`](coordinator) relay consumed via [`BodyStream`].

pub mod abort;
pub mod coordinator;
pub(crate) mod executor;
pub mod promise;

// Re-exports for convenience
pub use abort::AbortController;
pub use coordinator::BodyStream;
pub use promise::{Promise, Step};

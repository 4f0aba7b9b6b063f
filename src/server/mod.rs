//! Server shell around the connection engine: shared context, accept loop
//! and idle timer.

pub mod context;
pub mod listener;
pub mod timer;

pub use context::ServerContext;

//! Runtime orchestration.
//!
//! The [`StatusRuntime`] wires the components together and owns their
//! lifecycles: it builds the roster, runs the initial directory refresh,
//! starts the feed sources, the packet-to-status pipeline and the
//! dispatcher, and coordinates a graceful shutdown over a shared
//! cancellation token.

mod orchestrator;

pub use orchestrator::{RuntimeError, StatusRuntime};

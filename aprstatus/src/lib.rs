//! aprstatus - amateur radio presence for your team chat.
//!
//! This library listens to the APRS-IS network feed, matches position
//! reports against the callsigns found in a presence platform's user
//! directory, and publishes each operator's last heard location as their
//! custom status.
//!
//! # High-Level API
//!
//! The [`runtime`] module provides the assembled service:
//!
//! ```ignore
//! use aprstatus::config::Config;
//! use aprstatus::runtime::StatusRuntime;
//!
//! let runtime = StatusRuntime::start(Config::default()).await?;
//!
//! // ... until shutdown is requested
//! runtime.shutdown().await;
//! ```

pub mod config;
pub mod dispatch;
pub mod feed;
pub mod geo;
pub mod logging;
pub mod packet;
pub mod platform;
pub mod processor;
pub mod roster;
pub mod runtime;

/// Version of the aprstatus library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

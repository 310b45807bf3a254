//! Duffy Daemon - Adapters and wiring for the step-sync service
//!
//! The `duffyd` binary runs the coordinator, the paired-device link and
//! the periodic refresh. This library holds the pieces it shares with the
//! `duffy` CLI:
//!
//! - [`health`] - File-backed health data provider
//! - [`notify`] - Desktop (D-Bus) and log-only notifiers
//! - [`services`] - Builds every adapter from a configuration
//! - [`logging`] - Tracing subscriber set-up

pub mod health;
pub mod logging;
pub mod notify;
pub mod services;

pub use health::FileHealthProvider;
pub use notify::{connect_notifier, DesktopNotifier, LogNotifier};
pub use services::Services;

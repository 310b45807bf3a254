//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! core. Ports are interfaces that the use cases and the sync coordinator
//! depend on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IStepsCache`] - Persistent step records, goal and notification flags
//! - [`ISyncChannel`] - Messaging link to the paired device
//! - [`INotificationService`] - Local user notifications
//! - [`IHealthProvider`] - Source of step counts (opaque external provider)
//! - [`IClock`] - Device-local calendar day

pub mod clock;
pub mod health_provider;
pub mod notification;
pub mod steps_cache;
pub mod sync_channel;

pub use clock::{FixedClock, IClock, SystemClock};
pub use health_provider::{HealthError, IHealthProvider};
pub use notification::{INotificationService, Notification, NotificationPriority};
pub use steps_cache::IStepsCache;
pub use sync_channel::ISyncChannel;

//! Domain types and business rules
//!
//! This module contains the core domain types for Duffy:
//! - Newtypes for validated values (`DayKey`, `GoalValue`)
//! - Cached step records and notification flags
//! - The typed cross-device sync message and its wire codec
//! - Domain-specific error types

pub mod errors;
pub mod message;
pub mod newtypes;
pub mod steps;

// Re-export commonly used types
pub use errors::DomainError;
pub use message::{DecodedPayload, Delivery, SyncMessage};
pub use newtypes::{DayKey, GoalValue};
pub use steps::{NotificationFlag, StepsRecord};

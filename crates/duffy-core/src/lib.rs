//! Duffy Core - Domain logic for step-count caching and paired-device sync
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `DayKey`, `StepsRecord`, `GoalValue`, `NotificationFlag`, `SyncMessage`
//! - **Use cases** - `GoalNotifier`, `TodayStepsUseCase`, `WeekSummaryUseCase`
//! - **Port definitions** - Traits for adapters: `IStepsCache`, `ISyncChannel`,
//!   `INotificationService`, `IHealthProvider`, `IClock`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain values through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;

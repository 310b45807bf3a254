//! Use cases (interactors) for Duffy
//!
//! This module contains the application use cases that orchestrate
//! domain values and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`GoalNotifier`] - At-most-once-per-day goal-reached notification
//! - [`TodayStepsUseCase`] - Today's step count for display, with staleness
//! - [`WeekSummaryUseCase`] - The past week of step counts, newest first

pub mod goal_notifier;
pub mod today_steps;
pub mod week_summary;

#[cfg(test)]
pub(crate) mod test_support;

pub use goal_notifier::{Broadcast, GoalCheck, GoalNotifier};
pub use today_steps::{StepsDisplay, TodayStepsUseCase, TodaySummary};
pub use week_summary::{DaySteps, WeekSource, WeekSummary, WeekSummaryUseCase};

//! Notification service port (driven/secondary port)
//!
//! This module defines the interface for raising local notifications on
//! this device. Implementations may use the desktop notification bus or a
//! log-only fallback.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because notification delivery is adapter-specific.
//! - Notifications are fire-and-forget; the caller does not wait for
//!   user interaction and never retries a failed delivery.

use serde::{Deserialize, Serialize};

use crate::domain::GoalValue;

/// Priority level for a notification
///
/// Maps to urgency levels in notification systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Low priority, may not be shown immediately
    Low,
    /// Normal priority, shown in the notification area
    #[default]
    Normal,
    /// High priority, may trigger a banner or sound
    High,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// A notification to display to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Title of the notification (short, descriptive)
    pub title: String,
    /// Body text with details about the event
    pub body: String,
    /// Priority level affecting how the notification is displayed
    pub priority: NotificationPriority,
    /// Category for grouping/filtering (e.g., "goal")
    pub category: String,
}

impl Notification {
    /// Creates a new notification with the given title and body
    ///
    /// Uses `Normal` priority and an empty category by default.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
            category: String::new(),
        }
    }

    /// Sets the priority level
    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// The daily "goal reached" notification
    pub fn goal_reached(goal: GoalValue) -> Self {
        Self::new(
            "Daily goal reached",
            format!(
                "You reached your goal of {} steps today.",
                group_thousands(goal.steps())
            ),
        )
        .with_priority(NotificationPriority::High)
        .with_category("goal")
    }
}

/// Formats a step count with `,` thousands separators
pub fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Port trait for local notifications
///
/// Implementations should gracefully handle notification failures
/// (e.g., missing notification daemon) by returning an error, never by
/// panicking.
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Sends a notification to the user
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

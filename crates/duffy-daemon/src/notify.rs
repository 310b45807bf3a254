//! Local notification adapters
//!
//! - [`DesktopNotifier`] talks to the freedesktop notification service
//!   (`org.freedesktop.Notifications`) on the session bus.
//! - [`LogNotifier`] only logs; used when no session bus is available.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};
use zbus::zvariant::Value;

use duffy_core::ports::{INotificationService, Notification, NotificationPriority};

const NOTIFICATIONS_NAME: &str = "org.freedesktop.Notifications";
const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";
const NOTIFICATIONS_INTERFACE: &str = "org.freedesktop.Notifications";

const APP_NAME: &str = "Duffy";

/// Desktop notifications over D-Bus
pub struct DesktopNotifier {
    connection: zbus::Connection,
}

impl DesktopNotifier {
    /// Connects to the session bus
    pub async fn connect() -> anyhow::Result<Self> {
        let connection = zbus::Connection::session()
            .await
            .context("Failed to connect to the session bus")?;
        Ok(Self { connection })
    }
}

/// Freedesktop urgency hint (0 low, 1 normal, 2 critical)
fn urgency(priority: NotificationPriority) -> u8 {
    match priority {
        NotificationPriority::Low => 0,
        NotificationPriority::Normal => 1,
        NotificationPriority::High => 2,
    }
}

#[async_trait]
impl INotificationService for DesktopNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let proxy = zbus::Proxy::new(
            &self.connection,
            NOTIFICATIONS_NAME,
            NOTIFICATIONS_PATH,
            NOTIFICATIONS_INTERFACE,
        )
        .await
        .context("Failed to reach the notification service")?;

        let mut hints: HashMap<&str, Value<'_>> = HashMap::new();
        hints.insert("urgency", Value::from(urgency(notification.priority)));
        if !notification.category.is_empty() {
            hints.insert("category", Value::from(notification.category.as_str()));
        }
        let actions: Vec<&str> = Vec::new();

        let id: u32 = proxy
            .call(
                "Notify",
                &(
                    APP_NAME,
                    0u32,
                    "",
                    notification.title.as_str(),
                    notification.body.as_str(),
                    actions,
                    hints,
                    -1i32,
                ),
            )
            .await
            .context("Notify call failed")?;

        info!(id, title = %notification.title, "Desktop notification shown");
        Ok(())
    }
}

/// Notifier that writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl INotificationService for LogNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        info!(
            title = %notification.title,
            body = %notification.body,
            priority = %notification.priority,
            category = %notification.category,
            "Notification"
        );
        Ok(())
    }
}

/// Desktop notifier when the session bus is reachable, log-only otherwise
pub async fn connect_notifier() -> Arc<dyn INotificationService> {
    match DesktopNotifier::connect().await {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!(error = %e, "Desktop notifications unavailable, logging instead");
            Arc::new(LogNotifier)
        }
    }
}

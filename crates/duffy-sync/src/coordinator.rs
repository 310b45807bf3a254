//! Sync coordinator - merges paired-device messages into the step cache
//!
//! The [`SyncCoordinator`] holds no state of its own. It applies inbound
//! [`SyncMessage`]s to the cache, runs the goal check when a record for
//! today arrives, and tells the counterpart about local changes.
//!
//! ## Mailbox
//!
//! ```text
//! link listener ──deliver()──┐
//! refresh loop ──local_fetch()──→ mpsc ──→ SyncCoordinator (one at a time)
//! CLI ──change_goal()────────┘
//! ```
//!
//! All cache mutation and notification firing goes through the single
//! consumer spawned by [`SyncCoordinator::spawn`], so two events for the
//! same day can never interleave their check-then-mark sequence.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use duffy_core::domain::{DayKey, GoalValue, StepsRecord, SyncMessage};
use duffy_core::ports::{IClock, ISyncChannel, IStepsCache};
use duffy_core::usecases::{Broadcast, GoalCheck, GoalNotifier};

use crate::SyncError;

/// What an inbound message did to local state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The shared goal was stored
    GoalUpdated { goal: GoalValue },
    /// The counterpart's notification was recorded for `day`
    NotificationRecorded { day: DayKey },
    /// A snapshot was cached; `check` is `None` when it is not for today
    SnapshotCached {
        record: StepsRecord,
        check: Option<GoalCheck>,
    },
}

impl InboundOutcome {
    pub fn notified(&self) -> bool {
        matches!(
            self,
            InboundOutcome::SnapshotCached {
                check: Some(check),
                ..
            } if check.notified()
        )
    }
}

/// What recording a locally fetched record did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub record: StepsRecord,
    /// False when the record was for an earlier day and skipped the goal check
    pub is_today: bool,
    pub notified: bool,
    /// Whether `GoalNotificationSent` went out on the interactive path
    pub broadcast: bool,
}

/// Applies sync decisions; owned by the mailbox task once spawned
pub struct SyncCoordinator {
    cache: Arc<dyn IStepsCache>,
    goal_notifier: GoalNotifier,
    channel: Arc<dyn ISyncChannel>,
    clock: Arc<dyn IClock>,
}

impl SyncCoordinator {
    /// Creates a coordinator
    ///
    /// `goal_notifier` should share `cache` and `channel` with the
    /// coordinator so flags and broadcasts land in the same place.
    pub fn new(
        cache: Arc<dyn IStepsCache>,
        goal_notifier: GoalNotifier,
        channel: Arc<dyn ISyncChannel>,
        clock: Arc<dyn IClock>,
    ) -> Self {
        Self {
            cache,
            goal_notifier,
            channel,
            clock,
        }
    }

    /// Applies one message received from the paired device
    ///
    /// A snapshot for today may fire the local notification, but never
    /// re-broadcasts `GoalNotificationSent`: the counterpart produced the
    /// data and runs its own check.
    pub async fn handle_inbound(&self, message: SyncMessage) -> Result<InboundOutcome, SyncError> {
        debug!(kind = message.kind(), "Handling inbound sync message");

        match message {
            SyncMessage::StepsGoalUpdate { goal } => {
                self.cache.set_goal(goal).await.map_err(SyncError::storage)?;
                info!(goal = %goal, "Daily goal updated by paired device");
                Ok(InboundOutcome::GoalUpdated { goal })
            }
            SyncMessage::GoalNotificationSent { day } => {
                self.cache
                    .mark_notification_sent(&day)
                    .await
                    .map_err(SyncError::storage)?;
                info!(day = %day, "Paired device already sent the goal notification");
                Ok(InboundOutcome::NotificationRecorded { day })
            }
            SyncMessage::StepsDataSnapshot { day, steps } => {
                let record = StepsRecord::new(day, steps);
                self.cache.put(&record).await.map_err(SyncError::storage)?;

                let check = if self.is_today(&day) {
                    Some(
                        self.goal_notifier
                            .notify_if_reached(&record, Broadcast::Suppressed)
                            .await
                            .map_err(SyncError::storage)?,
                    )
                } else {
                    None
                };

                debug!(
                    day = %day,
                    steps,
                    notified = check.map(|c| c.notified()).unwrap_or(false),
                    "Cached snapshot from paired device"
                );
                Ok(InboundOutcome::SnapshotCached { record, check })
            }
        }
    }

    /// Records a step count fetched on this device
    ///
    /// The record is cached, checked against the goal when it is for today,
    /// and then always pushed to the counterpart in the background.
    pub async fn record_local_fetch(&self, record: StepsRecord) -> Result<FetchOutcome, SyncError> {
        self.cache.put(&record).await.map_err(SyncError::storage)?;

        let is_today = self.is_today(&record.day);
        let check = if is_today {
            self.goal_notifier
                .notify_if_reached(&record, Broadcast::ToCounterpart)
                .await
                .map_err(SyncError::storage)?
        } else {
            debug!(day = %record.day, "Fetched record is not for today, skipping goal check");
            GoalCheck::NotReached
        };

        self.channel.send_background(SyncMessage::snapshot(&record));

        let (notified, broadcast) = match check {
            GoalCheck::Notified { broadcast } => (true, broadcast),
            _ => (false, false),
        };

        info!(
            day = %record.day,
            steps = record.steps,
            notified,
            "Recorded local step fetch"
        );

        Ok(FetchOutcome {
            record,
            is_today,
            notified,
            broadcast,
        })
    }

    /// Stores a goal set on this device and tells the counterpart
    pub async fn change_goal(&self, goal: GoalValue) -> Result<(), SyncError> {
        self.cache.set_goal(goal).await.map_err(SyncError::storage)?;
        self.channel
            .send_interactive(SyncMessage::StepsGoalUpdate { goal });
        info!(goal = %goal, "Daily goal changed locally");
        Ok(())
    }

    fn is_today(&self, day: &DayKey) -> bool {
        *day == self.clock.today()
    }

    /// Moves the coordinator into its mailbox task
    ///
    /// The task runs until every [`CoordinatorHandle`] has been dropped.
    pub fn spawn(self, capacity: usize) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(self.run(rx));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(self, mut rx: mpsc::Receiver<Command>) {
        info!("Sync coordinator started");

        while let Some(command) = rx.recv().await {
            match command {
                Command::Inbound { message, reply } => {
                    let result = self.handle_inbound(message).await;
                    if let Err(e) = &result {
                        warn!(kind = message.kind(), error = %e, "Failed to apply inbound message");
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                Command::LocalFetch { record, reply } => {
                    let result = self.record_local_fetch(record).await;
                    if let Err(e) = &result {
                        warn!(day = %record.day, error = %e, "Failed to record local fetch");
                    }
                    let _ = reply.send(result);
                }
                Command::ChangeGoal { goal, reply } => {
                    let result = self.change_goal(goal).await;
                    if let Err(e) = &result {
                        warn!(goal = %goal, error = %e, "Failed to change goal");
                    }
                    let _ = reply.send(result);
                }
            }
        }

        info!("Sync coordinator stopped");
    }
}

enum Command {
    Inbound {
        message: SyncMessage,
        reply: Option<oneshot::Sender<Result<InboundOutcome, SyncError>>>,
    },
    LocalFetch {
        record: StepsRecord,
        reply: oneshot::Sender<Result<FetchOutcome, SyncError>>,
    },
    ChangeGoal {
        goal: GoalValue,
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
}

/// Cloneable entry point to a running coordinator
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Enqueues an inbound message without waiting for it to be applied
    pub async fn deliver(&self, message: SyncMessage) -> Result<(), SyncError> {
        self.tx
            .send(Command::Inbound {
                message,
                reply: None,
            })
            .await
            .map_err(|_| SyncError::MailboxClosed)
    }

    /// Enqueues an inbound message and waits until it has been applied
    pub async fn apply(&self, message: SyncMessage) -> Result<InboundOutcome, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Inbound {
                message,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SyncError::MailboxClosed)?;
        rx.await.map_err(|_| SyncError::MailboxClosed)?
    }

    /// Enqueues a locally fetched record and waits for the outcome
    pub async fn local_fetch(&self, record: StepsRecord) -> Result<FetchOutcome, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::LocalFetch { record, reply })
            .await
            .map_err(|_| SyncError::MailboxClosed)?;
        rx.await.map_err(|_| SyncError::MailboxClosed)?
    }

    /// Enqueues a local goal change and waits for it to be stored
    pub async fn change_goal(&self, goal: GoalValue) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::ChangeGoal { goal, reply })
            .await
            .map_err(|_| SyncError::MailboxClosed)?;
        rx.await.map_err(|_| SyncError::MailboxClosed)?
    }
}

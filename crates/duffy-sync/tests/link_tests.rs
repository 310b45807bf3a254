//! Loopback tests for the paired-device TCP link

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use duffy_cache::{DatabasePool, SqliteStepsCache};
use duffy_core::domain::{GoalValue, StepsRecord, SyncMessage};
use duffy_core::ports::{FixedClock, ISyncChannel, IStepsCache};
use duffy_core::usecases::GoalNotifier;
use duffy_sync::{LinkListener, LinkSettings, SyncCoordinator, TcpSyncChannel};

use common::{today, RecordingNotifier, RecordingSink};

fn settings(peer: SocketAddr) -> LinkSettings {
    LinkSettings {
        peer,
        connect_timeout: Duration::from_millis(300),
        retry_interval: Duration::from_millis(50),
        outbox_capacity: 16,
    }
}

/// An address nothing is listening on (yet)
fn free_addr() -> SocketAddr {
    let spare = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    spare.local_addr().unwrap()
}

async fn start_listener(
    addr: &str,
    sink: Arc<RecordingSink>,
) -> (SocketAddr, CancellationToken) {
    let listener = LinkListener::bind(addr, sink).await.unwrap();
    let local = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(listener.run(shutdown.clone()));
    (local, shutdown)
}

async fn wait_for(sink: &RecordingSink, count: usize) -> Vec<SyncMessage> {
    for _ in 0..200 {
        {
            let received = sink.received.lock().unwrap();
            if received.len() >= count {
                return received.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} messages, got {:?}",
        count,
        sink.received.lock().unwrap()
    );
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let sink = Arc::new(RecordingSink::default());
    let (addr, shutdown) = start_listener("127.0.0.1:0", sink.clone()).await;
    let channel = TcpSyncChannel::connect(settings(addr));

    let sent = vec![
        SyncMessage::StepsGoalUpdate {
            goal: GoalValue::new(8000),
        },
        SyncMessage::StepsDataSnapshot {
            day: today(),
            steps: 100,
        },
        SyncMessage::GoalNotificationSent { day: today() },
        SyncMessage::StepsDataSnapshot {
            day: today(),
            steps: 200,
        },
    ];
    channel.send_interactive(sent[0]);
    channel.send_background(sent[1]);
    channel.send_interactive(sent[2]);
    channel.send_background(sent[3]);

    assert_eq!(wait_for(&sink, 4).await, sent);

    channel.shutdown().await;
    shutdown.cancel();
}

#[tokio::test]
async fn test_background_waits_for_counterpart() {
    let addr = free_addr();
    let channel = TcpSyncChannel::connect(settings(addr));
    let snapshot = SyncMessage::StepsDataSnapshot {
        day: today(),
        steps: 4200,
    };

    channel.send_background(snapshot);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sink = Arc::new(RecordingSink::default());
    let (_, shutdown) = start_listener(&addr.to_string(), sink.clone()).await;

    assert_eq!(wait_for(&sink, 1).await, vec![snapshot]);

    channel.shutdown().await;
    shutdown.cancel();
}

#[tokio::test]
async fn test_interactive_is_dropped_while_counterpart_is_down() {
    let addr = free_addr();
    let channel = TcpSyncChannel::connect(settings(addr));

    channel.send_interactive(SyncMessage::StepsGoalUpdate {
        goal: GoalValue::new(1),
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sink = Arc::new(RecordingSink::default());
    let (_, shutdown) = start_listener(&addr.to_string(), sink.clone()).await;

    let marker = SyncMessage::GoalNotificationSent { day: today() };
    channel.send_background(marker);

    assert_eq!(wait_for(&sink, 1).await, vec![marker]);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.received.lock().unwrap().len(), 1);

    channel.shutdown().await;
    shutdown.cancel();
}

#[tokio::test]
async fn test_shutdown_flushes_outbox() {
    let sink = Arc::new(RecordingSink::default());
    let (addr, shutdown) = start_listener("127.0.0.1:0", sink.clone()).await;
    let channel = TcpSyncChannel::connect(settings(addr));

    let goal = SyncMessage::StepsGoalUpdate {
        goal: GoalValue::new(12_345),
    };
    channel.send_background(goal);
    channel.shutdown().await;

    assert_eq!(wait_for(&sink, 1).await, vec![goal]);

    // Sends after shutdown are dropped quietly
    channel.send_background(goal);
    shutdown.cancel();
}

#[tokio::test]
async fn test_background_survives_counterpart_restart() {
    let first = Arc::new(RecordingSink::default());
    let (addr, first_shutdown) = start_listener("127.0.0.1:0", first.clone()).await;
    let channel = TcpSyncChannel::connect(settings(addr));

    let before = SyncMessage::StepsDataSnapshot {
        day: today(),
        steps: 1,
    };
    channel.send_background(before);
    assert_eq!(wait_for(&first, 1).await, vec![before]);

    // Counterpart restarts on the same address; the writer still holds the old connection
    first_shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let restarted = Arc::new(RecordingSink::default());
    let (_, restarted_shutdown) = start_listener(&addr.to_string(), restarted.clone()).await;

    let after = SyncMessage::StepsDataSnapshot {
        day: today(),
        steps: 2,
    };
    channel.send_background(after);

    assert_eq!(wait_for(&restarted, 1).await, vec![after]);
    assert_eq!(first.received.lock().unwrap().len(), 1);

    channel.shutdown().await;
    restarted_shutdown.cancel();
}

#[tokio::test]
async fn test_bind_rejects_bad_address() {
    let sink = Arc::new(RecordingSink::default());
    assert!(LinkListener::bind("not an address", sink).await.is_err());
}

/// Watch side: a real coordinator behind the listener
#[tokio::test]
async fn test_paired_devices_share_one_notification() {
    // Watch
    let pool = DatabasePool::in_memory().await.unwrap();
    let clock = Arc::new(FixedClock::new(today()));
    let watch_cache = Arc::new(SqliteStepsCache::new(pool.pool().clone(), clock.clone()));
    let watch_notifier = Arc::new(RecordingNotifier::default());
    let watch_channel = Arc::new(TcpSyncChannel::disabled());
    let goal_notifier = GoalNotifier::new(
        watch_cache.clone(),
        watch_notifier.clone(),
        watch_channel.clone(),
    );
    let (watch_handle, _task) =
        SyncCoordinator::new(watch_cache.clone(), goal_notifier, watch_channel, clock.clone())
            .spawn(16);

    let listener = LinkListener::bind("127.0.0.1:0", Arc::new(watch_handle.clone()))
        .await
        .unwrap();
    let watch_addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    tokio::spawn(listener.run(shutdown.clone()));

    // Phone, with a TCP channel pointed at the watch
    let phone_pool = DatabasePool::in_memory().await.unwrap();
    let phone_cache = Arc::new(SqliteStepsCache::new(
        phone_pool.pool().clone(),
        clock.clone(),
    ));
    let phone_notifier = Arc::new(RecordingNotifier::default());
    let phone_channel = Arc::new(TcpSyncChannel::connect(settings(watch_addr)));
    let goal_notifier = GoalNotifier::new(
        phone_cache.clone(),
        phone_notifier.clone(),
        phone_channel.clone(),
    );
    let (phone_handle, _task) = SyncCoordinator::new(
        phone_cache.clone(),
        goal_notifier,
        phone_channel.clone(),
        clock.clone(),
    )
    .spawn(16);

    watch_cache.set_goal(GoalValue::new(10_000)).await.unwrap();
    phone_handle.change_goal(GoalValue::new(10_000)).await.unwrap();
    let outcome = phone_handle
        .local_fetch(StepsRecord::new(today(), 10_200))
        .await
        .unwrap();
    assert!(outcome.notified);

    let mut synced = false;
    for _ in 0..200 {
        if watch_cache.get(&today()).await.unwrap() == Some(StepsRecord::new(today(), 10_200)) {
            synced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(synced, "snapshot never reached the watch");

    // GoalNotificationSent went out before the snapshot, so the watch stays quiet
    assert!(watch_cache.get_notification_flag(&today()).await.unwrap().sent);
    assert_eq!(watch_notifier.count(), 0);
    assert_eq!(phone_notifier.count(), 1);

    phone_channel.shutdown().await;
    shutdown.cancel();
}

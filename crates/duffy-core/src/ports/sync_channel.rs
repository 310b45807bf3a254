//! Paired-device channel port (driven/secondary port)
//!
//! Abstracts the transport between the two paired devices. Every send is
//! fire-and-forget: link-down, not-activated and not-supported conditions
//! are logged by the adapter and never reported to the caller.
//!
//! Inbound messages are delivered by the adapter to whatever sink it was
//! constructed with, once per message and in arrival order.

use crate::domain::SyncMessage;

/// Port trait for sending messages to the paired device
pub trait ISyncChannel: Send + Sync {
    /// Sends immediately if the counterpart is reachable; dropped otherwise
    fn send_interactive(&self, message: SyncMessage);

    /// Queues for eventual delivery even if the counterpart is unreachable now
    fn send_background(&self, message: SyncMessage);
}

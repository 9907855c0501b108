//! Lifecycle events passed from the wireless stack's callback context to
//! the main loop through the [`EventBus`](crate::events::EventBus).

use core::fmt;

/// Link state change, consumed exactly once by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A peer connected successfully.
    Connected,
    /// The peer link dropped; carries the HCI reason code.
    Disconnected(u8),
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "CONNECTED"),
            Self::Disconnected(reason) => write!(f, "DISCONNECTED (reason 0x{reason:02x})"),
        }
    }
}

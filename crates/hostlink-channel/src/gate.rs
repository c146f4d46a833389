//! Single-assignment gate holding the one session per channel.
//!
//! Many readers, one delayed writer, exactly-once write: operations started
//! before `connect` completes park here and all wake with the same session.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ChannelError;
use crate::session::Session;

pub(crate) struct ConnectionGate {
    slot: watch::Sender<Option<Arc<Session>>>,
}

impl ConnectionGate {
    pub(crate) fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Publish the session and wake every current and future waiter.
    ///
    /// Fails with [`ChannelError::AlreadyConnected`] if a session was
    /// already published; the stored session is never replaced.
    pub(crate) fn resolve(&self, session: Arc<Session>) -> Result<(), ChannelError> {
        let mut stored = false;
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(session);
            stored = true;
            true
        });

        if stored {
            Ok(())
        } else {
            Err(ChannelError::AlreadyConnected)
        }
    }

    /// Suspend until a session is available, then return it.
    ///
    /// Never times out on its own; a deadline belongs on the caller's token.
    pub(crate) async fn wait(&self, token: &CancellationToken) -> Result<Arc<Session>, ChannelError> {
        let mut slot = self.slot.subscribe();
        tokio::select! {
            () = token.cancelled() => Err(ChannelError::Cancelled),
            resolved = slot.wait_for(Option::is_some) => {
                let guard = resolved.map_err(|_| ChannelError::Disconnected)?;
                guard.as_ref().map(Arc::clone).ok_or(ChannelError::Disconnected)
            }
        }
    }
}

//! The channel façade: lazy connect plus the typed operation surface.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::json;
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hostlink_rpc::methods;
use hostlink_rpc::types::{DashboardUrls, PublishingActivity, ResourceState};

use crate::dispatch::RequestDispatcher;
use crate::error::ChannelError;
use crate::gate::ConnectionGate;
use crate::session::Session;
use crate::stream::RemoteStream;

/// Identifier of the spawned application-host process. Held for diagnostics
/// only; supervision stays with the launcher that spawned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostProcess {
    pub pid: u32,
}

/// Client side of the backchannel to one application host.
///
/// Operations may be invoked before [`connect`](Self::connect) completes;
/// they park on the internal gate and all proceed over the single session
/// once it exists. The channel never reconnects: a dropped session fails
/// every in-flight and future call, and a fresh host needs a fresh channel.
pub struct Channel {
    gate: ConnectionGate,
    host: OnceLock<Option<HostProcess>>,
    connect_attempted: AtomicBool,
}

impl Channel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            gate: ConnectionGate::new(),
            host: OnceLock::new(),
            connect_attempted: AtomicBool::new(false),
        }
    }

    /// The process this channel is attached to, once known.
    #[must_use]
    pub fn host_process(&self) -> Option<HostProcess> {
        self.host.get().copied().flatten()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.gate.is_resolved()
    }

    /// Establish the transport: open the unix socket at `socket_path`,
    /// attach a session bound to `dispatcher`, and release every operation
    /// waiting on the gate.
    ///
    /// # Errors
    ///
    /// [`ChannelError::AlreadyConnected`] if `connect` was already called
    /// on this channel, whatever the outcome or timing of that first call
    /// (checked before any socket is opened). [`ChannelError::Cancelled`]
    /// if the token fires before the socket connects, or
    /// [`ChannelError::Io`] if the connect itself fails; in both cases the
    /// gate stays unresolved and the channel is permanently unconnectable.
    /// There is no retry inside the channel.
    pub async fn connect(
        &self,
        process: Option<HostProcess>,
        socket_path: impl AsRef<Path>,
        dispatcher: Arc<dyn RequestDispatcher>,
        token: &CancellationToken,
    ) -> Result<(), ChannelError> {
        let socket_path = socket_path.as_ref();

        // One attempt per channel, even if it never reached the socket.
        if self.connect_attempted.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::AlreadyConnected);
        }
        let _ = self.host.set(process);

        debug!(path = %socket_path.display(), "connecting to application host");
        let stream = tokio::select! {
            () = token.cancelled() => return Err(ChannelError::Cancelled),
            connected = UnixStream::connect(socket_path) => connected?,
        };
        debug!(path = %socket_path.display(), "connected to application host");

        let session = Session::attach(stream, dispatcher);
        self.gate.resolve(session)
    }

    /// Liveness probe: send a timestamp, get the host's echo back. Useful
    /// for round-trip measurement; the value itself carries no contract.
    ///
    /// # Errors
    ///
    /// Cancellation, host fault, or transport failure for this one call.
    pub async fn ping(&self, timestamp: i64, token: &CancellationToken) -> Result<i64, ChannelError> {
        let session = self.gate.wait(token).await?;
        debug!(timestamp, "sending ping");
        let reply = session
            .invoke(methods::PING, vec![json!(timestamp)], token)
            .await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Ask the host to begin a graceful shutdown. The host drives the
    /// actual teardown; the caller keeps awaiting the host's exit through
    /// whatever spawned it.
    ///
    /// # Errors
    ///
    /// Cancellation, host fault, or transport failure for this one call.
    pub async fn request_stop(&self, token: &CancellationToken) -> Result<(), ChannelError> {
        let session = self.gate.wait(token).await?;
        debug!("requesting stop");
        session
            .invoke(methods::REQUEST_STOP, Vec::new(), token)
            .await?;
        Ok(())
    }

    /// Where the host's dashboard can be reached.
    ///
    /// # Errors
    ///
    /// Cancellation, host fault, or transport failure for this one call.
    pub async fn dashboard_urls(&self, token: &CancellationToken) -> Result<DashboardUrls, ChannelError> {
        let session = self.gate.wait(token).await?;
        debug!("requesting dashboard urls");
        let reply = session
            .invoke(methods::DASHBOARD_URLS, Vec::new(), token)
            .await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// The ordered list of publishers the host knows about.
    ///
    /// # Errors
    ///
    /// Cancellation, host fault, or transport failure for this one call.
    pub async fn publishers(&self, token: &CancellationToken) -> Result<Vec<String>, ChannelError> {
        let session = self.gate.wait(token).await?;
        debug!("requesting publishers");
        let reply = session
            .invoke(methods::PUBLISHERS, Vec::new(), token)
            .await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Subscribe to resource-state snapshots. Elements arrive in the
    /// host's emission order; later snapshots for the same resource
    /// supersede earlier ones, and nothing is deduplicated here.
    ///
    /// # Errors
    ///
    /// Cancellation, host fault on the subscription, or transport failure.
    pub async fn resource_states(
        &self,
        token: &CancellationToken,
    ) -> Result<RemoteStream<ResourceState>, ChannelError> {
        let session = self.gate.wait(token).await?;
        debug!("subscribing to resource states");
        session
            .invoke_streaming(methods::RESOURCE_STATES, Vec::new(), token)
            .await
    }

    /// Subscribe to publishing-activity updates. Consumers should stop
    /// treating an id as active once its completion or error flag is set;
    /// the stream itself runs until the host ends it.
    ///
    /// # Errors
    ///
    /// Cancellation, host fault on the subscription, or transport failure.
    pub async fn publishing_activities(
        &self,
        token: &CancellationToken,
    ) -> Result<RemoteStream<PublishingActivity>, ChannelError> {
        let session = self.gate.wait(token).await?;
        debug!("subscribing to publishing activities");
        session
            .invoke_streaming(methods::PUBLISHING_ACTIVITIES, Vec::new(), token)
            .await
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new()
    }
}

//! Error taxonomy for backchannel operations.
//!
//! Every failure reaches the caller of the specific operation that observed
//! it; nothing is swallowed or retried. Cancellation is its own variant so
//! callers can tell voluntary abandonment from failure.

use hostlink_rpc::protocol::RpcFault;
use hostlink_rpc::transport::CodecError;

/// Errors surfaced by [`Channel`](crate::Channel) operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// `connect` was called on a channel that already holds a session.
    /// A programming error, not a retryable condition.
    #[error("already connected to the application host")]
    AlreadyConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller's cancellation token fired while waiting on the gate, an
    /// in-flight call, or a stream pull.
    #[error("operation cancelled")]
    Cancelled,

    /// The host reported an error for this one call.
    #[error("host fault {code}: {message}")]
    Fault { code: i32, message: String },

    /// The session or socket closed out from under the channel. The channel
    /// is unusable from this point; a new one must be created.
    #[error("connection closed")]
    Disconnected,

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChannelError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }
}

impl From<RpcFault> for ChannelError {
    fn from(fault: RpcFault) -> Self {
        Self::Fault {
            code: fault.code,
            message: fault.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;

//! Shared JSON-RPC 2.0 protocol definitions for the hostlink backchannel.
//!
//! Everything that must agree between the controlling CLI and the
//! application host lives here:
//!
//! - [`protocol`]: JSON-RPC 2.0 message types, fault codes, operation names,
//!   and the server-streaming notification envelope
//! - [`transport`]: length-prefixed codec framing messages over a
//!   unix-domain stream socket
//! - [`types`]: payload types carried by the backchannel operations
//!
//! The lazily connecting client built on these definitions lives in
//! `hostlink-channel`.

pub mod protocol;
pub mod transport;
pub mod types;

// Re-export protocol types
pub use protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, Message,
    PARSE_ERROR, Request, RequestId, Response, RpcFault, STREAM_END, STREAM_FAULT, STREAM_ITEM,
    StreamEnd, StreamFault, StreamItem, methods,
};

// Re-export transport types
pub use transport::{CodecError, WireCodec};

// Re-export operation payload types
pub use types::{DashboardUrls, PublishingActivity, ResourceState};

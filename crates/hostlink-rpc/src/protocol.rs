//! JSON-RPC 2.0 protocol types for the backchannel.
//!
//! Requests flow in both directions over one socket: the CLI invokes the
//! operations in [`methods`] on the host, and the host may call back into
//! the CLI's dispatcher. Server-driven streams ride on notifications
//! carrying the originating request id (see the `STREAM_*` methods).

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Remote operation names the backchannel depends on.
///
/// Argument lists are positional; the no-argument operations send an empty
/// positional list, not an absent `params` field.
pub mod methods {
    pub const PING: &str = "PingAsync";
    pub const REQUEST_STOP: &str = "RequestStopAsync";
    pub const DASHBOARD_URLS: &str = "GetDashboardUrlsAsync";
    pub const PUBLISHERS: &str = "GetPublishersAsync";
    pub const RESOURCE_STATES: &str = "GetResourceStatesAsync";
    pub const PUBLISHING_ACTIVITIES: &str = "GetPublishingActivitiesAsync";
}

/// Notification method delivering one element of a server-driven stream.
pub const STREAM_ITEM: &str = "stream/item";
/// Notification method marking normal completion of a stream.
pub const STREAM_END: &str = "stream/end";
/// Notification method terminating a stream with a host-reported fault.
pub const STREAM_FAULT: &str = "stream/fault";

/// JSON-RPC 2.0 request id.
///
/// The client only ever issues numeric ids; the string form exists because
/// the host is free to use either for its own calls back into the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(n)
    }
}

/// JSON-RPC 2.0 request. A request without an id is a notification and
/// receives no response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response. Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
    pub id: RequestId,
}

impl Response {
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    #[must_use]
    pub fn error(id: RequestId, fault: RpcFault) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(fault),
            id,
        }
    }
}

/// JSON-RPC 2.0 error object, as reported by the remote endpoint for one
/// specific call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcFault {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }
}

impl std::fmt::Display for RpcFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fault {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcFault {}

/// Any frame on the wire. Requests carry a `method`; responses carry an
/// `id` with `result` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
}

/// Params of a [`STREAM_ITEM`] notification. `id` is the request id of the
/// streaming call this element belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamItem {
    pub id: u64,
    pub item: Value,
}

/// Params of a [`STREAM_END`] notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEnd {
    pub id: u64,
}

/// Params of a [`STREAM_FAULT`] notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFault {
    pub id: u64,
    pub error: RpcFault,
}

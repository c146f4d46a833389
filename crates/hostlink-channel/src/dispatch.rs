//! Inbound call surface the host may invoke on this process.
//!
//! The dispatcher is supplied by the embedding application and attached at
//! connect time; the channel itself never interprets inbound methods beyond
//! the stream envelope.

use serde_json::Value;

use hostlink_rpc::protocol::RpcFault;

/// Target for requests and notifications arriving from the host.
///
/// `dispatch` runs on the session's reader task, so implementations should
/// answer quickly and hand real work to their own tasks.
pub trait RequestDispatcher: Send + Sync + 'static {
    /// Handle an inbound request; the returned value (or fault) is sent
    /// back to the host as the response.
    ///
    /// # Errors
    ///
    /// Returns the fault to report to the host for this call.
    fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcFault>;

    /// Handle an inbound notification that is not stream traffic.
    fn notify(&self, method: &str, params: Option<Value>) {
        let _ = (method, params);
    }
}

/// Dispatcher that rejects every inbound request with a method-not-found
/// fault. Suitable when the embedding process exposes no callback surface.
pub struct NullDispatcher;

impl RequestDispatcher for NullDispatcher {
    fn dispatch(&self, method: &str, _params: Option<Value>) -> Result<Value, RpcFault> {
        tracing::debug!(method, "rejecting inbound request");
        Err(RpcFault::method_not_found())
    }
}

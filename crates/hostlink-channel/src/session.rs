//! The RPC session attached to one connected socket.
//!
//! One reader task per session routes inbound frames: responses to the
//! pending-call table, stream notifications to per-call routes, everything
//! else to the dispatcher. Concurrent calls need no locking beyond the
//! shared sink; responses are matched to requests by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use hostlink_rpc::protocol::{
    Message, Request, RequestId, Response, STREAM_END, STREAM_FAULT, STREAM_ITEM, StreamEnd,
    StreamFault, StreamItem,
};
use hostlink_rpc::transport::WireCodec;

use crate::dispatch::RequestDispatcher;
use crate::error::ChannelError;
use crate::stream::{RemoteStream, StreamEvent};

/// Inbound window per stream route. Backpressure past this point holds the
/// reader task, which in turn holds the socket.
const STREAM_WINDOW: usize = 64;

type Sink = SplitSink<Framed<UnixStream, WireCodec>, Message>;
type Source = SplitStream<Framed<UnixStream, WireCodec>>;
type PendingCalls = Mutex<HashMap<u64, oneshot::Sender<Result<Response, ChannelError>>>>;
type StreamRoutes = Mutex<HashMap<u64, mpsc::Sender<StreamEvent>>>;

/// One attached RPC binding over one established connection.
///
/// The session owns the socket: when the last handle drops, the reader task
/// stops and the socket closes with it. A session is never reattached or
/// replaced; once it drops, every in-flight and future call fails.
#[derive(Debug)]
pub struct Session {
    sink: Arc<Mutex<Sink>>,
    pending: Arc<PendingCalls>,
    routes: Arc<StreamRoutes>,
    closed: Arc<AtomicBool>,
    stop_reading: CancellationToken,
    next_id: AtomicU64,
}

impl Session {
    /// Attach an RPC session to a connected socket, bound to the given
    /// dispatcher for inbound calls.
    pub(crate) fn attach(stream: UnixStream, dispatcher: Arc<dyn RequestDispatcher>) -> Arc<Self> {
        let (sink, source) = Framed::new(stream, WireCodec::new()).split();

        let session = Arc::new(Self {
            sink: Arc::new(Mutex::new(sink)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            routes: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
            stop_reading: CancellationToken::new(),
            next_id: AtomicU64::new(1),
        });

        tokio::spawn(read_loop(
            source,
            Arc::clone(&session.sink),
            Arc::clone(&session.pending),
            Arc::clone(&session.routes),
            Arc::clone(&session.closed),
            session.stop_reading.clone(),
            dispatcher,
        ));

        session
    }

    /// Invoke a remote operation with positional arguments and wait for its
    /// single response value.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Cancelled`] if the token fires while the call is
    /// outstanding (the host may still process it), [`ChannelError::Fault`]
    /// if the host reports an error for this call, and a transport-class
    /// error if the connection is gone.
    pub async fn invoke(
        &self,
        method: &str,
        args: Vec<Value>,
        token: &CancellationToken,
    ) -> Result<Value, ChannelError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self.call(id, method, args, token).await?;

        if let Some(fault) = response.error {
            return Err(fault.into());
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Invoke a remote operation whose response is a server-driven stream.
    ///
    /// The stream route is registered before the request goes out, so no
    /// element can be lost between the host's acknowledgement and the first
    /// pull.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`invoke`](Self::invoke); a fault on the
    /// acknowledgement tears the route down before it is handed out.
    pub async fn invoke_streaming<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
        token: &CancellationToken,
    ) -> Result<RemoteStream<T>, ChannelError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let (event_tx, event_rx) = mpsc::channel(STREAM_WINDOW);
        {
            let mut routes = self.routes.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChannelError::Disconnected);
            }
            routes.insert(id, event_tx);
        }

        let acknowledged: Result<(), ChannelError> =
            self.call(id, method, args, token).await.and_then(|ack| match ack.error {
                Some(fault) => Err(fault.into()),
                None => Ok(()),
            });
        if let Err(e) = acknowledged {
            self.routes.lock().await.remove(&id);
            return Err(e);
        }

        debug!(method, id, "stream subscribed");
        Ok(RemoteStream::new(event_rx))
    }

    /// Send one request and wait for the matching response, honoring the
    /// caller's token. The pending entry is cleaned up on every exit path.
    async fn call(
        &self,
        id: u64,
        method: &str,
        args: Vec<Value>,
        token: &CancellationToken,
    ) -> Result<Response, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(ChannelError::Disconnected);
            }
            pending.insert(id, reply_tx);
        }

        debug!(method, id, "sending request");
        let request = Request::new(method, Some(Value::Array(args)), RequestId::Number(id));
        if let Err(e) = self.send(Message::Request(request)).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        tokio::select! {
            () = token.cancelled() => {
                self.pending.lock().await.remove(&id);
                Err(ChannelError::Cancelled)
            }
            outcome = reply_rx => outcome.map_err(|_| ChannelError::Disconnected)?,
        }
    }

    async fn send(&self, message: Message) -> Result<(), ChannelError> {
        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(ChannelError::from)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_reading.cancel();
    }
}

/// Routes every inbound frame until the socket ends, the codec fails, or
/// the session is dropped; then fails everything still waiting.
async fn read_loop(
    mut source: Source,
    sink: Arc<Mutex<Sink>>,
    pending: Arc<PendingCalls>,
    routes: Arc<StreamRoutes>,
    closed: Arc<AtomicBool>,
    stop_reading: CancellationToken,
    dispatcher: Arc<dyn RequestDispatcher>,
) {
    loop {
        let frame = tokio::select! {
            () = stop_reading.cancelled() => break,
            frame = source.next() => frame,
        };

        match frame {
            Some(Ok(Message::Response(response))) => {
                settle_response(&pending, response).await;
            }
            Some(Ok(Message::Request(request))) => {
                handle_inbound(request, &sink, &routes, dispatcher.as_ref()).await;
            }
            Some(Err(e)) => {
                warn!("backchannel transport failed: {e}");
                break;
            }
            None => {
                debug!("backchannel closed by the host");
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    for (_, waiter) in pending.lock().await.drain() {
        let _ = waiter.send(Err(ChannelError::Disconnected));
    }
    // Dropping the route senders wakes every open stream with a transport
    // error rather than a normal completion.
    routes.lock().await.clear();
}

async fn settle_response(pending: &PendingCalls, response: Response) {
    let id = match &response.id {
        RequestId::Number(n) => *n,
        RequestId::Text(text) => {
            warn!(id = %text, "discarding response with an id this client never issued");
            return;
        }
    };

    match pending.lock().await.remove(&id) {
        Some(waiter) => {
            let _ = waiter.send(Ok(response));
        }
        None => debug!(id, "response arrived after its call was abandoned"),
    }
}

async fn handle_inbound(
    request: Request,
    sink: &Mutex<Sink>,
    routes: &StreamRoutes,
    dispatcher: &dyn RequestDispatcher,
) {
    let Request {
        method, params, id, ..
    } = request;

    let Some(id) = id else {
        route_notification(&method, params, routes, dispatcher).await;
        return;
    };

    let reply = match dispatcher.dispatch(&method, params) {
        Ok(value) => Response::success(id, value),
        Err(fault) => Response::error(id, fault),
    };
    if let Err(e) = sink.lock().await.send(Message::Response(reply)).await {
        warn!(method, "failed to answer inbound request: {e}");
    }
}

async fn route_notification(
    method: &str,
    params: Option<Value>,
    routes: &StreamRoutes,
    dispatcher: &dyn RequestDispatcher,
) {
    match method {
        STREAM_ITEM => {
            let Some(envelope) = decode_envelope::<StreamItem>(method, params) else {
                return;
            };
            deliver(routes, envelope.id, StreamEvent::Item(envelope.item), false).await;
        }
        STREAM_END => {
            let Some(envelope) = decode_envelope::<StreamEnd>(method, params) else {
                return;
            };
            deliver(routes, envelope.id, StreamEvent::End, true).await;
        }
        STREAM_FAULT => {
            let Some(envelope) = decode_envelope::<StreamFault>(method, params) else {
                return;
            };
            deliver(routes, envelope.id, StreamEvent::Fault(envelope.error), true).await;
        }
        _ => dispatcher.notify(method, params),
    }
}

fn decode_envelope<T: serde::de::DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> Option<T> {
    let Some(params) = params else {
        warn!(method, "stream notification without params");
        return None;
    };
    match serde_json::from_value(params) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!(method, "malformed stream notification: {e}");
            None
        }
    }
}

/// Hand one event to its route. Terminal events and dead receivers both
/// retire the route.
async fn deliver(routes: &StreamRoutes, id: u64, event: StreamEvent, terminal: bool) {
    let route = routes.lock().await.get(&id).cloned();
    let Some(route) = route else {
        debug!(id, "stream event with no live route");
        return;
    };

    let receiver_gone = route.send(event).await.is_err();
    if terminal || receiver_gone {
        routes.lock().await.remove(&id);
    }
}

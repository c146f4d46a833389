//! Lazy, pull-based view of a server-driven stream.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hostlink_rpc::protocol::RpcFault;

use crate::error::ChannelError;

/// One event on a stream route, as delivered by the session's reader task.
/// A dropped sender (no event at all) means the session itself went away.
pub(crate) enum StreamEvent {
    Item(serde_json::Value),
    End,
    Fault(RpcFault),
}

/// Forward-only sequence of elements emitted by the host.
///
/// Elements are pulled one at a time with [`next`](Self::next); each pull
/// suspends until the host emits the next element, ends the stream, or the
/// connection drops. Nothing is buffered beyond the session's small inbound
/// window, and the sequence cannot be restarted.
pub struct RemoteStream<T> {
    events: mpsc::Receiver<StreamEvent>,
    finished: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> RemoteStream<T> {
    pub(crate) fn new(events: mpsc::Receiver<StreamEvent>) -> Self {
        Self {
            events,
            finished: false,
            _item: PhantomData,
        }
    }

    /// Pull the next element.
    ///
    /// Returns `None` once the host has ended the stream; a dropped
    /// connection instead yields `Some(Err(ChannelError::Disconnected))`
    /// before the stream finishes. Cancelling the token abandons the pull
    /// with `Some(Err(ChannelError::Cancelled))` without consuming an
    /// element; the stream stays usable if the caller pulls again with a
    /// live token.
    pub async fn next(&mut self, token: &CancellationToken) -> Option<Result<T, ChannelError>> {
        if self.finished {
            return None;
        }

        let event = tokio::select! {
            () = token.cancelled() => return Some(Err(ChannelError::Cancelled)),
            event = self.events.recv() => event,
        };

        match event {
            Some(StreamEvent::Item(value)) => {
                Some(serde_json::from_value(value).map_err(ChannelError::from))
            }
            Some(StreamEvent::End) => {
                self.finished = true;
                None
            }
            Some(StreamEvent::Fault(fault)) => {
                self.finished = true;
                Some(Err(fault.into()))
            }
            None => {
                self.finished = true;
                Some(Err(ChannelError::Disconnected))
            }
        }
    }

    /// True once the stream has ended, faulted, or lost its connection.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream_with_events(events: Vec<StreamEvent>) -> RemoteStream<Vec<String>> {
        let (tx, rx) = mpsc::channel(8);
        for event in events {
            tx.try_send(event).unwrap();
        }
        drop(tx);
        RemoteStream::new(rx)
    }

    #[tokio::test]
    async fn yields_items_in_delivery_order_then_ends() {
        let mut stream = stream_with_events(vec![
            StreamEvent::Item(json!(["a"])),
            StreamEvent::Item(json!(["b"])),
            StreamEvent::End,
        ]);
        let token = CancellationToken::new();

        assert_eq!(stream.next(&token).await.unwrap().unwrap(), vec!["a"]);
        assert_eq!(stream.next(&token).await.unwrap().unwrap(), vec!["b"]);
        assert!(stream.next(&token).await.is_none());
        assert!(stream.is_finished());
        // Exhaustion is sticky.
        assert!(stream.next(&token).await.is_none());
    }

    #[tokio::test]
    async fn fault_terminates_with_the_host_error() {
        let mut stream =
            stream_with_events(vec![StreamEvent::Fault(RpcFault::internal_error("broke"))]);
        let token = CancellationToken::new();

        let err = stream.next(&token).await.unwrap().unwrap_err();
        assert!(matches!(err, ChannelError::Fault { .. }));
        assert!(stream.next(&token).await.is_none());
    }

    #[tokio::test]
    async fn dropped_route_is_a_transport_error_not_completion() {
        // No end marker ever arrives; the route sender just goes away.
        let mut stream = stream_with_events(vec![]);
        let token = CancellationToken::new();

        let err = stream.next(&token).await.unwrap().unwrap_err();
        assert!(matches!(err, ChannelError::Disconnected));
    }

    #[tokio::test]
    async fn cancelled_pull_does_not_consume_or_finish() {
        let (tx, rx) = mpsc::channel(8);
        let mut stream: RemoteStream<Vec<String>> = RemoteStream::new(rx);

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let err = stream.next(&cancelled).await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert!(!stream.is_finished());

        // The element queued in the meantime is still there for a live pull.
        tx.try_send(StreamEvent::Item(json!(["later"]))).unwrap();
        let live = CancellationToken::new();
        assert_eq!(stream.next(&live).await.unwrap().unwrap(), vec!["later"]);
    }

    #[tokio::test]
    async fn malformed_item_surfaces_a_decode_error_per_pull() {
        let mut stream = stream_with_events(vec![
            StreamEvent::Item(json!({"not": "an array"})),
            StreamEvent::End,
        ]);
        let token = CancellationToken::new();

        let err = stream.next(&token).await.unwrap().unwrap_err();
        assert!(matches!(err, ChannelError::Json(_)));
        // A bad element does not end the stream; the host's end marker does.
        assert!(stream.next(&token).await.is_none());
    }
}

//! Lazily connecting RPC backchannel to a spawned application host.
//!
//! A [`Channel`] is created before its transport exists. Operations invoked
//! early park on an internal single-assignment gate; once
//! [`Channel::connect`] attaches the session over the host's unix socket,
//! every parked and future call proceeds over that one connection. Unary
//! operations return typed values, streaming operations return a pull-based
//! [`RemoteStream`], and every operation takes a [`CancellationToken`]
//! honored at each suspension point.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hostlink_channel::{CancellationToken, Channel, HostProcess, NullDispatcher};
//!
//! # async fn example() -> Result<(), hostlink_channel::ChannelError> {
//! let channel = Channel::new();
//! let token = CancellationToken::new();
//!
//! channel
//!     .connect(
//!         Some(HostProcess { pid: 4242 }),
//!         "/tmp/apphost.sock",
//!         Arc::new(NullDispatcher),
//!         &token,
//!     )
//!     .await?;
//!
//! let echoed = channel.ping(1_000, &token).await?;
//! println!("host echoed {echoed}");
//!
//! let mut states = channel.resource_states(&token).await?;
//! while let Some(state) = states.next(&token).await {
//!     let state = state?;
//!     println!("{} is {}", state.resource, state.state);
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod dispatch;
mod error;
mod gate;
mod session;
mod stream;

pub use channel::{Channel, HostProcess};
pub use dispatch::{NullDispatcher, RequestDispatcher};
pub use error::{ChannelError, Result};
pub use stream::RemoteStream;

// Re-exported so callers don't need a direct tokio-util dependency just to
// mint tokens.
pub use tokio_util::sync::CancellationToken;

//! # Edge Channels
//!
//! Every edge is backed by a rendezvous channel: a send completes only once the
//! consumer has taken the value. This is the backpressure mechanism of the
//! engine. A producer can never run ahead of its slowest consumer, and a node
//! with no inputs re-executes only after every receiver has accepted its
//! previous output.
//!
//! The channel is a `tokio::sync::mpsc` channel of capacity one whose items
//! carry a `oneshot` acknowledgement. The sender parks on the acknowledgement,
//! which the receiver fires when it takes the value. If the sender stops
//! waiting (its task was cancelled) the value is dropped on receipt instead of
//! surfacing in a later run.
//!
//! ```rust
//! use nodeflow::channels::edge_channel;
//! use nodeflow::value::Value;
//!
//! # tokio_test::block_on(async {
//! let (tx, rx) = edge_channel();
//! let send = tokio::spawn(async move { tx.send(Value::Integer(7)).await });
//! assert_eq!(rx.recv().await, Some(Value::Integer(7)));
//! assert!(send.await.unwrap().is_ok());
//! # });
//! ```

use crate::value::Value;
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::trace;

/// The receiving side of an edge has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("edge channel closed")]
pub struct ChannelClosed;

struct Delivery {
  value: Value,
  ack: oneshot::Sender<()>,
}

/// Producer half of an edge.
#[derive(Clone, Debug)]
pub struct EdgeSender {
  tx: mpsc::Sender<Delivery>,
}

/// Consumer half of an edge.
///
/// Clones share the same underlying receiver; only one of them can wait on it
/// at a time. The graph keeps one clone in the port and hands another to the
/// node task of each run.
#[derive(Clone, Debug)]
pub struct EdgeReceiver {
  rx: Arc<Mutex<mpsc::Receiver<Delivery>>>,
}

impl std::fmt::Debug for Delivery {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Delivery").field("value", &self.value).finish()
  }
}

/// Allocates a fresh, unbuffered edge channel.
pub fn edge_channel() -> (EdgeSender, EdgeReceiver) {
  let (tx, rx) = mpsc::channel(1);
  (
    EdgeSender { tx },
    EdgeReceiver {
      rx: Arc::new(Mutex::new(rx)),
    },
  )
}

impl EdgeSender {
  /// Sends a value and waits until a receiver has taken it.
  ///
  /// # Errors
  ///
  /// Returns [`ChannelClosed`] if the receiver was dropped before or while
  /// the value was in flight.
  pub async fn send(&self, value: Value) -> Result<(), ChannelClosed> {
    let (ack, acked) = oneshot::channel();
    self
      .tx
      .send(Delivery { value, ack })
      .await
      .map_err(|_| ChannelClosed)?;
    acked.await.map_err(|_| ChannelClosed)
  }

  /// Returns `true` once the receiving side has been dropped.
  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }
}

impl EdgeReceiver {
  /// Waits for the next value.
  ///
  /// Returns `None` once every sender has been dropped.
  pub async fn recv(&self) -> Option<Value> {
    let mut rx = self.rx.lock().await;
    loop {
      let Delivery { value, ack } = rx.recv().await?;
      if ack.send(()).is_ok() {
        return Some(value);
      }
      trace!("EdgeReceiver::recv() dropping abandoned value {:?}", value);
    }
  }
}

/// Live view of one node's output.
///
/// An observer is a fan-out consumer that is not an input port: the editor uses
/// it to display the values a node produces. Because edges are unbuffered, a
/// producer with an observer attached blocks until the observer reads, so keep
/// it drained or drop it. Once dropped, the producer skips it.
#[derive(Debug)]
pub struct Observer {
  node: crate::graph::Id,
  rx: EdgeReceiver,
}

impl Observer {
  pub(crate) fn new(node: crate::graph::Id, rx: EdgeReceiver) -> Self {
    Self { node, rx }
  }

  /// Identity of the observed node.
  pub fn node(&self) -> crate::graph::Id {
    self.node
  }

  /// Waits for the next value produced by the observed node.
  pub async fn recv(&self) -> Option<Value> {
    self.rx.recv().await
  }

  /// Turns the observer into a stream of produced values.
  pub fn into_stream(self) -> impl Stream<Item = Value> + Send + 'static {
    futures::stream::unfold(self.rx, |rx| async move {
      let value = rx.recv().await?;
      Some((value, rx))
    })
  }
}

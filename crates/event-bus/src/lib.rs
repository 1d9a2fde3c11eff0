//! Message link between two isolated contexts.
//!
//! Each side of a [`link`] only ever sees JSON text from the other, so nothing
//! but serialized values crosses the boundary. Delivery is fire-and-forget and
//! FIFO per sender; a vanished peer turns sends into no-ops.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Address of one end of a link.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PeerId {
    pub name: String,
    pub instance: Uuid,
}

impl PeerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: Uuid::new_v4(),
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, &self.instance.simple().to_string()[..8])
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("peer {0} is not listening")]
    PeerGone(PeerId),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sending half. Cheap to clone; every clone addresses the same peer.
pub struct Outbox<M> {
    to: PeerId,
    tx: mpsc::UnboundedSender<String>,
    _marker: PhantomData<fn(M)>,
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            to: self.to.clone(),
            tx: self.tx.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M> Outbox<M>
where
    M: Serialize + fmt::Debug,
{
    pub fn peer(&self) -> &PeerId {
        &self.to
    }

    pub fn send(&self, message: &M) -> Result<(), BusError> {
        let frame = serde_json::to_string(message)?;
        self.tx
            .send(frame)
            .map_err(|_| BusError::PeerGone(self.to.clone()))
    }

    /// Sends and swallows delivery failures; a missing peer has no effect.
    pub fn post(&self, message: &M) {
        match self.send(message) {
            Ok(()) => debug!(to = %self.to, ?message, "message posted"),
            Err(BusError::PeerGone(peer)) => {
                debug!(to = %peer, ?message, "peer gone; message dropped")
            }
            Err(err) => warn!(to = %self.to, error = %err, "message not posted"),
        }
    }
}

/// Receiving half.
pub struct Inbox<M> {
    owner: PeerId,
    rx: mpsc::UnboundedReceiver<String>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> Inbox<M>
where
    M: DeserializeOwned,
{
    pub fn owner(&self) -> &PeerId {
        &self.owner
    }

    /// Next well-formed message, or `None` once every sender is gone.
    /// Frames that do not decode are logged and skipped.
    pub async fn recv(&mut self) -> Option<M> {
        loop {
            let frame = self.rx.recv().await?;
            if let Some(message) = self.decode(&frame) {
                return Some(message);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<M> {
        while let Ok(frame) = self.rx.try_recv() {
            if let Some(message) = self.decode(&frame) {
                return Some(message);
            }
        }
        None
    }

    /// Everything currently queued.
    pub fn drain(&mut self) -> Vec<M> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn decode(&self, frame: &str) -> Option<M> {
        match serde_json::from_str(frame) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!(peer = %self.owner, error = %err, frame, "dropping malformed frame");
                None
            }
        }
    }
}

/// One side of a link: sends `Out`, receives `In`.
pub struct Endpoint<Out, In> {
    pub outbox: Outbox<Out>,
    pub inbox: Inbox<In>,
    raw: mpsc::UnboundedSender<String>,
}

impl<Out, In> Endpoint<Out, In> {
    pub fn split(self) -> (Outbox<Out>, Inbox<In>) {
        (self.outbox, self.inbox)
    }

    /// Injects a raw frame into this endpoint's own inbox, as if the peer had
    /// sent it. Used to exercise decoding of hand-written payloads.
    pub fn inject_raw(&self, frame: impl Into<String>) -> bool {
        self.raw.send(frame.into()).is_ok()
    }
}

/// Connects two named peers. `A` is what the first side sends, `B` what the
/// second side sends.
pub fn link<A, B>(first: &str, second: &str) -> (Endpoint<A, B>, Endpoint<B, A>) {
    let first_id = PeerId::new(first);
    let second_id = PeerId::new(second);
    let (to_second, second_rx) = mpsc::unbounded_channel();
    let (to_first, first_rx) = mpsc::unbounded_channel();

    let first_end = Endpoint {
        outbox: Outbox {
            to: second_id.clone(),
            tx: to_second.clone(),
            _marker: PhantomData,
        },
        inbox: Inbox {
            owner: first_id.clone(),
            rx: first_rx,
            _marker: PhantomData,
        },
        raw: to_first.clone(),
    };
    let second_end = Endpoint {
        outbox: Outbox {
            to: first_id,
            tx: to_first,
            _marker: PhantomData,
        },
        inbox: Inbox {
            owner: second_id,
            rx: second_rx,
            _marker: PhantomData,
        },
        raw: to_second,
    };
    (first_end, second_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "action", rename_all = "camelCase")]
    enum Ping {
        Ping { seq: u32 },
        Reset,
    }

    #[tokio::test]
    async fn delivers_in_sender_order() {
        let (left, right) = link::<Ping, Ping>("left", "right");
        let (out, _left_in) = left.split();
        let (_right_out, mut inbox) = right.split();
        for seq in 0..3 {
            out.send(&Ping::Ping { seq }).unwrap();
        }
        out.post(&Ping::Reset);
        assert_eq!(inbox.recv().await, Some(Ping::Ping { seq: 0 }));
        assert_eq!(
            inbox.drain(),
            vec![Ping::Ping { seq: 1 }, Ping::Ping { seq: 2 }, Ping::Reset]
        );
    }

    #[tokio::test]
    async fn raw_frames_decode_like_peer_messages() {
        let (left, _right) = link::<Ping, Ping>("left", "right");
        assert!(left.inject_raw(r#"{"action":"bogus"}"#));
        assert!(left.inject_raw(r#"{"action":"ping","seq":7}"#));
        let (_out, mut inbox) = left.split();
        assert_eq!(inbox.try_recv(), Some(Ping::Ping { seq: 7 }));
    }

    #[test]
    fn sending_to_dropped_peer_is_reported() {
        let (left, right) = link::<Ping, Ping>("left", "right");
        drop(right);
        let (out, _) = left.split();
        assert!(matches!(out.send(&Ping::Reset), Err(BusError::PeerGone(_))));
        out.post(&Ping::Reset);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;

use crate::addr::NodeAddr;

/// Protocol-native transaction fingerprint; a double-SHA256 for Bitcoin.
pub type TxId = [u8; 32];

/// A single transaction-announcement sighting reported by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionNotify {
    /// Peer that announced the transaction to us.
    pub source: NodeAddr,
    /// Wall-clock time of the announcement.
    pub timestamp: SystemTime,
    pub txid: TxId,
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("connecting to the remote node failed")]
    ConnectFailed(#[source] std::io::Error),

    #[error("remote socket disconnected")]
    Disconnected(#[source] std::io::Error),

    #[error("peer is not running")]
    NotRunning,

    #[error("peer spinning halted")]
    Halted,

    #[error("payload codec failure")]
    Codec(#[from] argos_codec::Error),
}

/// Callback surface the coordinator exposes to running peers.
///
/// Peers hold this behind a [`Weak`] handle so the coordinator owning them
/// does not form a reference cycle; a peer whose coordinator is gone simply
/// drops its callbacks.
pub trait Courier: Send + Sync {
    /// Records one transaction announcement.
    fn notify_transaction(&self, notify: TransactionNotify);

    /// Records that `src` claims connections to each address in `learned`.
    fn node_conn(&self, src: NodeAddr, learned: Vec<NodeAddr>);

    /// Removes a node from the observed topology.
    fn node_exit(&self, addr: NodeAddr);
}

#[derive(Debug, Default)]
struct HaltState {
    active: AtomicBool,
    notify: Notify,
}

/// Handle used to stop a spinning peer from outside its task.
#[derive(Debug, Clone, Default)]
pub struct Halter {
    state: Arc<HaltState>,
}

impl Halter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the peer as running; called by the peer once its connection is
    /// established.
    pub fn activate(&self) {
        self.state.active.store(true, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.state.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Requests an immediate stop of the peer.
    pub fn halt(&self) -> Result<(), PeerError> {
        if !self.is_active() {
            return Err(PeerError::NotRunning);
        }
        self.state.notify.notify_one();
        Ok(())
    }

    /// Resolves once a stop has been requested.
    pub async fn halted(&self) {
        self.state.notify.notified().await;
    }
}

/// A single connection to a remote node of the sniffed network.
#[async_trait]
pub trait Peer: Send {
    /// Connects to the remote node and drives its message loop. Returns only
    /// on connection failure, socket error or an external halt.
    async fn spin(&mut self) -> Result<(), PeerError>;

    /// The handle used to stop this peer while `spin` runs.
    fn halter(&self) -> Halter;
}

/// Factory for protocol-specific peers, keyed by protocol name in the
/// [`crate::Registry`].
pub type PeerConstructor =
    Arc<dyn Fn(Weak<dyn Courier>, NodeAddr) -> Box<dyn Peer> + Send + Sync>;

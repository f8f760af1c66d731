//! Coordination layer of the Argos sniffer
//!
//! A sniffer is an abstract super-node that connects to many peers of a
//! cryptocurrency network at once, records which peer announced which
//! transaction first, and estimates the originating node of every observed
//! transaction. Protocol crates plug into this layer through the
//! [`Registry`]: they provide a [`Peer`] constructor and a [`SeedProvider`]
//! for their network, and call back into the coordinator through the
//! [`Courier`] surface.

pub mod addr;
pub mod config;
pub mod daemon;
pub mod estimate;
pub mod master;
pub mod peer;
pub mod registry;
pub mod sniffer;

pub use addr::NodeAddr;

/// Surfaces coordinator trace output when tests run with `--nocapture`.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
pub use config::Config;
pub use daemon::Daemon;
pub use estimate::{Method, Report, OBSERVATION_THRESHOLD};
pub use peer::{Courier, Halter, Peer, PeerConstructor, PeerError, TransactionNotify, TxId};
pub use registry::{Registry, RegistryError, SeedError, SeedProvider};
pub use sniffer::{Sniffer, SnifferError};

//! Bitcoin wire protocol support for the Argos sniffer
//!
//! Implements the subset of the Bitcoin P2P protocol (v70015) a passive
//! observer needs: the message framing with magic-byte resynchronization,
//! the handshake, inventory and transaction flows, and the address gossip
//! that feeds the sniffer's peer graph. This node never serves data; every
//! `getdata`/`getheaders` request is answered with `notfound`.

mod bearer;
mod codec;
mod hashing;
mod magic;
mod messages;
mod peer;
mod seed;
mod types;

pub use bearer::Bearer;
pub use hashing::{checksum, double_sha256};
pub use magic::{seek_magic, MagicSeeker};
pub use messages::*;
pub use peer::Peer;
pub use seed::{DnsSeeds, DEFAULT_PORT};
pub use types::*;

use std::sync::Arc;

use argos_sniffer::{Registry, RegistryError};

/// Protocol version advertised in our `version` message.
pub const PROTOCOL_VERSION: i32 = 70015;

/// User agent advertised in our `version` message.
pub const USER_AGENT: &str = "/Argos:0.1/";

/// Frames longer than this are rejected without reading the payload.
pub const MAX_MESSAGE_LENGTH: u32 = 4096 * 1024;

/// Name under which this protocol registers with a sniffer registry.
pub const PROTOCOL_NAME: &str = "bitcoin";

/// Registers the Bitcoin peer constructor and seed provider.
pub fn install(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_peer_constructor(
        PROTOCOL_NAME,
        Arc::new(|courier, addr| Box::new(Peer::new(courier, addr)) as Box<dyn argos_sniffer::Peer>),
    )?;
    registry.register_seed_provider(PROTOCOL_NAME, Arc::new(DnsSeeds::new()))?;
    Ok(())
}

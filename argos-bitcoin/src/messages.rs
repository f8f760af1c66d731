use std::borrow::Cow;

use argos_sniffer::NodeAddr;

use crate::types::{InventoryType, NetworkMagic, ServiceType, VarInt, VarString};

/// Wire command names understood by the dispatcher.
pub mod command {
    pub const VERSION: &str = "version";
    pub const VERACK: &str = "verack";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    pub const INV: &str = "inv";
    pub const GETDATA: &str = "getdata";
    pub const NOTFOUND: &str = "notfound";
    pub const TX: &str = "tx";
    pub const ADDR: &str = "addr";
    pub const REJECT: &str = "reject";
    pub const SENDHEADERS: &str = "sendheaders";
    pub const SENDCMPCT: &str = "sendcmpct";
    pub const FEEFILTER: &str = "feefilter";
    pub const FILTERLOAD: &str = "filterload";
    pub const FILTERADD: &str = "filteradd";
    pub const FILTERCLEAR: &str = "filterclear";
    pub const GETHEADERS: &str = "getheaders";
    pub const HEADERS: &str = "headers";
}

/// 24-byte frame header preceding every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: NetworkMagic,
    /// ASCII command name, null padded.
    pub command: [u8; 12],
    /// Payload length in bytes.
    pub length: u32,
    /// First four little-endian bytes of the payload double-SHA256.
    pub checksum: u32,
}

impl MessageHeader {
    pub const LENGTH: usize = 24;

    /// The command name up to its first null byte.
    pub fn command_str(&self) -> Cow<'_, str> {
        let end = self
            .command
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.command.len());
        String::from_utf8_lossy(&self.command[..end])
    }
}

/// The null-padded 12-byte command field for `name`; overlong names are
/// truncated.
pub fn command_bytes(name: &str) -> [u8; 12] {
    let mut out = [0u8; 12];
    let len = name.len().min(out.len());
    out[..len].copy_from_slice(&name.as_bytes()[..len]);
    out
}

/// Network address entry as carried in `addr` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAddress {
    /// Last-seen time. Not present in the version message form.
    pub time: u32,
    pub services: ServiceType,
    /// v4-in-v6 mapped address bytes, network order.
    pub ip: [u8; 16],
    /// Network byte order on the wire.
    pub port: u16,
}

impl NetworkAddress {
    pub fn node_addr(&self) -> NodeAddr {
        NodeAddr::new(self.ip, self.port)
    }
}

/// Address form embedded in the version message; carries no `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionAddress {
    pub services: ServiceType,
    pub ip: [u8; 16],
    pub port: u16,
}

impl VersionAddress {
    pub fn new(services: ServiceType, addr: NodeAddr) -> Self {
        Self {
            services,
            ip: addr.ip,
            port: addr.port,
        }
    }

    pub fn node_addr(&self) -> NodeAddr {
        NodeAddr::new(self.ip, self.port)
    }
}

/// A `(type, hash)` advertisement of an object a node holds or requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inventory {
    pub kind: InventoryType,
    pub hash: [u8; 32],
}

/// Shared payload of the `inv`, `getdata` and `notfound` messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryList {
    pub entries: Vec<Inventory>,
}

impl From<Vec<Inventory>> for InventoryList {
    fn from(entries: Vec<Inventory>) -> Self {
        Self { entries }
    }
}

/// Advertised immediately on an outgoing connection; no further
/// communication happens until both sides have exchanged theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub version: i32,
    pub services: ServiceType,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub addr_recv: VersionAddress,
    /// Mostly dummy bytes on the modern network.
    pub addr_from: VersionAddress,
    /// Random per-connection nonce, used to detect connections to self.
    pub nonce: u64,
    pub user_agent: VarString,
    /// Last block the emitting node has.
    pub start_height: i32,
    /// Whether relayed transactions should be announced (BIP 37).
    pub relay: bool,
}

/// Known-node gossip; non-advertised nodes are typically forgotten after a
/// few hours.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Addr {
    pub entries: Vec<NetworkAddress>,
}

/// Header request carrying a block locator, newest back to genesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetHeaders {
    pub version: u32,
    pub locator_hashes: Vec<[u8; 32]>,
    /// Zero to request as many headers as possible.
    pub hash_stop: [u8; 32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: [u8; 32],
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    /// Always zero in a `headers` payload.
    pub tx_count: VarInt,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    pub entries: Vec<BlockHeader>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping {
    pub nonce: u64,
}

/// Echoes the nonce of the `ping` it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub nonce: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendCmpct {
    pub announce: bool,
    pub version: u64,
}

/// Sent when a message is rejected; `data` carries the txid or block hash
/// when the rejection relates to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
    /// Command of the rejected message.
    pub message: VarString,
    pub ccode: u8,
    pub reason: VarString,
    /// Omitted from the wire when absent.
    pub data: Option<[u8; 32]>,
}

/// BIP 37 bloom filter; at most 36,000 bytes of bit field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLoad {
    pub filter: Vec<u8>,
    /// At most 50 hash functions.
    pub n_hash_funcs: u32,
    pub n_tweak: u32,
    pub n_flags: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAdd {
    pub data: Vec<u8>,
}

/// Reference to one output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    pub hash: [u8; 32],
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Transaction value in satoshis.
    pub value: i64,
    pub pk_script: Vec<u8>,
}

/// Witness attached to one input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxWitness {
    pub data: Vec<u8>,
}

/// Bitcoin transaction with the BIP-144 optional witness marker.
///
/// A zero where the input count belongs is always the witness marker; a
/// genuine empty-input transaction cannot be expressed on this wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    /// `[0, 1]` when witness data is present.
    pub flag: [u8; 2],
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    /// One entry per input when the witness flag is set, empty otherwise.
    pub witnesses: Vec<TxWitness>,
    /// Block number or timestamp before which the transaction is locked.
    pub lock_time: u32,
}

impl Transaction {
    pub fn has_witness(&self) -> bool {
        self.flag == [0, 1]
    }
}

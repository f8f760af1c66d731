use std::borrow::Cow;
use std::fmt;

/// Magic value indicating the origin network of a message; also the marker
/// used to seek the next frame when the stream state is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkMagic(pub u32);

impl NetworkMagic {
    pub const MAIN: Self = Self(0xD9B4_BEF9);
    pub const TESTNET: Self = Self(0xDAB5_BFFA);
    pub const TESTNET3: Self = Self(0x0709_110B);
    pub const SIGNET: Self = Self(0x40CF_030A);
    pub const NAMECOIN: Self = Self(0xFEB4_BEF9);

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::MAIN => Some("main"),
            Self::TESTNET => Some("testnet"),
            Self::TESTNET3 => Some("testnet3"),
            Self::SIGNET => Some("signet"),
            Self::NAMECOIN => Some("namecoin"),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "main" => Some(Self::MAIN),
            "testnet" | "regtest" => Some(Self::TESTNET),
            "testnet3" => Some(Self::TESTNET3),
            "signet" | "default" => Some(Self::SIGNET),
            "namecoin" => Some(Self::NAMECOIN),
            _ => None,
        }
    }
}

impl fmt::Display for NetworkMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// Integer stored as 64 bits but carried with the variable-length
/// compact-size encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct VarInt(pub u64);

impl From<u64> for VarInt {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<usize> for VarInt {
    fn from(value: usize) -> Self {
        Self(value as u64)
    }
}

impl From<VarInt> for u64 {
    fn from(value: VarInt) -> Self {
        value.0
    }
}

/// Length-prefixed byte string. The wire does not promise UTF-8.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct VarString(pub Vec<u8>);

impl VarString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for VarString {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Display for VarString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for VarString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarString({:?})", self.to_string_lossy())
    }
}

/// Identifies the object type linked to an inventory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InventoryType(pub u32);

impl InventoryType {
    /// Flag marking a request for witness serialization; not a type of its
    /// own.
    pub const WITNESS_FLAG: Self = Self(1 << 30);

    pub const TX: Self = Self(1);
    pub const BLOCK: Self = Self(2);
    /// Block-header hash requesting a `merkleblock` reply; needs a loaded
    /// bloom filter.
    pub const FILTERED_BLOCK: Self = Self(3);
    /// Block-header hash requesting a `cmpctblock` reply.
    pub const CMPCT_BLOCK: Self = Self(4);

    pub const WITNESS_TX: Self = Self(Self::TX.0 | Self::WITNESS_FLAG.0);
    pub const WITNESS_BLOCK: Self = Self(Self::BLOCK.0 | Self::WITNESS_FLAG.0);
    pub const WITNESS_FILTERED_BLOCK: Self = Self(Self::FILTERED_BLOCK.0 | Self::WITNESS_FLAG.0);

    /// The type with the witness flag stripped.
    pub fn basic(&self) -> Self {
        Self(self.0 & !Self::WITNESS_FLAG.0)
    }

    pub fn is_witness(&self) -> bool {
        self.0 & Self::WITNESS_FLAG.0 != 0
    }

    pub fn is_tx(&self) -> bool {
        self.basic() == Self::TX
    }

    pub fn is_block(&self) -> bool {
        self.basic() == Self::BLOCK
    }

    pub fn is_filtered_block(&self) -> bool {
        self.basic() == Self::FILTERED_BLOCK
    }

    pub fn is_cmpct_block(&self) -> bool {
        self.basic() == Self::CMPCT_BLOCK
    }

    /// No bits outside the known types and the witness flag, and no
    /// witness-flagged compact block.
    pub fn is_valid(&self) -> bool {
        let basic = self.basic();
        (1..=4).contains(&basic.0) && !(self.is_witness() && basic == Self::CMPCT_BLOCK)
    }
}

/// Bitfield of features a node offers on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ServiceType(pub u64);

impl ServiceType {
    /// Can be asked for full blocks instead of just headers.
    pub const NETWORK: Self = Self(1);
    pub const GETUTXO: Self = Self(2);
    pub const BLOOM: Self = Self(4);
    pub const WITNESS: Self = Self(8);
    /// Never formally proposed and discontinued; still seen sporadically.
    pub const XTHIN: Self = Self(16);
    pub const COMPACT_FILTERS: Self = Self(64);
    pub const NETWORK_LIMITED: Self = Self(1024);

    /// Whether any of the `reference` bits are offered.
    pub fn serves(&self, reference: ServiceType) -> bool {
        self.0 & reference.0 != 0
    }
}

/// Minimum fee rate a peer wants announced, in satoshis per kilobyte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeFilter(pub i64);

pub const REJECT_MALFORMED: u8 = 0x01;
pub const REJECT_INVALID: u8 = 0x10;
pub const REJECT_OBSOLETE: u8 = 0x11;
pub const REJECT_DUPLICATE: u8 = 0x12;
pub const REJECT_NONSTANDARD: u8 = 0x40;
pub const REJECT_DUST: u8 = 0x41;
pub const REJECT_INSUFFICIENT_FEE: u8 = 0x42;
pub const REJECT_CHECKPOINT: u8 = 0x43;

//! Wire codecs for the Bitcoin message types
//!
//! Compact-size integers and the typed integer wrappers are defined as
//! little-endian regardless of the ambient order; only `NetworkAddress.port`
//! travels in network order. Counts preceding collections are authoritative
//! when decoding and derived from the collection length when encoding.

use argos_codec::{ByteReader, ByteWriter, Decode, Encode, Error, Order};

use crate::messages::*;
use crate::types::*;

impl Decode for VarInt {
    fn decode(r: &mut ByteReader<'_>, _order: Order) -> Result<Self, Error> {
        let tag = r.u8()?;
        let value = match tag {
            0xFD => u16::decode(r, Order::Little)? as u64,
            0xFE => u32::decode(r, Order::Little)? as u64,
            0xFF => u64::decode(r, Order::Little)?,
            small => small as u64,
        };
        Ok(Self(value))
    }
}

impl Encode for VarInt {
    fn encode(&self, w: &mut ByteWriter, _order: Order) -> Result<(), Error> {
        match self.0 {
            value if value < 0xFD => w.put(&[value as u8]),
            value if value < 0x1_0000 => {
                w.put(&[0xFD]);
                (value as u16).encode(w, Order::Little)?;
            }
            value if value < 0x1_0000_0000 => {
                w.put(&[0xFE]);
                (value as u32).encode(w, Order::Little)?;
            }
            value => {
                w.put(&[0xFF]);
                value.encode(w, Order::Little)?;
            }
        }
        Ok(())
    }
}

impl Decode for VarString {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let length = decode_count(r, order)?;
        Ok(Self(r.take(length)?.to_vec()))
    }
}

impl Encode for VarString {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.0.len()).encode(w, order)?;
        w.put(&self.0);
        Ok(())
    }
}

macro_rules! little_endian_newtype {
    ($ty:ty, $inner:ty) => {
        impl Decode for $ty {
            fn decode(r: &mut ByteReader<'_>, _order: Order) -> Result<Self, Error> {
                Ok(Self(<$inner>::decode(r, Order::Little)?))
            }
        }

        impl Encode for $ty {
            fn encode(&self, w: &mut ByteWriter, _order: Order) -> Result<(), Error> {
                self.0.encode(w, Order::Little)
            }
        }
    };
}

little_endian_newtype!(NetworkMagic, u32);
little_endian_newtype!(InventoryType, u32);
little_endian_newtype!(ServiceType, u64);
little_endian_newtype!(FeeFilter, i64);

/// Reads a compact-size count, bounded to addressable sizes.
fn decode_count(r: &mut ByteReader<'_>, order: Order) -> Result<usize, Error> {
    let VarInt(count) = VarInt::decode(r, order)?;
    usize::try_from(count).map_err(|_| Error::invalid("count exceeds addressable size"))
}

/// Decodes `count` consecutive elements. The pre-allocation is capped by
/// the bytes left in the reader, every element costs at least one.
fn decode_vec<T: Decode>(
    r: &mut ByteReader<'_>,
    order: Order,
    count: usize,
) -> Result<Vec<T>, Error> {
    let mut out = Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        out.push(T::decode(r, order)?);
    }
    Ok(out)
}

impl Decode for MessageHeader {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            magic: NetworkMagic::decode(r, order)?,
            command: <[u8; 12]>::decode(r, order)?,
            length: u32::decode(r, Order::Little)?,
            checksum: u32::decode(r, Order::Little)?,
        })
    }
}

impl Encode for MessageHeader {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.magic.encode(w, order)?;
        self.command.encode(w, order)?;
        self.length.encode(w, Order::Little)?;
        self.checksum.encode(w, Order::Little)
    }
}

impl Decode for NetworkAddress {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            time: u32::decode(r, order)?,
            services: ServiceType::decode(r, order)?,
            ip: <[u8; 16]>::decode(r, order)?,
            port: u16::decode(r, Order::Big)?,
        })
    }
}

impl Encode for NetworkAddress {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.time.encode(w, order)?;
        self.services.encode(w, order)?;
        self.ip.encode(w, order)?;
        self.port.encode(w, Order::Big)
    }
}

impl Decode for VersionAddress {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            services: ServiceType::decode(r, order)?,
            ip: <[u8; 16]>::decode(r, order)?,
            port: u16::decode(r, Order::Big)?,
        })
    }
}

impl Encode for VersionAddress {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.services.encode(w, order)?;
        self.ip.encode(w, order)?;
        self.port.encode(w, Order::Big)
    }
}

impl Decode for Inventory {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            kind: InventoryType::decode(r, order)?,
            hash: <[u8; 32]>::decode(r, order)?,
        })
    }
}

impl Encode for Inventory {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.kind.encode(w, order)?;
        self.hash.encode(w, order)
    }
}

impl Decode for InventoryList {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let count = decode_count(r, order)?;
        Ok(Self {
            entries: decode_vec(r, order, count)?,
        })
    }
}

impl Encode for InventoryList {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.entries.len()).encode(w, order)?;
        for entry in &self.entries {
            entry.encode(w, order)?;
        }
        Ok(())
    }
}

impl Decode for Version {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            version: i32::decode(r, order)?,
            services: ServiceType::decode(r, order)?,
            timestamp: i64::decode(r, order)?,
            addr_recv: VersionAddress::decode(r, order)?,
            addr_from: VersionAddress::decode(r, order)?,
            nonce: u64::decode(r, order)?,
            user_agent: VarString::decode(r, order)?,
            start_height: i32::decode(r, order)?,
            relay: bool::decode(r, order)?,
        })
    }
}

impl Encode for Version {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.version.encode(w, order)?;
        self.services.encode(w, order)?;
        self.timestamp.encode(w, order)?;
        self.addr_recv.encode(w, order)?;
        self.addr_from.encode(w, order)?;
        self.nonce.encode(w, order)?;
        self.user_agent.encode(w, order)?;
        self.start_height.encode(w, order)?;
        self.relay.encode(w, order)
    }
}

impl Decode for Addr {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let count = decode_count(r, order)?;
        Ok(Self {
            entries: decode_vec(r, order, count)?,
        })
    }
}

impl Encode for Addr {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.entries.len()).encode(w, order)?;
        for entry in &self.entries {
            entry.encode(w, order)?;
        }
        Ok(())
    }
}

impl Decode for GetHeaders {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let version = u32::decode(r, order)?;
        let count = decode_count(r, order)?;
        Ok(Self {
            version,
            locator_hashes: decode_vec(r, order, count)?,
            hash_stop: <[u8; 32]>::decode(r, order)?,
        })
    }
}

impl Encode for GetHeaders {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.version.encode(w, order)?;
        VarInt::from(self.locator_hashes.len()).encode(w, order)?;
        for hash in &self.locator_hashes {
            hash.encode(w, order)?;
        }
        self.hash_stop.encode(w, order)
    }
}

impl Decode for BlockHeader {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            version: i32::decode(r, order)?,
            prev_block: <[u8; 32]>::decode(r, order)?,
            merkle_root: <[u8; 32]>::decode(r, order)?,
            timestamp: u32::decode(r, order)?,
            bits: u32::decode(r, order)?,
            nonce: u32::decode(r, order)?,
            tx_count: VarInt::decode(r, order)?,
        })
    }
}

impl Encode for BlockHeader {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.version.encode(w, order)?;
        self.prev_block.encode(w, order)?;
        self.merkle_root.encode(w, order)?;
        self.timestamp.encode(w, order)?;
        self.bits.encode(w, order)?;
        self.nonce.encode(w, order)?;
        self.tx_count.encode(w, order)
    }
}

impl Decode for Headers {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let count = decode_count(r, order)?;
        Ok(Self {
            entries: decode_vec(r, order, count)?,
        })
    }
}

impl Encode for Headers {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.entries.len()).encode(w, order)?;
        for entry in &self.entries {
            entry.encode(w, order)?;
        }
        Ok(())
    }
}

impl Decode for Ping {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::decode(r, order)?,
        })
    }
}

impl Encode for Ping {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.nonce.encode(w, order)
    }
}

impl Decode for Pong {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::decode(r, order)?,
        })
    }
}

impl Encode for Pong {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.nonce.encode(w, order)
    }
}

impl Decode for SendCmpct {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            announce: bool::decode(r, order)?,
            version: u64::decode(r, order)?,
        })
    }
}

impl Encode for SendCmpct {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.announce.encode(w, order)?;
        self.version.encode(w, order)
    }
}

impl Decode for Reject {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let message = VarString::decode(r, order)?;
        let ccode = r.u8()?;
        let reason = VarString::decode(r, order)?;
        // trailing field, omitted when the error carries no object hash
        let data = if r.is_empty() {
            None
        } else {
            Some(<[u8; 32]>::decode(r, order)?)
        };
        Ok(Self {
            message,
            ccode,
            reason,
            data,
        })
    }
}

impl Encode for Reject {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.message.encode(w, order)?;
        w.put(&[self.ccode]);
        self.reason.encode(w, order)?;
        if let Some(data) = &self.data {
            data.encode(w, order)?;
        }
        Ok(())
    }
}

impl Decode for FilterLoad {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let count = decode_count(r, order)?;
        Ok(Self {
            filter: r.take(count)?.to_vec(),
            n_hash_funcs: u32::decode(r, order)?,
            n_tweak: u32::decode(r, order)?,
            n_flags: r.u8()?,
        })
    }
}

impl Encode for FilterLoad {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.filter.len()).encode(w, order)?;
        w.put(&self.filter);
        self.n_hash_funcs.encode(w, order)?;
        self.n_tweak.encode(w, order)?;
        w.put(&[self.n_flags]);
        Ok(())
    }
}

impl Decode for FilterAdd {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let count = decode_count(r, order)?;
        Ok(Self {
            data: r.take(count)?.to_vec(),
        })
    }
}

impl Encode for FilterAdd {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.data.len()).encode(w, order)?;
        w.put(&self.data);
        Ok(())
    }
}

impl Decode for OutPoint {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        Ok(Self {
            hash: <[u8; 32]>::decode(r, order)?,
            index: u32::decode(r, order)?,
        })
    }
}

impl Encode for OutPoint {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.hash.encode(w, order)?;
        self.index.encode(w, order)
    }
}

impl Decode for TxIn {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let previous_output = OutPoint::decode(r, order)?;
        let script_length = decode_count(r, order)?;
        Ok(Self {
            previous_output,
            signature_script: r.take(script_length)?.to_vec(),
            sequence: u32::decode(r, order)?,
        })
    }
}

impl Encode for TxIn {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.previous_output.encode(w, order)?;
        VarInt::from(self.signature_script.len()).encode(w, order)?;
        w.put(&self.signature_script);
        self.sequence.encode(w, order)
    }
}

impl Decode for TxOut {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let value = i64::decode(r, order)?;
        let script_length = decode_count(r, order)?;
        Ok(Self {
            value,
            pk_script: r.take(script_length)?.to_vec(),
        })
    }
}

impl Encode for TxOut {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.value.encode(w, order)?;
        VarInt::from(self.pk_script.len()).encode(w, order)?;
        w.put(&self.pk_script);
        Ok(())
    }
}

impl Decode for TxWitness {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let count = decode_count(r, order)?;
        Ok(Self {
            data: r.take(count)?.to_vec(),
        })
    }
}

impl Encode for TxWitness {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        VarInt::from(self.data.len()).encode(w, order)?;
        w.put(&self.data);
        Ok(())
    }
}

impl Decode for Transaction {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let version = u32::decode(r, order)?;

        let mut flag = [0u8; 2];
        let mut input_count = decode_count(r, order)?;
        if input_count == 0 {
            // witness marker, never a genuine zero-input transaction
            flag[1] = r.u8()?;
            input_count = decode_count(r, order)?;
        }

        let inputs: Vec<TxIn> = decode_vec(r, order, input_count)?;
        let output_count = decode_count(r, order)?;
        let outputs = decode_vec(r, order, output_count)?;

        let witnesses = if flag[1] == 1 {
            decode_vec(r, order, inputs.len())?
        } else {
            Vec::new()
        };

        Ok(Self {
            version,
            flag,
            inputs,
            outputs,
            witnesses,
            lock_time: u32::decode(r, order)?,
        })
    }
}

impl Encode for Transaction {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        self.version.encode(w, order)?;

        let witness = self.has_witness();
        if witness {
            self.flag.encode(w, order)?;
        }

        VarInt::from(self.inputs.len()).encode(w, order)?;
        for input in &self.inputs {
            input.encode(w, order)?;
        }

        VarInt::from(self.outputs.len()).encode(w, order)?;
        for output in &self.outputs {
            output.encode(w, order)?;
        }

        if witness {
            for entry in &self.witnesses {
                entry.encode(w, order)?;
            }
        }

        self.lock_time.encode(w, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argos_codec::{decode, encode};

    #[test]
    fn varint_boundary_encodings() {
        let cases: [(u64, &[u8]); 7] = [
            (0x00, &[0x00]),
            (0xFC, &[0xFC]),
            (0xFD, &[0xFD, 0xFD, 0x00]),
            (0xFFFF, &[0xFD, 0xFF, 0xFF]),
            (0x1_0000, &[0xFE, 0x00, 0x00, 0x01, 0x00]),
            (0xFFFF_FFFF, &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF]),
            (
                0x1_0000_0000,
                &[0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
            ),
        ];

        for (value, bytes) in cases {
            assert_eq!(encode(&VarInt(value)).unwrap(), bytes, "encoding {value:#x}");
            let (back, read) = decode::<VarInt>(bytes).unwrap();
            assert_eq!(back, VarInt(value));
            assert_eq!(read, bytes.len());
        }
    }

    #[test]
    fn varint_decoding_stops_at_its_own_length() {
        // a one-byte value followed by garbage consumes exactly one byte
        let (value, read) = decode::<VarInt>(&[0x42, 0xFF, 0xFF]).unwrap();
        assert_eq!(value, VarInt(0x42));
        assert_eq!(read, 1);
    }

    #[test]
    fn varstring_roundtrip_keeps_raw_bytes() {
        let raw = VarString(vec![0xC0, 0xFF, 0xEE]);
        let bytes = encode(&raw).unwrap();
        assert_eq!(bytes, vec![0x03, 0xC0, 0xFF, 0xEE]);
        let (back, _) = decode::<VarString>(&bytes).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn reject_data_is_optional_at_the_tail() {
        let bare = Reject {
            message: VarString::from("tx"),
            ccode: crate::types::REJECT_INVALID,
            reason: VarString::from("unsupported"),
            data: None,
        };
        let bytes = encode(&bare).unwrap();
        let (back, read) = decode::<Reject>(&bytes).unwrap();
        assert_eq!(back, bare);
        assert_eq!(read, bytes.len());

        let tagged = Reject {
            data: Some([0xAA; 32]),
            ..bare
        };
        let bytes = encode(&tagged).unwrap();
        let (back, _) = decode::<Reject>(&bytes).unwrap();
        assert_eq!(back.data, Some([0xAA; 32]));
    }

    #[test]
    fn witness_transaction_roundtrip() {
        let tx = Transaction {
            version: 2,
            flag: [0, 1],
            inputs: vec![TxIn {
                previous_output: OutPoint {
                    hash: [0x11; 32],
                    index: 1,
                },
                signature_script: vec![],
                sequence: 0xFFFF_FFFF,
            }],
            outputs: vec![TxOut {
                value: 50_000,
                pk_script: vec![0x51],
            }],
            witnesses: vec![TxWitness {
                data: vec![0x01, 0x02, 0x03],
            }],
            lock_time: 0,
        };

        let bytes = encode(&tx).unwrap();
        // version, marker, flag
        assert_eq!(&bytes[..6], &[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        let (back, read) = decode::<Transaction>(&bytes).unwrap();
        assert_eq!(back, tx);
        assert_eq!(read, bytes.len());
    }

    #[test]
    fn legacy_transaction_roundtrip_has_no_marker() {
        let tx = Transaction {
            version: 1,
            flag: [0, 0],
            inputs: vec![TxIn {
                previous_output: OutPoint {
                    hash: [0x22; 32],
                    index: 0,
                },
                signature_script: vec![0xAB; 4],
                sequence: 0,
            }],
            outputs: vec![],
            witnesses: vec![],
            lock_time: 7,
        };

        let bytes = encode(&tx).unwrap();
        assert_eq!(bytes[4], 0x01); // input count directly after version
        let (back, _) = decode::<Transaction>(&bytes).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn network_address_port_is_big_endian() {
        let address = NetworkAddress {
            time: 0x4D10_15E2,
            services: ServiceType::NETWORK,
            ip: {
                let mut ip = [0u8; 16];
                ip[10] = 0xFF;
                ip[11] = 0xFF;
                ip[12..].copy_from_slice(&[10, 0, 0, 1]);
                ip
            },
            port: 8333,
        };

        let bytes = encode(&address).unwrap();
        assert_eq!(&bytes[bytes.len() - 2..], &[0x20, 0x8D]);
        let (back, _) = decode::<NetworkAddress>(&bytes).unwrap();
        assert_eq!(back, address);
    }
}

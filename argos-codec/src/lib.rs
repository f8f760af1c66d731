//! Common binary encoding interface shared by the Argos wire codecs
//!
//! The Argos wire formats are fixed-layout binary: little-endian integers by
//! default, with individual fields (ports, for instance) overriding to
//! network order. This crate provides the positioned reader/writer pair and
//! the [`Decode`]/[`Encode`] traits that protocol crates implement for their
//! message types.
//!
//! Three conventions replace the field tags of the original wire notation:
//!
//! * a field in network order decodes with an explicit [`Order::Big`] while
//!   the rest of the record keeps the ambient order;
//! * a collection is preceded by its count field; decoding reads the count
//!   first and pre-allocates, encoding derives the count from the actual
//!   collection length;
//! * an optional trailing field is an `Option<_>` decoded as `None` when the
//!   reader is exhausted, and must be the last field of its record.

mod read;
mod write;

pub use read::ByteReader;
pub use write::ByteWriter;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use thiserror::Error;

/// Byte order applied to multi-byte integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Little,
    Big,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected end of input, needed {needed} bytes with {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }
}

/// A value readable from a wire buffer.
pub trait Decode: Sized {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error>;
}

/// A value writable to a wire buffer.
pub trait Encode {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error>;
}

/// Decodes a value from the start of `input` in the default little-endian
/// order, returning the value and the count of bytes consumed.
pub fn decode<T: Decode>(input: &[u8]) -> Result<(T, usize), Error> {
    decode_with(input, Order::Little)
}

pub fn decode_with<T: Decode>(input: &[u8], order: Order) -> Result<(T, usize), Error> {
    let mut reader = ByteReader::new(input);
    let value = T::decode(&mut reader, order)?;
    Ok((value, reader.position()))
}

/// Encodes a value in the default little-endian order.
pub fn encode<T: Encode>(value: &T) -> Result<Vec<u8>, Error> {
    encode_with(value, Order::Little)
}

pub fn encode_with<T: Encode>(value: &T, order: Order) -> Result<Vec<u8>, Error> {
    let mut writer = ByteWriter::new();
    value.encode(&mut writer, order)?;
    Ok(writer.into_vec())
}

impl Decode for u8 {
    fn decode(r: &mut ByteReader<'_>, _order: Order) -> Result<Self, Error> {
        r.u8()
    }
}

impl Encode for u8 {
    fn encode(&self, w: &mut ByteWriter, _order: Order) -> Result<(), Error> {
        w.put(&[*self]);
        Ok(())
    }
}

impl Decode for i8 {
    fn decode(r: &mut ByteReader<'_>, _order: Order) -> Result<Self, Error> {
        Ok(r.u8()? as i8)
    }
}

impl Encode for i8 {
    fn encode(&self, w: &mut ByteWriter, _order: Order) -> Result<(), Error> {
        w.put(&[*self as u8]);
        Ok(())
    }
}

impl Decode for bool {
    fn decode(r: &mut ByteReader<'_>, _order: Order) -> Result<Self, Error> {
        Ok(r.u8()? != 0)
    }
}

impl Encode for bool {
    fn encode(&self, w: &mut ByteWriter, _order: Order) -> Result<(), Error> {
        w.put(&[u8::from(*self)]);
        Ok(())
    }
}

macro_rules! multi_byte_codec {
    ($ty:ty, $len:expr, $read:ident, $write:ident) => {
        impl Decode for $ty {
            fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
                let bytes = r.take($len)?;
                Ok(match order {
                    Order::Little => LittleEndian::$read(bytes),
                    Order::Big => BigEndian::$read(bytes),
                })
            }
        }

        impl Encode for $ty {
            fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
                let mut bytes = [0u8; $len];
                match order {
                    Order::Little => LittleEndian::$write(&mut bytes, *self),
                    Order::Big => BigEndian::$write(&mut bytes, *self),
                }
                w.put(&bytes);
                Ok(())
            }
        }
    };
}

multi_byte_codec!(u16, 2, read_u16, write_u16);
multi_byte_codec!(i16, 2, read_i16, write_i16);
multi_byte_codec!(u32, 4, read_u32, write_u32);
multi_byte_codec!(i32, 4, read_i32, write_i32);
multi_byte_codec!(u64, 8, read_u64, write_u64);
multi_byte_codec!(i64, 8, read_i64, write_i64);
multi_byte_codec!(f32, 4, read_f32, write_f32);
multi_byte_codec!(f64, 8, read_f64, write_f64);

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(r: &mut ByteReader<'_>, order: Order) -> Result<Self, Error> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(T::decode(r, order)?);
        }
        items
            .try_into()
            .map_err(|_| Error::invalid("array length mismatch"))
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, w: &mut ByteWriter, order: Order) -> Result<(), Error> {
        for item in self {
            item.encode(w, order)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_little_endian() {
        let (value, read) = decode::<u32>(&[0x0B, 0x11, 0x09, 0x07]).unwrap();
        assert_eq!(value, 0x0709_110B);
        assert_eq!(read, 4);
        assert_eq!(encode(&0x0709_110Bu32).unwrap(), vec![0x0B, 0x11, 0x09, 0x07]);
    }

    #[test]
    fn big_order_flips_byte_significance() {
        let (value, _) = decode_with::<u16>(&[0x20, 0x8D], Order::Big).unwrap();
        assert_eq!(value, 8333);
        assert_eq!(encode_with(&8333u16, Order::Big).unwrap(), vec![0x20, 0x8D]);
    }

    #[test]
    fn short_input_reports_needed_bytes() {
        let err = decode::<u64>(&[1, 2, 3]).unwrap_err();
        match err {
            Error::UnexpectedEof { needed, available } => {
                assert_eq!(needed, 8);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn byte_arrays_pass_through_untouched() {
        let bytes = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let (value, read) = decode::<[u8; 4]>(&bytes).unwrap();
        assert_eq!(value, bytes);
        assert_eq!(read, 4);
    }

    #[test]
    fn arrays_of_multi_byte_values_honor_order() {
        let values: [u16; 2] = [0x1234, 0x5678];
        assert_eq!(
            encode_with(&values, Order::Big).unwrap(),
            vec![0x12, 0x34, 0x56, 0x78]
        );
        let (back, _) = decode_with::<[u16; 2]>(&[0x34, 0x12, 0x78, 0x56], Order::Little).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn bool_decodes_any_nonzero_byte() {
        assert!(decode::<bool>(&[0x02]).unwrap().0);
        assert!(!decode::<bool>(&[0x00]).unwrap().0);
        assert_eq!(encode(&true).unwrap(), vec![0x01]);
    }
}

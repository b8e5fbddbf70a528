//! Avro is a data serialization system whose binary encoding carries no
//! field names or tags: the reader walks the writer's schema and decodes
//! each value in declaration order.
//!
//! <https://avro.apache.org/docs/1.11.1/specification/#binary-encoding>
//!
//! Its Rust-specific implementation is presented below.
//! Where appropriate, the primitive types of the Avro schema language have
//! been replaced by similar types of the Rust language. For example, the
//! `int` type is `i32`, `long` is `i64`, `bytes` is `[u8]` / `Vec<u8>` and
//! a `fixed` of size N is `[u8; N]`. The union `["null", T]` maps onto
//! `Option<T>` and `map<T>` onto a `BTreeMap<String, T>`.
//!
//! Only the subset of the specification needed by the IPC handshake and the
//! mail protocol is implemented. Schema resolution is not.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use byteorder::LittleEndian;
use byteorder::{ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};

pub mod handshake;
pub mod mail;
mod utils;

pub use utils::{read_long, write_long};

/// Avro writes `float` and `double` little endian.
pub type AvroEndian = LittleEndian;

pub trait Serialize {
    /// Serializes the implementing type to the provided writer.
    ///
    /// ## Parameters
    /// * `dest` - Where will the value be serialized to.
    ///
    /// ## Returns
    /// * `std::io::Result<()>` - Ok(()) on success, or an error if serialization fails.
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()>;
}

pub trait Deserialize {
    /// Deserializes data from the provided reader into the implementing type.
    ///
    /// ## Parameters
    /// * `src` - From where the value will be deserialized.
    ///
    /// ## Returns
    /// * `std::io::Result<()>` - Ok(()) on success, or an error if deserialization fails.
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()>;
}

/// Deserialization based on the [Default] trait of the type T.
pub fn deserialize<T>(src: &mut impl Read) -> std::io::Result<T>
where
    T: Deserialize + Default,
{
    let mut val = T::default();
    val.deserialize(src)?;

    Ok(val)
}

/// Marker trait for Avro `enum` serialization.
pub trait SerializeEnum: ToPrimitive {}

/// An enum is encoded by an `int`, the zero-based position of its symbol.
impl<T: SerializeEnum> Serialize for T {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if let Some(val) = self.to_i32() {
            return val.serialize(dest);
        }
        Err(utils::invalid_data("Invalid enum value"))
    }
}

/// Marker trait for Avro `enum` deserialization.
pub trait DeserializeEnum: FromPrimitive {}

impl<T: DeserializeEnum> Deserialize for T {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let val = deserialize::<i32>(src)?;
        if let Some(val) = FromPrimitive::from_i32(val) {
            *self = val;
            return Ok(());
        }

        Err(utils::invalid_data("Invalid enum symbol index"))
    }
}

/// A `boolean` is written as a single byte whose value is either 0 (false) or 1 (true).
impl Serialize for bool {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_u8(u8::from(*self))
    }
}

impl Deserialize for bool {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match src.read_u8()? {
            0 => *self = false,
            1 => *self = true,
            _ => return Err(utils::invalid_data("Invalid value for boolean")),
        }
        Ok(())
    }
}

/// Avro `int`, zig-zag varint.
impl Serialize for i32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        write_long(i64::from(*self), dest)
    }
}

impl Deserialize for i32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let Ok(val) = i32::try_from(read_long(src)?) else {
            return Err(utils::invalid_data("Varint does not fit in an `int`"));
        };
        *self = val;
        Ok(())
    }
}

/// Avro `long`, zig-zag varint.
impl Serialize for i64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        write_long(*self, dest)
    }
}

impl Deserialize for i64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = read_long(src)?;
        Ok(())
    }
}

/// Avro `float`.
impl Serialize for f32 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_f32::<AvroEndian>(*self)
    }
}

impl Deserialize for f32 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_f32::<AvroEndian>()?;
        Ok(())
    }
}

/// Avro `double`.
impl Serialize for f64 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_f64::<AvroEndian>(*self)
    }
}

impl Deserialize for f64 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = src.read_f64::<AvroEndian>()?;
        Ok(())
    }
}

/// Avro `fixed` of size N: exactly N raw bytes, no length prefix.
impl<const N: usize> Serialize for [u8; N] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(self)
    }
}

impl<const N: usize> Deserialize for [u8; N] {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        src.read_exact(self)
    }
}

/// Lengths and block counts in Avro are always `long`. This wrapper
/// type provides a way to serialize the [usize] type common to Rust as [i64].
#[derive(Default)]
struct UsizeAsLong(usize);

impl Serialize for UsizeAsLong {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        let Some(val) = self.0.to_i64() else {
            return Err(utils::invalid_data("cannot cast `usize` to `long`"));
        };

        write_long(val, dest)
    }
}

impl Deserialize for UsizeAsLong {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let Some(val) = read_long(src)?.to_usize() else {
            return Err(utils::invalid_data("negative or oversized length"));
        };

        self.0 = val;
        Ok(())
    }
}

/// Avro `bytes`: a `long` length followed by that many bytes.
impl Serialize for [u8] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        UsizeAsLong(self.len()).serialize(dest)?;
        dest.write_all(self)
    }
}

impl Serialize for Vec<u8> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

impl Deserialize for Vec<u8> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let length = deserialize::<UsizeAsLong>(src)?.0;
        self.clear();
        // read through `take` so a forged length cannot force a huge allocation
        let read = src.by_ref().take(length as u64).read_to_end(self)?;
        if read != length {
            self.clear();
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }

        Ok(())
    }
}

/// Avro `string`: encoded as `bytes` holding UTF-8.
impl Serialize for str {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_bytes().serialize(dest)
    }
}

impl Serialize for String {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_str().serialize(dest)
    }
}

impl Deserialize for String {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let bytes = deserialize::<Vec<u8>>(src)?;
        match String::from_utf8(bytes) {
            Ok(val) => *self = val,
            Err(_) => {
                self.clear();
                return Err(utils::invalid_data("Not UTF-8 string"));
            }
        }

        Ok(())
    }
}

/// Avro `array`. The whole slice is written as a single block followed by
/// the terminating zero count; an empty slice is just the zero count.
impl<T: Serialize> Serialize for [T] {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if !self.is_empty() {
            UsizeAsLong(self.len()).serialize(dest)?;
            for i in self {
                i.serialize(dest)?;
            }
        }
        write_long(0, dest)
    }
}

impl<T: Serialize> Serialize for Vec<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.as_slice().serialize(dest)
    }
}

/// Reads the count of the next array or map block. A negative count is
/// followed by the byte size of the block, which is skipped over.
fn read_block_count(src: &mut impl Read) -> std::io::Result<usize> {
    let count = read_long(src)?;
    if count < 0 {
        let _block_size = read_long(src)?;
    }
    count
        .unsigned_abs()
        .to_usize()
        .ok_or_else(|| utils::invalid_data("block count does not fit in `usize`"))
}

impl<T: Deserialize + Default> Deserialize for Vec<T> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.clear();
        loop {
            let count = read_block_count(src)?;
            if count == 0 {
                break;
            }
            for _ in 0..count {
                self.push(deserialize::<T>(src)?);
            }
        }
        Ok(())
    }
}

/// Avro `map`. Keys are always strings.
impl<V: Serialize> Serialize for BTreeMap<String, V> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        if !self.is_empty() {
            UsizeAsLong(self.len()).serialize(dest)?;
            for (key, value) in self {
                key.serialize(dest)?;
                value.serialize(dest)?;
            }
        }
        write_long(0, dest)
    }
}

impl<V: Deserialize + Default> Deserialize for BTreeMap<String, V> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.clear();
        loop {
            let count = read_block_count(src)?;
            if count == 0 {
                break;
            }
            for _ in 0..count {
                let key = deserialize::<String>(src)?;
                let value = deserialize::<V>(src)?;
                self.insert(key, value);
            }
        }
        Ok(())
    }
}

/// Macro for implementing Avro serialization and deserialization for records.
///
/// A record is encoded by encoding the values of its fields in the order
/// that they are declared, with nothing in between.
#[allow(non_camel_case_types)]
#[macro_export]
macro_rules! SerializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::protocol::avro::Serialize for $t {
            fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
                $($crate::protocol::avro::Serialize::serialize(&self.$element, dest)?;)*
                Ok(())
            }
        }
    };
}

#[allow(non_camel_case_types)]
#[macro_export]
macro_rules! DeserializeStruct {
    (
        $t:ident,
        $($element:ident),*
    ) => {
        impl $crate::protocol::avro::Deserialize for $t {
            fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
                $($crate::protocol::avro::Deserialize::deserialize(&mut self.$element, src)?;)*
                Ok(())
            }
        }
    };
}

// The union ["null", T]: branch index as a `long`, then the value if any.
impl<T: Serialize> Serialize for Option<T> {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            Some(data) => {
                write_long(1, dest)?;
                data.serialize(dest)
            }
            None => write_long(0, dest),
        }
    }
}

impl<T: Deserialize + Default> Deserialize for Option<T> {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match read_long(src)? {
            0 => *self = None,
            1 => *self = Some(deserialize::<T>(src)?),
            _ => return Err(utils::invalid_data("Invalid union branch for optional value")),
        }

        Ok(())
    }
}

// Re-export public types for use in other modules
pub use crate::DeserializeStruct;
pub use crate::SerializeStruct;

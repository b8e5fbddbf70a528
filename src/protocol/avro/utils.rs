use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

/// A zig-zag varint never needs more than ten bytes for 64 bits.
pub const MAX_VARINT_LENGTH: usize = 10;

pub fn write_long(value: i64, dest: &mut impl Write) -> std::io::Result<()> {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n & !0x7f != 0 {
        dest.write_u8(((n & 0x7f) | 0x80) as u8)?;
        n >>= 7;
    }
    dest.write_u8(n as u8)
}

pub fn read_long(src: &mut impl Read) -> std::io::Result<i64> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for _ in 0..MAX_VARINT_LENGTH {
        let byte = src.read_u8()?;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((value >> 1) as i64 ^ -((value & 1) as i64));
        }
        shift += 7;
    }
    Err(invalid_data("varint is longer than 10 bytes"))
}

pub fn invalid_data(m: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, m)
}

//! Binary stream helpers for the set wire format.
//!
//! Fixed-width integers are little-endian. Byte strings are `[len: u64 LE][bytes]`.
//! Structured headers (limits, schema) go through `bincode`.

use std::io::{Read, Write};

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Upper bound accepted for a single length-prefixed value or bincode record (256 MiB).
const MAX_BYTES_LEN: u64 = 256 * 1024 * 1024;

pub(crate) fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn write_u128<W: Write>(writer: &mut W, value: u128) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_bool<W: Write>(writer: &mut W, value: bool) -> Result<()> {
    writer.write_all(&[u8::from(value)])?;
    Ok(())
}

pub(crate) fn read_bool<R: Read>(reader: &mut R) -> Result<bool> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    match buf[0] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::CorruptedData(format!("invalid bool byte {other}"))),
    }
}

pub(crate) fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    write_u64(writer, bytes.len() as u64)?;
    writer.write_all(bytes)?;
    Ok(())
}

pub(crate) fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_u64(reader)?;
    if len > MAX_BYTES_LEN {
        return Err(Error::CorruptedData(format!(
            "byte string of {len} bytes exceeds the {MAX_BYTES_LEN} byte limit"
        )));
    }
    let len = usize::try_from(len)
        .map_err(|_| Error::CorruptedData(format!("byte string length {len} overflows usize")))?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads an element count, rejecting values that cannot be a real collection size.
pub(crate) fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let len = read_u64(reader)?;
    usize::try_from(len)
        .map_err(|_| Error::CorruptedData(format!("element count {len} overflows usize")))
}

/// Fixed-width integers like the plain `bincode` functions, but every read is
/// bounded so a corrupted length cannot force a huge allocation.
fn bincode_options() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_BYTES_LEN)
}

pub(crate) fn write_bincode<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    bincode_options().serialize_into(writer, value)?;
    Ok(())
}

pub(crate) fn read_bincode<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    Ok(bincode_options().deserialize_from(reader)?)
}

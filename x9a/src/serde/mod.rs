//! Byte-level (de)serialization primitives for the X9A container
//!
//! Integers in an X9A file are big-endian (the master tune field of the
//! system record is the single exception). Sections and entries are framed
//! with 4-byte length fields whose value is only known once the body behind
//! them has been written, which is what [`write_length_prefixed`] is for.
//!
//! The `expect_*` helpers read a value and fail with
//! [`ReadError::UnexpectedLiteral`] when it differs from the fixed value the
//! format prescribes at that position.

use crate::name::NameError;
use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    slice,
};
use thiserror::Error;

pub fn read_u8<R>(mut reader: R) -> io::Result<u8>
where
    R: Read,
{
    let mut byte = 0;
    reader.read_exact(slice::from_mut(&mut byte))?;
    Ok(byte)
}

pub fn read_u16_be<R>(mut reader: R) -> io::Result<u16>
where
    R: Read,
{
    let mut bytes = [0; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_be_bytes(bytes))
}

pub fn read_u16_le<R>(mut reader: R) -> io::Result<u16>
where
    R: Read,
{
    let mut bytes = [0; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

pub fn read_u32_be<R>(mut reader: R) -> io::Result<u32>
where
    R: Read,
{
    let mut bytes = [0; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}

pub fn write_u16_be<W>(mut writer: W, value: u16) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&value.to_be_bytes())
}

pub fn write_u16_le<W>(mut writer: W, value: u16) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&value.to_le_bytes())
}

pub fn write_u32_be<W>(mut writer: W, value: u32) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(&value.to_be_bytes())
}

/// Read bytes up to (and consuming) a null terminator
pub fn read_null_terminated<R>(mut reader: R) -> io::Result<Vec<u8>>
where
    R: Read,
{
    let mut bytes = Vec::new();
    loop {
        match read_u8(&mut reader)? {
            0 => break,
            byte => bytes.push(byte),
        }
    }
    Ok(bytes)
}

pub fn write_null_terminated<W>(mut writer: W, bytes: &[u8]) -> io::Result<()>
where
    W: Write,
{
    writer.write_all(bytes)?;
    writer.write_all(&[0])
}

pub fn write_repeated_byte<W>(value: u8, count: usize, mut writer: W) -> io::Result<()>
where
    W: Write,
{
    for _ in 0..count {
        writer.write_all(slice::from_ref(&value))?;
    }

    Ok(())
}

/// Read a fixed byte sequence and fail if it isn't exactly `expected`
pub fn expect_bytes<R>(mut reader: R, expected: &[u8]) -> Result<(), ReadError>
where
    R: Read + Seek,
{
    let offset = reader.stream_position()?;
    let mut found = vec![0; expected.len()];
    reader.read_exact(&mut found)?;

    if found != expected {
        return Err(ReadError::UnexpectedLiteral {
            offset,
            expected: hex_string(expected),
            found: hex_string(&found),
        });
    }

    Ok(())
}

/// Read a fixed ASCII tag (e.g. a section name) and fail if it differs
pub fn expect_tag<R>(mut reader: R, tag: &str) -> Result<(), ReadError>
where
    R: Read + Seek,
{
    let offset = reader.stream_position()?;
    let mut found = vec![0; tag.len()];
    reader.read_exact(&mut found)?;

    if found != tag.as_bytes() {
        return Err(ReadError::UnexpectedLiteral {
            offset,
            expected: format!("\"{tag}\""),
            found: format!("\"{}\"", String::from_utf8_lossy(&found)),
        });
    }

    Ok(())
}

pub fn expect_u16_be<R>(mut reader: R, expected: u16) -> Result<(), ReadError>
where
    R: Read + Seek,
{
    let offset = reader.stream_position()?;
    let found = read_u16_be(&mut reader)?;

    if found != expected {
        return Err(ReadError::UnexpectedLiteral {
            offset,
            expected: format!("{expected:#x}"),
            found: format!("{found:#x}"),
        });
    }

    Ok(())
}

pub fn expect_u32_be<R>(mut reader: R, expected: u32) -> Result<(), ReadError>
where
    R: Read + Seek,
{
    let offset = reader.stream_position()?;
    let found = read_u32_be(&mut reader)?;

    if found != expected {
        return Err(ReadError::UnexpectedLiteral {
            offset,
            expected: format!("{expected:#x}"),
            found: format!("{found:#x}"),
        });
    }

    Ok(())
}

/// Write a block whose length is only known once its body has been written
///
/// Reserves a 4-byte big-endian length field, runs `body`, measures how many
/// bytes it produced and seeks back to patch the field, leaving the stream
/// positioned right after the body.
pub fn write_length_prefixed<W, F>(writer: &mut W, body: F) -> io::Result<()>
where
    W: Write + Seek,
    F: FnOnce(&mut W) -> io::Result<()>,
{
    let length_position = writer.stream_position()?;
    writer.write_all(&[0; 4])?;

    let start = writer.stream_position()?;
    body(&mut *writer)?;
    let end = writer.stream_position()?;

    writer.seek(SeekFrom::Start(length_position))?;
    write_u32_be(&mut *writer, (end - start) as u32)?;
    writer.seek(SeekFrom::Start(end))?;

    Ok(())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect()
}

/// Errors that might occur decoding an X9A file
///
/// Every variant is terminal: a file that violates the format in any way is
/// treated as unsupported, never as partially readable.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Any failure that has to do with I/O
    #[error("Something failed with I/O")]
    Io(#[from] io::Error),

    /// A fixed byte sequence, tag or integer did not have its required value
    #[error("Unexpected value at offset {offset:#x}: expected {expected}, found {found}")]
    UnexpectedLiteral {
        offset: u64,
        expected: String,
        found: String,
    },

    /// The catalogue did not list exactly the four required sections
    #[error("Unexpected catalogue sections: {}", .found.join(", "))]
    UnexpectedCatalogue { found: Vec<String> },

    /// A declared block or entry length disagrees with the actual byte count
    #[error("Declared length {declared} does not match actual length {found}")]
    LengthMismatch { declared: u32, found: u32 },

    /// A payload filler byte was not the 0xFF sentinel
    #[error("Padding byte at offset {offset:#x} is {found:#04x}, expected 0xff")]
    PaddingViolation { offset: u64, found: u8 },

    /// Two places in the file that must agree (index vs. payload, or the
    /// redundant copies of a field) did not
    #[error("Cross-check failed: {0}")]
    CrossCheck(String),

    /// A stored name could not be reconstructed
    #[error("Reading a name failed")]
    Name(#[from] NameError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn length_prefix_is_patched() {
        let mut cursor = Cursor::new(Vec::new());

        cursor.write_all(b"Tag!").unwrap();
        write_length_prefixed(&mut cursor, |writer| writer.write_all(&[1, 2, 3, 4, 5])).unwrap();
        cursor.write_all(b"after").unwrap();

        let bytes = cursor.into_inner();
        assert_eq!(&bytes[..13], b"Tag!\x00\x00\x00\x05\x01\x02\x03\x04\x05");
        assert_eq!(&bytes[13..], b"after");
    }

    #[test]
    fn nested_length_prefixes() {
        let mut cursor = Cursor::new(Vec::new());

        write_length_prefixed(&mut cursor, |writer| {
            writer.write_all(&[0xAB])?;
            write_length_prefixed(writer, |writer| writer.write_all(&[0xCD, 0xEF]))
        })
        .unwrap();

        assert_eq!(
            cursor.into_inner(),
            [0x00, 0x00, 0x00, 0x07, 0xAB, 0x00, 0x00, 0x00, 0x02, 0xCD, 0xEF]
        );
    }

    #[test]
    fn expectation_failure_reports_offset() {
        let mut cursor = Cursor::new([0xDE, 0xAD, 0x00, 0x00, 0x00, 0x2A]);
        cursor.set_position(2);

        match expect_u32_be(&mut cursor, 0x2B) {
            Err(ReadError::UnexpectedLiteral {
                offset,
                expected,
                found,
            }) => {
                assert_eq!(offset, 2);
                assert_eq!(expected, "0x2b");
                assert_eq!(found, "0x2a");
            }
            other => panic!("expected an UnexpectedLiteral error, got {other:?}"),
        }
    }

    #[test]
    fn null_terminated_round_trip() {
        let mut bytes = Vec::new();
        write_null_terminated(&mut bytes, b"System").unwrap();
        assert_eq!(bytes, b"System\0");

        let name = read_null_terminated(Cursor::new(&bytes)).unwrap();
        assert_eq!(name, b"System");
    }
}

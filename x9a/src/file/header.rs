//! The fixed preamble at the start of every X9A file

use crate::serde::{ReadError, expect_bytes, expect_u32_be, read_u32_be, write_u32_be};
use std::io::{self, Read, Seek, Write};

const MAGIC: &[u8] = b"YAMAHA-YSFC\0";
const VERSION: &[u8] = b"6.0.0\0";
const RESERVED_ZEROS: [u8; 10] = [0; 10];
const RESERVED_PATTERN: [u8; 28] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// The fixed-layout file preamble
///
/// Everything in the header is constant except the size of the catalogue
/// that follows it.
pub(crate) struct Header {
    pub catalogue_size: u32,
}

impl Header {
    pub fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        expect_bytes(&mut reader, MAGIC)?;
        expect_u32_be(&mut reader, 0)?;
        expect_bytes(&mut reader, VERSION)?;
        expect_bytes(&mut reader, &RESERVED_ZEROS)?;
        let catalogue_size = read_u32_be(&mut reader)?;
        expect_bytes(&mut reader, &RESERVED_PATTERN)?;

        Ok(Self { catalogue_size })
    }

    pub fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(MAGIC)?;
        write_u32_be(&mut writer, 0)?;
        writer.write_all(VERSION)?;
        writer.write_all(&RESERVED_ZEROS)?;
        write_u32_be(&mut writer, self.catalogue_size)?;
        writer.write_all(&RESERVED_PATTERN)
    }
}

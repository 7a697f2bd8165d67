//! The index sections describing where each payload lives

use crate::serde::{
    ReadError, expect_tag, expect_u16_be, read_null_terminated, read_u8, read_u32_be,
    write_length_prefixed, write_null_terminated, write_u16_be, write_u32_be,
};
use std::io::{self, Read, Seek, SeekFrom, Write};

// Marker that follows the location fields of every voice entry
const VOICE_ENTRY_MARKER: u16 = 0x3F;

// The name the single system entry must carry
const SYSTEM_ENTRY_NAME: &[u8] = b"System";

/// One entry of the voice index: where a voice payload lives, and the
/// position and name it is filed under
pub(crate) struct VoiceEntry {
    pub data_size: u32,
    /// Offset of the payload slot, relative to the start of its section
    pub data_offset: u32,
    pub page: u8,
    pub slot: u8,
    pub name: Vec<u8>,
}

/// The single entry of the system index
pub(crate) struct SystemEntry {
    pub data_size: u32,
    pub data_offset: u32,
}

pub(crate) fn read_voice_entries<R>(reader: &mut R, offset: u32) -> Result<Vec<VoiceEntry>, ReadError>
where
    R: Read + Seek,
{
    read_section(reader, offset, "ELST", |reader| {
        let data_size = read_u32_be(&mut *reader)?;
        let data_offset = read_u32_be(&mut *reader)?;
        expect_u16_be(&mut *reader, VOICE_ENTRY_MARKER)?;
        let page = read_u8(&mut *reader)?;
        let slot = read_u8(&mut *reader)?;
        let name = read_null_terminated(&mut *reader)?;

        Ok(VoiceEntry {
            data_size,
            data_offset,
            page,
            slot,
            name,
        })
    })
}

pub(crate) fn read_system_entries<R>(
    reader: &mut R,
    offset: u32,
) -> Result<Vec<SystemEntry>, ReadError>
where
    R: Read + Seek,
{
    read_section(reader, offset, "ESYS", |reader| {
        let data_size = read_u32_be(&mut *reader)?;
        let data_offset = read_u32_be(&mut *reader)?;
        expect_u16_be(&mut *reader, 0)?;
        expect_u16_be(&mut *reader, 0)?;

        let name_offset = reader.stream_position()?;
        let name = read_null_terminated(&mut *reader)?;
        if name != SYSTEM_ENTRY_NAME {
            return Err(ReadError::UnexpectedLiteral {
                offset: name_offset,
                expected: "\"System\"".to_string(),
                found: format!("\"{}\"", String::from_utf8_lossy(&name)),
            });
        }

        Ok(SystemEntry {
            data_size,
            data_offset,
        })
    })
}

/// Read an index section: tag, body length, entry count and the entries
/// themselves, each framed as an `Entr` block
///
/// Both the per-entry lengths and the body length are validated against the
/// bytes actually consumed.
fn read_section<R, T, F>(
    reader: &mut R,
    offset: u32,
    tag: &str,
    mut read_entry: F,
) -> Result<Vec<T>, ReadError>
where
    R: Read + Seek,
    F: FnMut(&mut R) -> Result<T, ReadError>,
{
    reader.seek(SeekFrom::Start(offset as u64))?;
    expect_tag(&mut *reader, tag)?;
    let block_length = read_u32_be(&mut *reader)?;
    let block_start = reader.stream_position()?;

    let count = read_u32_be(&mut *reader)?;
    let mut entries = Vec::with_capacity(count as usize);

    for _ in 0..count {
        expect_tag(&mut *reader, "Entr")?;
        let entry_length = read_u32_be(&mut *reader)?;
        let entry_start = reader.stream_position()?;

        entries.push(read_entry(&mut *reader)?);

        let consumed = (reader.stream_position()? - entry_start) as u32;
        if entry_length != consumed {
            return Err(ReadError::LengthMismatch {
                declared: entry_length,
                found: consumed,
            });
        }
    }

    let consumed = (reader.stream_position()? - block_start) as u32;
    if block_length != consumed {
        return Err(ReadError::LengthMismatch {
            declared: block_length,
            found: consumed,
        });
    }

    Ok(entries)
}

pub(crate) fn write_voice_entries<W>(writer: &mut W, entries: &[VoiceEntry]) -> io::Result<()>
where
    W: Write + Seek,
{
    writer.write_all(b"ELST")?;
    write_length_prefixed(writer, |writer| {
        write_u32_be(&mut *writer, entries.len() as u32)?;

        for entry in entries {
            writer.write_all(b"Entr")?;
            write_length_prefixed(writer, |writer| {
                write_u32_be(&mut *writer, entry.data_size)?;
                write_u32_be(&mut *writer, entry.data_offset)?;
                write_u16_be(&mut *writer, VOICE_ENTRY_MARKER)?;
                writer.write_all(&[entry.page, entry.slot])?;
                write_null_terminated(&mut *writer, &entry.name)
            })?;
        }

        Ok(())
    })
}

pub(crate) fn write_system_entries<W>(writer: &mut W, entries: &[SystemEntry]) -> io::Result<()>
where
    W: Write + Seek,
{
    writer.write_all(b"ESYS")?;
    write_length_prefixed(writer, |writer| {
        write_u32_be(&mut *writer, entries.len() as u32)?;

        for entry in entries {
            writer.write_all(b"Entr")?;
            write_length_prefixed(writer, |writer| {
                write_u32_be(&mut *writer, entry.data_size)?;
                write_u32_be(&mut *writer, entry.data_offset)?;
                write_u16_be(&mut *writer, 0)?;
                write_u16_be(&mut *writer, 0)?;
                write_null_terminated(&mut *writer, SYSTEM_ENTRY_NAME)
            })?;
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_voice_section(entries: &[VoiceEntry]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        write_voice_entries(&mut cursor, entries).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn voice_entries_round_trip() {
        let entries = vec![
            VoiceEntry {
                data_size: 0x400,
                data_offset: 12,
                page: 0,
                slot: 0,
                name: b"Grand Piano".to_vec(),
            },
            VoiceEntry {
                data_size: 0x400,
                data_offset: 12 + 0x408,
                page: 0,
                slot: 1,
                name: Vec::new(),
            },
        ];

        let bytes = encode_voice_section(&entries);
        let decoded = read_voice_entries(&mut Cursor::new(&bytes), 0).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].name, b"Grand Piano");
        assert_eq!(decoded[0].data_offset, 12);
        assert_eq!(decoded[1].page, 0);
        assert_eq!(decoded[1].slot, 1);
        assert_eq!(decoded[1].data_offset, 12 + 0x408);
    }

    #[test]
    fn entry_length_mismatch_fails() {
        let entries = vec![VoiceEntry {
            data_size: 0x400,
            data_offset: 12,
            page: 0,
            slot: 0,
            name: Vec::new(),
        }];

        let mut bytes = encode_voice_section(&entries);
        // The entry body is 13 bytes; declare one more
        assert_eq!(bytes[12..16], *b"Entr");
        bytes[19] = 14;

        assert!(matches!(
            read_voice_entries(&mut Cursor::new(&bytes), 0),
            Err(ReadError::LengthMismatch {
                declared: 14,
                found: 13
            })
        ));
    }

    #[test]
    fn system_entry_requires_its_name() {
        let mut cursor = Cursor::new(Vec::new());
        write_system_entries(
            &mut cursor,
            &[SystemEntry {
                data_size: 0x200,
                data_offset: 12,
            }],
        )
        .unwrap();
        let mut bytes = cursor.into_inner();

        let decoded = read_system_entries(&mut Cursor::new(&bytes), 0).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].data_size, 0x200);

        // "System" starts after the tag, length, count and entry preamble
        bytes[32] = b'Z';
        assert!(matches!(
            read_system_entries(&mut Cursor::new(&bytes), 0),
            Err(ReadError::UnexpectedLiteral { .. })
        ));
    }
}

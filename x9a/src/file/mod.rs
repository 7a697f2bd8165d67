//! Reading and writing whole X9A files

mod catalogue;
mod entry;
mod header;

use crate::{
    serde::{
        ReadError, expect_tag, read_u32_be, write_length_prefixed, write_repeated_byte,
        write_u32_be,
    },
    system::SystemData,
    voice::Voice,
};
use catalogue::Catalogue;
use entry::{SystemEntry, VoiceEntry};
use header::Header;
use std::{
    fs::File,
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
};
use thiserror::Error;

// The sentinel every payload slot is padded out with
const FILL_BYTE: u8 = 0xFF;

// The fixed envelope sizes payloads are padded out to
const VOICE_PAD_SIZE: u32 = 0x400;
const SYSTEM_PAD_SIZE: u32 = 0x200;

/// A decoded X9A file: the voice bank plus the system settings
///
/// ```no_run
/// # use x9a::X9aFile;
/// // Load a bank from disk, with the round-trip support gate applied
/// let mut bank = X9aFile::from_path_verified("stage-set.x9a")?;
///
/// // Rename the first voice and write the bank back
/// bank.voices[0].name = "My Piano".parse()?;
/// bank.to_path("stage-set.x9a")?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct X9aFile {
    /// The voices, in bank order (page `i / 8`, slot `i % 8`)
    pub voices: Vec<Voice>,

    /// The instrument's global configuration
    pub system: SystemData,
}

impl X9aFile {
    /// The number of voice slots on a live set page
    pub const SLOTS_PER_PAGE: usize = 8;

    /// The number of live set pages in a bank
    pub const PAGE_COUNT: usize = 20;

    /// The number of voices in a bank
    pub const VOICE_COUNT: usize = Self::PAGE_COUNT * Self::SLOTS_PER_PAGE;

    /// Construct a bank of empty voices and default system settings
    pub fn new() -> Self {
        Self {
            voices: vec![Voice::default(); Self::VOICE_COUNT],
            system: SystemData::default(),
        }
    }

    /// Parse an X9A file from an arbitrary I/O reader
    ///
    /// The reader must support seeking; the catalogue points at its sections
    /// by absolute offset and the payload slots are addressed through their
    /// index entries.
    pub fn from_reader<R>(mut reader: R) -> Result<Self, ReadError>
    where
        R: Read + Seek,
    {
        let header = Header::from_reader(&mut reader)?;
        let catalogue = Catalogue::from_reader(&mut reader, header.catalogue_size)?;
        let [elst, esys, dlst, dsys] = catalogue.section_offsets()?;

        let voice_entries = entry::read_voice_entries(&mut reader, elst)?;
        let system_entries = entry::read_system_entries(&mut reader, esys)?;
        if system_entries.len() != 1 {
            return Err(ReadError::CrossCheck(format!(
                "expected exactly one system entry, found {}",
                system_entries.len()
            )));
        }

        let voices = read_voice_payloads(&mut reader, dlst, &voice_entries)?;
        let system = read_system_payload(&mut reader, dsys, &system_entries[0])?;

        Ok(Self { voices, system })
    }

    /// Parse an X9A file from a path on disk
    pub fn from_path<P>(path: P) -> Result<Self, ReadError>
    where
        P: AsRef<Path>,
    {
        Self::from_reader(File::open(path)?)
    }

    /// Parse an X9A file and prove that it is fully understood
    ///
    /// The parsed bank is re-encoded and compared against the input; only
    /// byte identity shows that every corner of the file was accounted for.
    /// A file that parses but re-encodes differently was written by an
    /// unsupported firmware variant and must not be loaded, as saving it
    /// back would silently lose whatever was not understood.
    pub fn from_bytes_verified(bytes: &[u8]) -> Result<Self, LoadError> {
        let file = Self::from_reader(Cursor::new(bytes))?;

        let mut encoded = Cursor::new(Vec::with_capacity(bytes.len()));
        file.to_writer(&mut encoded).map_err(ReadError::from)?;

        if encoded.get_ref() != bytes {
            return Err(LoadError::RoundTrip);
        }

        Ok(file)
    }

    /// Parse an X9A file from a path on disk and prove that it is fully
    /// understood, as in [`X9aFile::from_bytes_verified`]
    pub fn from_path_verified<P>(path: P) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
    {
        let bytes = std::fs::read(path).map_err(ReadError::from)?;
        Self::from_bytes_verified(&bytes)
    }

    /// Serialize the bank to an arbitrary I/O writer
    ///
    /// The writer must support seeking: section offsets are only known once
    /// the section bodies have been written, so the catalogue is written as
    /// a placeholder first and patched afterwards.
    pub fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write + Seek,
    {
        let placeholder = Catalogue::placeholder();
        Header {
            catalogue_size: placeholder.size(),
        }
        .to_writer(&mut writer)?;

        let catalogue_position = writer.stream_position()?;
        placeholder.to_writer(&mut writer)?;

        let mut offsets = [0; 4];

        offsets[0] = writer.stream_position()? as u32;
        entry::write_voice_entries(&mut writer, &self.voice_entries())?;

        offsets[1] = writer.stream_position()? as u32;
        entry::write_system_entries(
            &mut writer,
            &[SystemEntry {
                data_size: SYSTEM_PAD_SIZE,
                data_offset: slot_offset(0, SYSTEM_PAD_SIZE),
            }],
        )?;

        offsets[2] = writer.stream_position()? as u32;
        writer.write_all(b"DLST")?;
        write_length_prefixed(&mut writer, |writer| {
            write_u32_be(&mut *writer, self.voices.len() as u32)?;
            for voice in &self.voices {
                write_payload_slot(writer, VOICE_PAD_SIZE, |writer| voice.to_writer(writer))?;
            }
            Ok(())
        })?;

        offsets[3] = writer.stream_position()? as u32;
        writer.write_all(b"DSYS")?;
        write_length_prefixed(&mut writer, |writer| {
            write_u32_be(&mut *writer, 1)?;
            write_payload_slot(writer, SYSTEM_PAD_SIZE, |writer| self.system.to_writer(writer))
        })?;

        // Second pass over the reserved catalogue, now with the real offsets
        let end_position = writer.stream_position()?;
        writer.seek(SeekFrom::Start(catalogue_position))?;
        Catalogue::with_offsets(offsets).to_writer(&mut writer)?;
        writer.seek(SeekFrom::Start(end_position))?;

        Ok(())
    }

    /// Serialize the bank to a path on disk
    pub fn to_path<P>(&self, path: P) -> io::Result<()>
    where
        P: AsRef<Path>,
    {
        self.to_writer(File::create(path)?)
    }

    /// Find the next voice whose name contains `term`, case-insensitively
    ///
    /// The search starts at `start` and wraps around the end of the bank.
    pub fn find_voice_by_name(&self, term: &str, start: usize) -> Option<usize> {
        if self.voices.is_empty() {
            return None;
        }

        let term = term.to_ascii_lowercase();
        (0..self.voices.len())
            .map(|offset| (start + offset) % self.voices.len())
            .find(|index| {
                self.voices[*index]
                    .name
                    .to_string()
                    .to_ascii_lowercase()
                    .contains(&term)
            })
    }

    /// The voice index entries, derived from the bank itself
    fn voice_entries(&self) -> Vec<VoiceEntry> {
        self.voices
            .iter()
            .enumerate()
            .map(|(index, voice)| VoiceEntry {
                data_size: VOICE_PAD_SIZE,
                data_offset: slot_offset(index, VOICE_PAD_SIZE),
                page: (index / Self::SLOTS_PER_PAGE) as u8,
                slot: (index % Self::SLOTS_PER_PAGE) as u8,
                name: voice.name.as_bytes().to_vec(),
            })
            .collect()
    }
}

impl Default for X9aFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Offset of a payload slot relative to the start of its section: the
/// section tag, length and count fields, then the preceding slots
fn slot_offset(index: usize, pad_size: u32) -> u32 {
    12 + index as u32 * (8 + pad_size)
}

fn read_voice_payloads<R>(
    reader: &mut R,
    section_offset: u32,
    entries: &[VoiceEntry],
) -> Result<Vec<Voice>, ReadError>
where
    R: Read + Seek,
{
    let (block_length, count) = read_payload_section_header(reader, section_offset, "DLST")?;
    if count as usize != entries.len() {
        return Err(ReadError::CrossCheck(format!(
            "the index lists {} voices but the payload section holds {count}",
            entries.len()
        )));
    }

    let expected_length = 4 + entries.iter().map(|entry| 8 + entry.data_size).sum::<u32>();
    if block_length != expected_length {
        return Err(ReadError::LengthMismatch {
            declared: block_length,
            found: expected_length,
        });
    }

    let mut voices = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let (payload_offset, payload) =
            read_payload_slot(reader, section_offset, entry.data_offset, entry.data_size)?;

        let mut cursor = Cursor::new(payload.as_slice());
        let voice = Voice::from_reader(&mut cursor)?;
        check_padding(&cursor, payload_offset)?;

        let page = (index / X9aFile::SLOTS_PER_PAGE) as u8;
        let slot = (index % X9aFile::SLOTS_PER_PAGE) as u8;
        if entry.page != page || entry.slot != slot {
            return Err(ReadError::CrossCheck(format!(
                "voice {index} is filed under page {} slot {} instead of page {page} slot {slot}",
                entry.page, entry.slot
            )));
        }

        if entry.name != voice.name.as_bytes() {
            return Err(ReadError::CrossCheck(format!(
                "voice {index} is indexed as \"{}\" but its payload is named \"{}\"",
                String::from_utf8_lossy(&entry.name),
                voice.name
            )));
        }

        voices.push(voice);
    }

    Ok(voices)
}

fn read_system_payload<R>(
    reader: &mut R,
    section_offset: u32,
    entry: &SystemEntry,
) -> Result<SystemData, ReadError>
where
    R: Read + Seek,
{
    let (block_length, count) = read_payload_section_header(reader, section_offset, "DSYS")?;
    if count != 1 {
        return Err(ReadError::CrossCheck(format!(
            "expected one system payload, found {count}"
        )));
    }

    let expected_length = 4 + 8 + entry.data_size;
    if block_length != expected_length {
        return Err(ReadError::LengthMismatch {
            declared: block_length,
            found: expected_length,
        });
    }

    let (payload_offset, payload) =
        read_payload_slot(reader, section_offset, entry.data_offset, entry.data_size)?;

    let mut cursor = Cursor::new(payload.as_slice());
    let system = SystemData::from_reader(&mut cursor)?;
    check_padding(&cursor, payload_offset)?;

    Ok(system)
}

fn read_payload_section_header<R>(
    reader: &mut R,
    offset: u32,
    tag: &str,
) -> Result<(u32, u32), ReadError>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(offset as u64))?;
    expect_tag(&mut *reader, tag)?;
    let block_length = read_u32_be(&mut *reader)?;
    let count = read_u32_be(&mut *reader)?;

    Ok((block_length, count))
}

/// Read one padded payload slot, returning the payload bytes and the
/// absolute file offset they start at
fn read_payload_slot<R>(
    reader: &mut R,
    section_offset: u32,
    data_offset: u32,
    data_size: u32,
) -> Result<(u64, Vec<u8>), ReadError>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(section_offset as u64 + data_offset as u64))?;
    expect_tag(&mut *reader, "Data")?;

    let pad_size = read_u32_be(&mut *reader)?;
    if pad_size != data_size {
        return Err(ReadError::LengthMismatch {
            declared: pad_size,
            found: data_size,
        });
    }

    let payload_offset = reader.stream_position()?;
    let mut payload = vec![0; data_size as usize];
    reader.read_exact(&mut payload)?;

    Ok((payload_offset, payload))
}

/// Require everything after the cursor position to be the 0xFF fill sentinel
fn check_padding(cursor: &Cursor<&[u8]>, payload_offset: u64) -> Result<(), ReadError> {
    let bytes = *cursor.get_ref();
    let position = cursor.position() as usize;

    for (index, byte) in bytes[position..].iter().enumerate() {
        if *byte != FILL_BYTE {
            return Err(ReadError::PaddingViolation {
                offset: payload_offset + (position + index) as u64,
                found: *byte,
            });
        }
    }

    Ok(())
}

/// Write one payload slot: the `Data` tag, the pad size, the payload itself
/// and enough fill bytes to reach the pad size
fn write_payload_slot<W, F>(writer: &mut W, pad_size: u32, payload: F) -> io::Result<()>
where
    W: Write + Seek,
    F: FnOnce(&mut W) -> io::Result<()>,
{
    writer.write_all(b"Data")?;
    write_u32_be(&mut *writer, pad_size)?;

    let start = writer.stream_position()?;
    payload(&mut *writer)?;
    let consumed = writer.stream_position()? - start;
    assert!(
        consumed <= pad_size as u64,
        "a payload of {consumed} bytes exceeds its {pad_size}-byte envelope"
    );

    write_repeated_byte(FILL_BYTE, (pad_size as u64 - consumed) as usize, writer)
}

/// Errors that might occur loading an X9A file through the round-trip gate
#[derive(Debug, Error)]
pub enum LoadError {
    /// Parsing the file failed
    #[error("Parsing the file failed")]
    Read(#[from] ReadError),

    /// The parsed bank did not re-encode to the original bytes, meaning the
    /// file comes in a variant this crate does not fully understand
    #[error("Re-encoding the parsed file did not reproduce the original bytes")]
    RoundTrip,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::LiveSetEq;

    fn encode(file: &X9aFile) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        file.to_writer(&mut cursor).unwrap();
        cursor.into_inner()
    }

    fn section_offsets(bytes: &[u8]) -> [u32; 4] {
        let mut cursor = Cursor::new(bytes);
        let header = Header::from_reader(&mut cursor).unwrap();
        Catalogue::from_reader(&mut cursor, header.catalogue_size)
            .unwrap()
            .section_offsets()
            .unwrap()
    }

    #[test]
    fn empty_bank_round_trips_byte_for_byte() {
        let bytes = encode(&X9aFile::new());

        let decoded = X9aFile::from_bytes_verified(&bytes).unwrap();
        assert_eq!(decoded.voices.len(), X9aFile::VOICE_COUNT);
        assert!(decoded.voices.iter().all(|voice| voice.name.is_empty()));
        assert_eq!(decoded.system, SystemData::default());
    }

    #[test]
    fn populated_bank_round_trips_byte_for_byte() {
        let mut bank = X9aFile::new();
        bank.voices[0].name = "Grand Piano".parse().unwrap();
        bank.voices[9].name = "E¥Piano".parse().unwrap();
        bank.voices[9].live_set_eq = Some(LiveSetEq::default());
        bank.system.master_tune = 4400;

        let bytes = encode(&bank);
        let decoded = X9aFile::from_bytes_verified(&bytes).unwrap();

        assert_eq!(decoded.voices[0].name.to_string(), "Grand Piano");
        assert_eq!(decoded.voices[9].name.to_string(), "E¥Piano");
        assert!(decoded.voices[9].live_set_eq.is_some());
        assert_eq!(decoded.system.master_tune, 4400);
    }

    #[test]
    fn catalogue_offsets_are_increasing() {
        let mut bank = X9aFile::new();
        bank.voices[0].name = "Grand Piano".parse().unwrap();

        let [elst, esys, dlst, dsys] = section_offsets(&encode(&bank));
        assert!(elst < esys && esys < dlst && dlst < dsys);

        // The catalogue sits right behind the 64-byte header
        assert_eq!(elst, 96);
    }

    #[test]
    fn non_sentinel_padding_fails() {
        let mut bytes = encode(&X9aFile::new());
        let [_, _, dlst, _] = section_offsets(&bytes);

        // Last fill byte of the first voice slot
        let index = dlst as usize + 12 + 8 + VOICE_PAD_SIZE as usize - 1;
        assert_eq!(bytes[index], 0xFF);
        bytes[index] = 0x00;

        assert!(matches!(
            X9aFile::from_reader(Cursor::new(&bytes)),
            Err(ReadError::PaddingViolation { found: 0x00, .. })
        ));
    }

    #[test]
    fn misfiled_position_fails() {
        let mut bytes = encode(&X9aFile::new());
        let [elst, ..] = section_offsets(&bytes);

        // The page byte of the first index entry
        let index = elst as usize + 30;
        assert_eq!(bytes[index], 0);
        bytes[index] = 9;

        assert!(matches!(
            X9aFile::from_reader(Cursor::new(&bytes)),
            Err(ReadError::CrossCheck(_))
        ));
    }

    #[test]
    fn index_and_payload_names_must_agree() {
        let mut bytes = encode(&X9aFile::new());
        let [_, _, dlst, _] = section_offsets(&bytes);

        // First byte of the first voice's name field
        let index = dlst as usize + 12 + 8 + 4;
        assert_eq!(bytes[index], 0);
        bytes[index] = b'Z';

        assert!(matches!(
            X9aFile::from_reader(Cursor::new(&bytes)),
            Err(ReadError::CrossCheck(_))
        ));
    }

    #[test]
    fn entry_length_corruption_fails() {
        let mut bytes = encode(&X9aFile::new());
        let [elst, ..] = section_offsets(&bytes);

        // The declared length of the first index entry
        let index = elst as usize + 19;
        assert_eq!(bytes[index], 13);
        bytes[index] = 14;

        assert!(matches!(
            X9aFile::from_reader(Cursor::new(&bytes)),
            Err(ReadError::LengthMismatch {
                declared: 14,
                found: 13
            })
        ));
    }

    #[test]
    fn find_voice_by_name_wraps_around() {
        let mut bank = X9aFile::new();
        bank.voices[3].name = "Warm Grand".parse().unwrap();
        bank.voices[100].name = "Grandiose".parse().unwrap();

        assert_eq!(bank.find_voice_by_name("grand", 0), Some(3));
        assert_eq!(bank.find_voice_by_name("grand", 4), Some(100));
        assert_eq!(bank.find_voice_by_name("grand", 101), Some(3));
        assert_eq!(bank.find_voice_by_name("clavinet", 0), None);
    }
}

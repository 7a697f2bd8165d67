//! The name → offset table pointing at the four sections of the file body

use crate::serde::{ReadError, read_u32_be, write_u32_be};
use std::io::{self, Read, Write};

/// Tags of the four sections every file must contain, in file order
const SECTION_TAGS: [[u8; 4]; 4] = [*b"ELST", *b"ESYS", *b"DLST", *b"DSYS"];

const ENTRY_LEN: u32 = 8;

/// The table at the start of the file body mapping section tags to the
/// absolute offsets those sections start at
///
/// The catalogue is written twice on encode: once as a placeholder to
/// reserve its position, and once more with the real offsets after every
/// section body has been emitted.
pub(crate) struct Catalogue {
    entries: Vec<([u8; 4], u32)>,
}

impl Catalogue {
    /// A catalogue for the standard sections with the offsets still unknown
    pub fn placeholder() -> Self {
        Self::with_offsets([0; 4])
    }

    /// A catalogue for the standard sections at the given offsets
    pub fn with_offsets(offsets: [u32; 4]) -> Self {
        Self {
            entries: SECTION_TAGS.into_iter().zip(offsets).collect(),
        }
    }

    /// The number of bytes the catalogue takes up in the file
    pub fn size(&self) -> u32 {
        self.entries.len() as u32 * ENTRY_LEN
    }

    pub fn from_reader<R>(mut reader: R, catalogue_size: u32) -> Result<Self, ReadError>
    where
        R: Read,
    {
        let count = catalogue_size / ENTRY_LEN;
        let mut entries = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let mut tag = [0; 4];
            reader.read_exact(&mut tag)?;
            let offset = read_u32_be(&mut reader)?;
            entries.push((tag, offset));
        }

        Ok(Self { entries })
    }

    /// Check that the catalogue lists exactly the standard sections in their
    /// required order and hand back their offsets, ELST through DSYS
    pub fn section_offsets(&self) -> Result<[u32; 4], ReadError> {
        if self.entries.len() != SECTION_TAGS.len()
            || self
                .entries
                .iter()
                .zip(&SECTION_TAGS)
                .any(|((tag, _), required)| tag != required)
        {
            return Err(ReadError::UnexpectedCatalogue {
                found: self
                    .entries
                    .iter()
                    .map(|(tag, _)| String::from_utf8_lossy(tag).into_owned())
                    .collect(),
            });
        }

        let mut offsets = [0; 4];
        for (slot, (_, offset)) in offsets.iter_mut().zip(&self.entries) {
            *slot = *offset;
        }

        Ok(offsets)
    }

    pub fn to_writer<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        for (tag, offset) in &self.entries {
            writer.write_all(tag)?;
            write_u32_be(&mut writer, *offset)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let catalogue = Catalogue::with_offsets([0x60, 0x100, 0x200, 0x300]);

        let mut bytes = Vec::new();
        catalogue.to_writer(&mut bytes).unwrap();
        assert_eq!(bytes.len(), catalogue.size() as usize);

        let decoded = Catalogue::from_reader(Cursor::new(&bytes), catalogue.size()).unwrap();
        assert_eq!(
            decoded.section_offsets().unwrap(),
            [0x60, 0x100, 0x200, 0x300]
        );
    }

    #[test]
    fn unknown_section_fails() {
        let mut bytes = Vec::new();
        Catalogue::with_offsets([0x60, 0x100, 0x200, 0x300])
            .to_writer(&mut bytes)
            .unwrap();
        bytes[0..4].copy_from_slice(b"XLST");

        let decoded = Catalogue::from_reader(Cursor::new(&bytes), 32).unwrap();
        match decoded.section_offsets() {
            Err(ReadError::UnexpectedCatalogue { found }) => {
                assert_eq!(found, ["XLST", "ESYS", "DLST", "DSYS"]);
            }
            other => panic!("expected an UnexpectedCatalogue error, got {other:?}"),
        }
    }

    #[test]
    fn reordered_sections_fail() {
        let mut bytes = Vec::new();
        Catalogue::with_offsets([0x60, 0x100, 0x200, 0x300])
            .to_writer(&mut bytes)
            .unwrap();
        bytes[0..4].copy_from_slice(b"ESYS");
        bytes[8..12].copy_from_slice(b"ELST");

        let decoded = Catalogue::from_reader(Cursor::new(&bytes), 32).unwrap();
        assert!(decoded.section_offsets().is_err());
    }
}

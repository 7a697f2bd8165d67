//! Voice names: length-restricted strings over a subset of printable ASCII

use std::{fmt, str::FromStr};
use thiserror::Error;

/// The name a voice is filed under, as shown on the instrument display
///
/// Names hold at most 15 characters and are stored in the voice record as a
/// fixed 16-byte field padded with nulls. The instrument accepts the
/// printable ASCII range without the colon; the byte at the ASCII backslash
/// position renders as a yen sign (`¥`) on the display, and this type applies
/// the same substitution in both directions.
///
/// The character restriction is a rule of the editing surface. Bytes read
/// from a file are kept verbatim so that whatever the instrument wrote
/// round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name {
    bytes: [u8; Self::ENCODED_LEN],
}

impl Name {
    /// The maximal number of characters in a name
    pub const CAPACITY: usize = 15;

    /// The length of the name field inside a voice record
    pub(crate) const ENCODED_LEN: usize = 16;

    // The glyph the instrument renders for the ASCII backslash byte
    const YEN: char = '¥';
    const YEN_BYTE: u8 = 0x5C;

    /// Reconstruct a name from its wire form, trimming the null padding
    ///
    /// A field without any null padding would imply a 16-character name,
    /// which could never be re-encoded, and is rejected.
    pub(crate) fn from_wire(bytes: [u8; Self::ENCODED_LEN]) -> Result<Self, NameError> {
        let name = Self { bytes };
        if name.len() > Self::CAPACITY {
            return Err(NameError::TooLong);
        }

        Ok(name)
    }

    /// The full 16-byte wire form, including the null padding
    pub(crate) fn wire_bytes(&self) -> &[u8; Self::ENCODED_LEN] {
        &self.bytes
    }

    /// The bytes of the name, without the trailing null padding
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// The number of characters in the name
    pub fn len(&self) -> usize {
        Self::ENCODED_LEN
            - self
                .bytes
                .iter()
                .rev()
                .take_while(|byte| **byte == 0)
                .count()
    }

    /// Are there _any_ characters in the name?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Is this character usable in a name?
    ///
    /// Allowed are the printable ASCII characters without the colon and the
    /// backslash, plus the yen sign that stands in for the latter.
    pub fn is_char_allowed(c: char) -> bool {
        match c {
            Self::YEN => true,
            ':' | '\\' => false,
            ' '..='~' => true,
            _ => false,
        }
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; Self::ENCODED_LEN];
        let mut index = 0;

        for c in s.chars() {
            if !Self::is_char_allowed(c) {
                return Err(NameError::InvalidChar { character: c, index });
            }
            if index == Self::CAPACITY {
                return Err(NameError::TooLong);
            }

            bytes[index] = if c == Self::YEN { Self::YEN_BYTE } else { c as u8 };
            index += 1;
        }

        Ok(Self { bytes })
    }
}

impl<'a> TryFrom<&'a str> for Name {
    type Error = NameError;

    #[inline]
    fn try_from(s: &'a str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            let c = if *byte == Self::YEN_BYTE {
                Self::YEN
            } else {
                *byte as char
            };
            write!(f, "{c}")?;
        }

        Ok(())
    }
}

/// Errors that can result from trying to build a [`Name`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    /// Names hold at most 15 characters
    #[error("The name does not fit in 15 characters")]
    TooLong,

    /// Only a subset of printable ASCII is allowed in names
    #[error("Character {character:?} at position {index} is not allowed in a name")]
    InvalidChar { character: char, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str() {
        let name: Name = "Grand Piano".parse().expect("name rejected");
        assert_eq!(name.len(), 11);
        assert!(!name.is_empty());
        assert_eq!(name.as_bytes(), b"Grand Piano");
        assert_eq!(format!("{name}"), "Grand Piano");
    }

    #[test]
    fn length_boundary() {
        assert!("123456789012345".parse::<Name>().is_ok());
        assert_eq!(
            "1234567890123456".parse::<Name>(),
            Err(NameError::TooLong)
        );
    }

    #[test]
    fn disallowed_characters() {
        assert_eq!(
            "a:b".parse::<Name>(),
            Err(NameError::InvalidChar {
                character: ':',
                index: 1
            })
        );
        assert_eq!(
            "\\".parse::<Name>(),
            Err(NameError::InvalidChar {
                character: '\\',
                index: 0
            })
        );
    }

    #[test]
    fn yen_substitution() {
        let name: Name = "A¥B".parse().expect("name rejected");
        assert_eq!(name.as_bytes(), &[b'A', 0x5C, b'B']);
        assert_eq!(format!("{name}"), "A¥B");
    }

    #[test]
    fn wire_round_trip() {
        let mut bytes = [0; Name::ENCODED_LEN];
        bytes[..5].copy_from_slice(b"Organ");

        let name = Name::from_wire(bytes).expect("wire form rejected");
        assert_eq!(name.as_bytes(), b"Organ");
        assert_eq!(name.wire_bytes(), &bytes);
    }

    #[test]
    fn wire_without_padding_is_too_long() {
        assert_eq!(Name::from_wire([b'x'; 16]), Err(NameError::TooLong));
    }

    #[test]
    fn default() {
        let name = Name::default();
        assert_eq!(name.len(), 0);
        assert!(name.is_empty());
        assert_eq!(format!("{name}"), "");
    }
}

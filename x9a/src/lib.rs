//! Interfacing with the X9A live set files of Yamaha CP88/CP73 stage pianos
//!
//! An `.x9a` file stores the instrument's full bank of 160 voices (20 live set
//! pages of 8 slots each) plus its system settings. [`X9aFile`] decodes the
//! container and re-encodes it byte-for-byte. [`X9aFile::from_bytes_verified`]
//! additionally proves that byte identity before handing the bank out, which
//! is the only reliable signal that a particular file variant is fully
//! understood by this crate.
//!
//! This crate does not talk to the instrument itself; it only reads and
//! writes the files its librarian software exchanges over USB storage.

pub mod file;
pub mod name;
pub mod serde;
pub mod system;
pub mod voice;

pub use file::{LoadError, X9aFile};
pub use name::{Name, NameError};
pub use serde::ReadError;
pub use system::SystemData;
pub use voice::Voice;

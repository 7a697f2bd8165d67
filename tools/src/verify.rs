use crate::utils::iter_files;
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;
use x9a::X9aFile;

/// Check whether X9A files pass the round-trip support gate
///
/// Every file is parsed and re-encoded; only files whose re-encoded bytes
/// match the originals exactly are fully understood and safe to edit.
#[derive(Args)]
#[clap(author, version)]
pub struct VerifyArgs {
    /// The paths to the files or folders to verify
    paths: Vec<PathBuf>,

    /// Search folders recursively
    #[clap(short, long)]
    recursive: bool,
}

pub fn verify(args: &VerifyArgs) -> Result<()> {
    let mut failures = 0;

    for entry in iter_files(&args.paths, args.recursive, &["x9a"]) {
        let path = entry.path();

        match X9aFile::from_path_verified(path) {
            Ok(_) => println!("{:<48} ok", path.to_string_lossy()),
            Err(error) => {
                failures += 1;
                println!("{:<48} UNSUPPORTED ({error})", path.to_string_lossy());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} file(s) failed the round-trip check");
    }

    Ok(())
}

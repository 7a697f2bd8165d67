use crate::utils::iter_files;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use x9a::X9aFile;

/// List the voices stored in X9A files
#[derive(Args)]
#[clap(author, version)]
pub struct InspectArgs {
    /// The paths to the files or folders to inspect
    paths: Vec<PathBuf>,

    /// Search folders recursively
    #[clap(short, long)]
    recursive: bool,

    /// Also list voices with empty names
    #[clap(short, long)]
    all: bool,
}

pub fn inspect(args: &InspectArgs) -> Result<()> {
    for entry in iter_files(&args.paths, args.recursive, &["x9a"]) {
        let path = entry.path();
        let bank = X9aFile::from_path(path).context("Reading the X9A file failed")?;

        println!("{}", path.file_name().unwrap().to_string_lossy());

        for (index, voice) in bank.voices.iter().enumerate() {
            if voice.name.is_empty() && !args.all {
                continue;
            }

            // Pages and slots are numbered from 1 on the instrument display
            println!(
                "{:>3}-{} | {}",
                index / X9aFile::SLOTS_PER_PAGE + 1,
                index % X9aFile::SLOTS_PER_PAGE + 1,
                voice.name
            );
        }
    }

    Ok(())
}

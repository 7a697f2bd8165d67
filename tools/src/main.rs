use anyhow::Result;
use clap::Parser;

use x9a_tools::inspect::{inspect, InspectArgs};
use x9a_tools::verify::{verify, VerifyArgs};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
enum Cli {
    Inspect(InspectArgs),
    Verify(VerifyArgs),
}

fn main() -> Result<()> {
    match Cli::parse_from(wild::args()) {
        Cli::Inspect(args) => inspect(&args),
        Cli::Verify(args) => verify(&args),
    }
}

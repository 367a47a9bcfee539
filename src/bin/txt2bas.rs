//! Text file to N88-BASIC converter

use clap::Parser;
use falmml::basic::text_to_basic;
use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "txt2bas")]
#[command(version = "0.1.0")]
#[command(about = "Wrap text read from stdin into an N88-BASIC program", long_about = None)]
struct Args {
    /// Output BASIC file
    output: PathBuf,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), falmml::Error> {
    let image = text_to_basic(io::stdin().lock())?;
    fs::write(&args.output, image).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Can't open '{}': {}", args.output.display(), e),
        )
    })?;

    Ok(())
}

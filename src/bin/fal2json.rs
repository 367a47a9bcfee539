//! Sound data to JSON converter

use clap::Parser;
use falmml::data::image::load_image;
use falmml::{ConvertOptions, Converter, DriverType};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fal2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump decoded sound data commands as JSON", long_about = None)]
struct Args {
    /// Input sound data file
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// File format (default: auto detect)
    #[arg(short = 'F', long = "format")]
    format: Option<DriverType>,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), falmml::Error> {
    let image = load_image(&args.input)?;
    let converter = Converter::new(ConvertOptions {
        driver: args.format,
        ..ConvertOptions::default()
    });
    let dump = converter.dump(&image)?;

    let json_string = if args.compact {
        serde_json::to_string(&dump)?
    } else {
        serde_json::to_string_pretty(&dump)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}

use clap::Parser;
use falmml::{ConvertOptions, Converter, DriverType, Tags};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "falmml")]
#[command(version = "0.1.0")]
#[command(about = "Falcom sound data to MUCOM88 MML decompiler", long_about = None)]
struct Args {
    /// Input sound data file (raw or gzip-compressed)
    input: PathBuf,

    /// Output MML file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose (debug info)
    #[arg(short, long)]
    verbose: bool,

    /// Apply workaround and ignore warnings
    #[arg(short = 'w', long)]
    workaround: bool,

    /// MUCOM88 version tag (1.7 is required for "r%n")
    #[arg(short = 'm', long = "mucom88")]
    mucom88: Option<String>,

    /// Title for tag
    #[arg(short, long)]
    title: Option<String>,

    /// Author for tag
    #[arg(short, long)]
    author: Option<String>,

    /// Composer for tag
    #[arg(short, long)]
    composer: Option<String>,

    /// Date for tag
    #[arg(short, long)]
    date: Option<String>,

    /// Comment for tag
    #[arg(short = 'C', long)]
    comment: Option<String>,

    /// File format (default: auto detect)
    ///
    /// opn = OPN / OPN, opna = OPNA / OPNA, va = OPNA (PC-88VA) / OPNA,
    /// mono = OPNA / OPN, x1opm = OPM+PSG (X1) / OPNA, x1psg = PSG (X1) / OPN
    #[arg(short = 'F', long = "format")]
    format: Option<DriverType>,

    /// Write SSG envelope presets as expanded E commands instead of macros
    #[arg(long)]
    expand_ssg_env: bool,

    /// Append a Timer-B tempo line after the first SSG channel
    #[arg(long)]
    timer_b: Option<u8>,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), falmml::Error> {
    let options = ConvertOptions {
        driver: args.format,
        workaround: args.workaround,
        ssg_env_macro: !args.expand_ssg_env,
        timer_b_tempo: args.timer_b,
        tags: Tags {
            mucom88: args.mucom88,
            title: args.title,
            author: args.author,
            composer: args.composer,
            date: args.date,
            comment: args.comment,
        },
    };
    let mut converter = Converter::new(options);

    match &args.output {
        Some(path) => converter.convert_file(&args.input, path)?,
        None => {
            let image = falmml::data::image::load_image(&args.input)?;
            let mml = converter.convert(&image)?;
            print!("{}", mml);
        }
    }

    Ok(())
}

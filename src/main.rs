use amlsum::Error;
use amlsum::patch::{patch_file, PatchOptions};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "amlsum",
    version,
    about = "Rewrite an Amlogic boot image header and add an SD-boot header at offset 512"
)]
struct Cli {
    /// Boot image to patch in place (e.g. u-boot.bin)
    image: PathBuf,
    /// Compute and print the new headers without writing them
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Report format on stdout
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            let err = Error::Argument(format!("{:?}", e.kind()));
            return ExitCode::from(err.exit_code());
        }
    };

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let opts = PatchOptions { dry_run: cli.dry_run };
    match patch_file(&cli.image, &opts) {
        Ok(report) => {
            match cli.format {
                Format::Text => println!("{}", report),
                Format::Json => match report.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("ERROR: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}: {}", cli.image.display(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

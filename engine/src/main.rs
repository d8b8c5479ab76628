//! nestcsv CLI - CSV rows to nested JSON lines and back
//!
//! ```bash
//! nestcsv convert orders.csv -o orders.jsonl     # CSV -> NDJSON, bad rows to error_lines.csv
//! nestcsv flatten orders.jsonl                   # nested NDJSON -> flat NDJSON
//! nestcsv remap orders.jsonl -p profile.json     # rename keys and re-nest
//! nestcsv export orders.jsonl -o orders.csv      # NDJSON -> CSV with path headers
//! nestcsv validate orders.jsonl -p profile.json  # check records against a profile
//! nestcsv example-profile                        # print an example profile
//! nestcsv operations                             # list enrichment operations
//! ```
//!
//! `NESTCSV_PROFILE` (environment or `.env`) names the profile used when
//! `--profile` is not given.

use clap::{Parser, Subcommand};
use nestcsv::logs::{log_error, log_info, log_success};
use nestcsv::profile::{example_profile, ConversionProfile};
use nestcsv::transform::{
    convert_csv, export_csv, flatten_ndjson, operations_description, remap_ndjson, ConvertOptions,
};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const PROFILE_ENV: &str = "NESTCSV_PROFILE";

#[derive(Parser)]
#[command(name = "nestcsv")]
#[command(about = "Convert CSV rows into nested JSON lines using dotted header paths", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV file to NDJSON
    Convert {
        /// Input CSV file
        input: PathBuf,

        /// Output NDJSON file
        #[arg(short, long, default_value = "out.jsonl")]
        output: PathBuf,

        /// File receiving rows that failed or were rejected
        #[arg(short, long, default_value = "error_lines.csv")]
        errors: PathBuf,

        /// Conversion profile (JSON)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Header paths to use instead of the file's header row
        #[arg(long, value_delimiter = ',')]
        headers: Option<Vec<String>>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Discard columns the profile does not rename
        #[arg(long)]
        drop_unmapped: bool,

        /// Remove empty values from every record
        #[arg(long)]
        prune: bool,
    },

    /// Flatten nested NDJSON records into `a.b[0].c` keys
    Flatten {
        /// Input NDJSON file (default: stdin)
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rename the keys of NDJSON records using a profile's rename table
    Remap {
        /// Input NDJSON file (default: stdin)
        input: Option<PathBuf>,

        /// Conversion profile (JSON)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Discard keys the rename table does not mention
        #[arg(long)]
        drop_unmapped: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export NDJSON records as CSV with path headers
    Export {
        /// Input NDJSON file (default: stdin)
        input: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,
    },

    /// Check NDJSON records against a profile's patterns and schema
    Validate {
        /// Input NDJSON file
        input: PathBuf,

        /// Conversion profile (JSON)
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },

    /// Show example conversion profile
    ExampleProfile,

    /// Show available enrichment operations
    Operations,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            errors,
            profile,
            headers,
            delimiter,
            drop_unmapped,
            prune,
        } => {
            let options = ConvertOptions {
                headers,
                delimiter,
                drop_unmapped: drop_unmapped.then_some(true),
                prune: prune.then_some(true),
            };
            cmd_convert(&input, &output, &errors, profile.as_deref(), &options)
        }

        Commands::Flatten { input, output } => cmd_flatten(input.as_deref(), output.as_deref()),

        Commands::Remap {
            input,
            profile,
            drop_unmapped,
            output,
        } => cmd_remap(input.as_deref(), profile.as_deref(), drop_unmapped, output.as_deref()),

        Commands::Export {
            input,
            output,
            delimiter,
        } => cmd_export(input.as_deref(), output.as_deref(), delimiter),

        Commands::Validate { input, profile } => cmd_validate(&input, profile.as_deref()),

        Commands::ExampleProfile => cmd_example_profile(),

        Commands::Operations => cmd_operations(),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

/// `--profile`, then `NESTCSV_PROFILE`, then an empty profile.
fn load_profile(path: Option<&Path>) -> Result<ConversionProfile, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => std::env::var_os(PROFILE_ENV).map(PathBuf::from),
    };

    match path {
        Some(p) => {
            log_info(format!("Using profile: {}", p.display()));
            Ok(ConversionProfile::from_file(&p)?)
        }
        None => Ok(ConversionProfile::default()),
    }
}

fn cmd_convert(
    input: &Path,
    output: &Path,
    errors: &Path,
    profile: Option<&Path>,
    options: &ConvertOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = load_profile(profile)?;
    let stats = convert_csv(input, output, errors, &profile, options)?;

    log_success(format!("Records saved to: {}", output.display()));
    if stats.diverted() > 0 {
        log_info(format!("Diverted rows saved to: {}", errors.display()));
    }
    Ok(())
}

fn cmd_flatten(input: Option<&Path>, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let stats = flatten_ndjson(open_input(input)?, open_output(output)?)?;
    log_success(format!("Flattened {} records", stats.written));
    Ok(())
}

fn cmd_remap(
    input: Option<&Path>,
    profile: Option<&Path>,
    drop_unmapped: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = load_profile(profile)?;
    let drop_unmapped = drop_unmapped || profile.drop_unmapped;

    let stats = remap_ndjson(
        open_input(input)?,
        open_output(output)?,
        &profile.rename,
        drop_unmapped,
    )?;
    log_success(format!("Remapped {} of {} records", stats.written, stats.read));
    Ok(())
}

fn cmd_export(
    input: Option<&Path>,
    output: Option<&Path>,
    delimiter: char,
) -> Result<(), Box<dyn std::error::Error>> {
    if !delimiter.is_ascii() {
        return Err(format!("delimiter '{}' is not a single-byte character", delimiter).into());
    }
    let stats = export_csv(open_input(input)?, open_output(output)?, delimiter as u8)?;
    log_success(format!("Exported {} rows", stats.written));
    Ok(())
}

fn cmd_validate(input: &Path, profile: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Validating: {}", input.display()));

    let compiled = load_profile(profile)?.compile()?;
    let reader = open_input(Some(input))?;

    let mut valid = 0;
    let mut invalid = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(&line)?;
        match compiled.validate(&record) {
            Ok(()) => valid += 1,
            Err(errors) => {
                invalid += 1;
                if invalid <= 5 {
                    log_error(format!("Line {} invalid:", i + 1));
                    for err in errors.iter().take(3) {
                        log_error(format!("  - {}", err));
                    }
                }
            }
        }
    }

    log_info(format!("Results: {} valid, {} invalid", valid, invalid));

    if invalid > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_example_profile() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", example_profile().to_json()?);
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(File::create(p)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

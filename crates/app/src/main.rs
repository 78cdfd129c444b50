use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use formscan_ocr::FieldExtractor;
use formscan_sheets::SheetWriter;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "formscan")]
#[command(about = "Read fixed-layout paper forms and append them to a Google Sheet")]
#[command(version)]
struct Cli {
    /// Application configuration (defaults to ./formscan.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR every configured field of a scanned form and print the result as JSON
    ///
    /// Needs a binary built with `--features tesseract`.
    Extract {
        image: PathBuf,
        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Append one reviewed row to the spreadsheet
    Append {
        /// Cell values for columns A–F, in order
        #[arg(long, num_args = 1.., required_unless_present = "from_json", conflicts_with = "from_json")]
        values: Vec<String>,
        /// Read the row from a JSON file (e.g. edited `extract` output)
        #[arg(long)]
        from_json: Option<PathBuf>,
        /// Spreadsheet URL or id, overriding sheets.spreadsheet
        #[arg(long)]
        sheet: Option<String>,
        /// Worksheet name, overriding sheets.worksheet
        #[arg(long)]
        worksheet: Option<String>,
    },
    /// Load and validate the configuration files
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract { image, output } => {
            let fields = commands::load_fields(&config)?;
            let extractor = FieldExtractor::from_settings(commands::build_recognizer(&config)?, &config.ocr);
            let result = commands::run_extract(&extractor, &fields, &image)?;
            commands::write_json(&result, output.as_deref())?;
        }
        Commands::Append { values, from_json, sheet, worksheet } => {
            let values = match from_json {
                Some(path) => commands::row_values(commands::read_row_file(&path)?, &config.sheets.row_columns),
                None => values,
            };
            let Some(locator) = sheet.or_else(|| config.sheets.spreadsheet.clone()) else {
                bail!("No spreadsheet given; pass --sheet or set sheets.spreadsheet");
            };
            let worksheet = worksheet.unwrap_or_else(|| config.sheets.worksheet.clone());

            let client = commands::sheets_client(&config.sheets)?;
            let writer = SheetWriter::new(client).with_policy(config.sheets.on_missing_worksheet);
            let (success, message) = writer.write(&values, &locator, &worksheet).await.into_pair();
            if !success {
                bail!(message);
            }
            println!("{message}");
        }
        Commands::CheckConfig => {
            let fields = commands::load_fields(&config)?;
            let checks = commands::check_fields(&fields);
            for check in &checks {
                match &check.problem {
                    Some(problem) => println!("{:<16} {problem}", check.field),
                    None => println!("{:<16} ok", check.field),
                }
            }
            let bad = checks.iter().filter(|c| c.problem.is_some()).count();
            if bad > 0 {
                bail!("{bad} of {} field rectangles will always read as empty", checks.len());
            }
            info!(fields = checks.len(), "configuration is valid");
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Bank {
    Asn,
    Ing,
    Knab,
    Degiro,
    Icscards,
}

/// Convert a bank or broker statement export into normalized JSON.
#[derive(Debug, Parser)]
#[command(name = "parse_statement")]
struct Cli {
    /// Institution that produced the export.
    #[arg(long, value_enum)]
    bank: Bank,

    /// Account id for sources that do not carry one (required for DEGIRO,
    /// optional pre-seed for ASN).
    #[arg(long)]
    account_id: Option<String>,

    /// Input file: a CSV export, or `pdftotext -layout` output for ICS.
    input: PathBuf,

    /// Write the JSON here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let statement = match cli.bank {
        Bank::Asn => {
            let mut parser = asn::AsnCsvParser::new();
            if let Some(account_id) = cli.account_id.clone() {
                parser = parser.with_account_id(account_id);
            }
            parser.parse_file(&cli.input)?
        }
        Bank::Ing => ing::IngCsvParser::new().parse_file(&cli.input)?,
        Bank::Knab => knab::KnabCsvParser::new().parse_file(&cli.input)?,
        Bank::Degiro => {
            degiro::DegiroCsvParser::new(cli.account_id.clone()).parse_file(&cli.input)?
        }
        Bank::Icscards => icscards::IcsCardsTextParser::new().parse_file(&cli.input)?,
    };

    let json =
        serde_json::to_string_pretty(&statement).context("cannot serialize statement")?;
    match &cli.output {
        Some(path) => fs::write(path, &json)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

//! gridquery command-line runner
//!
//! Runs one grid request against a JSON dataset through the in-memory
//! engine and prints the page.

mod formatter;
mod run;

use clap::Parser;
use formatter::OutputFormat;
use gridquery_proto::ProtocolVersion;
use std::path::PathBuf;

/// gridquery command-line runner
#[derive(Parser, Debug)]
#[command(name = "gridquery")]
#[command(version, about = "Run a data-grid request against a JSON dataset")]
pub struct Args {
    /// Schema file (`{"entities": [...], "relations": [...]}`)
    #[arg(short = 's', long)]
    pub schema: Option<PathBuf>,

    /// Dataset file (`{"Entity": [{...}, ...]}`)
    #[arg(short = 'd', long)]
    pub data: PathBuf,

    /// Request file in the normalized request format
    #[arg(short = 'r', long)]
    pub request: PathBuf,

    /// Root entity type of the grid
    #[arg(long)]
    pub root: String,

    /// Envelope member names: current (1.10) or legacy (1.9)
    #[arg(long, default_value_t = ProtocolVersion::Current)]
    pub protocol: ProtocolVersion,

    /// Grid configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Schema catalog directory; the schema file, if given, is applied to it
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Stamp rows with DT_RowId
    #[arg(long)]
    pub row_id: bool,

    /// Stamp rows with this DT_RowClass
    #[arg(long)]
    pub row_class: Option<String>,

    /// Output format
    #[arg(long, default_value = "json", value_enum)]
    pub format: OutputFormat,
}

fn main() {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gridquery=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    match run::run(&args) {
        Ok(page) => {
            println!(
                "{}",
                formatter.format_response(&page.response, &page.columns, args.protocol)
            );
        }
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

//! epf-sync - USPS EPF download and AIS conversion tool

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epf_client::{DownloadOutcome, EpfClient, ListFilesRequest};
use epf_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use epf_ingest::ais::RecordType;
use epf_ingest::convert::{convert_file, ConvertOptions};
use epf_ingest::emitter::{SqlSink, DEFAULT_BATCH_SIZE};
use epf_ingest::progress::{create_line_progress, create_spinner, format_bytes};
use epf_ingest::scanner::ChunkedFileScanner;
use epf_ingest::{SyncConfig, SyncOrchestrator};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "epf-sync")]
#[command(author, version, about = "USPS EPF download and AIS City State conversion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a CS215N data file into INSERT statements
    Convert {
        /// Fixed-width data file
        #[arg(short, long)]
        file: PathBuf,

        /// Record type to extract (A/alias or D/detail)
        #[arg(short, long, default_value = "D")]
        record_type: RecordType,

        /// Line to start reading from
        #[arg(short, long, default_value_t = 0)]
        start_line: u64,

        /// Maximum records to convert (0 for all)
        #[arg(short = 'n', long, default_value_t = 0)]
        lines: usize,

        /// Append SQL to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows per INSERT statement
        #[arg(short, long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Print "Found: N" when done
        #[arg(long)]
        return_count: bool,

        /// Print "Last Line: N" when done
        #[arg(long)]
        return_position: bool,
    },

    /// Query the service version
    Version,

    /// List files available for a product
    List {
        #[arg(long, default_value = "AIS")]
        product_code: String,

        #[arg(long, default_value = "CS215N")]
        product_id: String,

        /// Status filter (N, S or C)
        #[arg(long)]
        status: Option<String>,

        /// Fulfilled date filter
        #[arg(long)]
        fulfilled: Option<String>,
    },

    /// Download the newest file for a product and mark it completed
    Download {
        #[arg(long, default_value = "AIS")]
        product_code: String,

        #[arg(long, default_value = "CS215N")]
        product_id: String,

        #[arg(long, default_value = "N")]
        status: String,
    },

    /// Run the full download, convert and load cycle
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Console)
        .log_file_prefix("epf-sync")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().with_env().unwrap_or(log_config);
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Convert {
            file,
            record_type,
            start_line,
            lines,
            output,
            batch_size,
            return_count,
            return_position,
        } => {
            let options = ConvertOptions {
                record_type,
                start_line,
                max_records: Some(lines),
                batch_size,
                ..Default::default()
            };
            convert(file, options, output, return_count, return_position)?;
        },
        Command::Version => {
            let config = SyncConfig::load()?;
            let mut client = EpfClient::new(config.epf_config(), config.credentials())?;
            let response = client.version().await?;
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        },
        Command::List {
            product_code,
            product_id,
            status,
            fulfilled,
        } => {
            let config = SyncConfig::load()?;
            let mut request = ListFilesRequest::new(product_code, product_id);
            if let Some(status) = status {
                request = request.with_status(status);
            }
            if let Some(fulfilled) = fulfilled {
                request = request.with_fulfilled(fulfilled);
            }

            let mut client = EpfClient::new(config.epf_config(), config.credentials())?;
            client.login().await?;
            let files = client.list_files(&request).await;
            if let Err(e) = client.logout().await {
                warn!(error = %e, "Logout failed");
            }

            for file in files? {
                println!(
                    "{}\t{}\t{}\t{}",
                    file.file_id, file.status, file.fulfilled, file.file_path
                );
            }
        },
        Command::Download {
            product_code,
            product_id,
            status,
        } => {
            let config = SyncConfig::load()?;
            config.validate()?;
            let request = ListFilesRequest::new(product_code, product_id).with_status(status);

            let mut client = EpfClient::new(config.epf_config(), config.credentials())?;
            client.login().await?;
            let spinner = create_spinner("Downloading newest file");
            let outcome = client.download_newest_file(&request).await;
            spinner.finish_and_clear();
            if let Err(e) = client.logout().await {
                warn!(error = %e, "Logout failed");
            }

            match outcome? {
                DownloadOutcome::Downloaded { file, download } => {
                    println!("File ID: {}", file.file_id);
                    println!("Path: {}", download.file_path.display());
                    println!("Size: {}", format_bytes(download.file_size));
                    println!("SHA-256: {}", download.sha256);
                },
                DownloadOutcome::NoFileToDownload => println!("No file to download"),
            }
        },
        Command::Sync => {
            let config = SyncConfig::load()?;
            let report = SyncOrchestrator::new(config).run().await;
            println!("{}", report.render());
            if report.outcome.is_failure() {
                anyhow::bail!("sync failed: {}", report.outcome);
            }
        },
    }

    Ok(())
}

fn convert(
    file: PathBuf,
    options: ConvertOptions,
    output: Option<PathBuf>,
    return_count: bool,
    return_position: bool,
) -> Result<()> {
    info!(file = %file.display(), record_type = %options.record_type, "Converting data file");

    let summary = match &output {
        Some(path) => {
            let sink = SqlSink::append(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            let total = ChunkedFileScanner::new(options.family).line_count(&file)?;
            let progress = create_line_progress(total, &format!("Converting {}", file.display()));
            progress.set_position(options.start_line);
            let (_, summary) =
                convert_file(&file, &options, sink, |line| progress.set_position(line + 1))?;
            progress.finish_and_clear();
            summary
        },
        None => {
            let stdout = io::stdout().lock();
            let (_, summary) = convert_file(&file, &options, stdout, |_| {})?;
            summary
        },
    };

    // SQL on stdout keeps the counters as comments
    let prefix = if output.is_some() { "" } else { "-- " };
    let mut stdout = io::stdout().lock();
    if return_count {
        writeln!(stdout, "{}Found: {}", prefix, summary.found_count)?;
    }
    if return_position {
        writeln!(stdout, "{}Last Line: {}", prefix, summary.last_line_number)?;
    }
    Ok(())
}

//! pg_raxarchive CLI - PostgreSQL WAL archiving on Rackspace Cloud Files
//!
//! Meant to be called from `postgresql.conf`:
//!
//! ```text
//! archive_command = 'pg_raxarchive upload %p %f'
//! restore_command = 'pg_raxarchive download %f %p'
//! archive_cleanup_command = 'pg_raxarchive cleanup %r'
//! ```

use clap::{Parser, Subcommand};
use log::LevelFilter;
use pg_raxarchive::{Archiver, ArchiverConfig, CloudFilesStore, Compression};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pg_raxarchive")]
#[command(about = "Handle PostgreSQL WAL archiving on Rackspace Cloud Files")]
#[command(version)]
struct Cli {
    /// Credential file (pyrax INI format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cloud Files region
    #[arg(long, default_value = pg_raxarchive::config::DEFAULT_REGION)]
    region: String,

    /// Container holding the archives
    #[arg(long, default_value = pg_raxarchive::config::DEFAULT_CONTAINER)]
    container: String,

    /// Use the public network instead of the Rackspace service network
    #[arg(long)]
    use_public: bool,

    /// Identity service URL
    #[arg(long, hide = true)]
    identity_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        /// Full source path
        srcpath: PathBuf,
        /// WAL filename
        filename: String,
        /// Store the file without gzip compression
        #[arg(long)]
        disable_compression: bool,
    },

    /// Download a file
    Download {
        /// WAL filename
        filename: String,
        /// Full destination path
        destpath: PathBuf,
    },

    /// Remove archives older than a file
    Cleanup {
        /// Last file to keep
        filename: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = ArchiverConfig::default()
        .with_region(&cli.region)
        .with_container(&cli.container)
        .with_public(cli.use_public)
        .with_credentials_path(
            cli.config
                .clone()
                .unwrap_or_else(ArchiverConfig::default_credentials_path),
        )
        .with_identity_url(cli.identity_url.clone());

    let archiver = Archiver::new(CloudFilesStore::connect(&config)?);

    match cli.command {
        Commands::Upload {
            srcpath,
            filename,
            disable_compression,
        } => {
            archiver.upload(&srcpath, &filename, !disable_compression)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "uploaded": filename,
                    "compressed": !disable_compression
                }),
            );
        }

        Commands::Download { filename, destpath } => {
            archiver.download(&filename, &destpath, Compression::Auto)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "downloaded": filename,
                    "path": destpath.display().to_string()
                }),
            );
        }

        Commands::Cleanup { filename } => {
            archiver.cleanup(&filename)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "kept_from": filename
                }),
            );
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the default `warn` (or `debug` with `--debug`)
fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {}: {}",
                buf.timestamp(),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Text => serde_json::to_string_pretty(value),
    };
    if let Ok(rendered) = rendered {
        println!("{}", rendered);
    }
}

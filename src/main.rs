use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use searchparty::{
    keys::{load_keys, MainKey},
    output,
    protocol::{FetchResponse, Report},
    query::{LocatedReport, ReportQuery},
    server::{AppleReportsServer, Auth, RemoteAnisetteProvider},
};

#[derive(Parser)]
struct CliParser {
    /// Directory holding `*.keys` and `*.record` files.
    #[arg(long, default_value = "keys")]
    keys_dir: PathBuf,

    /// Hex-encoded key that decrypts `*.record` files.
    #[arg(long, env = "BEACON_STORE_PASSWORD", hide_env_values = true)]
    beacon_store_password: Option<String>,

    /// Address of an anisette v3-compatible server.
    #[arg(long, default_value = "http://localhost:6969")]
    anisette_url: String,

    /// JSON file with `dsid` and `searchPartyToken`.
    #[arg(long, default_value = "auth.json")]
    auth_file: PathBuf,

    /// Length of the search window in hours, ending now.
    #[arg(long, default_value_t = 2)]
    hours: u32,

    /// When the beacons were separated from their owner (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_rfc3339)]
    lost_at: Option<DateTime<Utc>>,

    /// How decoded locations are printed.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Command to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the loaded keys with their kind and metadata.
    Keys,
    /// Fetch reports for the search window and print them without decrypting.
    FetchRaw,
    /// Fetch reports for the search window, decrypt them and print them by time.
    Locate,
    /// Decrypt reports saved by `fetch-raw`.
    Decode {
        /// File written by `fetch-raw`.
        reports: PathBuf,
        /// End of the search window the reports were fetched for (RFC 3339).
        #[arg(long, value_parser = parse_rfc3339)]
        end: Option<DateTime<Utc>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// One `{"tagData", "report"}` object per line.
    Json,
    /// A GeoJSON FeatureCollection.
    Geojson,
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(value)?.into())
}

/// Install the global subscriber. `RUST_LOG` overrides `default_filter`.
fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    // stdout carries the results
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliParser::parse();
    init_tracing(&cli_args.log_level, cli_args.log_json);

    let keys = cli_args.load_keys()?;
    let now = Utc::now();

    match &cli_args.command {
        Command::Keys => {
            for key in &keys {
                println!(
                    "{}",
                    serde_json::json!({
                        "id": key.id(),
                        "kind": key.kind().to_string(),
                        "keyInfo": key.key_info(),
                    })
                );
            }
        }
        Command::FetchRaw => {
            let query = cli_args.query(&keys, now)?;
            let reports = cli_args.fetch(&query).await?;

            println!(
                "{}",
                serde_json::to_string_pretty(&FetchResponse { results: reports })?
            );
        }
        Command::Locate => {
            let query = cli_args.query(&keys, now)?;
            let reports = cli_args.fetch(&query).await?;

            cli_args.print(decode(&query, &reports))?;
        }
        Command::Decode { reports, end } => {
            let contents = fs::read(reports)
                .with_context(|| format!("unable to read {}", reports.display()))?;
            let response: FetchResponse = serde_json::from_slice(&contents)
                .with_context(|| format!("{} is not a saved fetch response", reports.display()))?;

            let query = cli_args.query(&keys, end.unwrap_or(now))?;

            cli_args.print(decode(&query, &response.results))?;
        }
    }

    Ok(())
}

impl CliParser {
    fn load_keys(&self) -> Result<Vec<MainKey>> {
        let record_key = self
            .beacon_store_password
            .as_deref()
            .map(hex::decode)
            .transpose()
            .context("the beacon store password must be hex")?;

        let keys = load_keys(&self.keys_dir, record_key.as_deref())
            .with_context(|| format!("unable to load keys from {}", self.keys_dir.display()))?;
        tracing::info!(count = keys.len(), dir = %self.keys_dir.display(), "loaded keys");

        Ok(keys)
    }

    fn query(&self, keys: &[MainKey], now: DateTime<Utc>) -> Result<ReportQuery> {
        let query = ReportQuery::build(keys, self.hours, self.lost_at.unwrap_or(now), now);

        for failure in query.failures() {
            tracing::warn!(key = %failure.key_id, error = %failure.error, "skipping key");
        }
        if query.is_empty() {
            bail!("no sub-keys to search for");
        }

        tracing::info!(
            sub_keys = query.len(),
            start = %query.start(),
            end = %query.end(),
            "built report query"
        );

        Ok(query)
    }

    async fn fetch(&self, query: &ReportQuery) -> Result<Vec<Report>> {
        let auth = Auth::from_file(&self.auth_file)?;
        let server = AppleReportsServer::new(RemoteAnisetteProvider::new(&self.anisette_url));

        let reports = server
            .fetch_reports(&query.fetch_request(), &auth)
            .await
            .context("unable to fetch reports")?;
        tracing::info!(count = reports.len(), "fetched reports");

        Ok(reports)
    }

    fn print(&self, located: Vec<LocatedReport>) -> Result<()> {
        match self.format {
            Format::Json => print!("{}", output::json_lines(&located)?),
            Format::Geojson => println!("{}", output::feature_collection(&located)?),
        }

        Ok(())
    }
}

fn decode(query: &ReportQuery, reports: &[Report]) -> Vec<LocatedReport> {
    let (mut located, failures) = query.decode_reports(reports);
    if !failures.is_empty() {
        tracing::warn!(
            failed = failures.len(),
            decoded = located.len(),
            "some reports could not be decoded"
        );
    }

    located.sort_by_key(|report| report.tag_data.time);
    located
}

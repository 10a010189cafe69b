use ambush_proxy::{
    known_sites, Discovery, FetcherConfig, FileSource, HttpSource, ListingParser, ListingSource,
    ValidatedProxySet, Validator, ValidatorConfig, DEFAULT_LISTING_URL,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Finds free proxies that accept connections
#[derive(Parser)]
#[command(name = "ambush-proxy")]
#[command(about = "Discovers free proxies from public listings and keeps the live ones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a saved listing page and print its candidates
    Parse {
        /// Listing page saved to disk
        input: PathBuf,
        /// Id of the table holding the proxy rows
        #[arg(long, default_value = "list")]
        table_id: String,
    },
    /// Fetch listings, probe every candidate and print the live proxies
    Check {
        /// Listing URL to fetch
        #[arg(
            short,
            long,
            env = "AMBUSH_LISTING_URL",
            default_value = DEFAULT_LISTING_URL,
            conflicts_with_all = ["input", "all_sites"]
        )]
        url: String,
        /// Read the listing from a saved page instead of fetching it
        #[arg(short, long, conflicts_with = "all_sites")]
        input: Option<PathBuf>,
        /// Fetch every known listing site
        #[arg(long)]
        all_sites: bool,
        /// Keep only proxies from these country codes (repeatable)
        #[arg(short, long)]
        country: Vec<String>,
        /// Number of concurrent probes
        #[arg(short = 'n', long, default_value = "64")]
        concurrency: usize,
        /// Connect timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
        /// Id of the table holding the proxy rows
        #[arg(long, default_value = "list")]
        table_id: String,
        /// Write live proxies to this file, one IP:PORT per line
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Parse { input, table_id } => {
            let parser = ListingParser::for_table(&table_id)?;
            let raw = FileSource::new(&input).fetch().await?;
            let candidates = parser.parse(&raw)?;

            println!("Parsed {} candidates from {:?}", candidates.len(), input);
            for candidate in &candidates {
                println!("{}", candidate);
            }
        }
        Commands::Check {
            url,
            input,
            all_sites,
            country,
            concurrency,
            timeout,
            table_id,
            output,
            json,
        } => {
            let validator = Validator::with_config(
                ValidatorConfig::new()
                    .with_concurrency(concurrency)
                    .with_timeout(Duration::from_secs(timeout)),
            );
            let discovery = Discovery::new(ListingParser::for_table(&table_id)?, validator)
                .with_countries(country);

            let sources: Vec<Box<dyn ListingSource>> = match input {
                Some(path) => vec![Box::new(FileSource::new(path)) as Box<dyn ListingSource>],
                None if all_sites => known_sites()
                    .iter()
                    .map(|site| {
                        HttpSource::for_site(site, FetcherConfig::default())
                            .map(|source| Box::new(source) as Box<dyn ListingSource>)
                    })
                    .collect::<Result<_>>()?,
                None => vec![Box::new(HttpSource::new(&url)?) as Box<dyn ListingSource>],
            };

            let candidates = discovery.gather(&sources).await?;
            info!(
                candidates = candidates.len(),
                concurrency,
                timeout_secs = timeout,
                "Checking proxy candidates"
            );

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted, stopping validation");
                        cancel.cancel();
                    }
                }
            });

            let live = discovery
                .validator()
                .validate_until(candidates, cancel)
                .await;

            if let Some(path) = output {
                live.save_to_file(&path)?;
                info!(count = live.len(), path = ?path, "Saved live proxies");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&live)?);
            } else {
                print_live(&live);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn print_live(live: &ValidatedProxySet) {
    println!(
        "Results: {} live out of {} probed",
        live.len(),
        live.probed()
    );

    for entry in live.ranked() {
        let candidate = &entry.candidate;
        println!(
            "{}\t{}\t{}\t{}ms",
            candidate.to_simple_string(),
            candidate.country_code.trim(),
            candidate.country_name.trim(),
            entry.connect_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_url_conflicts_with_input() {
        let err = Cli::try_parse_from([
            "ambush-proxy",
            "check",
            "--url",
            "https://www.sslproxies.org",
            "--input",
            "saved.html",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from([
            "ambush-proxy",
            "check",
            "--url",
            "https://www.sslproxies.org",
            "--all-sites",
        ])
        .err()
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_input_alone_accepted() {
        let cli = Cli::try_parse_from(["ambush-proxy", "check", "--input", "saved.html"]).unwrap();
        match cli.command {
            Commands::Check { input, .. } => assert_eq!(input, Some(PathBuf::from("saved.html"))),
            Commands::Parse { .. } => panic!("expected check"),
        }
    }
}

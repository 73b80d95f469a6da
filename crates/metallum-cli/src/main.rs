mod progress;
mod save;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use metallum_acquire::output::{self, ReviewExport, SearchQuery};
use metallum_acquire::{CacheMode, CatalogSearch, Fetch, MetallumCatalog, Transport, TransportConfig};
use metallum_harvest::{extract_listing, HarvestOptions, Harvester};
use metallum_model::{Review, WorkRef};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_BAND: &str = "Opeth";
const DEFAULT_ALBUM: &str = "Blackwater Park";

#[derive(Parser)]
#[command(name = "metallum")]
#[command(about = "Harvest album reviews from Encyclopaedia Metallum")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long, global = true)]
    utc: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for an album and collect every review of every match
    Harvest(HarvestArgs),

    /// Re-run extraction on a saved review listing page
    Extract {
        /// Saved listing HTML (see `harvest --save-html`)
        #[arg(short, long)]
        input: String,

        /// URL the listing was fetched from; review links are built from it
        #[arg(long)]
        listing_url: String,

        /// Album id the listing belongs to
        #[arg(long, default_value = "0")]
        work_id: String,

        #[arg(short, long, default_value = DEFAULT_BAND)]
        band: String,

        #[arg(short, long, default_value = DEFAULT_ALBUM)]
        album: String,

        /// Output file path for the reviews JSON
        #[arg(short, long, default_value = "reviews.json")]
        output: String,

        /// Print every extracted review in full
        #[arg(long)]
        print: bool,
    },

    /// Print the reviews stored in a reviews JSON file
    Show {
        /// Reviews JSON written by `harvest` or `extract`
        file: String,

        /// One line per review instead of the full text
        #[arg(long)]
        brief: bool,
    },
}

#[derive(Args)]
struct HarvestArgs {
    /// Band name (prompted for when omitted)
    #[arg(short, long)]
    band: Option<String>,

    /// Album title (prompted for when omitted)
    #[arg(short, long)]
    album: Option<String>,

    /// Output file path for the reviews JSON
    #[arg(short, long, default_value = "reviews.json")]
    output: String,

    /// Directory for the persistent response cache
    #[arg(long, default_value = ".metallum-cache")]
    cache_dir: PathBuf,

    /// Don't cache responses at all
    #[arg(long)]
    no_cache: bool,

    /// Treat cached responses older than this many hours as missing
    #[arg(long)]
    cache_expire_hours: Option<u64>,

    /// Whole-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Longest single wait after a 429, in seconds
    #[arg(long, default_value_t = 300)]
    max_backoff: u64,

    /// Albums fetched at the same time
    #[arg(short = 'j', long, default_value_t = 1)]
    concurrency: usize,

    /// Send this User-Agent instead of rotating browser identities
    #[arg(long)]
    user_agent: Option<String>,

    /// Request every generated review link and log the ones that don't resolve
    #[arg(long)]
    verify_links: bool,

    /// Save each downloaded review listing into this directory
    #[arg(long)]
    save_html: Option<String>,

    /// Print every harvested review in full
    #[arg(long)]
    print: bool,
}

impl HarvestArgs {
    fn transport_config(&self) -> TransportConfig {
        let cache = if self.no_cache {
            CacheMode::Disabled
        } else {
            CacheMode::Disk {
                dir: self.cache_dir.clone(),
                expire_after: self
                    .cache_expire_hours
                    .map(|h| Duration::from_secs(h * 60 * 60)),
            }
        };
        TransportConfig {
            timeout: Duration::from_secs(self.timeout),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            max_backoff: Duration::from_secs(self.max_backoff),
            user_agent: self.user_agent.clone(),
            cache,
            ..TransportConfig::default()
        }
    }

    fn harvest_options(&self) -> HarvestOptions {
        HarvestOptions {
            concurrency: self.concurrency,
            verify_links: self.verify_links,
            ..HarvestOptions::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map log level, suppressing noisy HTML-parsing crates at debug/trace
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn  => "warn",
        LogLevel::Info  => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let result = runtime.block_on(run(cli.command));
    // A prompt interrupted by Ctrl-C leaves its blocking reader behind; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Harvest(args) => harvest(args).await?,
        Commands::Extract {
            input,
            listing_url,
            work_id,
            band,
            album,
            output,
            print,
        } => {
            tracing::info!(input = %input, output = %output, "Extracting saved listing");
            let html = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {input}"))?;
            let work = WorkRef {
                id: work_id,
                title: album.clone(),
                artist: band.clone(),
                kind: None,
                release_date: None,
                url: String::new(),
                listing: None,
            };

            let extraction = extract_listing(&listing_url, &work, &html);
            tracing::info!(
                reviews = extraction.reviews.len(),
                skipped = extraction.failures.len(),
                "Extracted reviews"
            );
            if print {
                print_reviews(&extraction.reviews, false);
            }

            let export = ReviewExport::new(SearchQuery { album, band }, extraction.reviews);
            output::write_reviews(&export, &output)?;
        }
        Commands::Show { file, brief } => {
            let export = output::read_reviews(&file)?;
            tracing::info!(
                band = %export.query.band,
                album = %export.query.album,
                fetched_at = %export.fetched_at,
                reviews = export.count,
                "Loaded reviews"
            );
            print_reviews(&export.reviews, brief);
        }
    }

    Ok(())
}

fn print_reviews(reviews: &[Review], brief: bool) {
    for review in reviews {
        if brief {
            println!("{review}");
        } else {
            println!("{}", review.full_info());
        }
    }
}

async fn harvest(args: HarvestArgs) -> Result<()> {
    let Some((band, album)) = resolve_query(&args).await? else {
        tracing::info!("Cancelled before search started");
        return Ok(());
    };

    let transport: Arc<dyn Fetch> = Arc::new(
        Transport::from_config(&args.transport_config())
            .context("Failed to set up HTTP transport")?,
    );
    let fetcher: Arc<dyn Fetch> = match &args.save_html {
        Some(dir) => Arc::new(save::SavingFetch::new(transport.clone(), dir.clone())),
        None => transport.clone(),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current albums");
            on_interrupt.cancel();
        }
    });

    let catalog = MetallumCatalog::new(transport);
    let candidates = tokio::select! {
        found = catalog.search(&album, &band) => found.context("Album search failed")?,
        _ = cancel.cancelled() => {
            tracing::info!("Cancelled during search");
            return Ok(());
        }
    };

    let harvester = Harvester::new(fetcher)
        .with_progress(Arc::new(progress::BarProgress::new()))
        .with_options(args.harvest_options())
        .with_cancellation(cancel.clone());
    let report = harvester.run(&candidates).await?;

    for failure in &report.fragment_failures {
        tracing::debug!(%failure, "Fragment skipped");
    }
    let summary = report.summary();
    tracing::info!(%summary, "Done");

    if args.print {
        print_reviews(&report.reviews, false);
    }

    let export = ReviewExport::new(SearchQuery { album, band }, report.reviews);
    output::write_reviews(&export, &args.output)?;

    Ok(())
}

/// Band and album from flags, prompting for whichever is missing.
/// `None` when the user hits Ctrl-C at a prompt.
async fn resolve_query(args: &HarvestArgs) -> Result<Option<(String, String)>> {
    let band = match &args.band {
        Some(band) => band.clone(),
        None => match prompt("Band", DEFAULT_BAND).await? {
            Some(band) => band,
            None => return Ok(None),
        },
    };
    let album = match &args.album {
        Some(album) => album.clone(),
        None => match prompt("Album", DEFAULT_ALBUM).await? {
            Some(album) => album,
            None => return Ok(None),
        },
    };
    Ok(Some((band, album)))
}

async fn prompt(label: &'static str, default: &'static str) -> Result<Option<String>> {
    let input = tokio::task::spawn_blocking(move || {
        Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .default(default.to_string())
            .interact_text()
    });

    tokio::select! {
        answer = input => prompt_answer(answer.context("Prompt task failed")?),
        _ = tokio::signal::ctrl_c() => {
            println!();
            Ok(None)
        }
    }
}

/// Ctrl-C typed into the prompt surfaces as an interrupted read, not a signal.
fn prompt_answer(answer: Result<String, dialoguer::Error>) -> Result<Option<String>> {
    match answer {
        Ok(answer) => Ok(Some(answer.trim().to_string())),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

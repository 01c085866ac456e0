//! CLI definition, tracing setup, and the ingestion run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use confeed_confluence::{ConfluenceClient, ConfluenceConfig};
use confeed_ingest::{HttpIngestSink, ProgressReporter, SpaceIngestor};
use confeed_shared::{LoadOptions, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// confeed — push a Confluence space into a text ingestion service.
#[derive(Parser)]
#[command(
    name = "confeed",
    version,
    about = "Ingest every page of a Confluence space into a text ingestion service, \
             keyed by content hash.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Base URL of the Confluence instance.
    #[arg(long, value_name = "URL")]
    pub confluence_url: Url,

    /// Confluence username (usually an email address).
    #[arg(long, value_name = "USER")]
    pub confluence_username: String,

    /// Confluence API key used as the basic-auth password.
    #[arg(long, value_name = "KEY")]
    pub confluence_apikey: String,

    /// Key of the space to ingest.
    #[arg(long, value_name = "SPACE")]
    pub confluence_space: String,

    /// Optional log file; timestamped lines are appended, no rotation.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Ingestion service endpoint (defaults to the config file value).
    #[arg(long, value_name = "URL")]
    pub ingest_url: Option<Url>,

    /// Ceiling on the total number of pages retrieved.
    #[arg(long, value_name = "N")]
    pub max_pages: Option<u32>,

    /// Page-listing batch size per request.
    #[arg(long, value_name = "N")]
    pub page_limit: Option<u32>,

    /// Do not download text attachments.
    #[arg(long)]
    pub skip_attachments: bool,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr; `--log-file` adds a second layer appending to the
/// given path.
pub(crate) fn init_tracing(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{
        EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    };

    let filter = match cli.verbose {
        0 => "confeed=info,confeed_shared=info,confeed_confluence=info,confeed_ingest=info",
        1 => "confeed=debug,confeed_shared=debug,confeed_confluence=debug,confeed_ingest=debug",
        _ => "trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| eyre!("cannot open log file '{}': {e}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    match cli.log_format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr).boxed())
                .with(file_layer)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).boxed())
                .with(file_layer)
                .init();
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run one ingestion pass over the requested space.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;

    // CLI flags override config file values.
    let mut opts = LoadOptions::from(&config);
    if let Some(limit) = cli.page_limit {
        opts.limit = limit;
    }
    if let Some(max_pages) = cli.max_pages {
        opts.max_pages = max_pages;
    }
    if cli.skip_attachments {
        opts.include_attachments = false;
    }

    let ingest_url = match cli.ingest_url {
        Some(url) => url,
        None => Url::parse(&config.ingest.endpoint)
            .map_err(|e| eyre!("invalid ingest endpoint '{}': {e}", config.ingest.endpoint))?,
    };

    info!(
        confluence_url = %cli.confluence_url,
        space = %cli.confluence_space,
        ingest_url = %ingest_url,
        max_pages = opts.max_pages,
        "starting ingestion pass"
    );

    let client = ConfluenceClient::connect(ConfluenceConfig {
        base_url: cli.confluence_url,
        username: cli.confluence_username,
        api_key: cli.confluence_apikey,
        timeout_secs: config.retrieval.timeout_secs,
    })
    .await?;

    let sink = HttpIngestSink::new(
        ingest_url,
        Duration::from_secs(config.retrieval.timeout_secs),
    )?;

    let ingestor = SpaceIngestor::new(client, sink, opts);

    let reporter = CliProgress::new();
    let summary = ingestor
        .ingest_space(&cli.confluence_space, &reporter)
        .await?;
    reporter.finish();

    println!();
    println!("  Space ingested!");
    println!("  Space:      {}", cli.confluence_space);
    println!("  Documents:  {}", summary.documents);
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn retrieving(&self, space_key: &str) {
        self.spinner
            .set_message(format!("Retrieving space {space_key}"));
    }

    fn document_submitted(&self, doc_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Ingesting [{current}/{total}] {doc_id}"));
    }
}

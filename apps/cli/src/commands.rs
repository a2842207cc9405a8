//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use feedmill_core::{
    BatchConfig, BatchReport, ChatCompletionClient, IngestReport, ProgressReporter,
    TransformConfig, dated_dir, ingest_feeds, run_batch,
};
use feedmill_feeds::{CursorStore, HttpFeedSource};
use feedmill_shared::{
    AppConfig, config_file_path, init_config, init_config_at, load_config, load_config_from,
    validate_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// feedmill: feeds in, translated and summarized Markdown out.
#[derive(Parser)]
#[command(
    name = "feedmill",
    version,
    about = "Fetch RSS/Atom feeds into Markdown, then translate, summarize and republish them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.feedmill/feedmill.toml).
    #[arg(long, global = true, env = "FEEDMILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch new items from every configured feed into the raw tree.
    Fetch {
        /// Raw document root (defaults to raw_<today>).
        #[arg(long)]
        raw: Option<PathBuf>,
    },

    /// Translate and summarize every pending document in the raw tree.
    Process {
        /// Source root (defaults to raw_<today>).
        #[arg(long)]
        src: Option<PathBuf>,

        /// Destination root (defaults to translated_<today>).
        #[arg(long)]
        dst: Option<PathBuf>,
    },

    /// Fetch, then process.
    Run {
        /// Source root (defaults to raw_<today>).
        #[arg(long)]
        src: Option<PathBuf>,

        /// Destination root (defaults to translated_<today>).
        #[arg(long)]
        dst: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "feedmill=info",
        1 => "feedmill=debug",
        _ => "feedmill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Fetch { raw } => {
            let config = load(config_path)?;
            cmd_fetch(&config, raw.as_deref()).await.map(|_| ())
        }
        Command::Process { src, dst } => {
            let config = load(config_path)?;
            cmd_process(&config, src.as_deref(), dst.as_deref()).await
        }
        Command::Run { src, dst } => {
            let config = load(config_path)?;
            validate_api_key(&config)?;
            cmd_fetch(&config, src.as_deref()).await?;
            cmd_process(&config, src.as_deref(), dst.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

/// Explicit flag, else the configured directory, else `<cwd>/<prefix>_<today>`.
fn resolve_dir(flag: Option<&Path>, configured: Option<&str>, prefix: &str) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = configured {
        return Ok(PathBuf::from(dir));
    }
    let cwd =
        std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    Ok(dated_dir(&cwd, prefix))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(config: &AppConfig, raw: Option<&Path>) -> Result<IngestReport> {
    if config.feeds.is_empty() {
        return Err(eyre!(
            "no feeds configured; add [[feeds]] entries to {}",
            config_file_path()?.display()
        ));
    }

    let raw_root = resolve_dir(raw, config.paths.raw_dir.as_deref(), "raw")?;
    let mut store = CursorStore::open(&config.paths.cursor_file)?;
    let source = HttpFeedSource::new(&config.fetch)?;

    info!(
        feeds = config.feeds.len(),
        raw_root = %raw_root.display(),
        cursor_file = %store.path().display(),
        "fetching feeds"
    );

    let reporter = CliProgress::new();
    let report = ingest_feeds(&config.feeds, &source, &mut store, &raw_root, &reporter).await;

    println!();
    for outcome in &report.feeds {
        match &outcome.result {
            Ok(paths) => println!("  {:>4} new   {}", paths.len(), outcome.feed),
            Err(e) => println!("  fail       {}: {e}", outcome.feed),
        }
    }
    println!(
        "  {} documents written to {}",
        report.documents_written(),
        raw_root.display()
    );
    println!();

    Ok(report)
}

async fn cmd_process(config: &AppConfig, src: Option<&Path>, dst: Option<&Path>) -> Result<()> {
    let api_key = validate_api_key(config)?;

    let batch = BatchConfig {
        source_root: resolve_dir(src, config.paths.raw_dir.as_deref(), "raw")?,
        dest_root: resolve_dir(dst, config.paths.output_dir.as_deref(), "translated")?,
        transform: TransformConfig::from(&config.generation),
    };
    batch.validate()?;
    let client = ChatCompletionClient::new(&config.generation, api_key)?;

    info!(
        src = %batch.source_root.display(),
        dst = %batch.dest_root.display(),
        model = client.model(),
        "processing documents"
    );

    let reporter = CliProgress::new();
    let report = run_batch(&batch, &client, &reporter).await;
    print_batch_report(&report);

    if report.is_clean() {
        Ok(())
    } else {
        Err(eyre!(
            "{} documents failed, {} published but not marked; rerun to retry",
            report.failed.len(),
            report.partial.len()
        ))
    }
}

fn print_batch_report(report: &BatchReport) {
    println!();
    for (path, error) in &report.failed {
        println!("  failed   {}: {error}", path.display());
    }
    for (path, error) in &report.partial {
        println!("  partial  {}: {error}", path.display());
    }
    println!("  {report}");
    println!("  Time: {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => {
            init_config_at(p)?;
            p.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {detail}"));
    }

    fn finish(&self, summary: &str) {
        self.spinner.finish_and_clear();
        info!("{summary}");
    }
}

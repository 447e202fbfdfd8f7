//! CLI binary for inventory-pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use inventory_pdf::{
    generate_to_dir, plan, DocumentVariant, FooterPolicy, GenerationConfig,
    GenerationProgressCallback, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar advancing per resolved photo, with a
/// log line for every placeholder substitution. Photos resolve out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading CSV…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            fallbacks: AtomicUsize::new(0),
        })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_records: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} photos  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_records as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Fetching");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{total_records} record(s) to lay out…"))
        ));
    }

    fn on_image_resolved(&self, record: usize, _total: usize) {
        self.bar.set_message(format!("record {record}"));
        self.bar.inc(1);
    }

    fn on_image_fallback(&self, record: usize, total: usize, reason: &str) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        let msg = if reason.chars().count() > 80 {
            format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} Record {:>3}/{:<3}  {}",
            red("✗"),
            record,
            total,
            dim(&msg),
        ));
    }

    fn on_generation_complete(&self, total_records: usize, pages: usize) {
        self.bar.finish_and_clear();
        let fallbacks = self.fallbacks.load(Ordering::SeqCst);
        if fallbacks == 0 {
            eprintln!(
                "{} {} record(s) on {} page(s)",
                green("✔"),
                bold(&total_records.to_string()),
                pages
            );
        } else {
            eprintln!(
                "{} {} record(s) on {} page(s)  ({} placeholder image(s))",
                cyan("⚠"),
                bold(&total_records.to_string()),
                pages,
                red(&fallbacks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pickup/delivery form → ./uploads/bon_d'enlevement_mobilier.pdf
  inventory-pdf "Mobilier Salle 2.csv"

  # Production list with logo and placeholder image
  inventory-pdf --variant list --assets ./assets stock.csv -o out/

  # Semicolon-separated export, footer on every page
  inventory-pdf --delimiter ';' --footer every-page stock.csv

  # Page count preview, no network
  inventory-pdf --plan stock.csv

  # Reproducible output and JSON report
  inventory-pdf --date 2024-03-07 --json stock.csv

ASSETS:
  logo.png       drawn at the top left instead of the brand name
  no-image.png   drawn when a photo cannot be fetched or decoded

CSV COLUMNS:
  SKU, Dénomination, Couleur, Matière, Dimension, Poids, Stockage,
  Emplacement, Photo (a URL, or a markdown link [label](https://…))
"#;

/// Render inventory CSV exports into paginated PDF forms and lists.
#[derive(Parser, Debug)]
#[command(
    name = "inventory-pdf",
    version,
    about = "Render inventory CSV exports into paginated PDF forms and lists",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// CSV file to render.
    input: PathBuf,

    /// Document variant.
    #[arg(long, env = "INVPDF_VARIANT", value_enum, default_value = "form")]
    variant: VariantArg,

    /// Output directory.
    #[arg(short, long, env = "INVPDF_OUTPUT_DIR", default_value = "uploads")]
    output: PathBuf,

    /// Name used for the artifact and list title. Default: the input file name.
    #[arg(long, env = "INVPDF_NAME")]
    name: Option<String>,

    /// Directory holding logo.png and no-image.png.
    #[arg(long, env = "INVPDF_ASSETS")]
    assets: Option<PathBuf>,

    /// Per-photo fetch timeout in seconds.
    #[arg(long, env = "INVPDF_FETCH_TIMEOUT", default_value_t = 15)]
    fetch_timeout: u64,

    /// Photos fetched in parallel.
    #[arg(short, long, env = "INVPDF_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Extra attempts for transient fetch failures.
    #[arg(long, env = "INVPDF_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Initial retry backoff in milliseconds.
    #[arg(long, env = "INVPDF_RETRY_BACKOFF", default_value_t = 500)]
    retry_backoff: u64,

    /// Which pages get the footer.
    #[arg(long, env = "INVPDF_FOOTER", value_enum, default_value = "last-page")]
    footer: FooterArg,

    /// CSV field delimiter (single ASCII character).
    #[arg(long, env = "INVPDF_DELIMITER", default_value = ",")]
    delimiter: char,

    /// Header date (YYYY-MM-DD). Default: today.
    #[arg(long, env = "INVPDF_DATE")]
    date: Option<NaiveDate>,

    /// Public URL prefix reported for the artifact.
    #[arg(long, env = "INVPDF_URL_PREFIX", default_value = "/uploads")]
    url_prefix: String,

    /// Print the page plan only; no fetching, no file written.
    #[arg(long)]
    plan: bool,

    /// Output a JSON report instead of text.
    #[arg(long, env = "INVPDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "INVPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INVPDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    Form,
    List,
}

impl From<VariantArg> for DocumentVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Form => DocumentVariant::Form,
            VariantArg::List => DocumentVariant::List,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FooterArg {
    LastPage,
    EveryPage,
}

impl From<FooterArg> for FooterPolicy {
    fn from(v: FooterArg) -> Self {
        match v {
            FooterArg::LastPage => FooterPolicy::LastPage,
            FooterArg::EveryPage => FooterPolicy::EveryPage,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.plan;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let source_name = match &cli.name {
        Some(n) => n.clone(),
        None => file_name(&cli.input)?,
    };
    let csv = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let variant: DocumentVariant = cli.variant.into();

    // ── Plan-only mode ───────────────────────────────────────────────────
    if cli.plan {
        let p = plan(&csv, variant, &source_name, &config).context("Failed to plan layout")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&p).context("Failed to serialise plan")?
            );
        } else {
            println!("Artifact:     {}", p.artifact_name);
            println!("Variant:      {}", p.variant);
            println!("Records:      {}", p.records);
            println!("Photos:       {}", p.photos_referenced);
            println!("Pages:        {}", p.pages);
        }
        return Ok(());
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let result = generate_to_dir(&csv, variant, &source_name, &cli.output, &config)
        .await
        .context("Generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialise result")?
        );
        return Ok(());
    }

    if !cli.quiet {
        if !show_progress {
            for w in &result.warnings {
                eprintln!("  {} {}", red("✗"), w);
            }
        }
        eprintln!(
            "{}  {} page(s)  {}ms  →  {}",
            if result.warnings.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            result.stats.pages,
            result.stats.total_duration_ms,
            bold(&result.artifact_path.display().to_string()),
        );
        eprintln!(
            "   {} photo(s) embedded  /  {} placeholder(s)  —  {}",
            dim(&result.stats.images_embedded().to_string()),
            dim(&(result.stats.placeholder_assets + result.stats.placeholder_boxes).to_string()),
            result.file_url,
        );
    }

    Ok(())
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a name from {}", path.display()))
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    if !cli.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character (got {:?})", cli.delimiter);
    }

    let mut builder = GenerationConfig::builder()
        .fetch_timeout_secs(cli.fetch_timeout)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff)
        .footer_policy(cli.footer.into())
        .delimiter(cli.delimiter as u8)
        .url_prefix(cli.url_prefix.clone());

    if let Some(ref dir) = cli.assets {
        builder = builder.assets_dir(dir.clone());
    }
    if let Some(date) = cli.date {
        builder = builder.edition_date(date);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

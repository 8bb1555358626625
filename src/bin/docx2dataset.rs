//! CLI binary for docx2dataset.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DatasetConfig`, runs the selected stages and prints a summary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docx2dataset::{
    build_dataset, DatasetConfig, DatasetReport, PageSelection, ProgressCallback, Stage,
    StageProgressCallback, StageReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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

/// Terminal progress callback: one bar per stage plus a log line per file.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            f(bar);
        }
    }
}

impl StageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len}  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix(stage.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{stage}: {total} input(s)"))
        ));
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_item_start(&self, _stage: Stage, _index: usize, _total: usize, name: &str) {
        self.with_bar(|bar| bar.set_message(name.to_string()));
    }

    fn on_item_complete(&self, _stage: Stage, index: usize, total: usize, name: &str) {
        self.with_bar(|bar| {
            bar.println(format!("  {} {:>3}/{:<3}  {}", green("✓"), index, total, name));
            bar.inc(1);
        });
    }

    fn on_item_skipped(&self, _stage: Stage, index: usize, total: usize, name: &str) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {:>3}/{:<3}  {}",
                dim("↷"),
                index,
                total,
                dim(&format!("{name} (exists)"))
            ));
            bar.inc(1);
        });
    }

    fn on_item_error(&self, _stage: Stage, index: usize, total: usize, name: &str, error: &str) {
        // Keep one line per failure; the full text is in the report.
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} {:>3}/{:<3}  {}  {}",
                red("✗"),
                index,
                total,
                name,
                red(&msg)
            ));
        });
    }

    fn on_stage_complete(&self, stage: Stage, total: usize, success_count: usize) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        eprintln!(
            "{} {}  {}/{} done",
            if success_count == total {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&stage.to_string()),
            success_count,
            total
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Build dataset.jsonl from existing images/ and markdown/ (default)
  docx2dataset

  # Whole pipeline under a custom root, one markdown file per page
  docx2dataset --root ./documents --split-pages all

  # Only rasterise PDFs, at 144 DPI
  docx2dataset --dpi 144 pdf-to-png

  # Fail instead of truncating when counts disagree
  docx2dataset --strict manifest

  # Machine-readable run report
  docx2dataset --json all > report.json

LAYOUT (relative to --root, default ../documents):
  docxs/           source .docx documents
  docxs/final/     per-page .docx files (--split-pages)
  pdfs/            <stem>.pdf
  images/<stem>/   01.png, 02.png, …
  markdown/        <stem>.mmd, or <stem>/<stem>_01.mmd with --split-pages
  dataset.jsonl    {"image": …, "markdown": …, "meta": "[]"} per line

REQUIREMENTS:
  libreoffice      docx-to-pdf
  pandoc           docx-to-markdown
  libpdfium        pdf-to-png; set PDFIUM_LIB_PATH=/path/to/libpdfium to pick one
"#;

/// Prepare an OCR dataset of page images and page markdown from .docx files.
#[derive(Parser, Debug)]
#[command(
    name = "docx2dataset",
    version,
    about = "Prepare an OCR dataset of page images and page markdown from .docx files",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Stage to run. Without one, only the manifest is built.
    #[command(subcommand)]
    command: Option<Command>,

    /// Document root holding docxs/, pdfs/, images/ and markdown/.
    #[arg(long, global = true, env = "DOCX2DATASET_ROOT", default_value = docx2dataset::config::DEFAULT_ROOT)]
    root: PathBuf,

    /// Source document directory (default: <root>/docxs).
    #[arg(long, global = true, env = "DOCX2DATASET_DOCXS_DIR")]
    docxs_dir: Option<PathBuf>,

    /// PDF directory (default: <root>/pdfs).
    #[arg(long, global = true, env = "DOCX2DATASET_PDFS_DIR")]
    pdfs_dir: Option<PathBuf>,

    /// Page image directory (default: <root>/images).
    #[arg(long, global = true, env = "DOCX2DATASET_IMAGES_DIR")]
    images_dir: Option<PathBuf>,

    /// Markdown directory (default: <root>/markdown).
    #[arg(long, global = true, env = "DOCX2DATASET_MARKDOWN_DIR")]
    markdown_dir: Option<PathBuf>,

    /// Per-page .docx directory used by --split-pages (default: <root>/docxs/final).
    #[arg(long, global = true, env = "DOCX2DATASET_SPLITS_DIR")]
    splits_dir: Option<PathBuf>,

    /// Manifest file (default: <root>/dataset.jsonl).
    #[arg(long, global = true, env = "DOCX2DATASET_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Rendering DPI (1–1200).
    #[arg(long, global = true, env = "DOCX2DATASET_DPI", default_value_t = 96,
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: u32,

    /// Pages to rasterise: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, global = true, env = "DOCX2DATASET_PAGES", default_value = "all")]
    pages: String,

    /// Split each document at page-break markers before converting to markdown.
    #[arg(long, global = true, env = "DOCX2DATASET_SPLIT_PAGES")]
    split_pages: bool,

    /// With --split-pages, also save content after the last page-break marker.
    #[arg(long, global = true, env = "DOCX2DATASET_KEEP_TRAILING_PAGE")]
    keep_trailing_page: bool,

    /// Fail when image and markdown counts differ instead of truncating.
    #[arg(long, global = true, env = "DOCX2DATASET_STRICT")]
    strict: bool,

    /// Office suite executable used for docx-to-pdf.
    #[arg(long, global = true, env = "DOCX2DATASET_OFFICE", default_value = "libreoffice")]
    office_program: String,

    /// Markup converter executable used for docx-to-markdown.
    #[arg(long, global = true, env = "DOCX2DATASET_PANDOC", default_value = "pandoc")]
    markdown_program: String,

    /// Print the run report as JSON on stdout.
    #[arg(long, global = true, env = "DOCX2DATASET_JSON")]
    json: bool,

    /// Disable progress bars.
    #[arg(long, global = true, env = "DOCX2DATASET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCX2DATASET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCX2DATASET_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Convert every .docx to PDF with the office suite.
    DocxToPdf,
    /// Convert every .docx to markdown with pandoc.
    DocxToMarkdown,
    /// Rasterise every PDF into one PNG per page.
    PdfToPng,
    /// Pair images with markdown into the JSONL manifest.
    Manifest,
    /// Run every stage in order.
    All,
}

impl Command {
    fn stages(self) -> Vec<Stage> {
        match self {
            Command::DocxToPdf => vec![Stage::DocxToPdf],
            Command::DocxToMarkdown => vec![Stage::DocxToMarkdown],
            Command::PdfToPng => vec![Stage::PdfToPng],
            Command::Manifest => vec![Stage::Manifest],
            Command::All => Stage::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs would interleave with the progress bars.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn StageProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run stages ───────────────────────────────────────────────────────
    let stages = cli
        .command
        .map(Command::stages)
        .unwrap_or_else(|| vec![Stage::Manifest]);

    let report = build_dataset(&config, &stages)
        .await
        .context("Dataset preparation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    Ok(())
}

/// Map CLI args to `DatasetConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DatasetConfig> {
    let mut builder = DatasetConfig::builder()
        .root(&cli.root)
        .dpi(cli.dpi)
        .pages(parse_pages(&cli.pages)?)
        .split_pages(cli.split_pages)
        .keep_trailing_page(cli.keep_trailing_page)
        .strict_pairing(cli.strict)
        .office_program(cli.office_program.clone())
        .markdown_program(cli.markdown_program.clone());

    if let Some(ref dir) = cli.docxs_dir {
        builder = builder.docxs_dir(dir);
    }
    if let Some(ref dir) = cli.pdfs_dir {
        builder = builder.pdfs_dir(dir);
    }
    if let Some(ref dir) = cli.images_dir {
        builder = builder.images_dir(dir);
    }
    if let Some(ref dir) = cli.markdown_dir {
        builder = builder.markdown_dir(dir);
    }
    if let Some(ref dir) = cli.splits_dir {
        builder = builder.splits_dir(dir);
    }
    if let Some(ref path) = cli.manifest {
        builder = builder.manifest_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &DatasetReport, show_progress: bool) {
    for stage in &report.stages {
        // The progress callback already printed a per-stage line.
        if !show_progress {
            eprintln!(
                "{} {}  {} ok, {} skipped, {} failed  {}",
                if stage.is_clean() { green("✔") } else { cyan("⚠") },
                bold(&stage.stage.to_string()),
                stage.succeeded,
                stage.skipped,
                stage.failed(),
                dim(&format!("{}ms", stage.duration_ms)),
            );
            print_failures(stage);
        }
        if let Some(ref stats) = stage.manifest {
            eprintln!(
                "   {} records from {} document(s)  {}",
                bold(&stats.records.to_string()),
                stats.documents,
                dim(&format!(
                    "dropped: {} image(s), {} markdown file(s)",
                    stats.dropped_images, stats.dropped_markdown
                )),
            );
        }
    }
    if report.total_failures() > 0 {
        eprintln!(
            "{} {} file(s) failed; see the log above",
            red("✘"),
            report.total_failures()
        );
    }
}

fn print_failures(stage: &StageReport) {
    for failure in &stage.failures {
        eprintln!("  {} {}", red("✗"), failure);
    }
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

//! Configuration types for dataset preparation.
//!
//! Every stage reads its directories and knobs from one [`DatasetConfig`],
//! built via its [`DatasetConfigBuilder`]. Stage functions never consult
//! global path constants; two configs can drive two independent dataset
//! trees in the same process.

use crate::error::DatasetError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Root of the document tree used when no other root is configured.
pub const DEFAULT_ROOT: &str = "../documents";

/// Configuration for the dataset preparation stages.
///
/// Built via [`DatasetConfig::builder()`] or [`DatasetConfig::default()`].
///
/// # Example
/// ```rust
/// use docx2dataset::DatasetConfig;
///
/// let config = DatasetConfig::builder()
///     .root("data")
///     .dpi(144)
///     .split_pages(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.images_dir, std::path::PathBuf::from("data/images"));
/// ```
#[derive(Clone)]
pub struct DatasetConfig {
    /// Directory holding the source `.docx` documents. Default: `<root>/docxs`.
    pub docxs_dir: PathBuf,

    /// Directory receiving rendered PDFs. Default: `<root>/pdfs`.
    pub pdfs_dir: PathBuf,

    /// Directory receiving one image folder per PDF. Default: `<root>/images`.
    ///
    /// This path is also the prefix written into every manifest `image` field,
    /// so a relative root keeps the manifest relocatable.
    pub images_dir: PathBuf,

    /// Directory receiving `.mmd` files. Default: `<root>/markdown`.
    pub markdown_dir: PathBuf,

    /// Scratch directory for per-page `.docx` files. Default: `<root>/docxs/final`.
    pub splits_dir: PathBuf,

    /// Output manifest. Default: `<root>/dataset.jsonl`.
    pub manifest_path: PathBuf,

    /// Rasterisation resolution in dots per inch. Range: 1–1200. Default: 96.
    ///
    /// The renderer scale is `dpi / 72`, 72 being the PDF points-per-inch.
    pub dpi: u32,

    /// Pages to rasterise from every PDF. Default: all pages.
    pub pages: PageSelection,

    /// Split every document into one `.docx` per page before markdown
    /// conversion. Default: false.
    ///
    /// Only the split layout (`<markdown>/<stem>/<stem>_NN.mmd`) lines up with
    /// the per-document image folders the manifest builder expects.
    pub split_pages: bool,

    /// Save the content after the last page-break marker as a final page.
    /// Default: false (the trailing page is dropped).
    pub keep_trailing_page: bool,

    /// Fail the manifest stage on any image/markdown count mismatch instead of
    /// truncating to the shorter list. Default: false.
    pub strict_pairing: bool,

    /// Extension (without dot, case-insensitive) of source documents. Default: `docx`.
    pub source_extension: String,

    /// Office suite executable used for DOCX → PDF. Default: `libreoffice`.
    pub office_program: String,

    /// Markup converter executable used for DOCX → Markdown. Default: `pandoc`.
    pub markdown_program: String,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::from_root(DEFAULT_ROOT)
    }
}

impl fmt::Debug for DatasetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetConfig")
            .field("docxs_dir", &self.docxs_dir)
            .field("pdfs_dir", &self.pdfs_dir)
            .field("images_dir", &self.images_dir)
            .field("markdown_dir", &self.markdown_dir)
            .field("splits_dir", &self.splits_dir)
            .field("manifest_path", &self.manifest_path)
            .field("dpi", &self.dpi)
            .field("pages", &self.pages)
            .field("split_pages", &self.split_pages)
            .field("keep_trailing_page", &self.keep_trailing_page)
            .field("strict_pairing", &self.strict_pairing)
            .field("source_extension", &self.source_extension)
            .field("office_program", &self.office_program)
            .field("markdown_program", &self.markdown_program)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn StageProgressCallback>"),
            )
            .finish()
    }
}

impl DatasetConfig {
    /// Create a new builder for `DatasetConfig`.
    pub fn builder() -> DatasetConfigBuilder {
        DatasetConfigBuilder {
            config: Self::default(),
        }
    }

    /// Default configuration with every directory placed under `root`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            docxs_dir: root.join("docxs"),
            pdfs_dir: root.join("pdfs"),
            images_dir: root.join("images"),
            markdown_dir: root.join("markdown"),
            splits_dir: root.join("docxs").join("final"),
            manifest_path: root.join("dataset.jsonl"),
            dpi: 96,
            pages: PageSelection::default(),
            split_pages: false,
            keep_trailing_page: false,
            strict_pairing: false,
            source_extension: "docx".to_string(),
            office_program: "libreoffice".to_string(),
            markdown_program: "pandoc".to_string(),
            progress_callback: None,
        }
    }

    /// Whether `path` carries the configured source-document extension.
    pub fn is_source_document(&self, path: &Path) -> bool {
        has_extension(path, &self.source_extension)
    }
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Builder for [`DatasetConfig`].
#[derive(Debug)]
pub struct DatasetConfigBuilder {
    config: DatasetConfig,
}

impl DatasetConfigBuilder {
    /// Re-root every directory under `root`, keeping all other settings.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        let rooted = DatasetConfig::from_root(root);
        self.config.docxs_dir = rooted.docxs_dir;
        self.config.pdfs_dir = rooted.pdfs_dir;
        self.config.images_dir = rooted.images_dir;
        self.config.markdown_dir = rooted.markdown_dir;
        self.config.splits_dir = rooted.splits_dir;
        self.config.manifest_path = rooted.manifest_path;
        self
    }

    pub fn docxs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.docxs_dir = dir.into();
        self
    }

    pub fn pdfs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfs_dir = dir.into();
        self
    }

    pub fn images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.images_dir = dir.into();
        self
    }

    pub fn markdown_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.markdown_dir = dir.into();
        self
    }

    pub fn splits_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.splits_dir = dir.into();
        self
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_path = path.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn split_pages(mut self, v: bool) -> Self {
        self.config.split_pages = v;
        self
    }

    pub fn keep_trailing_page(mut self, v: bool) -> Self {
        self.config.keep_trailing_page = v;
        self
    }

    pub fn strict_pairing(mut self, v: bool) -> Self {
        self.config.strict_pairing = v;
        self
    }

    pub fn source_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.source_extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn office_program(mut self, program: impl Into<String>) -> Self {
        self.config.office_program = program.into();
        self
    }

    pub fn markdown_program(mut self, program: impl Into<String>) -> Self {
        self.config.markdown_program = program.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DatasetConfig, DatasetError> {
        let c = &self.config;
        if c.dpi == 0 || c.dpi > 1200 {
            return Err(DatasetError::InvalidConfig(format!(
                "DPI must be 1–1200, got {}",
                c.dpi
            )));
        }
        if c.source_extension.is_empty() {
            return Err(DatasetError::InvalidConfig(
                "Source extension must not be empty".into(),
            ));
        }
        if c.office_program.trim().is_empty() || c.markdown_program.trim().is_empty() {
            return Err(DatasetError::InvalidConfig(
                "Converter program names must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The four pipeline stages, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    DocxToPdf,
    DocxToMarkdown,
    PdfToPng,
    Manifest,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 4] = [
        Stage::DocxToPdf,
        Stage::DocxToMarkdown,
        Stage::PdfToPng,
        Stage::Manifest,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::DocxToPdf => "docx-to-pdf",
            Stage::DocxToMarkdown => "docx-to-markdown",
            Stage::PdfToPng => "pdf-to-png",
            Stage::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

/// Specifies which pages of each PDF to rasterise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

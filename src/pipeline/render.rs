//! PDF rasterisation: render pages to PNG files or in-memory images via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`pdf_to_png`] moves the whole directory walk onto a blocking thread and
//! renders one PDF after another there.
//!
//! ## Failure policy
//!
//! [`rasterize`] never returns `Err` and never panics on a bad document. It
//! reports what happened through [`RasterOutcome`]: the document did not
//! open, a page failed after some pages were produced, or every requested
//! page was produced. Rendering stops at the first failing page.

use crate::config::{DatasetConfig, Stage};
use crate::error::{DatasetError, ItemError};
use crate::output::StageReport;
use crate::pipeline::input;
use crate::pipeline::stage::StageRun;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Points per inch of PDF user space.
const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Page numbers above this no longer sort lexicographically (`100.png` < `11.png`).
const MAX_SORTABLE_PAGES: usize = 99;

/// Where the PDF to rasterise comes from.
pub enum PdfSource<'a, 'lib> {
    /// A PDF file on disk.
    Path(&'a Path),
    /// PDF bytes already in memory.
    Bytes(&'a [u8]),
    /// A document the caller already opened with the same [`Pdfium`].
    Document(&'a PdfDocument<'lib>),
}

/// What to do with each rendered page.
#[derive(Debug, Clone, Copy)]
pub enum RasterTarget<'a> {
    /// Keep every page as an encoded BMP buffer; nothing is written to disk.
    Memory,
    /// Write `<dir>/NN.png`, `NN` being the 1-based page number.
    Directory(&'a Path),
}

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutput {
    /// PNG written to this path.
    File(PathBuf),
    /// Encoded image bytes.
    Encoded(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    /// 0-based page index in the document.
    pub index: usize,
    pub output: PageOutput,
}

/// Result of [`rasterize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterOutcome {
    /// Every requested page was rendered.
    Complete(Vec<RasterPage>),
    /// The document could not be opened; no pages were produced.
    OpenFailed { error: String },
    /// Page `page` (0-based) failed; `completed` holds the pages rendered before it.
    PageFailed {
        completed: Vec<RasterPage>,
        page: usize,
        error: String,
    },
}

impl RasterOutcome {
    /// Pages produced, whether or not rendering finished.
    pub fn pages(&self) -> &[RasterPage] {
        match self {
            RasterOutcome::Complete(pages) => pages,
            RasterOutcome::OpenFailed { .. } => &[],
            RasterOutcome::PageFailed { completed, .. } => completed,
        }
    }

    pub fn into_pages(self) -> Vec<RasterPage> {
        match self {
            RasterOutcome::Complete(pages) => pages,
            RasterOutcome::OpenFailed { .. } => Vec::new(),
            RasterOutcome::PageFailed { completed, .. } => completed,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RasterOutcome::Complete(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RasterOutcome::Complete(_) => None,
            RasterOutcome::OpenFailed { error } | RasterOutcome::PageFailed { error, .. } => {
                Some(error)
            }
        }
    }
}

/// Bind to a pdfium library.
///
/// Order: the file named by `PDFIUM_LIB_PATH`, then the system library, then
/// a platform-named library in the working directory.
pub fn bind_pdfium() -> Result<Pdfium, DatasetError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        if !path.is_empty() {
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| DatasetError::PdfiumBindingFailed(format!("{path}: {e}")));
        }
    }

    Pdfium::bind_to_system_library()
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        })
        .map(Pdfium::new)
        .map_err(|e| DatasetError::PdfiumBindingFailed(e.to_string()))
}

/// Renderer scale factor for a resolution in DPI.
pub fn render_scale(dpi: u32) -> f32 {
    dpi as f32 / PDF_POINTS_PER_INCH
}

/// File name of the image for 0-based page `index`: `01.png`, `02.png`, …
pub fn page_file_name(index: usize) -> String {
    format!("{:02}.png", index + 1)
}

/// Render pages of `source` at `dpi`.
///
/// `pages` lists 0-based page indices in the order to render; `None` renders
/// every page. Indices past the end of the document fail like any other page.
pub fn rasterize<'lib>(
    pdfium: &'lib Pdfium,
    source: PdfSource<'_, 'lib>,
    target: RasterTarget<'_>,
    dpi: u32,
    pages: Option<&[usize]>,
) -> RasterOutcome {
    let opened: PdfDocument<'lib>;
    let document = match source {
        PdfSource::Path(path) => match pdfium.load_pdf_from_file(path, None) {
            Ok(doc) => {
                opened = doc;
                &opened
            }
            Err(e) => return open_failed(format!("{}: {:?}", path.display(), e)),
        },
        PdfSource::Bytes(bytes) => match pdfium.load_pdf_from_byte_vec(bytes.to_vec(), None) {
            Ok(doc) => {
                opened = doc;
                &opened
            }
            Err(e) => return open_failed(format!("in-memory PDF: {:?}", e)),
        },
        PdfSource::Document(doc) => doc,
    };

    let page_count = document.pages().len() as usize;
    let indices: Vec<usize> = match pages {
        Some(p) => p.to_vec(),
        None => (0..page_count).collect(),
    };

    let render_config = PdfRenderConfig::new().scale_page_by_factor(render_scale(dpi));
    let mut completed = Vec::with_capacity(indices.len());

    for idx in indices {
        match render_page(document, idx, page_count, &render_config, target) {
            Ok(output) => completed.push(RasterPage { index: idx, output }),
            Err(e) => {
                error!("Rasterisation failed on page {}: {}", idx + 1, e);
                return RasterOutcome::PageFailed {
                    completed,
                    page: idx,
                    error: e,
                };
            }
        }
    }

    RasterOutcome::Complete(completed)
}

fn open_failed(error: String) -> RasterOutcome {
    error!("Failed to open PDF {}", error);
    RasterOutcome::OpenFailed { error }
}

fn render_page(
    document: &PdfDocument<'_>,
    index: usize,
    page_count: usize,
    render_config: &PdfRenderConfig,
    target: RasterTarget<'_>,
) -> Result<PageOutput, String> {
    if index >= page_count {
        return Err(format!(
            "page {} out of range (document has {} pages)",
            index + 1,
            page_count
        ));
    }

    let page = document
        .pages()
        .get(index as u16)
        .map_err(|e| format!("{:?}", e))?;
    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| format!("{:?}", e))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        index + 1,
        image.width(),
        image.height()
    );

    match target {
        RasterTarget::Memory => {
            let mut buf = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Bmp)
                .map_err(|e| format!("BMP encoding failed: {e}"))?;
            Ok(PageOutput::Encoded(buf))
        }
        RasterTarget::Directory(dir) => {
            let path = dir.join(page_file_name(index));
            image
                .save_with_format(&path, ImageFormat::Png)
                .map_err(|e| format!("writing {}: {e}", path.display()))?;
            Ok(PageOutput::File(path))
        }
    }
}

/// Image folder for `pdf`: `<images>/<stem>`.
pub fn image_dir_for(pdf: &Path, images_dir: &Path) -> PathBuf {
    images_dir.join(input::stem_of(pdf))
}

/// Rasterise every PDF in `config.pdfs_dir` into `config.images_dir/<stem>/`.
///
/// A PDF whose image folder already exists is skipped, whatever the folder
/// contains. The folder is created before rendering, so a PDF that fails is
/// not retried by the next run either.
pub async fn pdf_to_png(config: &DatasetConfig) -> Result<StageReport, DatasetError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || pdf_to_png_blocking(&config))
        .await
        .map_err(|e| DatasetError::Internal(format!("Render task panicked: {}", e)))?
}

fn pdf_to_png_blocking(config: &DatasetConfig) -> Result<StageReport, DatasetError> {
    let pdfs = input::files_with_extension(&config.pdfs_dir, "pdf")?;
    input::ensure_dir(&config.images_dir)?;

    let needs_render = pdfs
        .iter()
        .any(|pdf| !image_dir_for(pdf, &config.images_dir).exists());
    let pdfium = if needs_render {
        Some(bind_pdfium()?)
    } else {
        None
    };

    let mut run = StageRun::begin(config, Stage::PdfToPng, pdfs.len());
    for (i, pdf) in pdfs.iter().enumerate() {
        let name = input::name_of(pdf);
        let out_dir = image_dir_for(pdf, &config.images_dir);

        let Some(pdfium) = pdfium.as_ref().filter(|_| !out_dir.exists()) else {
            run.skip(i, &name);
            continue;
        };

        run.item_start(i, &name);
        if let Err(e) = std::fs::create_dir_all(&out_dir) {
            run.fail(
                i,
                &name,
                ItemError::Render {
                    file: pdf.clone(),
                    detail: format!("creating {}: {e}", out_dir.display()),
                },
            );
            continue;
        }

        match rasterize_into(pdfium, pdf, &out_dir, config) {
            Ok(written) => {
                info!("Rasterised {} → {} page(s)", name, written);
                run.succeed(i, &name);
            }
            Err(detail) => run.fail(
                i,
                &name,
                ItemError::Render {
                    file: pdf.clone(),
                    detail,
                },
            ),
        }
    }

    Ok(run.finish())
}

/// Open `pdf`, apply the configured page selection and write its pages.
fn rasterize_into(
    pdfium: &Pdfium,
    pdf: &Path,
    out_dir: &Path,
    config: &DatasetConfig,
) -> Result<usize, String> {
    let document = pdfium.load_pdf_from_file(pdf, None).map_err(|e| {
        let msg = format!("{:?}", e);
        error!("Failed to open PDF {}: {}", pdf.display(), msg);
        msg
    })?;

    let page_count = document.pages().len() as usize;
    if page_count > MAX_SORTABLE_PAGES {
        warn!(
            "{} has {} pages; image names past {:02}.png will not sort in page order",
            pdf.display(),
            page_count,
            MAX_SORTABLE_PAGES
        );
    }

    let indices = config.pages.to_indices(page_count);
    let outcome = rasterize(
        pdfium,
        PdfSource::Document(&document),
        RasterTarget::Directory(out_dir),
        config.dpi,
        Some(&indices),
    );

    match outcome {
        RasterOutcome::Complete(pages) => Ok(pages.len()),
        RasterOutcome::OpenFailed { error } => Err(error),
        RasterOutcome::PageFailed {
            completed,
            page,
            error,
        } => Err(format!(
            "page {}: {} ({} page(s) written before the failure)",
            page + 1,
            error,
            completed.len()
        )),
    }
}

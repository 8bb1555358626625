//! DOCX → Markdown via pandoc.
//!
//! Two layouts:
//!
//! * whole-document (default): `<markdown>/<stem>.mmd`
//! * page-split: the document is first cut into one `.docx` per page
//!   ([`crate::pipeline::split`]), then each page becomes
//!   `<markdown>/<stem>/<stem>_NN.mmd`.
//!
//! Page numbers are zero-padded to two digits like the page images, so a
//! lexicographic listing of either tree is in page order up to page 99.

use crate::config::{DatasetConfig, Stage};
use crate::error::{DatasetError, ItemError};
use crate::output::StageReport;
use crate::pipeline::input;
use crate::pipeline::split;
use crate::pipeline::stage::StageRun;
use crate::pipeline::tool::convert_file;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of generated markdown files.
pub const MARKDOWN_EXTENSION: &str = "mmd";

/// Convert every source document in `config.docxs_dir` to markdown in
/// `config.markdown_dir`, splitting into pages first when
/// `config.split_pages` is set.
pub async fn docx_to_markdown(config: &DatasetConfig) -> Result<StageReport, DatasetError> {
    let sources = input::source_documents(config)?;
    input::ensure_dir(&config.markdown_dir)?;

    let mut run = StageRun::begin(config, Stage::DocxToMarkdown, sources.len());
    for (i, docx) in sources.iter().enumerate() {
        let name = input::name_of(docx);
        run.item_start(i, &name);

        let failures = if config.split_pages {
            convert_pages(config, docx).await
        } else {
            let target = config
                .markdown_dir
                .join(format!("{}.{MARKDOWN_EXTENSION}", input::stem_of(docx)));
            convert_one(config, docx, &target).await.err().into_iter().collect()
        };

        if failures.is_empty() {
            run.succeed(i, &name);
        } else {
            for failure in failures {
                run.fail(i, &name, failure);
            }
        }
    }

    Ok(run.finish())
}

/// `-f docx -t markdown_mmd --markdown-headings=atx <docx> -o <target>`
pub fn pandoc_args(docx: &Path, target: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        "docx".into(),
        "-t".into(),
        "markdown_mmd".into(),
        "--markdown-headings=atx".into(),
        docx.as_os_str().to_owned(),
        "-o".into(),
        target.as_os_str().to_owned(),
    ]
}

/// Markdown path of page `page` (1-based) of the document `stem`.
pub fn page_markdown_path(markdown_dir: &Path, stem: &str, page: usize) -> PathBuf {
    markdown_dir
        .join(stem)
        .join(format!("{stem}_{page:02}.{MARKDOWN_EXTENSION}"))
}

async fn convert_one(config: &DatasetConfig, docx: &Path, target: &Path) -> Result<(), ItemError> {
    convert_file(
        &config.markdown_program,
        pandoc_args(docx, target),
        docx,
        target,
    )
    .await
}

/// Split `docx` into pages and convert each one. Returns every failure.
async fn convert_pages(config: &DatasetConfig, docx: &Path) -> Vec<ItemError> {
    let stem = input::stem_of(docx);
    let split_dir = config.splits_dir.join(&stem);
    let keep_trailing = config.keep_trailing_page;

    let src = docx.to_path_buf();
    let pages = match tokio::task::spawn_blocking(move || {
        split::split_docx(&src, &split_dir, keep_trailing)
    })
    .await
    {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            return vec![ItemError::Split {
                file: docx.to_path_buf(),
                detail: e.to_string(),
            }]
        }
        Err(e) => {
            return vec![ItemError::Split {
                file: docx.to_path_buf(),
                detail: format!("split task panicked: {e}"),
            }]
        }
    };

    if pages.is_empty() {
        debug!("{} has no page-break markers; nothing to convert", docx.display());
        return Vec::new();
    }

    let out_dir = config.markdown_dir.join(&stem);
    if let Err(e) = input::ensure_dir(&out_dir) {
        return vec![ItemError::Split {
            file: docx.to_path_buf(),
            detail: e.to_string(),
        }];
    }

    let mut failures = Vec::new();
    for (k, page) in pages.iter().enumerate() {
        let target = page_markdown_path(&config.markdown_dir, &stem, k + 1);
        if let Err(e) = convert_one(config, page, &target).await {
            failures.push(e);
        }
    }
    failures
}

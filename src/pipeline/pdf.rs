//! DOCX → PDF via a headless office suite.
//!
//! LibreOffice lays documents out the way a word processor does, which is
//! what the page images must show. Each document is converted with
//! `--convert-to pdf --outdir <pdfs>`; the office suite names the output
//! `<stem>.pdf` itself.

use crate::config::{DatasetConfig, Stage};
use crate::error::DatasetError;
use crate::output::StageReport;
use crate::pipeline::input;
use crate::pipeline::stage::StageRun;
use crate::pipeline::tool::convert_file;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Convert every source document in `config.docxs_dir` to a PDF in
/// `config.pdfs_dir`.
///
/// # Errors
/// Only for fatal conditions (input directory unreadable, output directory
/// not creatable). Per-document converter failures are collected in the
/// returned report.
pub async fn docx_to_pdf(config: &DatasetConfig) -> Result<StageReport, DatasetError> {
    let sources = input::source_documents(config)?;
    input::ensure_dir(&config.pdfs_dir)?;

    let mut run = StageRun::begin(config, Stage::DocxToPdf, sources.len());
    for (i, docx) in sources.iter().enumerate() {
        let name = input::name_of(docx);
        run.item_start(i, &name);

        let expected = pdf_path_for(docx, &config.pdfs_dir);
        let args = office_args(docx, &config.pdfs_dir);
        match convert_file(&config.office_program, args, docx, &expected).await {
            Ok(()) => run.succeed(i, &name),
            Err(e) => run.fail(i, &name, e),
        }
    }

    Ok(run.finish())
}

/// `--headless --convert-to pdf <docx> --outdir <outdir>`
pub fn office_args(docx: &Path, outdir: &Path) -> Vec<OsString> {
    vec![
        "--headless".into(),
        "--convert-to".into(),
        "pdf".into(),
        docx.as_os_str().to_owned(),
        "--outdir".into(),
        outdir.as_os_str().to_owned(),
    ]
}

/// Where the office suite puts the PDF for `docx`.
pub fn pdf_path_for(docx: &Path, outdir: &Path) -> PathBuf {
    outdir.join(format!("{}.pdf", input::stem_of(docx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ItemError;
    use crate::pipeline::tool::ToolOutcome;

    #[test]
    fn office_args_layout() {
        let args = office_args(Path::new("docs/a b.docx"), Path::new("out/pdfs"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--headless",
                "--convert-to",
                "pdf",
                "docs/a b.docx",
                "--outdir",
                "out/pdfs"
            ]
        );
    }

    #[test]
    fn pdf_keeps_the_stem() {
        assert_eq!(
            pdf_path_for(Path::new("docxs/report.v2.docx"), Path::new("pdfs")),
            PathBuf::from("pdfs/report.v2.pdf")
        );
    }

    #[tokio::test]
    async fn missing_office_suite_is_reported_per_document() {
        let root = tempfile::tempdir().unwrap();
        let config = DatasetConfig::builder()
            .root(root.path())
            .office_program("docx2dataset-no-such-office")
            .build()
            .unwrap();
        std::fs::create_dir_all(&config.docxs_dir).unwrap();
        std::fs::write(config.docxs_dir.join("a.docx"), b"x").unwrap();
        std::fs::write(config.docxs_dir.join("b.docx"), b"x").unwrap();
        std::fs::write(config.docxs_dir.join("notes.txt"), b"x").unwrap();

        let report = docx_to_pdf(&config).await.unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed(), 2);
        assert!(config.pdfs_dir.is_dir());
        assert!(matches!(
            &report.failures[0],
            ItemError::Tool {
                outcome: ToolOutcome::NotFound { .. },
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_without_output_is_missing_output() {
        let root = tempfile::tempdir().unwrap();
        let config = DatasetConfig::builder()
            .root(root.path())
            .office_program("true")
            .build()
            .unwrap();
        std::fs::create_dir_all(&config.docxs_dir).unwrap();
        std::fs::write(config.docxs_dir.join("a.docx"), b"x").unwrap();

        let report = docx_to_pdf(&config).await.unwrap();
        assert_eq!(report.failed(), 1);
        assert!(matches!(&report.failures[0], ItemError::MissingOutput { .. }));
    }
}

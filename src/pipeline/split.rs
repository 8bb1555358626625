//! Split one DOCX into one DOCX per page.
//!
//! A `.docx` has no pages, only a paragraph stream. Word records where its
//! last layout broke pages with `<w:lastRenderedPageBreak/>`, and a paragraph
//! holding that marker closes the page it belongs to. Hard breaks
//! (`<w:br w:type="page"/>`) are not markers: Word also writes a rendered
//! break after each of them, so counting both would split a page twice.
//!
//! Only paragraph text survives the split: run formatting, images and tables
//! are dropped. The per-page documents exist to give the markup converter
//! page-sized input, not to be faithful copies.

use crate::error::DatasetError;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DOCUMENT_PART: &str = "word/document.xml";

/// One top-level body paragraph of a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParagraph {
    pub text: String,
    pub page_break: bool,
}

/// Split `docx_path` into `outpath/1.docx`, `outpath/2.docx`, …
///
/// Paragraphs accumulate into the open page; a paragraph carrying a page
/// break marker is added and then closes the page. Paragraphs after the last
/// marker are only saved when `keep_trailing_page` is set, so by default the
/// number of pages written never exceeds the number of markers.
///
/// Returns the written paths in page order. `outpath` is created if missing.
pub fn split_docx(
    docx_path: &Path,
    outpath: &Path,
    keep_trailing_page: bool,
) -> Result<Vec<PathBuf>, DatasetError> {
    let paragraphs = read_paragraphs(docx_path)?;
    let pages = paginate(&paragraphs, keep_trailing_page);

    if !keep_trailing_page {
        let dropped = trailing_paragraphs(&paragraphs);
        if dropped > 0 {
            warn!(
                "{}: {} paragraph(s) after the last page break were not saved",
                docx_path.display(),
                dropped
            );
        }
    }

    std::fs::create_dir_all(outpath).map_err(|source| DatasetError::OutputWriteFailed {
        path: outpath.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let path = outpath.join(format!("{}.docx", i + 1));
        write_page(page, &path)?;
        debug!("Wrote page {} ({} paragraphs) → {}", i + 1, page.len(), path.display());
        written.push(path);
    }

    info!(
        "Split {} into {} page(s) from {} paragraph(s)",
        docx_path.display(),
        written.len(),
        paragraphs.len()
    );
    Ok(written)
}

/// Group paragraph texts into pages closed by page-break markers.
pub fn paginate(paragraphs: &[SourceParagraph], keep_trailing_page: bool) -> Vec<Vec<String>> {
    let mut pages = Vec::new();
    let mut current = Vec::new();

    for p in paragraphs {
        current.push(p.text.clone());
        if p.page_break {
            pages.push(std::mem::take(&mut current));
        }
    }

    if keep_trailing_page && !current.is_empty() {
        pages.push(current);
    }
    pages
}

fn trailing_paragraphs(paragraphs: &[SourceParagraph]) -> usize {
    paragraphs.iter().rev().take_while(|p| !p.page_break).count()
}

/// Read the top-level body paragraphs of a `.docx` package.
pub fn read_paragraphs(docx_path: &Path) -> Result<Vec<SourceParagraph>, DatasetError> {
    let invalid = |detail: String| DatasetError::InvalidDocx {
        path: docx_path.to_path_buf(),
        detail,
    };

    let file = std::fs::File::open(docx_path).map_err(|e| invalid(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| invalid(format!("{DOCUMENT_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| invalid(format!("{DOCUMENT_PART}: {e}")))?;

    parse_document_xml(&xml).map_err(|e| invalid(format!("{DOCUMENT_PART}: {e}")))
}

/// Paragraph state while its events are being read.
#[derive(Default)]
struct OpenParagraph {
    para: SourceParagraph,
    /// Paragraphs nested inside this one (text boxes); their content is ignored.
    nested: usize,
    in_text: bool,
    in_props: usize,
}

impl OpenParagraph {
    fn collecting(&self) -> bool {
        self.nested == 0
    }

    fn marker(&mut self, e: &BytesStart<'_>) {
        if !self.collecting() {
            return;
        }
        match e.local_name().as_ref() {
            b"lastRenderedPageBreak" => self.para.page_break = true,
            b"br" if !is_hard_page_break(e) => self.para.text.push('\n'),
            b"cr" => self.para.text.push('\n'),
            b"tab" if self.in_props == 0 => self.para.text.push('\t'),
            _ => {}
        }
    }
}

fn is_hard_page_break(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.local_name().as_ref() == b"type" && a.value.as_ref() == b"page")
}

/// Parse `word/document.xml` into its top-level body paragraphs.
///
/// Text comes from `w:t` runs, `w:tab` becomes `\t` and text-wrapping
/// `w:br`/`w:cr` become `\n`. Page-type `w:br` contributes nothing. Paragraphs
/// inside tables or text boxes are not body paragraphs and are skipped.
pub fn parse_document_xml(xml: &str) -> Result<Vec<SourceParagraph>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();

    let mut depth = 0usize;
    let mut body_children: Option<usize> = None;
    let mut open: Option<OpenParagraph> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"body" if body_children.is_none() => body_children = Some(depth + 1),
                    b"p" => match open.as_mut() {
                        Some(p) => p.nested += 1,
                        None if body_children == Some(depth) => {
                            open = Some(OpenParagraph::default())
                        }
                        None => {}
                    },
                    b"t" => {
                        if let Some(p) = open.as_mut() {
                            p.in_text = p.collecting();
                        }
                    }
                    b"pPr" => {
                        if let Some(p) = open.as_mut() {
                            p.in_props += 1;
                        }
                    }
                    _ => {
                        if let Some(p) = open.as_mut() {
                            p.marker(&e);
                        }
                    }
                }
                depth += 1;
            }
            Event::Empty(e) => {
                let name = e.local_name();
                match (name.as_ref(), open.as_mut()) {
                    (b"p", None) if body_children == Some(depth) => {
                        paragraphs.push(SourceParagraph::default())
                    }
                    (_, Some(p)) => p.marker(&e),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some(p) = open.as_mut() {
                    if p.in_text {
                        p.para.text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::CData(t) => {
                if let Some(p) = open.as_mut() {
                    if p.in_text {
                        p.para.text.push_str(&String::from_utf8_lossy(&t));
                    }
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = e.local_name();
                match name.as_ref() {
                    b"p" => {
                        if let Some(p) = open.as_mut() {
                            if p.nested > 0 {
                                p.nested -= 1;
                            } else if let Some(done) = open.take() {
                                paragraphs.push(done.para);
                            }
                        }
                    }
                    b"t" => {
                        if let Some(p) = open.as_mut() {
                            p.in_text = false;
                        }
                    }
                    b"pPr" => {
                        if let Some(p) = open.as_mut() {
                            p.in_props = p.in_props.saturating_sub(1);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Write one page's paragraphs as a plain `.docx`.
fn write_page(paragraphs: &[String], path: &Path) -> Result<(), DatasetError> {
    let file = std::fs::File::create(path).map_err(|source| DatasetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let doc = paragraphs
        .iter()
        .fold(Docx::new(), |doc, text| doc.add_paragraph(text_paragraph(text)));

    doc.build().pack(file).map_err(|e| DatasetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })
}

/// Plain paragraph whose tabs and line breaks survive as `w:tab` / `w:br`.
fn text_paragraph(text: &str) -> Paragraph {
    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (j, segment) in line.split('\t').enumerate() {
            if j > 0 {
                run = run.add_tab();
            }
            if !segment.is_empty() {
                run = run.add_text(segment);
            }
        }
    }
    Paragraph::new().add_run(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        )
    }

    fn para(text: &str) -> SourceParagraph {
        SourceParagraph {
            text: text.into(),
            page_break: false,
        }
    }

    fn breaking(text: &str) -> SourceParagraph {
        SourceParagraph {
            text: text.into(),
            page_break: true,
        }
    }

    /// Writes a minimal DOCX package holding only `word/document.xml`.
    fn write_docx(path: &Path, body: &str) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(document(body).as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn parses_text_tabs_and_breaks() {
        let xml = document(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
                 <w:r><w:t xml:space="preserve">Name:</w:t><w:tab/><w:t>Ada &amp; co</w:t></w:r>
                 <w:r><w:br/><w:t>line two</w:t></w:r></w:p>
               <w:p/>
               <w:p><w:r><w:lastRenderedPageBreak/><w:t>after break</w:t></w:r></w:p>
               <w:p><w:r><w:br w:type="page"/></w:r></w:p>"#,
        );
        let paras = parse_document_xml(&xml).unwrap();
        assert_eq!(
            paras,
            vec![
                para("Name:\tAda & co\nline two"),
                para(""),
                breaking("after break"),
                para(""),
            ]
        );
    }

    #[test]
    fn hard_break_followed_by_rendered_break_splits_once() {
        let xml = document(
            r#"<w:p><w:r><w:t>a</w:t><w:br w:type="page"/></w:r></w:p>
               <w:p><w:r><w:lastRenderedPageBreak/><w:t>b</w:t></w:r></w:p>
               <w:p><w:r><w:lastRenderedPageBreak/><w:t>c</w:t></w:r></w:p>"#,
        );
        let paras = parse_document_xml(&xml).unwrap();
        assert_eq!(paras, vec![para("a"), breaking("b"), breaking("c")]);
        assert_eq!(paginate(&paras, false), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn table_and_textbox_paragraphs_are_not_body_paragraphs() {
        let xml = document(
            r#"<w:p><w:r><w:t>intro</w:t></w:r></w:p>
               <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t><w:br w:type="page"/></w:r></w:p></w:tc></w:tr></w:tbl>
               <w:p><w:r><w:t>with box</w:t><w:drawing><w:txbxContent><w:p><w:r><w:t>boxed</w:t><w:lastRenderedPageBreak/></w:r></w:p></w:txbxContent></w:drawing></w:r></w:p>"#,
        );
        let paras = parse_document_xml(&xml).unwrap();
        assert_eq!(paras, vec![para("intro"), para("with box")]);
    }

    #[test]
    fn hyperlink_runs_contribute_text() {
        let xml = document(
            r#"<w:p><w:r><w:t xml:space="preserve">see </w:t></w:r><w:hyperlink><w:r><w:t>here</w:t></w:r></w:hyperlink></w:p>"#,
        );
        assert_eq!(parse_document_xml(&xml).unwrap(), vec![para("see here")]);
    }

    #[test]
    fn trailing_page_is_dropped_by_default() {
        let paras = vec![
            para("a"),
            breaking("b"),
            para("c"),
            breaking("d"),
            para("tail"),
        ];
        let pages = paginate(&paras, false);
        assert_eq!(pages, vec![vec!["a", "b"], vec!["c", "d"]]);
        assert_eq!(trailing_paragraphs(&paras), 1);
    }

    #[test]
    fn trailing_page_kept_on_request() {
        let paras = vec![para("a"), breaking("b"), para("tail")];
        let pages = paginate(&paras, true);
        assert_eq!(pages, vec![vec!["a", "b"], vec!["tail"]]);
    }

    #[test]
    fn document_without_markers_produces_no_pages() {
        let paras = vec![para("a"), para("b")];
        assert!(paginate(&paras, false).is_empty());
        assert_eq!(paginate(&paras, true), vec![vec!["a", "b"]]);
    }

    #[test]
    fn saved_pages_never_exceed_markers() {
        let paras = vec![breaking("x"), para("y"), breaking("z"), para("w"), para("v")];
        let markers = paras.iter().filter(|p| p.page_break).count();
        assert!(paginate(&paras, false).len() <= markers);
        assert_eq!(paginate(&paras, true).len(), markers + 1);
    }

    #[test]
    fn split_writes_numbered_pages_that_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("report.docx");
        write_docx(
            &src,
            r#"<w:p><w:r><w:t>Title</w:t></w:r></w:p>
               <w:p><w:r><w:t>one</w:t><w:tab/><w:t>end</w:t><w:lastRenderedPageBreak/></w:r></w:p>
               <w:p><w:r><w:t>two</w:t><w:lastRenderedPageBreak/></w:r></w:p>
               <w:p><w:r><w:t>lost tail</w:t></w:r></w:p>"#,
        );

        let out = dir.path().join("pages");
        let written = split_docx(&src, &out, false).unwrap();
        assert_eq!(written, vec![out.join("1.docx"), out.join("2.docx")]);

        let first = read_paragraphs(&written[0]).unwrap();
        let texts: Vec<&str> = first.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Title", "one\tend"]);
        assert!(first.iter().all(|p| !p.page_break));

        let second = read_paragraphs(&written[1]).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].text, "two");
    }

    #[test]
    fn split_keeps_trailing_page_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("memo.docx");
        write_docx(
            &src,
            r#"<w:p><w:r><w:t>a</w:t><w:lastRenderedPageBreak/></w:r></w:p><w:p><w:r><w:t>tail</w:t></w:r></w:p>"#,
        );
        let out = dir.path().join("pages");
        let written = split_docx(&src, &out, true).unwrap();
        assert_eq!(written.len(), 2);
        let tail = read_paragraphs(&written[1]).unwrap();
        assert_eq!(tail, vec![para("tail")]);
    }

    #[test]
    fn non_zip_input_is_invalid_docx() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fake.docx");
        std::fs::write(&src, b"plain text, not a zip").unwrap();
        let err = split_docx(&src, &dir.path().join("out"), false).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidDocx { .. }));
    }
}

//! Manifest builder: zip the image tree and the markdown tree into JSONL.
//!
//! Both trees are paired purely by position. The n-th entry of the sorted
//! image listing goes with the n-th entry of the sorted markdown listing,
//! and inside each pair the n-th image goes with the n-th markdown file.
//! Whichever side is shorter decides how many pairs exist. Nothing checks
//! that the names agree.
//!
//! ```text
//! images/report/01.png  ─┐
//!                        ├─ {"image":"images/report/01.png","markdown":"…","meta":"[]"}
//! markdown/report/report_01.mmd ─┘
//! ```

use crate::config::{DatasetConfig, Stage};
use crate::error::DatasetError;
use crate::output::{ManifestRecord, ManifestStats, StageReport};
use crate::pipeline::input;
use crate::pipeline::stage::StageRun;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One top-level entry of a tree: a document folder or a lone file.
#[derive(Debug)]
struct Group {
    /// Path prefix below the tree root (`"report/"` for a folder, `""` for a file).
    prefix: String,
    /// Folder or file name, used in log lines and mismatch errors.
    label: String,
    /// Items in pairing order.
    items: Vec<PathBuf>,
}

impl Group {
    fn load(entry: &Path) -> Result<Self, DatasetError> {
        let label = input::name_of(entry);
        if entry.is_dir() {
            Ok(Self {
                prefix: format!("{label}/"),
                items: input::sorted_entries(entry)?,
                label,
            })
        } else {
            Ok(Self {
                prefix: String::new(),
                items: vec![entry.to_path_buf()],
                label,
            })
        }
    }
}

/// Records of one document pair, markdown already read.
#[derive(Debug)]
struct DocumentRecords {
    label: String,
    records: Vec<ManifestRecord>,
}

#[derive(Debug, Default)]
struct Plan {
    documents: Vec<DocumentRecords>,
    stats: ManifestStats,
}

/// Build `config.manifest_path` from `config.images_dir` and
/// `config.markdown_dir`.
///
/// The manifest is recreated on every call. Every markdown file is read and
/// every strict-pairing check is made before the manifest is touched, and
/// the new file replaces the old one only once it is complete.
pub fn build_manifest(config: &DatasetConfig) -> Result<ManifestStats, DatasetError> {
    let plan = plan(config)?;
    let records = write_manifest(config, &plan, |_, _| {})?;
    Ok(ManifestStats {
        records,
        ..plan.stats
    })
}

/// [`build_manifest`] with stage bookkeeping, one item per document pair.
pub(crate) fn manifest_stage(config: &DatasetConfig) -> Result<StageReport, DatasetError> {
    let plan = plan(config)?;
    let mut run = StageRun::begin(config, Stage::Manifest, plan.documents.len());
    let records = write_manifest(config, &plan, |i, name| {
        run.item_start(i, name);
        run.succeed(i, name);
    })?;
    run.set_manifest(ManifestStats {
        records,
        ..plan.stats
    });
    Ok(run.finish())
}

/// `images_dir` as written into records, without trailing separators.
///
/// The filesystem root trims to `""`, so its records still read `/<folder>/<file>`.
fn images_root(images_dir: &Path) -> String {
    images_dir
        .display()
        .to_string()
        .trim_end_matches(['/', std::path::MAIN_SEPARATOR])
        .to_string()
}

fn plan(config: &DatasetConfig) -> Result<Plan, DatasetError> {
    let image_entries = input::sorted_entries(&config.images_dir)?;
    let markdown_entries = input::sorted_entries(&config.markdown_dir)?;

    let mut plan = Plan::default();
    check_counts(
        config,
        &config.images_dir.display().to_string(),
        image_entries.len(),
        markdown_entries.len(),
    )?;
    plan.stats.dropped_images += image_entries.len().saturating_sub(markdown_entries.len());
    plan.stats.dropped_markdown += markdown_entries.len().saturating_sub(image_entries.len());

    let root = images_root(&config.images_dir);
    for (image_entry, markdown_entry) in image_entries.iter().zip(&markdown_entries) {
        let images = Group::load(image_entry)?;
        let markdown = Group::load(markdown_entry)?;
        let (ni, nm) = (images.items.len(), markdown.items.len());

        check_counts(config, &images.label, ni, nm)?;
        if ni != nm {
            warn!(
                "{} has {} image(s) but {} has {} markdown file(s); pairing the first {}",
                image_entry.display(),
                ni,
                markdown_entry.display(),
                nm,
                ni.min(nm)
            );
        }
        plan.stats.dropped_images += ni.saturating_sub(nm);
        plan.stats.dropped_markdown += nm.saturating_sub(ni);

        let records = images
            .items
            .iter()
            .zip(&markdown.items)
            .map(|(image, md)| {
                let text = std::fs::read_to_string(md).map_err(|source| {
                    DatasetError::MarkdownRead {
                        path: md.clone(),
                        source,
                    }
                })?;
                Ok(ManifestRecord::new(
                    format!("{}/{}{}", root, images.prefix, input::name_of(image)),
                    text.trim(),
                ))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        debug!("Paired {} ↔ {}", images.label, markdown.label);
        plan.documents.push(DocumentRecords {
            label: images.label,
            records,
        });
    }

    if image_entries.len() != markdown_entries.len() {
        warn!(
            "{} image entries vs {} markdown entries; the extra entries are ignored",
            image_entries.len(),
            markdown_entries.len()
        );
    }

    plan.stats.documents = plan.documents.len();
    Ok(plan)
}

fn check_counts(
    config: &DatasetConfig,
    scope: &str,
    images: usize,
    markdown: usize,
) -> Result<(), DatasetError> {
    if config.strict_pairing && images != markdown {
        return Err(DatasetError::PairingMismatch {
            scope: scope.to_string(),
            images,
            markdown,
        });
    }
    Ok(())
}

/// Write all records to a sibling temp file, then rename it over the manifest.
fn write_manifest(
    config: &DatasetConfig,
    plan: &Plan,
    mut on_document: impl FnMut(usize, &str),
) -> Result<usize, DatasetError> {
    let path = &config.manifest_path;
    let write_err = |source: std::io::Error| DatasetError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        input::ensure_dir(parent)?;
    }
    let tmp_path = path.with_extension("jsonl.tmp");
    let mut out = BufWriter::new(File::create(&tmp_path).map_err(write_err)?);

    let mut written = 0usize;
    for (i, doc) in plan.documents.iter().enumerate() {
        for record in &doc.records {
            serde_json::to_writer(&mut out, record).map_err(|e| write_err(e.into()))?;
            out.write_all(b"\n").map_err(write_err)?;
            written += 1;
        }
        on_document(i, doc.label.as_str());
    }
    out.flush().map_err(write_err)?;
    drop(out);

    std::fs::rename(&tmp_path, path).map_err(write_err)?;
    info!("Wrote {} record(s) to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout(root: &Path) -> DatasetConfig {
        let config = DatasetConfig::builder().root(root).build().unwrap();
        fs::create_dir_all(&config.images_dir).unwrap();
        fs::create_dir_all(&config.markdown_dir).unwrap();
        config
    }

    fn add_document(config: &DatasetConfig, name: &str, images: usize, pages: &[&str]) {
        let img_dir = config.images_dir.join(name);
        let md_dir = config.markdown_dir.join(name);
        fs::create_dir_all(&img_dir).unwrap();
        fs::create_dir_all(&md_dir).unwrap();
        for i in 0..images {
            fs::write(img_dir.join(format!("{:02}.png", i + 1)), b"png").unwrap();
        }
        for (i, text) in pages.iter().enumerate() {
            fs::write(md_dir.join(format!("{name}_{:02}.mmd", i + 1)), text).unwrap();
        }
    }

    fn lines(config: &DatasetConfig) -> Vec<ManifestRecord> {
        fs::read_to_string(&config.manifest_path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn equal_counts_pair_every_page() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "doc", 3, &["one", "two", "three"]);

        let stats = build_manifest(&config).unwrap();
        assert_eq!(stats.records, 3);

        let records = lines(&config);
        assert_eq!(records.len(), 3);
        let images_root = config.images_dir.display().to_string();
        assert_eq!(records[0].image, format!("{images_root}/doc/01.png"));
        assert_eq!(records[2].image, format!("{images_root}/doc/03.png"));
        assert_eq!(records[1].markdown, "two");
        assert!(records.iter().all(|r| r.meta == "[]"));
    }

    #[test]
    fn shorter_side_truncates_pairing() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "doc", 2, &["a", "b", "c"]);

        let stats = build_manifest(&config).unwrap();
        assert_eq!(lines(&config).len(), 2);
        assert_eq!(stats.dropped_markdown, 1);
        assert_eq!(stats.dropped_images, 0);
    }

    #[test]
    fn rerun_overwrites_instead_of_appending() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "a", 2, &["x", "y"]);

        build_manifest(&config).unwrap();
        build_manifest(&config).unwrap();
        assert_eq!(lines(&config).len(), 2);
    }

    #[test]
    fn markdown_is_trimmed_and_unicode_kept_literal() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "doc", 1, &["\n\n  # Résumé 日本語  \n\n"]);

        build_manifest(&config).unwrap();
        let raw = fs::read_to_string(&config.manifest_path).unwrap();
        assert!(raw.contains("# Résumé 日本語\""));
        assert!(!raw.contains("\\u"));
        assert_eq!(raw.lines().count(), 1);
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn documents_zip_by_sorted_position() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "a", 1, &["first"]);
        add_document(&config, "b", 1, &["second"]);
        // Unpaired extra image folder sorts last and is ignored.
        fs::create_dir_all(config.images_dir.join("c")).unwrap();
        fs::write(config.images_dir.join("c").join("01.png"), b"png").unwrap();

        let stats = build_manifest(&config).unwrap();
        let records = lines(&config);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].markdown, "first");
        assert_eq!(records[1].markdown, "second");
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.dropped_images, 1);
    }

    #[test]
    fn plain_file_entries_are_single_items() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        fs::write(config.images_dir.join("cover.png"), b"png").unwrap();
        fs::write(config.markdown_dir.join("cover.mmd"), "Cover page").unwrap();

        build_manifest(&config).unwrap();
        let records = lines(&config);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].image,
            format!("{}/cover.png", config.images_dir.display())
        );
        assert_eq!(records[0].markdown, "Cover page");
    }

    #[test]
    fn strict_mode_rejects_mismatch_before_writing() {
        let root = tempfile::tempdir().unwrap();
        let mut config = layout(root.path());
        config.strict_pairing = true;
        add_document(&config, "doc", 2, &["a", "b", "c"]);

        let err = build_manifest(&config).unwrap_err();
        match err {
            DatasetError::PairingMismatch {
                scope,
                images,
                markdown,
            } => {
                assert_eq!(scope, "doc");
                assert_eq!((images, markdown), (2, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!config.manifest_path.exists());
    }

    #[test]
    fn unreadable_markdown_leaves_no_manifest() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "a", 1, &["fine"]);
        add_document(&config, "b", 1, &["placeholder"]);
        let bad = config.markdown_dir.join("b").join("b_01.mmd");
        fs::write(&bad, [0x66, 0x6f, 0xff, 0xfe]).unwrap();

        match build_manifest(&config).unwrap_err() {
            DatasetError::MarkdownRead { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!config.manifest_path.exists());
        assert!(!config.manifest_path.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn unreadable_markdown_keeps_previous_manifest() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "a", 1, &["fine"]);
        build_manifest(&config).unwrap();
        let before = fs::read_to_string(&config.manifest_path).unwrap();

        add_document(&config, "b", 1, &["placeholder"]);
        fs::write(config.markdown_dir.join("b").join("b_01.mmd"), [0xc3, 0x28]).unwrap();

        assert!(build_manifest(&config).is_err());
        assert_eq!(fs::read_to_string(&config.manifest_path).unwrap(), before);
    }

    #[test]
    fn trailing_slash_on_images_dir_is_dropped() {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("imgs");
        let config = DatasetConfig::builder()
            .root(root.path())
            .images_dir(format!("{}/", images.display()))
            .build()
            .unwrap();
        fs::create_dir_all(&config.images_dir).unwrap();
        fs::create_dir_all(&config.markdown_dir).unwrap();
        add_document(&config, "doc", 1, &["x"]);

        build_manifest(&config).unwrap();
        let records = lines(&config);
        assert_eq!(
            records[0].image,
            format!("{}/doc/01.png", images.display())
        );
        assert!(!records[0].image.contains("//"));
    }

    #[test]
    fn images_root_trims_separators() {
        assert_eq!(images_root(Path::new("imgs/")), "imgs");
        assert_eq!(images_root(Path::new("imgs//")), "imgs");
        assert_eq!(images_root(Path::new("../documents/images")), "../documents/images");
        assert_eq!(images_root(Path::new("/")), "");
    }

    #[test]
    fn strict_mode_accepts_matching_trees() {
        let root = tempfile::tempdir().unwrap();
        let mut config = layout(root.path());
        config.strict_pairing = true;
        add_document(&config, "doc", 2, &["a", "b"]);

        assert_eq!(build_manifest(&config).unwrap().records, 2);
    }

    #[test]
    fn missing_images_dir_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let config = DatasetConfig::builder().root(root.path()).build().unwrap();
        fs::create_dir_all(&config.markdown_dir).unwrap();

        assert!(matches!(
            build_manifest(&config),
            Err(DatasetError::DirectoryRead { .. })
        ));
    }

    #[test]
    fn stage_report_carries_manifest_stats() {
        let root = tempfile::tempdir().unwrap();
        let config = layout(root.path());
        add_document(&config, "a", 2, &["x", "y"]);
        add_document(&config, "b", 1, &["z"]);

        let report = manifest_stage(&config).unwrap();
        assert_eq!(report.stage, Stage::Manifest);
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 2);
        let stats = report.manifest.unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(stats.documents, 2);
    }
}

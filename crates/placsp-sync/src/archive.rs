//! Monthly archive staging
//!
//! Published archives are ZIP files holding one or more `.atom` pages. Only the
//! feed pages are staged, flattened into a single directory under their own
//! file names so `next` links between them resolve as siblings.

use crate::error::AccumulateError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const FEED_EXTENSION: &str = "atom";

/// Outcome of staging a batch of archives
#[derive(Debug, Default)]
pub struct StagingReport {
    pub archives: usize,
    pub extracted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub fn is_feed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FEED_EXTENSION))
}

pub fn is_archive_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Last path segment of an archive entry; directory components are dropped
fn entry_file_name(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
}

/// Extract every feed page of `archive` into `staging`, overwriting same-named files
pub fn extract_feed_entries(archive: &Path, staging: &Path) -> Result<Vec<PathBuf>, AccumulateError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| AccumulateError::Io { path, source }
    };
    let zip_err = |reason: zip::result::ZipError| AccumulateError::Archive {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    };

    std::fs::create_dir_all(staging).map_err(io_err(staging))?;
    let file = File::open(archive).map_err(io_err(archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(zip_err)?;

    let mut extracted = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(zip_err)?;
        if entry.is_dir() {
            continue;
        }

        let Some(name) = entry_file_name(entry.name()).map(str::to_string) else {
            continue;
        };
        if !is_feed_file(&name) {
            continue;
        }

        let target = staging.join(&name);
        let mut out = File::create(&target).map_err(io_err(&target))?;
        let bytes = io::copy(&mut entry, &mut out).map_err(io_err(&target))?;
        debug!(entry = %name, bytes, "Extracted feed page");
        extracted.push(target);
    }

    if extracted.is_empty() {
        warn!(archive = %archive.display(), "Archive holds no feed pages");
    }

    Ok(extracted)
}

/// Stage every archive in order; a broken archive is logged and skipped
pub fn stage_archives(archives: &[PathBuf], staging: &Path) -> StagingReport {
    let mut report = StagingReport::default();

    for (index, archive) in archives.iter().enumerate() {
        report.archives += 1;
        info!(
            archive = %archive.display(),
            current = index + 1,
            total = archives.len(),
            "Staging archive"
        );

        match extract_feed_entries(archive, staging) {
            Ok(mut pages) => report.extracted.append(&mut pages),
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "Failed to stage archive");
                report.failed.push((archive.clone(), e.to_string()));
            },
        }
    }

    if !report.failed.is_empty() {
        warn!(
            failed = report.failed.len(),
            total = report.archives,
            "Some archives could not be staged"
        );
    }

    report
}

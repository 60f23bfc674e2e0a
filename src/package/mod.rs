//! SCORM 2004 package writer.
//!
//! ## Staging discipline
//!
//! A package is assembled in a fresh temporary directory created *inside*
//! the output directory, zipped there, and the finished archive is renamed
//! into place. The staging directory is a [`tempfile::TempDir`], so it is
//! removed on every exit path (success, `?` early return or panic) and a
//! failed conversion never leaves a half-written archive behind.
//!
//! ## Archive layout
//!
//! ```text
//! imsmanifest.xml
//! SCORM_API_wrapper.js
//! page_1.html … page_N.html      N = pages across all sections
//! images/<name>                  first-reference order, once per file name
//! ```

pub mod archive;
pub mod html;
pub mod manifest;

use crate::config::PackageOptions;
use crate::error::{AssetError, ConvertError};
use crate::lecture::Lecture;
use crate::IMAGES_DIR;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the manifest at the archive root.
pub const MANIFEST_FILE: &str = "imsmanifest.xml";
/// Name of the runtime shim every page loads.
pub const SHIM_FILE: &str = "SCORM_API_wrapper.js";
/// The runtime shim, shipped verbatim in every package.
pub const SHIM_SOURCE: &str = include_str!("../../assets/SCORM_API_wrapper.js");

const MAX_ARCHIVE_STEM_CHARS: usize = 100;

/// File name of the n-th page (1-based).
pub fn page_file_name(n: usize) -> String {
    format!("page_{n}.html")
}

/// `<title>_SCORM_2004.zip` with path separators and other characters that
/// are unsafe in file names replaced by `_`.
pub fn archive_file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_control() || c.is_whitespace() || "/\\:*?\"<>|".contains(c) {
                '_'
            } else {
                c
            }
        })
        .take(MAX_ARCHIVE_STEM_CHARS)
        .collect();
    let stem = stem.trim_matches(['.', '_']);
    let stem = if stem.is_empty() {
        crate::lecture::DEFAULT_LECTURE_TITLE
    } else {
        stem
    };
    format!("{stem}_SCORM_2004.zip")
}

/// What [`write_package`] produced.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    /// Final location of the archive.
    pub archive_path: PathBuf,
    /// Number of SCO pages.
    pub pages: usize,
    /// Packaged image members, in archive order.
    pub images: Vec<String>,
    /// Images referenced by the lecture that could not be packaged.
    pub diagnostics: Vec<AssetError>,
}

/// Serialise `lecture` into a SCORM 2004 archive in `output_dir`.
///
/// Image blocks are resolved by file name inside `assets_dir/images/`; any
/// other directory part of their path is ignored, so nothing outside the
/// asset directory is ever packaged. Missing images are left out of the
/// pages and the manifest and reported in [`PackageReport::diagnostics`].
///
/// # Errors
///
/// Any I/O or zip failure. The staging directory is removed either way.
pub fn write_package(
    lecture: &Lecture,
    assets_dir: &Path,
    output_dir: &Path,
    options: &PackageOptions,
) -> Result<PackageReport, ConvertError> {
    let options = options.sanitized();
    info!("Writing package for '{}'", lecture.title);

    std::fs::create_dir_all(output_dir).map_err(|e| ConvertError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    let staging = tempfile::Builder::new()
        .prefix(".pdf2scorm-")
        .tempdir_in(output_dir)
        .map_err(|e| ConvertError::StagingFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
    let root = staging.path();
    debug!("Staging in {}", root.display());

    // ── Assets ───────────────────────────────────────────────────────────
    let images_dir = root.join(IMAGES_DIR);
    std::fs::create_dir_all(&images_dir).map_err(|e| ConvertError::StagingFailed {
        path: images_dir.clone(),
        source: e,
    })?;

    let mut packaged: Vec<String> = Vec::new();
    let mut copied_names: HashSet<String> = HashSet::new();
    let mut failed: HashSet<String> = HashSet::new();
    let mut diagnostics = Vec::new();

    for path in lecture.image_paths() {
        if failed.contains(path) {
            continue;
        }
        let Some(name) = Path::new(path).file_name().and_then(|n| n.to_str()) else {
            failed.insert(path.to_string());
            diagnostics.push(AssetError::NotFound {
                path: path.to_string(),
            });
            continue;
        };
        if copied_names.contains(name) {
            continue;
        }

        let source = assets_dir.join(IMAGES_DIR).join(name);
        if !source.is_file() {
            warn!("Image not found, leaving it out: {}", source.display());
            failed.insert(path.to_string());
            diagnostics.push(AssetError::NotFound {
                path: source.display().to_string(),
            });
            continue;
        }
        let target = images_dir.join(name);
        if let Err(e) = std::fs::copy(&source, &target) {
            warn!("Failed to copy {}: {}", source.display(), e);
            failed.insert(path.to_string());
            diagnostics.push(AssetError::Copy {
                path: source.display().to_string(),
                detail: e.to_string(),
            });
            continue;
        }
        copied_names.insert(name.to_string());
        packaged.push(format!("{IMAGES_DIR}/{name}"));
    }
    let available: HashSet<&str> = packaged.iter().map(String::as_str).collect();
    debug!(
        "Packaged {} images, {} unavailable",
        packaged.len(),
        failed.len()
    );

    // ── Pages ────────────────────────────────────────────────────────────
    let total = lecture.page_count();
    let mut members = vec![MANIFEST_FILE.to_string(), SHIM_FILE.to_string()];
    let mut page_images: Vec<Vec<String>> = Vec::with_capacity(total);

    for (i, page) in lecture.pages().enumerate() {
        let number = i + 1;
        let document = html::render_page(
            page,
            html::PagePosition { number, total },
            &lecture.title,
            &lecture.language,
            &options,
            &available,
        );
        let name = page_file_name(number);
        write_member(root, &name, document.as_bytes())?;
        members.push(name);

        let mut images: Vec<String> = Vec::new();
        for img in page.blocks.iter().filter_map(|b| b.as_image()) {
            let member = canonical_member(&img.path);
            if available.contains(member.as_str()) && !images.contains(&member) {
                images.push(member);
            }
        }
        page_images.push(images);
    }

    // ── Shim & manifest ──────────────────────────────────────────────────
    write_member(root, SHIM_FILE, SHIM_SOURCE.as_bytes())?;
    let manifest = manifest::build_manifest(lecture, &page_images, &options);
    write_member(root, MANIFEST_FILE, manifest.to_document().as_bytes())?;
    members.extend(packaged.iter().cloned());

    // ── Archive ──────────────────────────────────────────────────────────
    let file_name = archive_file_name(&lecture.title);
    let staged_archive = root.join(&file_name);
    archive::write_archive(root, &members, &staged_archive)?;

    let archive_path = output_dir.join(&file_name);
    std::fs::rename(&staged_archive, &archive_path).map_err(|e| {
        ConvertError::OutputWriteFailed {
            path: archive_path.clone(),
            source: e,
        }
    })?;

    if let Err(e) = staging.close() {
        warn!("Could not remove staging directory: {}", e);
    }

    info!(
        "Package written: {} ({} pages, {} images)",
        archive_path.display(),
        total,
        packaged.len()
    );
    Ok(PackageReport {
        archive_path,
        pages: total,
        images: packaged,
        diagnostics,
    })
}

/// `images/<file name>` for an image block path.
pub(crate) fn canonical_member(path: &str) -> String {
    match Path::new(path).file_name().and_then(|n| n.to_str()) {
        Some(name) => format!("{IMAGES_DIR}/{name}"),
        None => path.to_string(),
    }
}

fn write_member(root: &Path, name: &str, data: &[u8]) -> Result<(), ConvertError> {
    let path = root.join(name);
    std::fs::write(&path, data).map_err(|e| ConvertError::OutputWriteFailed { path, source: e })
}

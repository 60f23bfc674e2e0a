//! Image-source normalisation: one rewrite pass before reconstruction.
//!
//! Extractors and library callers hand over images in whatever form they
//! have: encoded bytes, `data:` URIs, absolute paths, paths relative to some
//! image folder, or (from browser front-ends) `blob:` URLs. This pass turns
//! every one of them into a canonical package-relative `images/<name>`
//! reference backed by a file in the conversion's asset directory, so the
//! rest of the pipeline only ever sees one shape.
//!
//! | Source | Result |
//! |--------|--------|
//! | `images/<file name>` | unchanged |
//! | `blob:…` | dropped, [`AssetError::BlobReference`] |
//! | `data:image/<fmt>;base64,…` | decoded → `img_<uuid>.<ext>` |
//! | bytes | written → `img_<uuid>.<ext>` |
//! | absolute file path | copied → `img_<uuid>.<ext>` |
//! | any other path (nested `images/…` included) | `images/<file name>` |
//!
//! Failures never abort the conversion: the fragment is dropped and an
//! [`AssetError`] recorded.

use crate::error::AssetError;
use crate::fragment::{Fragment, FragmentKind, ImageSource};
use crate::IMAGES_DIR;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

static DATA_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^data:image/(\w+);base64,(.+)$").unwrap());

/// Fragments after normalisation plus what had to be dropped.
#[derive(Debug, Default)]
pub struct Normalized {
    pub fragments: Vec<Fragment>,
    pub diagnostics: Vec<AssetError>,
}

/// Rewrite every image fragment to an `images/<name>` reference, storing
/// resolved bytes under `<assets_dir>/images/`.
///
/// Text fragments pass through untouched and the relative order of all
/// surviving fragments is preserved.
pub fn normalize_fragments(fragments: Vec<Fragment>, assets_dir: &Path) -> Normalized {
    let images_dir = assets_dir.join(IMAGES_DIR);
    let mut out = Normalized::default();

    for mut fragment in fragments {
        let FragmentKind::Image { source } = &fragment.kind else {
            out.fragments.push(fragment);
            continue;
        };

        match normalize_source(source, &images_dir) {
            Ok(path) => {
                fragment.kind = FragmentKind::Image {
                    source: ImageSource::Reference(path),
                };
                out.fragments.push(fragment);
            }
            Err(e) => {
                warn!("Page {}: skipping image: {}", fragment.page, e);
                out.diagnostics.push(e);
            }
        }
    }

    debug!(
        "Normalised image sources: {} fragments kept, {} dropped",
        out.fragments.len(),
        out.diagnostics.len()
    );
    out
}

/// Resolve one image source to its canonical `images/<name>` path.
pub fn normalize_source(source: &ImageSource, images_dir: &Path) -> Result<String, AssetError> {
    match source {
        ImageSource::Bytes { data, extension } => {
            let ext = sanitize_extension(extension).unwrap_or("png");
            store(data, ext, images_dir)
        }
        ImageSource::Reference(reference) => {
            let reference = reference.trim();
            if let Some(canonical) = source.canonical() {
                return Ok(canonical.trim().to_string());
            }
            if reference.starts_with("blob:") {
                return Err(AssetError::BlobReference {
                    reference: reference.to_string(),
                });
            }
            if reference.starts_with("data:") {
                let (ext, data) = decode_data_uri(reference)?;
                return store(&data, ext, images_dir);
            }

            let path = Path::new(reference);
            if path.is_absolute() {
                if !path.is_file() {
                    return Err(AssetError::NotFound {
                        path: reference.to_string(),
                    });
                }
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(sanitize_extension)
                    .unwrap_or("png");
                let data = std::fs::read(path).map_err(|e| AssetError::Copy {
                    path: reference.to_string(),
                    detail: e.to_string(),
                })?;
                return store(&data, ext, images_dir);
            }

            package_path(source)
        }
    }
}

/// Canonical package path for an image source without touching the disk.
///
/// Used where bytes can no longer be written (after normalisation); a
/// non-canonical relative path is reduced to its file name.
pub fn package_path(source: &ImageSource) -> Result<String, AssetError> {
    match source {
        ImageSource::Reference(r) => {
            if let Some(canonical) = source.canonical() {
                return Ok(canonical.to_string());
            }
            if r.starts_with("blob:") {
                return Err(AssetError::BlobReference {
                    reference: r.clone(),
                });
            }
            if r.starts_with("data:") {
                return Err(AssetError::MalformedDataUri {
                    prefix: r.chars().take(30).collect(),
                });
            }
            let name = Path::new(r.trim())
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AssetError::NotFound { path: r.clone() })?;
            Ok(format!("{IMAGES_DIR}/{name}"))
        }
        ImageSource::Bytes { .. } => Err(AssetError::Decode {
            detail: "image bytes were never written to the asset directory".into(),
        }),
    }
}

/// Split a `data:image/<fmt>;base64,<payload>` URI into extension and bytes.
fn decode_data_uri(uri: &str) -> Result<(&'static str, Vec<u8>), AssetError> {
    let caps = DATA_URI
        .captures(uri)
        .ok_or_else(|| AssetError::MalformedDataUri {
            prefix: uri.chars().take(30).collect(),
        })?;
    let ext = extension_for_format(&caps[1]);
    let payload: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
    let data = STANDARD.decode(payload).map_err(|e| AssetError::Decode {
        detail: e.to_string(),
    })?;
    Ok((ext, data))
}

/// File extension for an image format name from a MIME subtype.
pub fn extension_for_format(format: &str) -> &'static str {
    match format.to_ascii_lowercase().as_str() {
        "png" => "png",
        "jpeg" | "jpg" => "jpg",
        "gif" => "gif",
        "webp" => "webp",
        _ => "png",
    }
}

fn sanitize_extension(ext: &str) -> Option<&str> {
    let ext = ext.trim_start_matches('.');
    (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

fn store(data: &[u8], ext: &str, images_dir: &Path) -> Result<String, AssetError> {
    let name = format!("img_{}.{}", Uuid::new_v4(), ext);
    let target = images_dir.join(&name);
    std::fs::create_dir_all(images_dir)
        .and_then(|_| std::fs::write(&target, data))
        .map_err(|e| AssetError::Copy {
            path: target.display().to_string(),
            detail: e.to_string(),
        })?;
    debug!("Stored image {} ({} bytes)", name, data.len());
    Ok(format!("{IMAGES_DIR}/{name}"))
}

//! Zip assembly for the staged package.

use crate::error::ConvertError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip `members` (paths relative to `staging`, `/`-separated) into `archive`
/// in the given order.
pub fn write_archive(staging: &Path, members: &[String], archive: &Path) -> Result<(), ConvertError> {
    let file = File::create(archive).map_err(|e| ConvertError::OutputWriteFailed {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for member in members {
        let source = staging.join(member);
        let data = std::fs::read(&source).map_err(|e| ConvertError::OutputWriteFailed {
            path: source.clone(),
            source: e,
        })?;
        zip.start_file(member.as_str(), options)?;
        zip.write_all(&data).map_err(|e| ConvertError::OutputWriteFailed {
            path: archive.to_path_buf(),
            source: e,
        })?;
        debug!("Archived {} ({} bytes)", member, data.len());
    }

    let mut writer = zip.finish()?;
    writer.flush().map_err(|e| ConvertError::OutputWriteFailed {
        path: archive.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

//! Result types returned by the conversion entry points.

use crate::error::{AssetError, ConvertError, PageError};
use crate::lecture::Lecture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The complete result of a conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Where the SCORM archive was written.
    pub archive_path: PathBuf,
    /// The reconstructed lecture, as packaged.
    pub lecture: Lecture,
    /// Source document metadata (default when fragments came from the caller).
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
    /// Images that were dropped on the way, in the order they were met.
    pub diagnostics: Vec<AssetError>,
    /// Pages whose fallback text could not be read.
    pub page_errors: Vec<PageError>,
}

impl ConversionOutput {
    /// Strict view: fail if any image was dropped.
    ///
    /// The archive stays on disk either way.
    pub fn into_result(self) -> Result<Self, ConvertError> {
        if self.diagnostics.is_empty() {
            Ok(self)
        } else {
            Err(ConvertError::AssetsSkipped {
                skipped: self.diagnostics.len(),
            })
        }
    }
}

/// PDF document metadata, read without extracting content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Counters for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages read by the extractor.
    pub extracted_pages: usize,
    /// Fragments that reached reconstruction.
    pub fragments: usize,
    pub sections: usize,
    /// SCO pages in the package.
    pub lecture_pages: usize,
    pub images_packaged: usize,
    pub images_dropped: usize,
    pub extract_duration_ms: u64,
    pub package_duration_ms: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lecture::LectureMetadata;

    fn output(diagnostics: Vec<AssetError>) -> ConversionOutput {
        ConversionOutput {
            archive_path: PathBuf::from("out/Lecture_SCORM_2004.zip"),
            lecture: Lecture {
                title: "Lecture".into(),
                description: String::new(),
                language: "ru".into(),
                sections: Vec::new(),
                metadata: LectureMetadata::default(),
            },
            metadata: DocumentMetadata::default(),
            stats: ConversionStats::default(),
            diagnostics,
            page_errors: Vec::new(),
        }
    }

    #[test]
    fn strict_result_reports_skipped_images() {
        assert!(output(vec![]).into_result().is_ok());
        let err = output(vec![AssetError::NotFound {
            path: "images/x.png".into(),
        }])
        .into_result()
        .unwrap_err();
        assert!(matches!(err, ConvertError::AssetsSkipped { skipped: 1 }));
    }

    #[test]
    fn output_serialises_to_json() {
        let json = serde_json::to_value(output(vec![])).unwrap();
        assert_eq!(json["lecture"]["title"], "Lecture");
        assert_eq!(json["stats"]["lecture_pages"], 0);
    }
}

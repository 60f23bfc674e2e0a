//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline extracts each PDF page, rebuilds the lecture and
//! writes the package.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, a job record in a database, or a
//! terminal progress bar without the library knowing anything about how the
//! host application communicates.
//!
//! # Example
//!
//! ```rust
//! use pdf2scorm::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     extracted: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_extracted(&self, page_num: usize, total_pages: usize, fragments: usize) {
//!         self.extracted.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} fragments", page_num, total_pages, fragments);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     extracted: AtomicUsize::new(0),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it makes progress.
///
/// Implementations must be `Send + Sync` so a config can be shared across
/// threads. All methods have default no-op implementations so callers only
/// override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is extracted.
    ///
    /// # Arguments
    /// * `total_pages`: number of selected pages that will be extracted
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page's fragments have been extracted.
    ///
    /// # Arguments
    /// * `page_num`:    1-indexed PDF page number
    /// * `total_pages`: total PDF pages in the document
    /// * `fragments`:   text and image fragments the page produced
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, fragments: usize) {
        let _ = (page_num, total_pages, fragments);
    }

    /// Called when a page hit a non-fatal error (rasterisation or fallback
    /// text source). The page still takes part with whatever it produced.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once the document model is rebuilt.
    ///
    /// # Arguments
    /// * `pages`: number of lecture pages (one per level-1 header)
    fn on_lecture_built(&self, pages: usize) {
        let _ = pages;
    }

    /// Called after the archive has been moved into the output directory.
    fn on_conversion_complete(&self, archive: &Path, total_pages: usize) {
        let _ = (archive, total_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        extracted: AtomicUsize,
        fragments: AtomicUsize,
        errors: AtomicUsize,
        lecture_pages: AtomicUsize,
        archive: Mutex<Option<String>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, fragments: usize) {
            self.extracted.fetch_add(1, Ordering::SeqCst);
            self.fragments.fetch_add(fragments, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_lecture_built(&self, pages: usize) {
            self.lecture_pages.store(pages, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, archive: &Path, _total_pages: usize) {
            *self.archive.lock().unwrap() = Some(archive.display().to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_extracted(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_lecture_built(3);
        cb.on_conversion_complete(Path::new("out.zip"), 5);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_conversion_start(3);
        tracker.on_page_extracted(1, 3, 10);
        tracker.on_page_extracted(2, 3, 5);
        tracker.on_page_error(3, 3, "fallback timeout");
        tracker.on_page_extracted(3, 3, 0);
        tracker.on_lecture_built(2);
        tracker.on_conversion_complete(Path::new("/out/Intro_SCORM_2004.zip"), 3);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.extracted.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.fragments.load(Ordering::SeqCst), 15);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.lecture_pages.load(Ordering::SeqCst), 2);
        assert_eq!(
            tracker.archive.lock().unwrap().as_deref(),
            Some("/out/Intro_SCORM_2004.zip")
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ConversionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_page_extracted(1, 10, 512);
    }
}

//! Pipeline stages for PDF-to-SCORM conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on synthetic fragments without a PDF or a pdfium library.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ normalize ──▶ lines ──▶ paragraphs ──▶ headers
//! (path)    (pdfium)    (images/)     (rows)    (blocks)       (levels)
//!                                                                  │
//!                      anchor ◀── sections ◀── metadata ◀──────────┘
//!                      (images)   (pages)      (title, language)
//! ```
//!
//! 1. [`input`]      validate the user-supplied path and PDF magic bytes
//! 2. [`extract`]    fragments from pdfium, with an optional fallback text
//!    source for pages without a text layer
//! 3. [`normalize`]  resolve every image source to `images/<name>`
//! 4. [`lines`] / [`paragraphs`] / [`headers`] / [`metadata`] / [`sections`]
//!    / [`anchor`]   rebuild the document, driven by
//!    [`crate::reconstruct::reconstruct`]
//!
//! [`stats`] holds the small numeric helpers (median, mean) the layout
//! stages share; [`encode`] turns rasters into PNG.

pub mod anchor;
pub mod encode;
pub mod extract;
pub mod headers;
pub mod input;
pub mod lines;
pub mod metadata;
pub mod normalize;
pub mod paragraphs;
pub mod sections;
pub mod stats;

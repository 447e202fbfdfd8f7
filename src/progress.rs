//! Progress-callback trait for per-record generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to follow
//! photo resolution as it happens. The CLI uses this to drive its progress
//! bar; a web front end could forward the events over a socket.
//!
//! # Example
//!
//! ```rust
//! use inventory_pdf::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl GenerationProgressCallback for Counter {
//!     fn on_image_resolved(&self, _record: usize, _total: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline as it processes each record.
///
/// Photos are resolved concurrently, so `on_image_resolved` and
/// `on_image_fallback` may be called from several tasks at once and in any
/// order. All methods default to no-ops.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once after the CSV is decoded.
    fn on_generation_start(&self, total_records: usize) {
        let _ = total_records;
    }

    /// A record's photo slot is settled (image, or "no photo" box).
    ///
    /// `record` is 1-indexed.
    fn on_image_resolved(&self, record: usize, total_records: usize) {
        let _ = (record, total_records);
    }

    /// A record's photo failed and a placeholder was substituted. Called in
    /// addition to `on_image_resolved`.
    fn on_image_fallback(&self, record: usize, total_records: usize, reason: &str) {
        let _ = (record, total_records, reason);
    }

    /// Called once the PDF bytes exist.
    fn on_generation_complete(&self, total_records: usize, pages: usize) {
        let _ = (total_records, pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

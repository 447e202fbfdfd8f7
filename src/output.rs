//! Result types returned by the generation entry points.

use crate::error::ImageWarning;
use crate::pipeline::canvas::Page;
use crate::pipeline::image::ImageOutcome;
use crate::pipeline::layout::BlockPlacement;
use crate::variant::DocumentVariant;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A finished document held in memory.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    /// File name the document should be saved under, e.g. `liste_mobilier.pdf`.
    pub artifact_name: String,
    pub pdf: Vec<u8>,
    /// The page model the PDF was serialised from.
    pub pages: Vec<Page>,
    /// Where each record's block was placed, in record order.
    pub placements: Vec<BlockPlacement>,
    /// Photo problems, in record order.
    pub warnings: Vec<ImageWarning>,
    pub stats: GenerationStats,
}

/// Summary of a document written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub artifact_path: PathBuf,
    /// Where the artifact is served, e.g. `/uploads/liste_mobilier.pdf`.
    pub file_url: String,
    pub warnings: Vec<ImageWarning>,
    pub stats: GenerationStats,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub records: usize,
    pub pages: usize,
    /// Photos drawn as fetched (JPEG/PNG).
    pub images_fetched: usize,
    /// Photos transcoded from WebP.
    pub images_transcoded: usize,
    /// Slots filled with the `no-image.png` asset.
    pub placeholder_assets: usize,
    /// Slots drawn as a captioned box.
    pub placeholder_boxes: usize,
    pub resolve_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl GenerationStats {
    pub(crate) fn count(&mut self, outcome: ImageOutcome) {
        match outcome {
            ImageOutcome::Fetched => self.images_fetched += 1,
            ImageOutcome::Transcoded => self.images_transcoded += 1,
            ImageOutcome::PlaceholderAsset => self.placeholder_assets += 1,
            ImageOutcome::PlaceholderBox => self.placeholder_boxes += 1,
        }
    }

    /// Slots that show a real photo.
    pub fn images_embedded(&self) -> usize {
        self.images_fetched + self.images_transcoded
    }
}

/// Layout preview computed without fetching anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub artifact_name: String,
    pub variant: DocumentVariant,
    pub records: usize,
    pub pages: usize,
    /// Records that carry a photo reference and would trigger a fetch.
    pub photos_referenced: usize,
    pub placements: Vec<BlockPlacement>,
}

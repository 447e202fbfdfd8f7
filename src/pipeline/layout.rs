//! Pagination: where each record block goes.
//!
//! A [`LayoutEngine`] owns the page cursor for one document. Blocks have a
//! fixed height; before placing one the engine checks whether the block,
//! the footer band and the bottom margin still fit below the cursor, and
//! if not moves to the top of a fresh page. A block is therefore never
//! split, and each placement triggers at most one page break.
//!
//! ```text
//!  y ─▶ ┌──────┐  SKU: …                  (+0)
//!       │ img  │  Dénomination: …         (+15)
//!       │ 70pt │  Couleur: …, Matière: …  (+30)
//!       └──────┘  Dimension: …, Poids: …  (+50)
//!                 Stockage: …, Emplac…    (+70)
//!  y + block_height ─▶ next block
//! ```

use crate::pipeline::canvas::{PageGeometry, Rect};
use serde::{Deserialize, Serialize};

/// Number of text lines in a record block.
pub const BLOCK_LINES: usize = 5;

/// Block dimensions, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    pub block_height: f32,
    pub footer_height: f32,
    pub image_size: f32,
    /// Horizontal distance from the image box to the text column.
    pub text_offset_x: f32,
    /// Vertical offset of each text line from the block top.
    pub line_offsets: [f32; BLOCK_LINES],
    pub font_size: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            block_height: 120.0,
            footer_height: 50.0,
            image_size: 70.0,
            text_offset_x: 100.0,
            line_offsets: [0.0, 15.0, 30.0, 50.0, 70.0],
            font_size: 8.0,
        }
    }
}

/// Current drawing position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    /// 0-based page index.
    pub page_index: usize,
    pub y: f32,
}

/// Anchors for one record block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockPlacement {
    pub page_index: usize,
    pub image: Rect,
    /// Top-left anchor of each text line.
    pub lines: [(f32, f32); BLOCK_LINES],
    /// Whether a new page was started for this block.
    pub broke_page: bool,
}

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    geometry: PageGeometry,
    metrics: LayoutMetrics,
    cursor: PageCursor,
}

impl LayoutEngine {
    /// Start on page 0 at `start_y` (just below the variant furniture).
    pub fn new(geometry: PageGeometry, metrics: LayoutMetrics, start_y: f32) -> Self {
        Self {
            geometry,
            metrics,
            cursor: PageCursor {
                page_index: 0,
                y: start_y,
            },
        }
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Whether a block placed at the current cursor would run into the
    /// footer band.
    pub fn needs_break(&self) -> bool {
        self.cursor.y
            + self.metrics.block_height
            + self.metrics.footer_height
            + self.geometry.margin_bottom
            > self.geometry.height
    }

    /// Place the next block and advance the cursor past it.
    pub fn place_block(&mut self) -> BlockPlacement {
        let broke_page = self.needs_break();
        if broke_page {
            self.cursor.page_index += 1;
            self.cursor.y = self.geometry.margin_top;
        }

        let x = self.geometry.margin_left;
        let y = self.cursor.y;
        let text_x = x + self.metrics.text_offset_x;
        let lines = self.metrics.line_offsets.map(|dy| (text_x, y + dy));

        self.cursor.y += self.metrics.block_height;

        BlockPlacement {
            page_index: self.cursor.page_index,
            image: Rect::new(x, y, self.metrics.image_size, self.metrics.image_size),
            lines,
            broke_page,
        }
    }

    /// Pages used so far.
    pub fn page_count(&self) -> usize {
        self.cursor.page_index + 1
    }

    /// Top of the footer band.
    pub fn footer_y(&self) -> f32 {
        self.geometry.height - self.geometry.margin_bottom - self.metrics.footer_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(start_y: f32) -> LayoutEngine {
        LayoutEngine::new(PageGeometry::a4(), LayoutMetrics::default(), start_y)
    }

    fn pages_for(start_y: f32, records: usize) -> usize {
        let mut e = engine(start_y);
        for _ in 0..records {
            e.place_block();
        }
        e.page_count()
    }

    #[test]
    fn form_fits_three_on_first_page() {
        let mut e = engine(370.0);
        let p: Vec<_> = (0..4).map(|_| e.place_block()).collect();
        assert!(p[..3].iter().all(|b| b.page_index == 0 && !b.broke_page));
        assert_eq!(p[3].page_index, 1);
        assert!(p[3].broke_page);
        assert_eq!(p[3].image.y, 50.0);
    }

    #[test]
    fn list_fits_four_on_first_page() {
        assert_eq!(pages_for(200.0, 4), 1);
        assert_eq!(pages_for(200.0, 5), 2);
    }

    #[test]
    fn continuation_pages_fit_five() {
        // list: 4 + 5 + 5
        assert_eq!(pages_for(200.0, 14), 3);
        assert_eq!(pages_for(200.0, 15), 4);
        // form: 3 + 5
        assert_eq!(pages_for(370.0, 8), 2);
        assert_eq!(pages_for(370.0, 9), 3);
    }

    #[test]
    fn no_block_crosses_footer_band() {
        let mut e = engine(200.0);
        let footer_y = e.footer_y();
        for _ in 0..40 {
            let b = e.place_block();
            assert!(b.image.y + 120.0 <= footer_y + 1e-3, "block at {} overlaps footer", b.image.y);
        }
    }

    #[test]
    fn anchors_follow_offsets() {
        let mut e = engine(200.0);
        let b = e.place_block();
        assert_eq!(b.image, Rect::new(50.0, 200.0, 70.0, 70.0));
        assert_eq!(
            b.lines,
            [(150.0, 200.0), (150.0, 215.0), (150.0, 230.0), (150.0, 250.0), (150.0, 270.0)]
        );
        assert_eq!(e.cursor().y, 320.0);
    }

    #[test]
    fn zero_records_is_one_page() {
        assert_eq!(pages_for(370.0, 0), 1);
    }

    #[test]
    fn footer_band_position() {
        assert!((engine(0.0).footer_y() - (841.89 - 100.0)).abs() < 1e-3);
    }
}

//! The drawing surface: an in-memory page model of absolute draw operations.
//!
//! Coordinates follow the top-left origin convention of the layout code
//! (y grows downwards, units are PDF points). [`crate::pipeline::pdf`]
//! flips them when it serialises the model. Recording operations instead of
//! writing PDF directly keeps the draw pass synchronous and single-writer,
//! and lets tests assert on exactly what landed on each page.

use crate::pipeline::image::EmbeddedImage;
use crate::pipeline::metrics::{self, Font, LINE_HEIGHT_EM};
use std::sync::Arc;

/// An axis-aligned rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Horizontal alignment of a text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

/// One primitive drawing operation on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Raster image scaled into `rect`.
    Image { image: Arc<EmbeddedImage>, rect: Rect },
    /// Stroked rectangle outline (1pt line).
    StrokeRect(Rect),
    /// A single line of text whose line box starts at (`x`, `y`).
    Text {
        text: String,
        x: f32,
        y: f32,
        font: Font,
        size: f32,
    },
}

/// One page of the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// All text drawn on this page, one entry per line, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Number of raster images drawn on this page.
    pub fn image_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Image { .. }))
            .count()
    }
}

/// Page sizing shared by the canvas, the layout engine and the PDF writer.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    /// A4 portrait (595.28 × 841.89 pt) with 50 pt margins on every side.
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin_top: 50.0,
            margin_bottom: 50.0,
            margin_left: 50.0,
            margin_right: 50.0,
        }
    }

    /// Width available to text starting at `x` before the right margin.
    pub fn text_width_from(&self, x: f32) -> f32 {
        (self.width - x - self.margin_right).max(0.0)
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Records draw operations page by page.
///
/// Starts with one empty page; [`Canvas::add_page`] appends another and
/// makes it current. Operations always go to the current page.
#[derive(Debug, Clone)]
pub struct Canvas {
    geometry: PageGeometry,
    pages: Vec<Page>,
}

impl Canvas {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::default()],
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 0-based index of the page operations currently go to.
    pub fn current_page(&self) -> usize {
        self.pages.len() - 1
    }

    fn push(&mut self, op: DrawOp) {
        // `pages` is never empty: `new` seeds one page and nothing removes pages.
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn image(&mut self, image: Arc<EmbeddedImage>, rect: Rect) {
        self.push(DrawOp::Image { image, rect });
    }

    pub fn stroke_rect(&mut self, rect: Rect) {
        self.push(DrawOp::StrokeRect(rect));
    }

    /// Draws one unwrapped line of text.
    pub fn text(&mut self, text: impl Into<String>, x: f32, y: f32, font: Font, size: f32) {
        self.push(DrawOp::Text {
            text: text.into(),
            x,
            y,
            font,
            size,
        });
    }

    /// Draws `text` wrapped inside a box `width` points wide, starting at
    /// (`x`, `y`). Returns the y coordinate just below the last line.
    #[allow(clippy::too_many_arguments)]
    pub fn text_box(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        width: f32,
        font: Font,
        size: f32,
        align: Align,
    ) -> f32 {
        let line_height = size * LINE_HEIGHT_EM;
        let mut cursor = y;
        for line in metrics::wrap(text, font, size, width) {
            let line_x = match align {
                Align::Left => x,
                Align::Center => x + ((width - font.measure(&line, size)) / 2.0).max(0.0),
            };
            self.text(line, line_x, cursor, font, size);
            cursor += line_height;
        }
        cursor
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_one_page() {
        let canvas = Canvas::new(PageGeometry::a4());
        assert_eq!(canvas.page_count(), 1);
        assert_eq!(canvas.current_page(), 0);
    }

    #[test]
    fn ops_go_to_current_page() {
        let mut canvas = Canvas::new(PageGeometry::a4());
        canvas.stroke_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        canvas.add_page();
        canvas.text("hello", 50.0, 50.0, Font::Helvetica, 8.0);
        let pages = canvas.into_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].ops.len(), 1);
        assert_eq!(pages[1].texts().collect::<Vec<_>>(), vec!["hello"]);
    }

    #[test]
    fn centred_text_is_offset() {
        let mut canvas = Canvas::new(PageGeometry::a4());
        canvas.text_box("Titre", 50.0, 120.0, 495.28, Font::HelveticaBold, 14.0, Align::Center);
        match &canvas.pages()[0].ops[0] {
            DrawOp::Text { x, .. } => {
                let w = Font::HelveticaBold.measure("Titre", 14.0);
                assert!((x - (50.0 + (495.28 - w) / 2.0)).abs() < 1e-3);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn text_box_advances_per_line() {
        let mut canvas = Canvas::new(PageGeometry::a4());
        let end = canvas.text_box("a\nb\nc", 50.0, 100.0, 400.0, Font::Helvetica, 8.0, Align::Left);
        assert_eq!(canvas.pages()[0].texts().count(), 3);
        assert!((end - (100.0 + 3.0 * 8.0 * LINE_HEIGHT_EM)).abs() < 1e-3);
    }

    #[test]
    fn text_width_from_respects_right_margin() {
        let g = PageGeometry::a4();
        assert!((g.text_width_from(150.0) - (595.28 - 150.0 - 50.0)).abs() < 1e-3);
    }
}

//! The draw pass: records + resolved images → page model.
//!
//! Strictly sequential and synchronous. All network work has already
//! happened; this stage only decides positions (via the
//! [`LayoutEngine`]) and records draw operations on a [`Canvas`].

use crate::config::FooterPolicy;
use crate::labels::date_line;
use crate::pipeline::canvas::{Align, Canvas, Page, PageGeometry, Rect};
use crate::pipeline::image::{EmbeddedImage, ResolvedImage};
use crate::pipeline::layout::{BlockPlacement, LayoutEngine, LayoutMetrics};
use crate::pipeline::metrics::Font;
use crate::pipeline::normalize::{fields, CanonicalRecord};
use crate::variant::DocumentVariant;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

const LOGO_RECT: Rect = Rect {
    x: 50.0,
    y: 20.0,
    width: 150.0,
    height: 75.0,
};
const BRAND_SIZE: f32 = 14.0;
const DATE_X: f32 = 100.0;
const DATE_Y: f32 = 90.0;
const DATE_SIZE: f32 = 10.0;
/// Caption offset inside a placeholder box.
const CAPTION_DY: f32 = 30.0;

/// Everything the draw pass needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct ComposeContext<'a> {
    pub variant: DocumentVariant,
    pub stem: &'a str,
    pub edition_date: NaiveDate,
    pub logo: Option<Arc<EmbeddedImage>>,
    pub brand_name: &'a str,
    pub footer_text: &'a str,
    pub footer_policy: FooterPolicy,
    pub geometry: PageGeometry,
    pub metrics: LayoutMetrics,
}

/// Output of the draw pass.
#[derive(Debug, Clone)]
pub struct Composition {
    pub pages: Vec<Page>,
    pub placements: Vec<BlockPlacement>,
}

/// The five text lines of a record block.
pub fn record_lines(record: &CanonicalRecord) -> [String; 5] {
    let v = |f| record.value(f);
    [
        format!("SKU: {}", v(fields::SKU)),
        format!("Dénomination: {}", v(fields::DENOMINATION)),
        format!("Couleur: {}, Matière: {}", v(fields::COULEUR), v(fields::MATIERE)),
        format!("Dimension: {}, Poids: {}", v(fields::DIMENSION), v(fields::POIDS)),
        format!("Stockage: {}, Emplacement: {}", v(fields::STOCKAGE), v(fields::EMPLACEMENT)),
    ]
}

/// Draw the whole document. `images[i]` belongs to `records[i]`.
pub fn compose(
    ctx: &ComposeContext<'_>,
    records: &[CanonicalRecord],
    images: &[ResolvedImage],
) -> Composition {
    let mut canvas = Canvas::new(ctx.geometry);

    // ── Header ───────────────────────────────────────────────────────────
    match &ctx.logo {
        Some(logo) => canvas.image(Arc::clone(logo), LOGO_RECT),
        None => canvas.text(ctx.brand_name, LOGO_RECT.x, LOGO_RECT.y, Font::Helvetica, BRAND_SIZE),
    }
    canvas.text(
        date_line(ctx.edition_date),
        DATE_X,
        DATE_Y,
        Font::HelveticaBold,
        DATE_SIZE,
    );

    let start_y = (ctx.variant.layout().furniture)(&mut canvas, ctx.stem);

    // ── Records ──────────────────────────────────────────────────────────
    let mut engine = LayoutEngine::new(ctx.geometry, ctx.metrics, start_y);
    let mut placements = Vec::with_capacity(records.len());

    for (record, image) in records.iter().zip(images) {
        let placement = engine.place_block();
        if placement.broke_page {
            if ctx.footer_policy == FooterPolicy::EveryPage {
                draw_footer(&mut canvas, ctx, engine.footer_y());
            }
            canvas.add_page();
        }
        debug!(
            "Record {} → page {} y={:.1}",
            placements.len() + 1,
            placement.page_index + 1,
            placement.image.y
        );

        draw_image(&mut canvas, image, placement.image, ctx.metrics.font_size);
        for (line, (x, y)) in record_lines(record).iter().zip(placement.lines) {
            let width = ctx.geometry.text_width_from(x);
            canvas.text_box(line, x, y, width, Font::Helvetica, ctx.metrics.font_size, Align::Left);
        }
        placements.push(placement);
    }

    // ── Footer ───────────────────────────────────────────────────────────
    draw_footer(&mut canvas, ctx, engine.footer_y());

    Composition {
        pages: canvas.into_pages(),
        placements,
    }
}

fn draw_image(canvas: &mut Canvas, image: &ResolvedImage, rect: Rect, size: f32) {
    match image {
        ResolvedImage::Direct(img)
        | ResolvedImage::Transcoded(img)
        | ResolvedImage::Placeholder(img) => canvas.image(Arc::clone(img), rect),
        ResolvedImage::PlaceholderBox { caption } => {
            canvas.stroke_rect(rect);
            canvas.text_box(
                caption,
                rect.x,
                rect.y + CAPTION_DY,
                rect.width,
                Font::Helvetica,
                size,
                Align::Center,
            );
        }
    }
}

fn draw_footer(canvas: &mut Canvas, ctx: &ComposeContext<'_>, y: f32) {
    if ctx.footer_text.trim().is_empty() {
        return;
    }
    let g = &ctx.geometry;
    let width = g.width - g.margin_left - g.margin_right;
    canvas.text_box(
        ctx.footer_text,
        g.margin_left,
        y,
        width,
        Font::Helvetica,
        ctx.metrics.font_size,
        Align::Left,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{DEFAULT_BRAND_NAME, DEFAULT_FOOTER_TEXT, NO_IMAGE_CAPTION, SENTINEL};
    use crate::pipeline::canvas::DrawOp;
    use crate::pipeline::input::RawRow;
    use crate::pipeline::normalize::normalize_row;

    fn ctx(variant: DocumentVariant, policy: FooterPolicy) -> ComposeContext<'static> {
        ComposeContext {
            variant,
            stem: "mobilier",
            edition_date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            logo: None,
            brand_name: DEFAULT_BRAND_NAME,
            footer_text: DEFAULT_FOOTER_TEXT,
            footer_policy: policy,
            geometry: PageGeometry::a4(),
            metrics: LayoutMetrics::default(),
        }
    }

    fn records(n: usize) -> (Vec<CanonicalRecord>, Vec<ResolvedImage>) {
        let recs = (0..n)
            .map(|i| normalize_row(&RawRow::from_pairs([("SKU", format!("S{i}").as_str())])))
            .collect::<Vec<_>>();
        let imgs = vec![ResolvedImage::PlaceholderBox { caption: NO_IMAGE_CAPTION }; n];
        (recs, imgs)
    }

    fn footer_count(pages: &[Page]) -> usize {
        pages
            .iter()
            .flat_map(|p| p.texts())
            .filter(|t| t.starts_with("FDD LUMA/ARLES"))
            .count()
    }

    #[test]
    fn record_lines_use_sentinel_for_missing_fields() {
        let rec = normalize_row(&RawRow::from_pairs([("SKU", "A1"), ("Couleur", "Bleu")]));
        let lines = record_lines(&rec);
        assert_eq!(lines[0], "SKU: A1");
        assert_eq!(lines[1], format!("Dénomination: {SENTINEL}"));
        assert_eq!(lines[2], format!("Couleur: Bleu, Matière: {SENTINEL}"));
    }

    #[test]
    fn header_uses_brand_text_without_logo() {
        let (recs, imgs) = records(0);
        let c = compose(&ctx(DocumentVariant::List, FooterPolicy::LastPage), &recs, &imgs);
        let texts: Vec<_> = c.pages[0].texts().collect();
        assert_eq!(texts[0], DEFAULT_BRAND_NAME);
        assert_eq!(texts[1], "Date : 07/03/2024");
        assert_eq!(c.pages[0].image_count(), 0);
    }

    #[test]
    fn header_uses_logo_when_present() {
        let png = {
            use image::{DynamicImage, ImageFormat, RgbImage};
            let mut buf = Vec::new();
            DynamicImage::ImageRgb8(RgbImage::new(2, 2))
                .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
                .unwrap();
            buf
        };
        let logo = Arc::new(
            EmbeddedImage::from_bytes(png, crate::pipeline::image::EmbedFormat::Png).unwrap(),
        );
        let mut c = ctx(DocumentVariant::Form, FooterPolicy::LastPage);
        c.logo = Some(logo);
        let out = compose(&c, &[], &[]);
        assert_eq!(out.pages[0].image_count(), 1);
        assert!(!out.pages[0].texts().any(|t| t == DEFAULT_BRAND_NAME));
    }

    #[test]
    fn footer_once_on_last_page_by_default() {
        let (recs, imgs) = records(12);
        let c = compose(&ctx(DocumentVariant::List, FooterPolicy::LastPage), &recs, &imgs);
        assert_eq!(c.pages.len(), 3);
        assert_eq!(footer_count(&c.pages), 1);
        assert_eq!(footer_count(&c.pages[2..]), 1);
    }

    #[test]
    fn footer_on_every_page_when_asked() {
        let (recs, imgs) = records(12);
        let c = compose(&ctx(DocumentVariant::List, FooterPolicy::EveryPage), &recs, &imgs);
        assert_eq!(c.pages.len(), 3);
        for page in &c.pages {
            assert_eq!(footer_count(std::slice::from_ref(page)), 1);
        }
    }

    #[test]
    fn placeholder_box_is_stroked_and_captioned() {
        let (recs, imgs) = records(1);
        let c = compose(&ctx(DocumentVariant::List, FooterPolicy::LastPage), &recs, &imgs);
        let page = &c.pages[0];
        assert!(page
            .ops
            .iter()
            .any(|op| *op == DrawOp::StrokeRect(Rect::new(50.0, 200.0, 70.0, 70.0))));
        assert!(page.texts().any(|t| t == NO_IMAGE_CAPTION));
    }

    #[test]
    fn records_land_on_their_placement_page() {
        let (recs, imgs) = records(4);
        let c = compose(&ctx(DocumentVariant::Form, FooterPolicy::LastPage), &recs, &imgs);
        assert_eq!(c.pages.len(), 2);
        assert!(c.pages[0].texts().any(|t| t == "SKU: S2"));
        assert!(c.pages[1].texts().any(|t| t == "SKU: S3"));
        assert_eq!(c.placements[3].page_index, 1);
    }

    #[test]
    fn long_values_wrap_within_page() {
        let long = "très ".repeat(80);
        let rec = normalize_row(&RawRow::from_pairs([("Dénomination", long.as_str())]));
        let imgs = vec![ResolvedImage::PlaceholderBox { caption: NO_IMAGE_CAPTION }];
        let c = compose(&ctx(DocumentVariant::List, FooterPolicy::LastPage), &[rec], &imgs);
        let g = PageGeometry::a4();
        for op in &c.pages[0].ops {
            if let DrawOp::Text { text, x, font, size, .. } = op {
                assert!(x + font.measure(text, *size) <= g.width - g.margin_right + 1e-3, "{text}");
            }
        }
    }
}

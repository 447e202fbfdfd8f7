//! Page model → PDF bytes.
//!
//! Uses the two standard Type1 fonts (no embedding) with WinAnsi encoding
//! so French accents render. JPEGs are passed through as `DCTDecode`
//! streams, except CMYK ones, which are converted to RGB; PNGs are
//! decoded to 8-bit RGB plus an optional alpha soft mask and
//! Flate-compressed. An image shared by several records (the
//! placeholder asset, typically) is written once.
//!
//! The page model uses a top-left origin; PDF user space is bottom-left,
//! so every y is flipped here and nowhere else.

use crate::error::GenerateError;
use crate::pipeline::canvas::{DrawOp, Page, PageGeometry};
use crate::pipeline::image::{EmbedFormat, EmbeddedImage};
use crate::pipeline::metrics::{to_win_ansi, Font};
use image::{ExtendedColorType, ImageDecoder};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

const COMPRESSION_LEVEL: u8 = 6;

fn font_resource(font: Font) -> Name<'static> {
    match font {
        Font::Helvetica => Name(b"F1"),
        Font::HelveticaBold => Name(b"F2"),
    }
}

/// Sequential object id allocator.
struct RefAlloc(i32);

impl RefAlloc {
    fn next(&mut self) -> Ref {
        self.0 += 1;
        Ref::new(self.0)
    }
}

/// Serialise `pages` into a complete PDF document.
pub fn write_pdf(pages: &[Page], geometry: &PageGeometry, title: &str) -> Result<Vec<u8>, GenerateError> {
    let mut pdf = Pdf::new();
    let mut alloc = RefAlloc(0);

    let catalog_ref = alloc.next();
    let tree_ref = alloc.next();
    let info_ref = alloc.next();
    let regular_ref = alloc.next();
    let bold_ref = alloc.next();

    pdf.catalog(catalog_ref).pages(tree_ref);
    pdf.document_info(info_ref)
        .title(TextStr(title))
        .producer(TextStr(concat!("inventory-pdf ", env!("CARGO_PKG_VERSION"))));
    for (font_ref, font) in [(regular_ref, Font::Helvetica), (bold_ref, Font::HelveticaBold)] {
        pdf.type1_font(font_ref)
            .base_font(Name(font.base_name().as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    // ── Images: one XObject per distinct image ───────────────────────────
    let mut xobjects: HashMap<*const EmbeddedImage, (String, Ref)> = HashMap::new();
    for page in pages {
        for op in &page.ops {
            if let DrawOp::Image { image, .. } = op {
                let key = Arc::as_ptr(image);
                if xobjects.contains_key(&key) {
                    continue;
                }
                let name = format!("Im{}", xobjects.len() + 1);
                let xobj_ref = embed_image(&mut pdf, &mut alloc, image)?;
                xobjects.insert(key, (name, xobj_ref));
            }
        }
    }
    debug!("Embedded {} distinct image(s)", xobjects.len());

    // ── Pages ────────────────────────────────────────────────────────────
    let page_refs: Vec<Ref> = pages.iter().map(|_| alloc.next()).collect();
    pdf.pages(tree_ref)
        .kids(page_refs.iter().copied())
        .count(pages.len() as i32);

    for (page, page_ref) in pages.iter().zip(&page_refs) {
        let content_ref = alloc.next();
        let raw = page_content(page, geometry, &xobjects);
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), COMPRESSION_LEVEL);
        pdf.stream(content_ref, &compressed).filter(Filter::FlateDecode);

        let mut used: Vec<&(String, Ref)> = Vec::new();
        for op in &page.ops {
            if let DrawOp::Image { image, .. } = op {
                if let Some(entry) = xobjects.get(&Arc::as_ptr(image)) {
                    if !used.iter().any(|(n, _)| *n == entry.0) {
                        used.push(entry);
                    }
                }
            }
        }

        let mut pdf_page = pdf.page(*page_ref);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, geometry.width, geometry.height))
            .parent(tree_ref)
            .contents(content_ref);
        let mut resources = pdf_page.resources();
        resources
            .fonts()
            .pair(font_resource(Font::Helvetica), regular_ref)
            .pair(font_resource(Font::HelveticaBold), bold_ref);
        if !used.is_empty() {
            let mut xobj_dict = resources.x_objects();
            for (name, xobj_ref) in used {
                xobj_dict.pair(Name(name.as_bytes()), *xobj_ref);
            }
            xobj_dict.finish();
        }
        resources.finish();
        pdf_page.finish();
    }

    Ok(pdf.finish())
}

fn page_content(
    page: &Page,
    geometry: &PageGeometry,
    xobjects: &HashMap<*const EmbeddedImage, (String, Ref)>,
) -> Vec<u8> {
    let h = geometry.height;
    let mut content = Content::new();
    content.set_line_width(1.0);

    for op in &page.ops {
        match op {
            DrawOp::Image { image, rect } => {
                let Some((name, _)) = xobjects.get(&Arc::as_ptr(image)) else {
                    continue;
                };
                content.save_state();
                content.transform([rect.width, 0.0, 0.0, rect.height, rect.x, h - rect.y - rect.height]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
            DrawOp::StrokeRect(rect) => {
                content.rect(rect.x, h - rect.y - rect.height, rect.width, rect.height);
                content.stroke();
            }
            DrawOp::Text { text, x, y, font, size } => {
                let encoded = to_win_ansi(text);
                content.begin_text();
                content.set_font(font_resource(*font), *size);
                content.next_line(*x, h - (y + font.ascent() * size));
                content.show(Str(&encoded));
                content.end_text();
            }
        }
    }

    content.finish()
}

fn render_error(e: image::ImageError) -> GenerateError {
    GenerateError::RenderFailed {
        detail: format!("image embedding failed: {e}"),
    }
}

fn embed_image(pdf: &mut Pdf, alloc: &mut RefAlloc, img: &EmbeddedImage) -> Result<Ref, GenerateError> {
    let xobj_ref = alloc.next();
    match img.format {
        EmbedFormat::Jpeg => {
            let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(&img.data)).map_err(render_error)?;
            if decoder.original_color_type() == ExtendedColorType::Cmyk8 {
                // Adobe CMYK JPEGs are often stored inverted; let the decoder
                // convert to RGB rather than guessing the /Decode array.
                let rgb = image::DynamicImage::from_decoder(decoder)
                    .map_err(render_error)?
                    .to_rgb8();
                let (w, h) = rgb.dimensions();
                debug!("Converting CMYK JPEG ({}x{}) to RGB", w, h);
                write_rgb(pdf, xobj_ref, w, h, rgb.as_raw(), None);
                return Ok(xobj_ref);
            }
            let gray = matches!(decoder.color_type(), image::ColorType::L8 | image::ColorType::L16);

            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.width as i32);
            xobj.height(img.height as i32);
            if gray {
                xobj.color_space().device_gray();
            } else {
                xobj.color_space().device_rgb();
            }
            xobj.bits_per_component(8);
        }
        EmbedFormat::Png => {
            let decoded = image::load_from_memory_with_format(&img.data, image::ImageFormat::Png)
                .map_err(render_error)?;
            let rgba = decoded.to_rgba8();
            let (w, h) = rgba.dimensions();
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb: Vec<u8> = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();

            let smask_ref = if has_alpha {
                let alpha: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha, COMPRESSION_LEVEL);
                let mask_ref = alloc.next();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            write_rgb(pdf, xobj_ref, w, h, &rgb, smask_ref);
        }
    }
    Ok(xobj_ref)
}

/// Flate-compressed 8-bit RGB image XObject.
fn write_rgb(pdf: &mut Pdf, xobj_ref: Ref, w: u32, h: u32, rgb: &[u8], smask: Option<Ref>) {
    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(rgb, COMPRESSION_LEVEL);
    let mut xobj = pdf.image_xobject(xobj_ref, &compressed);
    xobj.filter(Filter::FlateDecode);
    xobj.width(w as i32);
    xobj.height(h as i32);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask {
        xobj.s_mask(mask_ref);
    }
}

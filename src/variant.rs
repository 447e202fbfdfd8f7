//! Document variants.
//!
//! Both variants share header, record blocks, pagination and footer. They
//! differ only in the artifact name prefix and in the "furniture" drawn
//! between the header and the first record, which also decides where the
//! first record starts.

use crate::labels::{
    list_title, FORM_DESTINATION, FORM_ORIGIN, FORM_SIGNATURE, FORM_TITLE, LIST_SUBTITLE,
};
use crate::pipeline::canvas::{Align, Canvas, Rect};
use crate::pipeline::metrics::{Font, LINE_HEIGHT_EM};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentVariant {
    /// Pickup/delivery form ("Bon d'enlèvement/livraison").
    Form,
    /// Production list ("Liste de …").
    List,
}

/// Draws the variant furniture for artifact stem `stem` and returns the y
/// coordinate where the first record block goes.
pub type FurnitureFn = fn(&mut Canvas, &str) -> f32;

/// Per-variant parameters of the shared assembler.
#[derive(Clone, Copy)]
pub struct VariantLayout {
    pub artifact_prefix: &'static str,
    pub furniture: FurnitureFn,
}

impl fmt::Debug for VariantLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantLayout")
            .field("artifact_prefix", &self.artifact_prefix)
            .finish_non_exhaustive()
    }
}

impl DocumentVariant {
    pub fn layout(self) -> VariantLayout {
        match self {
            DocumentVariant::Form => VariantLayout {
                artifact_prefix: "bon_d'enlevement_",
                furniture: form_furniture,
            },
            DocumentVariant::List => VariantLayout {
                artifact_prefix: "liste_",
                furniture: list_furniture,
            },
        }
    }

    /// Where the first record starts, without drawing anything.
    pub fn records_start_y(self) -> f32 {
        match self {
            DocumentVariant::Form => FORM_RECORDS_Y,
            DocumentVariant::List => LIST_RECORDS_Y,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentVariant::Form => "form",
            DocumentVariant::List => "list",
        }
    }
}

impl fmt::Display for DocumentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" | "bon" => Ok(DocumentVariant::Form),
            "list" | "liste" => Ok(DocumentVariant::List),
            other => Err(format!("unknown document variant '{other}' (expected form or list)")),
        }
    }
}

// ── Form ─────────────────────────────────────────────────────────────────

const TITLE_SIZE: f32 = 14.0;

const TABLE_X: f32 = 50.0;
const TABLE_Y: f32 = 140.0;
const CELL_WIDTH: f32 = 250.0;
const CELL_HEIGHT: f32 = 20.0;
const LARGE_CELL_HEIGHT: f32 = CELL_HEIGHT * 3.0;
const CELL_LABEL_SIZE: f32 = 10.0;
const CELL_PADDING: f32 = 5.0;

/// Below the table, leaving room for handwritten notes.
const FORM_RECORDS_Y: f32 = TABLE_Y + 7.0 * CELL_HEIGHT + LARGE_CELL_HEIGHT + 30.0;

fn table_cell(canvas: &mut Canvas, x: f32, y: f32, height: f32, label: &str) {
    canvas.stroke_rect(Rect::new(x, y, CELL_WIDTH, height));
    if !label.is_empty() {
        canvas.text(label, x + CELL_PADDING, y + CELL_PADDING, Font::Helvetica, CELL_LABEL_SIZE);
    }
}

fn form_furniture(canvas: &mut Canvas, _stem: &str) -> f32 {
    let g = *canvas.geometry();
    canvas.text_box(
        FORM_TITLE,
        g.margin_left,
        120.0,
        g.text_width_from(g.margin_left),
        Font::HelveticaBold,
        TITLE_SIZE,
        Align::Center,
    );

    // Two columns of: label / large blank / signature label / large blank.
    let rows = [
        (TABLE_Y, CELL_HEIGHT, [FORM_ORIGIN, FORM_DESTINATION]),
        (TABLE_Y + CELL_HEIGHT, LARGE_CELL_HEIGHT, ["", ""]),
        (TABLE_Y + CELL_HEIGHT + LARGE_CELL_HEIGHT, CELL_HEIGHT, [FORM_SIGNATURE, FORM_SIGNATURE]),
        (TABLE_Y + 2.0 * CELL_HEIGHT + LARGE_CELL_HEIGHT, LARGE_CELL_HEIGHT, ["", ""]),
    ];
    for (y, height, labels) in rows {
        table_cell(canvas, TABLE_X, y, height, labels[0]);
        table_cell(canvas, TABLE_X + CELL_WIDTH, y, height, labels[1]);
    }

    FORM_RECORDS_Y
}

// ── List ─────────────────────────────────────────────────────────────────

/// The title flows directly below the 10pt date line at y = 90.
const LIST_TITLE_Y: f32 = 90.0 + 10.0 * LINE_HEIGHT_EM;
const LIST_RECORDS_Y: f32 = 200.0;

fn list_furniture(canvas: &mut Canvas, stem: &str) -> f32 {
    let g = *canvas.geometry();
    let width = g.text_width_from(g.margin_left);
    let after_title = canvas.text_box(
        &list_title(stem),
        g.margin_left,
        LIST_TITLE_Y,
        width,
        Font::HelveticaBold,
        TITLE_SIZE,
        Align::Center,
    );
    canvas.text_box(
        LIST_SUBTITLE,
        g.margin_left,
        after_title + 0.2 * TITLE_SIZE * LINE_HEIGHT_EM,
        width,
        Font::HelveticaBold,
        TITLE_SIZE,
        Align::Center,
    );
    LIST_RECORDS_Y
}

//! Record normalisation and artifact naming.
//!
//! Turns untrimmed CSV rows into [`CanonicalRecord`]s whose every field
//! reads as either a trimmed, non-empty value or the sentinel
//! `"Non spécifié"`. Rows are never dropped, merged or reordered.

use crate::pipeline::input::RawRow;
use crate::labels::SENTINEL;
use crate::variant::DocumentVariant;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Columns the renderer reads.
pub mod fields {
    pub const SKU: &str = "SKU";
    pub const DENOMINATION: &str = "Dénomination";
    pub const COULEUR: &str = "Couleur";
    pub const MATIERE: &str = "Matière";
    pub const DIMENSION: &str = "Dimension";
    pub const POIDS: &str = "Poids";
    pub const STOCKAGE: &str = "Stockage";
    pub const EMPLACEMENT: &str = "Emplacement";
    pub const PHOTO: &str = "Photo";
}

/// A normalised inventory row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRecord {
    values: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// Value of `field`, or the sentinel when the column was absent.
    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or(SENTINEL)
    }

    /// Whether `field` carries a real value (not the sentinel).
    pub fn is_specified(&self, field: &str) -> bool {
        self.value(field) != SENTINEL
    }

    /// The raw photo reference, if one was given.
    pub fn photo(&self) -> Option<&str> {
        self.is_specified(fields::PHOTO)
            .then(|| self.value(fields::PHOTO))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Trims whitespace and any byte-order mark spreadsheet exports prepend.
fn clean(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Normalise one row. Later columns win when two keys trim to the same name.
pub fn normalize_row(row: &RawRow) -> CanonicalRecord {
    let values = row
        .fields
        .iter()
        .map(|(k, v)| {
            let value = clean(v);
            let value = if value.is_empty() { SENTINEL } else { value };
            (clean(k).to_string(), value.to_string())
        })
        .collect();
    CanonicalRecord { values }
}

/// Normalise every row, preserving order and count.
pub fn normalize(rows: &[RawRow]) -> Vec<CanonicalRecord> {
    rows.iter().map(normalize_row).collect()
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid regex"));

/// Stem used when sanitisation leaves nothing behind.
pub const FALLBACK_STEM: &str = "document";

/// Sanitised base name of the uploaded file.
///
/// Extension dropped, lower-cased, whitespace runs become `_`, anything
/// outside `[a-z0-9_]` removed, then only the first `_`-delimited token is
/// kept: `"Mobilier Salle 2.csv"` → `"mobilier"`.
pub fn artifact_stem(source_name: &str) -> String {
    let base = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name)
        .to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&base, "_");
    let cleaned = DISALLOWED.replace_all(&underscored, "");
    match cleaned.split('_').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => FALLBACK_STEM.to_string(),
    }
}

/// Output file name for `source_name` under `variant`.
pub fn artifact_name(variant: DocumentVariant, source_name: &str) -> String {
    format!(
        "{}{}.pdf",
        variant.layout().artifact_prefix,
        artifact_stem(source_name)
    )
}

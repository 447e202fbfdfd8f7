//! Static advance-width tables for the two standard PDF fonts we draw with.
//!
//! Widths come from the Adobe Core14 AFM files and are expressed in
//! thousandths of an em. The tables cover ASCII 0x20..=0x7E; accented Latin
//! letters are measured as their unaccented base letter, everything else
//! falls back to `FALLBACK_WIDTH`.
//!
//! Used for two things only: centring titles and wrapping text boxes. Record
//! blocks keep a fixed height regardless of what these tables report.

use serde::{Deserialize, Serialize};

/// Font faces available on the canvas. Both are standard Type1 fonts that
/// every PDF reader ships, so nothing is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    /// PostScript base-font name written to the PDF font dictionary.
    pub fn base_name(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Distance from the top of a line box to the baseline, in em.
    pub fn ascent(self) -> f32 {
        ASCENT_EM
    }

    /// Measures `s` at `size` points.
    pub fn measure(self, s: &str, size: f32) -> f32 {
        let table = match self {
            Font::Helvetica => &HELVETICA,
            Font::HelveticaBold => &HELVETICA_BOLD,
        };
        let units: u32 = s.chars().map(|c| char_width(table, c) as u32).sum();
        units as f32 * size / 1000.0
    }
}

/// Helvetica ascender (718/1000).
const ASCENT_EM: f32 = 0.718;

/// Line advance for wrapped text: ascender + |descender| + line gap of the
/// Helvetica AFM bounding box, in em.
pub const LINE_HEIGHT_EM: f32 = 1.156;

const FALLBACK_WIDTH: u16 = 556;

/// Index = (char as usize) - 32.
#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp ! " # $ % & ' ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // 0-9
    278, 278, 584, 584, 584, 556, 1015,                                             // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // N-Z
    278, 278, 278, 469, 556, 333,                                                   // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // n-z
    334, 260, 334, 584,                                                             // { | } ~
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

fn char_width(table: &[u16; 95], c: char) -> u16 {
    let c = fold_accent(c);
    let code = c as usize;
    if (32..=126).contains(&code) {
        table[code - 32]
    } else {
        FALLBACK_WIDTH
    }
}

/// Maps accented Latin-1 letters to the base letter that shares their width.
fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ÿ' | 'ý' => 'y',
        '\u{a0}' => ' ',
        '’' | '‘' => '\'',
        _ => c,
    }
}

/// Encodes `s` for a standard font using `WinAnsiEncoding`.
///
/// Latin-1 code points map to themselves; the handful of typographic
/// characters WinAnsi places in 0x80..=0x9F are remapped; anything else
/// becomes `?`.
pub fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .filter(|&c| c != '\r')
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '\t' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            'Œ' => 0x8c,
            'œ' => 0x9c,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap of `text` into lines no wider than `width` points.
///
/// Explicit newlines (`\n` or `\r\n`) are kept as hard breaks and tabs
/// count as spaces. A single word wider than the
/// box is split at the character that overflows, the way PDF drawing
/// libraries do.
pub fn wrap(text: &str, font: Font, size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut current = String::new();
        for word in paragraph.split([' ', '\t']).filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if font.measure(&candidate, size) <= width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            // The word alone may still overflow: hard-split it.
            let mut piece = String::new();
            for c in word.chars() {
                piece.push(c);
                if font.measure(&piece, size) > width && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(c);
                }
            }
            current = piece;
        }
        lines.push(current);
    }
    lines
}

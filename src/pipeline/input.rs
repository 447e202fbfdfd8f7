//! Input decoding: uploaded CSV bytes → raw rows.
//!
//! The first line names the columns. Rows do not have to match the header
//! length: missing trailing fields are simply absent from the row, extra
//! fields are kept under synthetic `_<index>` column names so nothing the
//! user uploaded is silently dropped before normalisation.

use crate::error::GenerateError;
use tracing::debug;

/// One decoded CSV line: ordered `(column name, value)` pairs, untrimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Builds a row from `(name, value)` string pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Decode `bytes` as a delimited table with a header row.
///
/// Fails with [`GenerateError::CsvParse`] on invalid UTF-8 or malformed
/// quoting; the error carries the offending line when known.
pub fn decode_csv(bytes: &[u8], delimiter: u8) -> Result<Vec<RawRow>, GenerateError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    debug!("CSV header: {} column(s)", headers.len());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields = record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let name = headers.get(i).cloned().unwrap_or_else(|| format!("_{i}"));
                (name, value.to_string())
            })
            .collect();
        rows.push(RawRow { fields });
    }

    debug!("Decoded {} CSV row(s)", rows.len());
    Ok(rows)
}

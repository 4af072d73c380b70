// =============================================================================
// CSV Export: flat tabular rendering of the chart working set
// =============================================================================
//
// Columns: Time,Price,Volume,Open,High,Low,RSI
//   - prices and RSI in shortest round-trip form, volume as an integer
//   - absent or non-numeric values are written as the `--` placeholder
//   - fields containing a comma, quote or newline are double-quoted; quoted
//     fields may span lines
// =============================================================================

#[cfg(test)]
use anyhow::{bail, Context, Result};

use crate::analytics::{CandleRecord, PLACEHOLDER};

pub const HEADER: [&str; 7] = ["Time", "Price", "Volume", "Open", "High", "Low", "RSI"];

/// One exported row, as written and as read back.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub time: String,
    pub price: Option<f64>,
    pub volume: Option<u64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub rsi: Option<f64>,
}

impl From<&CandleRecord> for ExportRow {
    fn from(record: &CandleRecord) -> Self {
        let c = &record.candle;
        Self {
            time: c.timestamp.clone(),
            price: Some(c.close).filter(|p| p.is_finite()),
            volume: c.volume,
            open: c.open,
            high: c.high,
            low: c.low,
            rsi: record.rsi.filter(|v| v.is_finite()),
        }
    }
}

/// Suggested download name for `symbol`.
pub fn export_filename(symbol: &str) -> String {
    format!("{symbol}_history.csv")
}

/// Render `records` as CSV text (header included, `\n` line endings).
pub fn export_csv(records: &[CandleRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.join(","));

    for record in records {
        let row = ExportRow::from(record);
        let time = if row.time.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            quote_field(&row.time)
        };
        let fields = [
            time,
            price_cell(row.price),
            row.volume
                .map(|v| v.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            price_cell(row.open),
            price_cell(row.high),
            price_cell(row.low),
            price_cell(row.rsi),
        ];
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

/// Parse text produced by [`export_csv`]. The header line is required.
#[cfg(test)]
pub fn parse_csv(text: &str) -> Result<Vec<ExportRow>> {
    let mut records = split_records(text)?.into_iter();

    let columns = records.next().context("CSV is empty")?;
    if columns != HEADER {
        bail!("unexpected CSV header: {}", columns.join(","));
    }

    let mut rows = Vec::new();
    for (n, fields) in records.enumerate() {
        if fields.len() != HEADER.len() {
            bail!(
                "row {} has {} fields, expected {}",
                n + 1,
                fields.len(),
                HEADER.len()
            );
        }
        rows.push(ExportRow {
            time: if fields[0] == PLACEHOLDER {
                String::new()
            } else {
                fields[0].clone()
            },
            price: parse_cell(&fields[1], "Price")?,
            volume: parse_cell(&fields[2], "Volume")?,
            open: parse_cell(&fields[3], "Open")?,
            high: parse_cell(&fields[4], "High")?,
            low: parse_cell(&fields[5], "Low")?,
            rsi: parse_cell(&fields[6], "RSI")?,
        });
    }

    Ok(rows)
}

// =============================================================================
// Internal helpers
// =============================================================================

fn price_cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

fn quote_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
fn parse_cell<T: std::str::FromStr>(raw: &str, column: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if raw == PLACEHOLDER {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .with_context(|| format!("invalid {column} value: {raw}"))
}

/// Split `text` into records of fields. Newlines inside quotes belong to the
/// field; blank lines outside quotes are skipped.
#[cfg(test)]
fn split_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            (',', false) => {
                fields.push(std::mem::take(&mut current));
                quoted = false;
            }
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) => {
                fields.push(std::mem::take(&mut current));
                if !(fields.len() == 1 && fields[0].is_empty() && !quoted) {
                    records.push(std::mem::take(&mut fields));
                }
                fields.clear();
                quoted = false;
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        bail!("unterminated quoted field");
    }
    if !current.is_empty() || !fields.is_empty() || quoted {
        fields.push(current);
        records.push(fields);
    }
    Ok(records)
}

//! Layout reconstruction for `pdftotext -layout` card statements.
//!
//! The text extraction preserves the tabular layout with runs of spaces.
//! This module splits each physical line on those runs and tags the result:
//! the masthead, page headers (period end and customer number), the BIC
//! marker, the totals block, and transaction rows. The engine consumes the
//! tagged rows; it never sees raw text.

use bigdecimal::BigDecimal;
use regex::Regex;
use statement_engine::numbers::{self, NumberFormat};
use statement_engine::row::{BalanceSnapshot, PageMarker, Row};
use statement_engine::{dates, Error};
use std::sync::LazyLock;

static COLUMN_SEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}|\t").expect("column separator pattern compiles"));

/// `dd mon  dd mon  ...  amount  Af|Bij`
static STATEMENT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d\d [a-z]{3}\s+\d\d [a-z]{3}.+[0-9,.]+\s+(Af|Bij)$")
        .expect("statement row pattern compiles")
});

static COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z]$").expect("country pattern compiles"));

const PAGE_HEADER: [&str; 4] = ["Datum", "ICS-klantnummer", "Volgnummer", "Bladnummer"];
const BALANCE_HEADER: [&str; 4] = [
    "Vorig openstaand saldo",
    "Totaal ontvangen betalingen",
    "Totaal nieuwe uitgaven",
    "Nieuw openstaand saldo",
];

/// Split a statement text into tagged logical rows. Line numbers in errors
/// are 1-based physical line numbers.
pub fn tag_lines<'a, I>(lines: I) -> Result<Vec<Row>, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut rows = Vec::new();
    let mut first_line = true;
    let mut new_page = false;
    let mut balance = false;

    for (idx, raw) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        let row = split_columns(line);

        if first_line && row.len() > 1 {
            first_line = false;
            // The engine checks it against the expected masthead.
            rows.push(Row::Header(row));
            continue;
        }

        if row.len() == 2 && row[1].starts_with("BIC: ") {
            rows.push(Row::PageBoundary(PageMarker {
                bank_id: Some(row[1]["BIC: ".len()..].to_string()),
                account_id: None,
                period_end: None,
            }));
        } else if row_is(&row, &PAGE_HEADER) {
            new_page = true;
        } else if new_page {
            new_page = false;
            let period_end = dates::parse_dutch_date(&row[0])
                .map_err(|e| Error::parse(line_no, e))?;
            let account_id = row
                .get(1)
                .cloned()
                .ok_or_else(|| Error::parse(line_no, "page header without customer number"))?;
            rows.push(Row::PageBoundary(PageMarker {
                bank_id: None,
                account_id: Some(account_id),
                period_end: Some(period_end),
            }));
        } else if row_is(&row, &BALANCE_HEADER) {
            balance = true;
        } else if balance {
            balance = false;
            if row.len() < 4 {
                return Err(Error::parse(line_no, format!("malformed totals row {row:?}")));
            }
            let start =
                marked_amount(&row[0], &row[1]).map_err(|e| Error::parse(line_no, e))?;
            let end = marked_amount(&row[row.len() - 2], &row[row.len() - 1])
                .map_err(|e| Error::parse(line_no, e))?;
            rows.push(Row::Balance(BalanceSnapshot {
                date: None,
                start: Some(start),
                end: Some(end),
            }));
        } else if STATEMENT_ROW.is_match(line) {
            rows.push(Row::Data(reshape(row)));
        }
    }

    Ok(rows)
}

fn split_columns(line: &str) -> Vec<String> {
    COLUMN_SEP.split(line).map(str::to_string).collect()
}

fn row_is(row: &[String], expected: &[&str]) -> bool {
    row.len() == expected.len()
        && row
            .iter()
            .zip(expected)
            .all(|(cell, want)| cell.as_str() == *want)
}

/// Repair columnar artifacts in a transaction row.
fn reshape(mut row: Vec<String>) -> Vec<String> {
    // The payee, place and country may come out as four cells instead of
    // three (THY | 2357312380512 | Istanbul | US). The country cell should
    // sit four cells in; merge payee fragments until it does.
    for idx in (0..row.len()).rev() {
        if COUNTRY.is_match(&row[idx]) {
            let mut idx = idx;
            while idx > 4 {
                let fragment = row.remove(3);
                row[2].push(' ');
                row[2].push_str(&fragment);
                idx -= 1;
            }
            break;
        }
    }

    // The payee column is 25 characters wide; a longer cell means the place
    // column was glued onto it (NEWREST WAGONS LITS FRANCPARIS).
    if (6..=7).contains(&row.len()) && row[2].chars().count() > 25 {
        let boundary = row[2]
            .char_indices()
            .nth(25)
            .map(|(i, _)| i)
            .unwrap_or(row[2].len());
        let rest = row[2].split_off(boundary);
        row.insert(3, rest);
    }

    row
}

/// An unsigned totals amount with its `Af`/`Bij` marker.
fn marked_amount(amount: &str, marker: &str) -> Result<BigDecimal, String> {
    let value = numbers::parse_decimal(amount, NumberFormat::Flexible)?;
    match marker {
        "Af" => Ok(-value),
        "Bij" => Ok(value),
        other => Err(format!("expected Af or Bij after an amount, got {other:?}")),
    }
}

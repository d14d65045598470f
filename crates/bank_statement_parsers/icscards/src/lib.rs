//! ICS Cards (International Card Services), The Netherlands, PDF statement.
//!
//! Input is the text form of the monthly card statement as produced by
//! `pdftotext -layout` (running the extraction itself is up to the caller).
//! The document reports its own identity and period: the BIC, the customer
//! number, the period end date and the opening/closing balance all come from
//! page furniture rather than from the transaction rows.

pub mod layout;

use anyhow::{Context, Result};
use statement_engine::mapper::{
    BalanceRule, BankProfile, Col, DateStyle, FieldMap, HeaderVariant, IdScheme, MemoRule,
    PayeeRule, SignRule, VariantKind,
};
use statement_engine::numbers::NumberFormat;
use statement_engine::{Statement, StatementParser};
use std::fs;
use std::path::Path;

pub const PARSER_NAME: &str = "icscards";

pub static PROFILE: BankProfile = BankProfile {
    name: PARSER_NAME,
    // The statement states its own BIC.
    bank_id: None,
    currency: "EUR",
    account_type: "CHECKING",
    requires_account_id: false,
    require_lines: false,
    variants: &[HeaderVariant {
        name: "pdftotext layout",
        header_rows: &[&["International Card Services BV", "www.icscards.nl"]],
        strip_empty_header_cells: false,
        // Dates are year-less `dd mon`, anchored to the reported period end.
        date_style: DateStyle::DutchDayMonthAnchored,
        number_format: NumberFormat::Flexible,
        columns: (5, 8),
        kind: VariantKind::Transactions(FieldMap {
            // The transaction date gives a wrong balance; the booking date
            // in the second column is the date of record.
            date: Col::At(1),
            date_user: Some(Col::At(0)),
            amount: Col::FromEnd(1),
            optional_amount: false,
            memo: Col::At(2),
            payee: None,
            counter_account: None,
            account: None,
            refnum: None,
            balance: None,
            sign: SignRule::Marker {
                col: Col::FromEnd(0),
                debit: "Af",
                credit: "Bij",
            },
            currency_filter: None,
        }),
    }],
    payee: PayeeRule::PlaceCountry,
    memo: MemoRule::Verbatim,
    classify: &[],
    accept: None,
    id_scheme: IdScheme::Fingerprint,
    balance: BalanceRule::Reported,
};

#[derive(Debug, Default)]
pub struct IcsCardsTextParser;

impl IcsCardsTextParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an already-extracted statement text file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Statement> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        self.parse_text(&text)
    }

    pub fn parse_text(&self, text: &str) -> Result<Statement> {
        let rows = layout::tag_lines(text.lines())?;
        let mut parser = StatementParser::new(&PROFILE, None)?;
        for row in rows {
            parser.push(row)?;
        }
        Ok(parser.finish()?)
    }
}

//! ING Bank, The Netherlands, CSV.
//!
//! ING changed its export header a few times over the years (the
//! `MutatieSoort` spelling, the newer `Mutatiesoort`, and an extended layout
//! with balance and tag columns); all of them carry the same nine leading
//! columns. Besides the transaction export there is a periodic savings
//! balance export that reports a balance per date and no transactions.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use statement_engine::mapper::{
    BalanceRule, BankProfile, Col, DateStyle, FieldMap, HeaderVariant, IdScheme, MemoRule,
    PayeeRule, SignRule, SnapshotMap, VariantKind,
};
use statement_engine::numbers::NumberFormat;
use statement_engine::{Row, Statement, StatementParser};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PARSER_NAME: &str = "ing";
pub const BANK_ID: &str = "INGBNL2A";

const TRANSACTION_MAP: FieldMap = FieldMap {
    date: Col::At(0),
    date_user: None,
    amount: Col::At(6),
    optional_amount: false,
    memo: Col::At(8),
    payee: Some(Col::At(1)),
    counter_account: Some(Col::At(3)),
    account: Some(Col::At(2)),
    refnum: None,
    balance: None,
    sign: SignRule::Marker {
        col: Col::At(5),
        debit: "Af",
        credit: "Bij",
    },
    currency_filter: None,
};

pub static PROFILE: BankProfile = BankProfile {
    name: PARSER_NAME,
    bank_id: Some(BANK_ID),
    currency: "EUR",
    account_type: "CHECKING",
    requires_account_id: false,
    require_lines: false,
    variants: &[
        HeaderVariant {
            name: "MutatieSoort",
            header_rows: &[&[
                "Datum",
                "Naam / Omschrijving",
                "Rekening",
                "Tegenrekening",
                "Code",
                "Af Bij",
                "Bedrag (EUR)",
                "MutatieSoort",
                "Mededelingen",
            ]],
            strip_empty_header_cells: false,
            date_style: DateStyle::Fmt("%Y%m%d"),
            number_format: NumberFormat::Comma,
            columns: (9, 9),
            kind: VariantKind::Transactions(TRANSACTION_MAP),
        },
        HeaderVariant {
            name: "Mutatiesoort",
            header_rows: &[&[
                "Datum",
                "Naam / Omschrijving",
                "Rekening",
                "Tegenrekening",
                "Code",
                "Af Bij",
                "Bedrag (EUR)",
                "Mutatiesoort",
                "Mededelingen",
            ]],
            strip_empty_header_cells: false,
            date_style: DateStyle::Fmt("%Y%m%d"),
            number_format: NumberFormat::Comma,
            columns: (9, 9),
            kind: VariantKind::Transactions(TRANSACTION_MAP),
        },
        HeaderVariant {
            name: "Mutatiesoort with balance and tag",
            header_rows: &[&[
                "Datum",
                "Naam / Omschrijving",
                "Rekening",
                "Tegenrekening",
                "Code",
                "Af Bij",
                "Bedrag (EUR)",
                "Mutatiesoort",
                "Mededelingen",
                "Saldo na mutatie",
                "Tag",
            ]],
            strip_empty_header_cells: false,
            date_style: DateStyle::Fmt("%Y%m%d"),
            number_format: NumberFormat::Comma,
            columns: (11, 11),
            kind: VariantKind::Transactions(TRANSACTION_MAP),
        },
        // Periodic savings balance export: one balance per row, no
        // transactions. The latest snapshot wins.
        HeaderVariant {
            name: "balance export",
            header_rows: &[&["Datum", "Naam / Omschrijving", "Rekening", "Saldo"]],
            strip_empty_header_cells: false,
            date_style: DateStyle::Fmt("%d-%m-%Y"),
            number_format: NumberFormat::Comma,
            columns: (4, 4),
            kind: VariantKind::BalanceSnapshot(SnapshotMap {
                date: Col::At(0),
                account: Some(Col::At(2)),
                balance: Col::At(3),
            }),
        },
    ],
    payee: PayeeRule::CounterOrFoldIntoMemo,
    memo: MemoRule::Verbatim,
    classify: &[],
    accept: None,
    id_scheme: IdScheme::Fingerprint,
    balance: BalanceRule::Derived,
};

#[derive(Debug, Default)]
pub struct IngCsvParser;

impl IngCsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Statement> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        self.parse_reader(file)
    }

    /// ING exports are ISO-8859-1 encoded.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<Statement> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).context("cannot read input")?;
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&raw);

        let mut parser = StatementParser::new(&PROFILE, None)?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        for record in rdr.records() {
            let record = record.context("cannot read CSV record")?;
            parser.push(Row::Data(record.iter().map(str::to_string).collect()))?;
        }
        Ok(parser.finish()?)
    }
}

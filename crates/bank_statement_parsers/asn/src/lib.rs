//! ASN Bank, The Netherlands, CSV (`transactie-historie_*.csv`).
//!
//! Headerless 19-column export, comma separated with single-quoted text
//! fields. Every row carries the balance before the mutation, and the
//! journal date plus transaction sequence number form a natural unique id.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use regex::Regex;
use statement_engine::mapper::{
    BalanceCol, BalanceRule, BalanceSemantics, BankProfile, Col, DateStyle, FieldMap,
    HeaderVariant, IdScheme, MemoRule, PayeeRule, SignRule, VariantKind,
};
use statement_engine::numbers::NumberFormat;
use statement_engine::{Row, Statement, StatementParser};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PARSER_NAME: &str = "asn";
pub const BANK_ID: &str = "ASNBNL21";

/// Column layout of the `transactie-historie` export.
///
/// 0 booking date, 1 own account, 2 counter account IBAN, 3 counter name,
/// 7/9 currencies, 8 balance before the mutation, 10 signed amount,
/// 11 journal date, 15 transaction sequence number, 17 description,
/// 18 statement number. Dates are `dd-mm-jjjj`, amounts use a dot decimal
/// separator and no grouping.
pub static PROFILE: BankProfile = BankProfile {
    name: PARSER_NAME,
    bank_id: Some(BANK_ID),
    currency: "EUR",
    account_type: "CHECKING",
    requires_account_id: false,
    require_lines: true,
    variants: &[HeaderVariant {
        name: "transactie-historie",
        header_rows: &[],
        strip_empty_header_cells: false,
        date_style: DateStyle::Fmt("%d-%m-%Y"),
        number_format: NumberFormat::Dot,
        columns: (19, 19),
        kind: VariantKind::Transactions(FieldMap {
            // The journal date is the booking date of record; together with
            // the sequence number it forms the unique transaction id.
            date: Col::At(11),
            date_user: Some(Col::At(0)),
            amount: Col::At(10),
            optional_amount: false,
            memo: Col::At(17),
            payee: Some(Col::At(3)),
            counter_account: Some(Col::At(2)),
            account: Some(Col::At(1)),
            refnum: None,
            balance: Some(BalanceCol {
                col: Col::At(8),
                semantics: BalanceSemantics::BeforeTransaction,
            }),
            sign: SignRule::FromAmount,
            currency_filter: None,
        }),
    }],
    payee: PayeeRule::CounterOrClear,
    memo: MemoRule::Verbatim,
    classify: &[],
    accept: None,
    id_scheme: IdScheme::Positional {
        sequence: Col::At(15),
    },
    balance: BalanceRule::RunningBalance,
};

/// The export file name embeds the account IBAN.
pub fn account_id_from_filename(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let pattern = Regex::new(r"transactie-historie_(NL\d+ASNB\d+)_\d+\.csv").ok()?;
    Some(pattern.captures(name)?.get(1)?.as_str().to_string())
}

#[derive(Debug, Default)]
pub struct AsnCsvParser {
    pub account_id: Option<String>,
}

impl AsnCsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Parse an export file. When no account id was set explicitly it is
    /// pre-seeded from the file name; either way the account column of every
    /// row must agree with it.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Statement> {
        let path = path.as_ref();
        let account_id = self
            .account_id
            .clone()
            .or_else(|| account_id_from_filename(path));
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        parse_rows(file, account_id)
    }

    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Statement> {
        parse_rows(reader, self.account_id.clone())
    }
}

fn parse_rows<R: Read>(reader: R, account_id: Option<String>) -> Result<Statement> {
    let mut parser = StatementParser::new(&PROFILE, account_id)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .quote(b'\'')
        .flexible(true)
        .from_reader(reader);
    for record in rdr.records() {
        let record = record.context("cannot read CSV record")?;
        parser.push(Row::Data(record.iter().map(str::to_string).collect()))?;
    }
    Ok(parser.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const SAMPLE: &str = "\
17-06-2022,NL00ASNB9999999999,NL99ASNB0000000000,XXXXXXXXX Z Z Z Z,,,,EUR,130.44,EUR,223.77,17-06-2022,17-06-2022,8810,IOB,51392971,,'Inleg juni',42
25-06-2022,NL00ASNB9999999999,,,,,,EUR,354.21,EUR,-14.50,25-06-2022,25-06-2022,9820,KST,50951652,,'Kosten gebruik betaalrekening inclusief 1 betaalpas',42
28-06-2022,NL00ASNB9999999999,NL99BANK0123456789,jansen,,,,EUR,339.71,EUR,0.00,29-06-2022,29-06-2022,8810,OVB,50139616,,'saldo informatie',42
28-06-2022,NL00ASNB9999999999,NL99BANK0123456789,jansen,,,,EUR,339.71,EUR,304.53,29-06-2022,29-06-2022,8810,OVB,50139617,'factuur 9234820','huur juli',42
11-07-2022,NL00ASNB9999999999,,,,,,EUR,644.24,EUR,-560.00,11-07-2022,11-07-2022,9820,GEA,50002877,,'geldautomaat opname',42
";

    #[test]
    fn parses_the_export() {
        let stmt = AsnCsvParser::new()
            .parse_reader(SAMPLE.as_bytes())
            .unwrap();

        assert_eq!(stmt.currency, "EUR");
        assert_eq!(stmt.bank_id.as_deref(), Some("ASNBNL21"));
        assert_eq!(stmt.account_id.as_deref(), Some("NL00ASNB9999999999"));
        assert_eq!(stmt.account_type, "CHECKING");

        // Zero-amount notification rows never materialize.
        assert_eq!(stmt.lines.len(), 4);

        assert_eq!(stmt.start_balance, Some(dec("130.44")));
        assert_eq!(stmt.end_balance, Some(dec("84.24")));
        assert_eq!(stmt.start_date, Some(ymd(2022, 6, 17)));
        // End date is exclusive.
        assert_eq!(stmt.end_date, Some(ymd(2022, 7, 12)));
    }

    #[test]
    fn journal_date_and_sequence_form_the_id() {
        let stmt = AsnCsvParser::new()
            .parse_reader(SAMPLE.as_bytes())
            .unwrap();
        assert_eq!(stmt.lines[0].id, "20220617.51392971");
        assert_eq!(stmt.lines[2].id, "20220629.50139617");
        // Journal date is the line date; the booking date is kept separately.
        assert_eq!(stmt.lines[2].date, ymd(2022, 6, 29));
        assert_eq!(stmt.lines[2].date_user, Some(ymd(2022, 6, 28)));
    }

    #[test]
    fn payee_carries_the_counter_account_or_is_cleared() {
        let stmt = AsnCsvParser::new()
            .parse_reader(SAMPLE.as_bytes())
            .unwrap();
        assert_eq!(
            stmt.lines[0].payee.as_deref(),
            Some("XXXXXXXXX Z Z Z Z (NL99ASNB0000000000)")
        );
        assert_eq!(
            stmt.lines[0]
                .counter_account
                .as_ref()
                .map(|acct| acct.acct_id.as_str()),
            Some("NL99ASNB0000000000")
        );
        assert_eq!(stmt.lines[1].payee, None);
        assert_eq!(
            stmt.lines[1].memo,
            "Kosten gebruik betaalrekening inclusief 1 betaalpas"
        );
        assert_eq!(stmt.lines[2].refnum, None);
    }

    #[test]
    fn account_id_comes_from_the_file_name() {
        assert_eq!(
            account_id_from_filename(Path::new(
                "transactie-historie_NL00ASNB9999999999_20220717204133.csv"
            ))
            .as_deref(),
            Some("NL00ASNB9999999999")
        );
        assert_eq!(account_id_from_filename(Path::new("mutaties.csv")), None);
    }

    #[test]
    fn a_second_account_in_the_file_is_a_hard_error() {
        let mixed = SAMPLE.replace(
            "11-07-2022,NL00ASNB9999999999",
            "11-07-2022,NL11ASNB1111111111",
        );
        let err = AsnCsvParser::new()
            .parse_reader(mixed.as_bytes())
            .unwrap_err();
        let parse = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(
            parse,
            statement_engine::Error::Parse { row: 5, .. }
        ));
    }

    #[test]
    fn an_empty_file_fails_validation() {
        let err = AsnCsvParser::new().parse_reader(&b""[..]).unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(
            engine,
            statement_engine::Error::Validation { .. }
        ));
    }

    #[test]
    fn a_short_row_reports_its_row_number() {
        let err = AsnCsvParser::new()
            .parse_reader(&b"17-06-2022,NL00ASNB9999999999,kapot\n"[..])
            .unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(
            engine,
            statement_engine::Error::Parse { row: 1, .. }
        ));
    }
}

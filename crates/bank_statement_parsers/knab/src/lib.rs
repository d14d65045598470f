//! KNAB Online Bank, The Netherlands, CSV (`Knab transactieoverzicht`).
//!
//! Semicolon separated, with a `KNAB EXPORT` banner row above the column
//! header. Amounts are unsigned; a separate `CreditDebet` column carries the
//! sign. Rows end with a trailing separator, so header matching ignores
//! empty cells.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use statement_engine::mapper::{
    BalanceRule, BankProfile, Col, DateStyle, FieldMap, HeaderVariant, IdScheme, MemoRule,
    PayeeRule, SignRule, VariantKind,
};
use statement_engine::numbers::NumberFormat;
use statement_engine::{Row, Statement, StatementParser};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PARSER_NAME: &str = "knab";
pub const BANK_ID: &str = "KNABNL2H";

pub static PROFILE: BankProfile = BankProfile {
    name: PARSER_NAME,
    bank_id: Some(BANK_ID),
    currency: "EUR",
    account_type: "CHECKING",
    requires_account_id: false,
    require_lines: true,
    variants: &[HeaderVariant {
        name: "transactieoverzicht",
        header_rows: &[
            &["KNAB EXPORT"],
            &[
                "Rekeningnummer",
                "Transactiedatum",
                "Valutacode",
                "CreditDebet",
                "Bedrag",
                "Tegenrekeningnummer",
                "Tegenrekeninghouder",
                "Valutadatum",
                "Betaalwijze",
                "Omschrijving",
                "Type betaling",
                "Machtigingsnummer",
                "Incassant ID",
                "Adres",
                "Referentie",
                "Boekdatum",
            ],
        ],
        strip_empty_header_cells: true,
        date_style: DateStyle::Fmt("%d-%m-%Y"),
        number_format: NumberFormat::Comma,
        columns: (16, 17),
        kind: VariantKind::Transactions(FieldMap {
            // The booking date is the line date; the transaction date is
            // kept as the user-initiated date.
            date: Col::At(15),
            date_user: Some(Col::At(1)),
            amount: Col::At(4),
            optional_amount: false,
            memo: Col::At(9),
            payee: Some(Col::At(6)),
            counter_account: Some(Col::At(5)),
            account: Some(Col::At(0)),
            refnum: Some(Col::At(14)),
            balance: None,
            sign: SignRule::Marker {
                col: Col::At(3),
                debit: "D",
                credit: "C",
            },
            currency_filter: None,
        }),
    }],
    payee: PayeeRule::CounterRequired,
    memo: MemoRule::Verbatim,
    classify: &[],
    accept: None,
    id_scheme: IdScheme::Fingerprint,
    balance: BalanceRule::Derived,
};

#[derive(Debug, Default)]
pub struct KnabCsvParser;

impl KnabCsvParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Statement> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        self.parse_reader(file)
    }

    /// KNAB exports are ISO-8859-1 encoded.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<Statement> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).context("cannot read input")?;
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&raw);

        let mut parser = StatementParser::new(&PROFILE, None)?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());
        for record in rdr.records() {
            let record = record.context("cannot read CSV record")?;
            parser.push(Row::Data(record.iter().map(str::to_string).collect()))?;
        }
        Ok(parser.finish()?)
    }
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
KNAB EXPORT;;;;;;;;;;;;;;;;
Rekeningnummer;Transactiedatum;Valutacode;CreditDebet;Bedrag;Tegenrekeningnummer;Tegenrekeninghouder;Valutadatum;Betaalwijze;Omschrijving;Type betaling;Machtigingsnummer;Incassant ID;Adres;Referentie;Boekdatum;
\"NL99KNAB9999999999\";\"26-03-2020\";\"EUR\";\"D\";\"7,02\";\"NL99ASNB9999999999\";\"JANSSEN G\";\"27-03-2020\";\"Overboeking\";\"Omschrijving 1\";\"\";\"\";\"\";\"\";\"C0C27IP2NC00000A\";\"28-03-2020\";
\"NL99KNAB9999999999\";\"26-03-2020\";\"EUR\";\"D\";\"0,00\";\"NL99ASNB9999999999\";\"JANSSEN G\";\"27-03-2020\";\"Overboeking\";\"\";\"\";\"\";\"\";\"\";\"C0C27IP2NC00000A\";\"28-03-2020\";
\"NL99KNAB9999999999\";\"27-03-2020\";\"EUR\";\"C\";\"5,00\";\"50022270\";\"Gert Janssen\";\"28-03-2020\";\"Ontvangen betaling\";\"Omschrijving 2\";\"\";\"\";\"\";\"\";\"C0C27PGFM28ERA34\";\"29-03-2020\";
";

    #[test]
    fn parses_the_export() {
        let stmt = KnabCsvParser::new().parse_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(stmt.currency, "EUR");
        assert_eq!(stmt.bank_id.as_deref(), Some("KNABNL2H"));
        assert_eq!(stmt.account_id.as_deref(), Some("NL99KNAB9999999999"));
        assert_eq!(stmt.account_type, "CHECKING");

        assert!(stmt.start_balance.is_none() && stmt.end_balance.is_none());
        assert_eq!(stmt.start_date, Some(ymd(2020, 3, 28)));
        assert_eq!(stmt.end_date, Some(ymd(2020, 3, 30)));

        // The zero-amount notification is skipped.
        assert_eq!(stmt.lines.len(), 2);

        assert_eq!(stmt.lines[0].date, ymd(2020, 3, 28));
        assert_eq!(stmt.lines[0].date_user, Some(ymd(2020, 3, 26)));
        assert_eq!(stmt.lines[0].amount, dec("-7.02"));
        assert_eq!(
            stmt.lines[0].payee.as_deref(),
            Some("JANSSEN G (NL99ASNB9999999999)")
        );
        assert_eq!(stmt.lines[0].memo, "Omschrijving 1");
        assert_eq!(stmt.lines[0].refnum.as_deref(), Some("C0C27IP2NC00000A"));

        assert_eq!(stmt.lines[1].date, ymd(2020, 3, 29));
        assert_eq!(stmt.lines[1].date_user, Some(ymd(2020, 3, 27)));
        assert_eq!(stmt.lines[1].amount, dec("5.00"));
        assert_eq!(stmt.lines[1].payee.as_deref(), Some("Gert Janssen (50022270)"));
        assert_eq!(stmt.lines[1].memo, "Omschrijving 2");
        assert_eq!(stmt.lines[1].refnum.as_deref(), Some("C0C27PGFM28ERA34"));
    }

    #[test]
    fn a_second_account_is_a_hard_error() {
        let mixed = SAMPLE.replace(
            "\"NL99KNAB9999999999\";\"27-03-2020\"",
            "\"NL00KNAB0000000000\";\"27-03-2020\"",
        );
        let err = KnabCsvParser::new()
            .parse_reader(mixed.as_bytes())
            .unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        match engine {
            statement_engine::Error::Parse { row, message } => {
                assert_eq!(*row, 5);
                assert!(message.contains("only one account"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn a_payee_without_counter_account_is_a_hard_error() {
        let broken = SAMPLE.replace("\"50022270\"", "\"\"");
        let err = KnabCsvParser::new()
            .parse_reader(broken.as_bytes())
            .unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(engine, statement_engine::Error::Parse { row: 5, .. }));
    }

    #[test]
    fn missing_second_header_row_is_a_parse_error() {
        let csv = "\
KNAB EXPORT;;;;;;;;;;;;;;;;
\"NL99KNAB9999999999\";\"26-03-2020\";\"EUR\";\"D\";\"7,02\";\"NL99ASNB9999999999\";\"JANSSEN G\";\"27-03-2020\";\"Overboeking\";\"Omschrijving 1\";\"\";\"\";\"\";\"\";\"C0C27IP2NC00000A\";\"28-03-2020\";
";
        let err = KnabCsvParser::new().parse_reader(csv.as_bytes()).unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(engine, statement_engine::Error::Parse { row: 2, .. }));
    }

    #[test]
    fn a_statement_without_lines_fails_validation() {
        let csv = "\
KNAB EXPORT;;;;;;;;;;;;;;;;
Rekeningnummer;Transactiedatum;Valutacode;CreditDebet;Bedrag;Tegenrekeningnummer;Tegenrekeninghouder;Valutadatum;Betaalwijze;Omschrijving;Type betaling;Machtigingsnummer;Incassant ID;Adres;Referentie;Boekdatum;
";
        let err = KnabCsvParser::new().parse_reader(csv.as_bytes()).unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        match engine {
            statement_engine::Error::Validation { message, .. } => {
                assert!(message.contains("no statement lines"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

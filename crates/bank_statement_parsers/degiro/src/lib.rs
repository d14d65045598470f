//! DEGIRO trader platform, The Netherlands, account CSV.
//!
//! The account export mixes cash movements with bookkeeping notifications
//! and foreign-currency conversions. Only euro deposits and withdrawals
//! become statement lines; everything else is classified and then discarded.
//! The export carries no account number, so the caller must supply one.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use statement_engine::mapper::{
    BalanceRule, BankProfile, Col, CurrencyFilter, DateStyle, FieldMap, HeaderVariant, IdScheme,
    Keyword, MemoRule, PayeeRule, SignRule, VariantKind,
};
use statement_engine::numbers::NumberFormat;
use statement_engine::{Row, Statement, StatementParser, TrnType};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PARSER_NAME: &str = "degiro";
pub const BANK_ID: &str = "STDGNL21";

pub static PROFILE: BankProfile = BankProfile {
    name: PARSER_NAME,
    bank_id: Some(BANK_ID),
    currency: "EUR",
    account_type: "CHECKING",
    requires_account_id: true,
    require_lines: false,
    variants: &[HeaderVariant {
        name: "Account",
        header_rows: &[&[
            "Datum",
            "Tijd",
            "Valutadatum",
            "Product",
            "ISIN",
            "Omschrijving",
            "FX",
            "Mutatie",
            "",
            "Saldo",
            "",
            "Order Id",
        ]],
        strip_empty_header_cells: false,
        date_style: DateStyle::Fmt("%d-%m-%Y"),
        number_format: NumberFormat::Comma,
        columns: (12, 12),
        kind: VariantKind::Transactions(FieldMap {
            date: Col::At(0),
            date_user: None,
            amount: Col::At(8),
            // Bookkeeping rows carry no amount at all; they are
            // notifications, not failures.
            optional_amount: true,
            memo: Col::At(5),
            payee: None,
            counter_account: None,
            account: None,
            refnum: None,
            balance: None,
            sign: SignRule::FromAmount,
            currency_filter: Some(CurrencyFilter {
                col: Col::At(7),
                currency: "EUR",
            }),
        }),
    }],
    payee: PayeeRule::None,
    memo: MemoRule::AppendProductIsin {
        product: Col::At(3),
        isin: Col::At(4),
    },
    // Phrases observed in real exports; best-effort, not exhaustive.
    // Anything unmatched falls back to the sign of the amount.
    classify: &[
        Keyword {
            pattern: "Dividendbelasting",
            exact: true,
            trntype: TrnType::Div,
        },
        Keyword {
            pattern: "Dividend",
            exact: true,
            trntype: TrnType::Div,
        },
        Keyword {
            pattern: "Rente",
            exact: true,
            trntype: TrnType::Int,
        },
        Keyword {
            pattern: "DEGIRO transactiekosten",
            exact: true,
            trntype: TrnType::Fee,
        },
        Keyword {
            pattern: "DEGIRO Aansluitingskosten",
            exact: false,
            trntype: TrnType::SrvChg,
        },
        Keyword {
            pattern: "Terugstorting",
            exact: true,
            trntype: TrnType::Xfer,
        },
        Keyword {
            pattern: "Storting",
            exact: true,
            trntype: TrnType::Dep,
        },
        Keyword {
            pattern: "iDEAL storting",
            exact: true,
            trntype: TrnType::Dep,
        },
    ],
    // Only cash in and out of the account is a statement line.
    accept: Some(&[TrnType::Xfer, TrnType::Dep]),
    id_scheme: IdScheme::Fingerprint,
    balance: BalanceRule::Derived,
};

#[derive(Debug)]
pub struct DegiroCsvParser {
    pub account_id: Option<String>,
}

impl DegiroCsvParser {
    pub fn new(account_id: Option<String>) -> Self {
        Self { account_id }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Statement> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        self.parse_reader(file)
    }

    /// DEGIRO exports are ISO-8859-1 encoded.
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> Result<Statement> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).context("cannot read input")?;
        let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&raw);

        let mut parser = StatementParser::new(&PROFILE, self.account_id.clone())?;
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

    const HEADER: &str = "Datum,Tijd,Valutadatum,Product,ISIN,Omschrijving,FX,Mutatie,,Saldo,,Order Id";

    fn parse(body: &str) -> Result<Statement> {
        let csv = format!("{HEADER}\n{body}");
        DegiroCsvParser::new(Some("ABC".to_string())).parse_reader(csv.as_bytes())
    }

    #[test]
    fn only_euro_deposits_and_withdrawals_become_lines() {
        let stmt = parse(
            "\
30-12-2019,15:58,30-12-2019,MORGAN STANLEY EUR LIQUIDITY FUND,LU1959429272,\"Conversie geldmarktfonds: Koop 0,000016 @ 9.961,4715 EUR\",,,,EUR,\"13,87\",
27-12-2019,09:21,27-12-2019,VANECK AEX,NL0009272749,Dividend,,EUR,\"0,19\",EUR,\"13,87\",
27-12-2019,09:21,27-12-2019,VANECK AEX,NL0009272749,Dividendbelasting,,EUR,\"-0,03\",EUR,\"13,68\",
21-06-2019,10:05,21-06-2019,,,Terugstorting,,EUR,\"-500,00\",EUR,\"13,52\",
20-06-2019,07:30,20-06-2019,,,\"iDEAL storting\",,EUR,\"500,00\",EUR,\"513,52\",
19-06-2019,12:00,19-06-2019,,,Storting,,USD,\"100,00\",USD,\"100,00\",
19-06-2019,11:00,19-06-2019,,,Storting,,EUR,\"250,00\",EUR,\"263,52\",
",
        )
        .unwrap();

        assert_eq!(stmt.currency, "EUR");
        assert_eq!(stmt.bank_id.as_deref(), Some("STDGNL21"));
        assert_eq!(stmt.account_id.as_deref(), Some("ABC"));

        // Dividend rows are classified DIV and discarded by the whitelist;
        // the conversion row has no amount; the USD deposit is filtered out.
        assert_eq!(stmt.lines.len(), 3);
        assert_eq!(stmt.lines[0].memo, "Terugstorting");
        assert_eq!(stmt.lines[0].trntype, TrnType::Xfer);
        assert_eq!(stmt.lines[0].amount, dec("-500.00"));
        assert_eq!(stmt.lines[1].trntype, TrnType::Dep);
        assert_eq!(stmt.lines[2].trntype, TrnType::Dep);

        // Dates are derived from the accepted lines only.
        assert_eq!(stmt.start_date, Some(ymd(2019, 6, 19)));
        assert_eq!(stmt.end_date, Some(ymd(2019, 6, 22)));
        assert!(stmt.start_balance.is_none() && stmt.end_balance.is_none());
    }

    #[test]
    fn equal_transfers_stay_distinguishable() {
        let stmt = parse(
            "\
21-06-2019,10:05,21-06-2019,,,Terugstorting,,EUR,\"-500,00\",EUR,\"13,52\",
21-06-2019,11:10,21-06-2019,,,Terugstorting,,EUR,\"-500,00\",EUR,\"-486,48\",
",
        )
        .unwrap();
        assert_eq!(stmt.lines.len(), 2);
        assert_eq!(stmt.lines[0].memo, "Terugstorting");
        assert_eq!(stmt.lines[1].memo, "Terugstorting #2");
        assert_ne!(stmt.lines[0].id, stmt.lines[1].id);
        assert!(stmt.lines[1].id.starts_with(&stmt.lines[0].id));
    }

    #[test]
    fn product_and_isin_are_appended_after_the_id_is_assigned() {
        let stmt = parse(
            "\
20-06-2019,07:30,20-06-2019,FLATEX EURO BANKACCOUNT,NLFLATEXACNT,\"iDEAL storting\",,EUR,\"500,00\",EUR,\"513,52\",
",
        )
        .unwrap();
        assert_eq!(
            stmt.lines[0].memo,
            "iDEAL storting FLATEX EURO BANKACCOUNT (NLFLATEXACNT)"
        );
    }

    #[test]
    fn the_account_id_must_be_configured() {
        let err = DegiroCsvParser::new(None)
            .parse_reader(&b"Datum\n"[..])
            .unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(engine, statement_engine::Error::Config { .. }));
    }

    #[test]
    fn a_wrong_header_is_a_parse_error() {
        let err = DegiroCsvParser::new(Some("ABC".to_string()))
            .parse_reader(&b"Datum,Tijd,Product\n"[..])
            .unwrap_err();
        let engine = err.downcast_ref::<statement_engine::Error>().unwrap();
        assert!(matches!(engine, statement_engine::Error::Parse { row: 1, .. }));
    }
}

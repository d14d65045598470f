//! The generic row-to-statement engine.
//!
//! One parse session consumes tagged rows for a single source file, applies
//! the institution's [`BankProfile`], and finalizes the statement in
//! [`StatementParser::finish`]. Row numbers in errors are 1-based and count
//! every pushed row, header rows included.

use crate::error::{Error, Result};
use crate::identity::IdRegistry;
use crate::mapper::{
    BalanceRule, BalanceSemantics, BankProfile, Col, DateStyle, FieldMap, HeaderVariant, IdScheme,
    MemoRule, PayeeRule, SignRule, SnapshotMap, VariantKind,
};
use crate::model::{BankAccount, Statement, Transaction, TrnType};
use crate::row::{BalanceSnapshot, PageMarker, Row};
use crate::{aggregate, dates, numbers, validate};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::debug;

#[derive(Debug)]
pub struct StatementParser<'p> {
    profile: &'p BankProfile,
    stmt: Statement,
    ids: IdRegistry,
    /// 1-based number of the row currently being processed.
    row_no: usize,
    /// Header variant selected by the first matching header row.
    variant: Option<&'p HeaderVariant>,
    /// Header rows of the selected variant consumed so far.
    header_pos: usize,
    snapshot: Option<BalanceSnapshot>,
}

impl<'p> StatementParser<'p> {
    pub fn new(profile: &'p BankProfile, account_id: Option<String>) -> Result<Self> {
        if profile.requires_account_id && account_id.is_none() {
            return Err(Error::config(format!(
                "{} statements carry no account number; supply an account id",
                profile.name
            )));
        }
        let mut stmt = Statement::new(profile.bank_id, account_id, profile.currency);
        stmt.account_type = profile.account_type.to_string();
        debug!(bank = profile.name, "parse session started");
        Ok(Self {
            profile,
            stmt,
            ids: IdRegistry::new(),
            row_no: 0,
            variant: None,
            header_pos: 0,
            snapshot: None,
        })
    }

    /// Parse a complete row sequence in one call.
    pub fn parse<I>(profile: &'p BankProfile, account_id: Option<String>, rows: I) -> Result<Statement>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut parser = StatementParser::new(profile, account_id)?;
        for row in rows {
            parser.push(row)?;
        }
        parser.finish()
    }

    pub fn push(&mut self, row: Row) -> Result<()> {
        self.row_no += 1;
        match row {
            Row::Header(cells) => self.match_header(cells),
            Row::Data(cells) => {
                if self.headers_pending() {
                    self.match_header(cells)
                } else {
                    self.data_row(cells)
                }
            }
            Row::Balance(snapshot) => {
                debug!(row = self.row_no, ?snapshot, "balance row");
                self.merge_snapshot(snapshot);
                Ok(())
            }
            Row::PageBoundary(marker) => self.page_marker(marker),
        }
    }

    /// Finalize balances and period bounds, then validate.
    pub fn finish(mut self) -> Result<Statement> {
        if self.headers_pending() {
            return Err(Error::parse(0, self.missing_header_message()));
        }
        let rule = match self.variant.map(|v| v.kind) {
            Some(VariantKind::BalanceSnapshot(_)) => BalanceRule::Snapshot,
            _ => self.profile.balance,
        };
        if self.profile.require_lines && rule != BalanceRule::Snapshot && self.stmt.lines.is_empty()
        {
            return Err(Error::validation("no statement lines read", self.stmt));
        }
        aggregate::finalize(&mut self.stmt, rule, self.snapshot.take())?;
        validate::assert_valid(&self.stmt)?;
        debug!(lines = self.stmt.lines.len(), "parse session finished");
        Ok(self.stmt)
    }

    fn headers_pending(&self) -> bool {
        match self.variant {
            Some(variant) => self.header_pos < variant.header_rows.len(),
            None => self
                .profile
                .variants
                .iter()
                .any(|v| !v.header_rows.is_empty()),
        }
    }

    fn missing_header_message(&self) -> String {
        match self.variant {
            Some(variant) => format!(
                "header not completely read: expected {:?}",
                &variant.header_rows[self.header_pos..]
            ),
            None => {
                let expected: Vec<_> = self
                    .profile
                    .variants
                    .iter()
                    .filter_map(|v| v.header_rows.first())
                    .collect();
                format!("header not completely read: expected one of {expected:?}")
            }
        }
    }

    fn match_header(&mut self, cells: Vec<String>) -> Result<()> {
        match self.variant {
            None => {
                for variant in self.profile.variants {
                    let Some(expected) = variant.header_rows.first() else {
                        continue;
                    };
                    if header_matches(expected, &cells, variant.strip_empty_header_cells) {
                        debug!(row = self.row_no, variant = variant.name, "header matched");
                        self.variant = Some(variant);
                        self.header_pos = 1;
                        return Ok(());
                    }
                }
                let expected: Vec<_> = self
                    .profile
                    .variants
                    .iter()
                    .filter_map(|v| v.header_rows.first())
                    .collect();
                Err(Error::parse(
                    self.row_no,
                    format!("expected one of the headers {expected:?}, got {cells:?}"),
                ))
            }
            Some(variant) if self.header_pos < variant.header_rows.len() => {
                let expected = variant.header_rows[self.header_pos];
                if header_matches(expected, &cells, variant.strip_empty_header_cells) {
                    self.header_pos += 1;
                    Ok(())
                } else {
                    Err(Error::parse(
                        self.row_no,
                        format!("expected header {expected:?}, got {cells:?}"),
                    ))
                }
            }
            Some(_) => Err(Error::parse(
                self.row_no,
                format!("unexpected header row {cells:?}"),
            )),
        }
    }

    fn data_row(&mut self, cells: Vec<String>) -> Result<()> {
        let variant = match self.variant {
            Some(variant) => variant,
            None => self.profile.variants.first().ok_or_else(|| {
                Error::parse(self.row_no, "no layout configured for this institution")
            })?,
        };
        debug!(row = self.row_no, ?cells, "data row");
        match variant.kind {
            VariantKind::Transactions(map) => self.transaction_row(*variant, map, cells),
            VariantKind::BalanceSnapshot(map) => self.snapshot_row(*variant, map, cells),
        }
    }

    fn transaction_row(
        &mut self,
        variant: HeaderVariant,
        map: FieldMap,
        cells: Vec<String>,
    ) -> Result<()> {
        let row_no = self.row_no;
        let (min, max) = variant.columns;
        if cells.len() < min || cells.len() > max {
            return Err(Error::parse(
                row_no,
                format!(
                    "expected between {min} and {max} cells, got {}: {cells:?}",
                    cells.len()
                ),
            ));
        }

        if let Some(col) = map.account {
            let account = self.cell(&cells, col, "account")?.to_string();
            self.pin_account(&account)?;
        }

        let raw_amount = self.cell(&cells, map.amount, "amount")?;
        if raw_amount.trim().is_empty() {
            if map.optional_amount {
                debug!(row = row_no, "row without amount skipped");
                return Ok(());
            }
            return Err(Error::parse(row_no, "empty amount cell"));
        }
        let mut amount = numbers::parse_decimal(raw_amount, variant.number_format)
            .map_err(|e| Error::parse(row_no, e))?;

        if let SignRule::Marker { col, debit, credit } = map.sign {
            let marker = self.cell(&cells, col, "debit/credit marker")?;
            if marker == debit {
                amount = -amount;
            } else if marker != credit {
                return Err(Error::parse(
                    row_no,
                    format!("debit/credit marker must be {debit:?} or {credit:?}, got {marker:?}"),
                ));
            }
        }

        // Zero-amount rows are notifications, not transactions.
        if amount == BigDecimal::from(0) {
            debug!(row = row_no, "zero-amount notification row skipped");
            return Ok(());
        }

        if let Some(filter) = map.currency_filter {
            let currency = self.cell(&cells, filter.col, "currency")?;
            if currency != filter.currency {
                debug!(row = row_no, currency, "foreign-currency row skipped");
                return Ok(());
            }
        }

        let date = self.parse_styled_date(variant.date_style, self.cell(&cells, map.date, "date")?)?;
        let date_user = match map.date_user {
            Some(col) => {
                let raw = self.cell(&cells, col, "transaction date")?;
                if raw.trim().is_empty() {
                    None
                } else {
                    Some(self.parse_styled_date(variant.date_style, raw)?)
                }
            }
            None => None,
        };

        let memo_raw = self.cell(&cells, map.memo, "memo")?.to_string();
        let payee_raw = map
            .payee
            .and_then(|col| col.get(&cells))
            .unwrap_or("")
            .to_string();
        let counter_raw = map
            .counter_account
            .and_then(|col| col.get(&cells))
            .unwrap_or("")
            .to_string();

        let (payee, memo) = match self.profile.payee {
            PayeeRule::None => (None, memo_raw),
            PayeeRule::CounterOrClear => {
                if counter_raw.is_empty() {
                    (None, memo_raw)
                } else {
                    (Some(format!("{payee_raw} ({counter_raw})")), memo_raw)
                }
            }
            PayeeRule::CounterOrFoldIntoMemo => {
                if counter_raw.is_empty() {
                    (None, format!("{payee_raw}, {memo_raw}"))
                } else {
                    (Some(format!("{payee_raw} ({counter_raw})")), memo_raw)
                }
            }
            PayeeRule::CounterRequired => {
                if counter_raw.is_empty() {
                    return Err(Error::parse(
                        row_no,
                        format!("payee {payee_raw:?} without a counter account"),
                    ));
                }
                (Some(format!("{payee_raw} ({counter_raw})")), memo_raw)
            }
            PayeeRule::PlaceCountry => {
                if cells.len() >= 7 {
                    (
                        Some(cells[2].clone()),
                        format!("{} ({})", cells[3], cells[4]),
                    )
                } else {
                    (None, memo_raw)
                }
            }
        };

        let counter_account = if counter_raw.is_empty() {
            None
        } else {
            Some(BankAccount::new(counter_raw))
        };
        let refnum = map
            .refnum
            .and_then(|col| col.get(&cells))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let running_balance = match map.balance {
            Some(balance) => {
                let raw = self.cell(&cells, balance.col, "running balance")?;
                let value = numbers::parse_decimal(raw, variant.number_format)
                    .map_err(|e| Error::parse(row_no, e))?;
                Some(match balance.semantics {
                    BalanceSemantics::BeforeTransaction => value + &amount,
                    BalanceSemantics::AfterTransaction => value,
                })
            }
            None => None,
        };

        let trntype = self
            .profile
            .classify_memo(&memo, TrnType::from_amount(&amount));
        if !self.profile.accepts(trntype) {
            debug!(row = row_no, ?trntype, "row type not accepted, skipped");
            return Ok(());
        }

        let mut tx = Transaction {
            id: String::new(),
            date,
            date_user,
            amount,
            memo,
            payee,
            trntype,
            counter_account,
            refnum,
            running_balance,
        };

        match self.profile.id_scheme {
            IdScheme::Positional { sequence } => {
                let seq = self.cell(&cells, sequence, "transaction sequence number")?;
                if seq.trim().is_empty() {
                    return Err(Error::parse(row_no, "empty transaction sequence number"));
                }
                tx.id = format!("{}.{}", tx.date.format("%Y%m%d"), seq);
            }
            IdScheme::Fingerprint => self.ids.assign(&mut tx),
        }

        if let MemoRule::AppendProductIsin { product, isin } = self.profile.memo {
            if let Some(product) = product.get(&cells).filter(|s| !s.is_empty()) {
                tx.memo.push(' ');
                tx.memo.push_str(product);
                if let Some(isin) = isin.get(&cells).filter(|s| !s.is_empty()) {
                    tx.memo.push_str(" (");
                    tx.memo.push_str(isin);
                    tx.memo.push(')');
                }
            }
        }

        debug!(row = row_no, id = %tx.id, "line accepted");
        self.stmt.lines.push(tx);
        Ok(())
    }

    fn snapshot_row(
        &mut self,
        variant: HeaderVariant,
        map: SnapshotMap,
        cells: Vec<String>,
    ) -> Result<()> {
        let (min, max) = variant.columns;
        if cells.len() < min || cells.len() > max {
            return Err(Error::parse(
                self.row_no,
                format!(
                    "expected between {min} and {max} cells, got {}: {cells:?}",
                    cells.len()
                ),
            ));
        }
        if let Some(col) = map.account {
            let account = self.cell(&cells, col, "account")?.to_string();
            self.pin_account(&account)?;
        }
        let date = self.parse_styled_date(variant.date_style, self.cell(&cells, map.date, "date")?)?;
        let raw_balance = self.cell(&cells, map.balance, "balance")?;
        let balance = numbers::parse_decimal(raw_balance, variant.number_format)
            .map_err(|e| Error::parse(self.row_no, e))?;
        self.merge_snapshot(BalanceSnapshot {
            date: Some(date),
            start: None,
            end: Some(balance),
        });
        Ok(())
    }

    fn page_marker(&mut self, marker: PageMarker) -> Result<()> {
        debug!(row = self.row_no, ?marker, "page marker");
        if let Some(bank_id) = marker.bank_id {
            match &self.stmt.bank_id {
                Some(existing) if *existing != bank_id => {
                    return Err(Error::parse(
                        self.row_no,
                        format!("conflicting bank ids: {existing} vs {bank_id}"),
                    ));
                }
                Some(_) => {}
                None => self.stmt.bank_id = Some(bank_id),
            }
        }
        if let Some(account_id) = marker.account_id {
            self.pin_account(&account_id)?;
        }
        if let Some(period_end) = marker.period_end {
            self.stmt.end_date = Some(period_end);
        }
        Ok(())
    }

    fn pin_account(&mut self, account: &str) -> Result<()> {
        match &self.stmt.account_id {
            Some(existing) if existing != account => Err(Error::parse(
                self.row_no,
                format!(
                    "only one account is allowed; previous account: {existing}, \
this row's account: {account}"
                ),
            )),
            Some(_) => Ok(()),
            None => {
                self.stmt.account_id = Some(account.to_string());
                Ok(())
            }
        }
    }

    fn parse_styled_date(&self, style: DateStyle, raw: &str) -> Result<NaiveDate> {
        let parsed = match style {
            DateStyle::Fmt(format) => dates::parse_date(raw, format),
            DateStyle::DutchDayMonthAnchored => match self.stmt.end_date {
                Some(anchor) => dates::parse_day_month_anchored(raw, anchor),
                None => Err("statement period end not known before transaction rows".to_string()),
            },
        };
        parsed.map_err(|e| Error::parse(self.row_no, e))
    }

    fn merge_snapshot(&mut self, incoming: BalanceSnapshot) {
        match &mut self.snapshot {
            None => self.snapshot = Some(incoming),
            Some(current) => match (current.date, incoming.date) {
                // Older snapshots never displace a newer one.
                (Some(cur), Some(new)) if new < cur => {}
                (_, Some(_)) => *current = incoming,
                (_, None) => {
                    if incoming.start.is_some() {
                        current.start = incoming.start;
                    }
                    if incoming.end.is_some() {
                        current.end = incoming.end;
                    }
                }
            },
        }
    }

    fn cell<'a>(&self, cells: &'a [String], col: Col, what: &str) -> Result<&'a str> {
        col.get(cells).ok_or_else(|| {
            Error::parse(
                self.row_no,
                format!("missing {what} cell at {col:?} in {cells:?}"),
            )
        })
    }
}

fn header_matches(expected: &[&str], got: &[String], strip_empty: bool) -> bool {
    if strip_empty {
        let filtered: Vec<&String> = got.iter().filter(|cell| !cell.is_empty()).collect();
        filtered.len() == expected.len()
            && filtered.iter().zip(expected).all(|(cell, want)| cell.as_str() == *want)
    } else {
        got.len() == expected.len()
            && got
                .iter()
                .zip(expected)
                .all(|(cell, want)| cell.as_str() == *want)
    }
}

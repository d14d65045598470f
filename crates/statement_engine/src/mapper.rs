//! Declarative per-institution parsing profiles.
//!
//! A [`BankProfile`] is pure data: which raw column feeds which canonical
//! field, which header layouts are known, how numbers and dates are written,
//! and which of a small set of named rules (sign, payee composition, memo
//! post-processing, keyword classification, acceptance filter, balance
//! derivation) the institution uses. One generic engine interprets these
//! profiles; institutions never subclass it.

use crate::model::TrnType;
use crate::numbers::NumberFormat;

/// A column position within a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Col {
    /// 0-based index from the start of the row.
    At(usize),
    /// Index from the end of the row: `FromEnd(0)` is the last cell. Used by
    /// sources whose rows vary in width.
    FromEnd(usize),
}

impl Col {
    pub fn get(self, row: &[String]) -> Option<&str> {
        let idx = match self {
            Col::At(i) => i,
            Col::FromEnd(n) => row.len().checked_sub(n + 1)?,
        };
        row.get(idx).map(|cell| cell.as_str())
    }
}

/// How the sign of the amount is determined.
#[derive(Debug, Clone, Copy)]
pub enum SignRule {
    /// The amount cell is already signed.
    FromAmount,
    /// A separate marker column carries a debit/credit token; the amount
    /// cell is unsigned and is negated when the marker says debit.
    Marker {
        col: Col,
        debit: &'static str,
        credit: &'static str,
    },
}

/// How payee and memo are composed from the raw cells.
#[derive(Debug, Clone, Copy)]
pub enum PayeeRule {
    /// The source has no counterparty column.
    None,
    /// With a counter account, payee becomes `name (account)`; without one
    /// the payee is cleared and the memo kept as-is.
    CounterOrClear,
    /// With a counter account, payee becomes `name (account)`; without one
    /// the name is folded into the memo as `name, memo` and payee cleared.
    CounterOrFoldIntoMemo,
    /// A counter account must be present; a row without one is malformed.
    CounterRequired,
    /// Card-statement rows: with 7+ cells, payee is the merchant and the
    /// memo becomes `place (country)`; narrow rows carry only a memo.
    PlaceCountry,
}

/// Memo post-processing applied after the id has been assigned.
#[derive(Debug, Clone, Copy)]
pub enum MemoRule {
    Verbatim,
    /// Append the product name, and the ISIN in parentheses, when present.
    AppendProductIsin { product: Col, isin: Col },
}

/// How unique transaction ids are produced.
#[derive(Debug, Clone, Copy)]
pub enum IdScheme {
    /// Content fingerprint with collision repair.
    Fingerprint,
    /// The source has a natural key: booking date as `yyyymmdd`, a dot, and
    /// the transaction sequence number. Trusted as unique, never
    /// collision-checked.
    Positional { sequence: Col },
}

/// How statement balances and period bounds are finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceRule {
    /// No balance in the source: dates derived from the lines, balances
    /// absent.
    Derived,
    /// Every row carries a running balance; endpoints come from whichever
    /// ends of the line list are chronologically first and last.
    RunningBalance,
    /// Balance-only export: the latest snapshot supplies the end balance
    /// and (exclusive) end date; no lines are materialized.
    Snapshot,
    /// The document reports period end and totals itself; only the start
    /// date is derived from the lines.
    Reported,
}

/// Keyword rule mapping memo text to a transaction type. Tables are compiled
/// from observed statements and are best-effort, not exhaustive; unmatched
/// memos fall back to the sign of the amount.
#[derive(Debug, Clone, Copy)]
pub struct Keyword {
    pub pattern: &'static str,
    /// Exact match when true, prefix match when false.
    pub exact: bool,
    pub trntype: TrnType,
}

/// Which running-balance figure a row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSemantics {
    BeforeTransaction,
    AfterTransaction,
}

#[derive(Debug, Clone, Copy)]
pub struct BalanceCol {
    pub col: Col,
    pub semantics: BalanceSemantics,
}

#[derive(Debug, Clone, Copy)]
pub struct CurrencyFilter {
    pub col: Col,
    pub currency: &'static str,
}

/// Field positions for a transaction layout.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub date: Col,
    pub date_user: Option<Col>,
    pub amount: Col,
    /// An empty amount cell discards the row instead of failing the parse.
    pub optional_amount: bool,
    pub memo: Col,
    pub payee: Option<Col>,
    pub counter_account: Option<Col>,
    /// The column carrying the statement's own account number; pinned after
    /// the first data row.
    pub account: Option<Col>,
    pub refnum: Option<Col>,
    pub balance: Option<BalanceCol>,
    pub sign: SignRule,
    pub currency_filter: Option<CurrencyFilter>,
}

/// Field positions for a balance-snapshot layout.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotMap {
    pub date: Col,
    pub account: Option<Col>,
    pub balance: Col,
}

#[derive(Debug, Clone, Copy)]
pub enum VariantKind {
    Transactions(FieldMap),
    BalanceSnapshot(SnapshotMap),
}

/// How data-row dates are written.
#[derive(Debug, Clone, Copy)]
pub enum DateStyle {
    /// A chrono format string such as `%d-%m-%Y`.
    Fmt(&'static str),
    /// Year-less Dutch `dd mon`, anchored to the reported period end.
    DutchDayMonthAnchored,
}

/// One known header layout of an institution. Institutions that changed
/// their export format over the years list one variant per layout; the
/// variant whose first header row matches the file wins.
#[derive(Debug, Clone, Copy)]
pub struct HeaderVariant {
    pub name: &'static str,
    /// Exact-match header rows, consumed before data rows begin. Empty for
    /// headerless exports.
    pub header_rows: &'static [&'static [&'static str]],
    /// Ignore empty cells when matching header rows (layouts padded with
    /// trailing separators).
    pub strip_empty_header_cells: bool,
    pub date_style: DateStyle,
    pub number_format: NumberFormat,
    /// Inclusive bounds on the data-row column count.
    pub columns: (usize, usize),
    pub kind: VariantKind,
}

/// Everything the engine needs to know about one institution.
#[derive(Debug, Clone, Copy)]
pub struct BankProfile {
    pub name: &'static str,
    /// BIC, when fixed per institution; documents that state their own BIC
    /// leave this unset.
    pub bank_id: Option<&'static str>,
    pub currency: &'static str,
    pub account_type: &'static str,
    /// The source carries no account number; the caller must supply one.
    pub requires_account_id: bool,
    /// An empty line set is a validation error for this institution.
    pub require_lines: bool,
    pub variants: &'static [HeaderVariant],
    pub payee: PayeeRule,
    pub memo: MemoRule,
    pub classify: &'static [Keyword],
    /// When set, only these types survive classification; everything else
    /// is discarded after classification.
    pub accept: Option<&'static [TrnType]>,
    pub id_scheme: IdScheme,
    pub balance: BalanceRule,
}

impl BankProfile {
    /// Classify a memo against the keyword table, falling back to the sign
    /// of the amount.
    pub fn classify_memo(&self, memo: &str, fallback: TrnType) -> TrnType {
        for rule in self.classify {
            let hit = if rule.exact {
                memo == rule.pattern
            } else {
                memo.starts_with(rule.pattern)
            };
            if hit {
                return rule.trntype;
            }
        }
        fallback
    }

    pub fn accepts(&self, trntype: TrnType) -> bool {
        match self.accept {
            Some(allowed) => allowed.contains(&trntype),
            None => true,
        }
    }
}

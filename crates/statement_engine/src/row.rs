use bigdecimal::BigDecimal;
use chrono::NaiveDate;

/// One logical row handed to the engine.
///
/// CSV-backed sources push every record as [`Row::Data`]; while header rows
/// are still expected the engine matches incoming data records against them.
/// Document-backed sources (columnar text extractions) tag their rows
/// upstream instead, so the engine branches on the tag rather than guessing
/// from the shape.
#[derive(Debug, Clone)]
pub enum Row {
    /// A row that must match the next expected header row.
    Header(Vec<String>),
    /// A candidate transaction record.
    Data(Vec<String>),
    /// A reported balance: a periodic snapshot or a statement totals block.
    Balance(BalanceSnapshot),
    /// Page-level markers from multi-page documents.
    PageBoundary(PageMarker),
}

/// Balance figures reported by the source rather than derived from lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSnapshot {
    pub date: Option<NaiveDate>,
    pub start: Option<BigDecimal>,
    pub end: Option<BigDecimal>,
}

/// Identity and period facts carried by page headers and footers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMarker {
    pub bank_id: Option<String>,
    pub account_id: Option<String>,
    /// Reported period end; already exclusive in the sources that carry it.
    pub period_end: Option<NaiveDate>,
}

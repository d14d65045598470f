use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;

/// OFX transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrnType {
    Credit,
    Debit,
    Int,
    Div,
    Fee,
    SrvChg,
    Dep,
    Atm,
    Pos,
    Xfer,
    Check,
    Payment,
    Cash,
    DirectDep,
    DirectDebit,
    RepeatPmt,
    Other,
}

impl TrnType {
    /// Default classification when no keyword rule applies: the sign decides.
    pub fn from_amount(amount: &BigDecimal) -> Self {
        if *amount < BigDecimal::from(0) {
            TrnType::Debit
        } else {
            TrnType::Credit
        }
    }
}

/// The counterparty's bank account, when the source discloses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccount {
    pub bank_id: Option<String>,
    pub acct_id: String,
}

impl BankAccount {
    pub fn new(acct_id: impl Into<String>) -> Self {
        Self {
            bank_id: None,
            acct_id: acct_id.into(),
        }
    }
}

/// One canonical financial movement within a statement.
///
/// `amount` is signed: negative is a debit, positive a credit. A zero amount
/// is never materialized; such rows are notifications, not transactions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Unique within the owning statement. Either positional
    /// (`<yyyymmdd>.<sequence>`) or a lowercase-hex content fingerprint,
    /// optionally suffixed `-N` after collision repair.
    pub id: String,
    /// Booking date.
    pub date: NaiveDate,
    /// Date the user initiated the transaction, when the source carries it.
    pub date_user: Option<NaiveDate>,
    pub amount: BigDecimal,
    pub memo: String,
    pub payee: Option<String>,
    pub trntype: TrnType,
    pub counter_account: Option<BankAccount>,
    pub refnum: Option<String>,
    /// Balance after this transaction, for sources that report one per row.
    pub running_balance: Option<BigDecimal>,
}

/// The normalized output aggregate for one account over one reporting period.
///
/// `end_date` is exclusive: one day past the last observed transaction date
/// when derived from the lines, or the institution-reported period end.
/// Line order is source row order; it is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub currency: String,
    pub bank_id: Option<String>,
    pub account_id: Option<String>,
    pub account_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_balance: Option<BigDecimal>,
    pub end_balance: Option<BigDecimal>,
    pub lines: Vec<Transaction>,
}

impl Statement {
    pub fn new(bank_id: Option<&str>, account_id: Option<String>, currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            bank_id: bank_id.map(|s| s.to_string()),
            account_id,
            account_type: "CHECKING".to_string(),
            start_date: None,
            end_date: None,
            start_balance: None,
            end_balance: None,
            lines: Vec::new(),
        }
    }

    pub fn min_line_date(&self) -> Option<NaiveDate> {
        self.lines.iter().map(|line| line.date).min()
    }

    pub fn max_line_date(&self) -> Option<NaiveDate> {
        self.lines.iter().map(|line| line.date).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn trntype_from_sign() {
        assert_eq!(
            TrnType::from_amount(&BigDecimal::from_str("-0.31").unwrap()),
            TrnType::Debit
        );
        assert_eq!(
            TrnType::from_amount(&BigDecimal::from_str("5.00").unwrap()),
            TrnType::Credit
        );
    }

    #[test]
    fn trntype_serializes_as_ofx_tag() {
        assert_eq!(serde_json::to_string(&TrnType::SrvChg).unwrap(), "\"SRVCHG\"");
        assert_eq!(serde_json::to_string(&TrnType::Xfer).unwrap(), "\"XFER\"");
    }

    #[test]
    fn line_date_bounds() {
        let mut stmt = Statement::new(Some("INGBNL2A"), None, "EUR");
        assert_eq!(stmt.min_line_date(), None);
        for day in [17, 3, 11] {
            stmt.lines.push(Transaction {
                id: format!("id-{day}"),
                date: NaiveDate::from_ymd_opt(2022, 6, day).unwrap(),
                date_user: None,
                amount: BigDecimal::from(1),
                memo: String::new(),
                payee: None,
                trntype: TrnType::Credit,
                counter_account: None,
                refnum: None,
                running_balance: None,
            });
        }
        assert_eq!(stmt.min_line_date(), NaiveDate::from_ymd_opt(2022, 6, 3));
        assert_eq!(stmt.max_line_date(), NaiveDate::from_ymd_opt(2022, 6, 17));
    }
}

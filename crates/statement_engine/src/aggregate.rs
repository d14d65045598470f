//! Post-pass finalization of statement-level fields.
//!
//! Balances and period bounds cannot be known until every row has been
//! consumed: some sources report balances on the last row, some report the
//! period in a page header, most report nothing at all.

use crate::error::{Error, Result};
use crate::mapper::BalanceRule;
use crate::model::Statement;
use crate::row::BalanceSnapshot;

pub fn finalize(
    stmt: &mut Statement,
    rule: BalanceRule,
    snapshot: Option<BalanceSnapshot>,
) -> Result<()> {
    match rule {
        BalanceRule::Derived => {
            derive_dates(stmt);
        }
        BalanceRule::RunningBalance => {
            derive_dates(stmt);
            apply_running_balance(stmt)?;
        }
        BalanceRule::Snapshot => {
            let Some(snapshot) = snapshot else {
                return Err(Error::validation("no balance snapshot found", stmt.clone()));
            };
            let (Some(date), Some(end)) = (snapshot.date, snapshot.end) else {
                return Err(Error::validation(
                    "balance snapshot is missing its date or amount",
                    stmt.clone(),
                ));
            };
            stmt.start_date = None;
            stmt.start_balance = None;
            stmt.end_balance = Some(end);
            // End date is exclusive: one day past the snapshot date.
            stmt.end_date = date.succ_opt();
        }
        BalanceRule::Reported => {
            if let Some(snapshot) = snapshot {
                stmt.start_balance = snapshot.start;
                stmt.end_balance = snapshot.end;
            }
            // The period end was pinned from the page marker during the
            // parse; only the start is derived from the lines.
            stmt.start_date = stmt.min_line_date();
        }
    }
    Ok(())
}

/// Start date = earliest line, end date = one day past the latest line.
fn derive_dates(stmt: &mut Statement) {
    stmt.start_date = stmt.min_line_date();
    stmt.end_date = stmt.max_line_date().and_then(|max| max.succ_opt());
}

/// Endpoint balances from per-row running balances. Sources may be sorted
/// oldest-first or newest-first; the chronological endpoints are picked by
/// date. A single-line statement is both endpoints at once, so no direction
/// needs to be guessed.
fn apply_running_balance(stmt: &mut Statement) -> Result<()> {
    let (Some(first), Some(last)) = (stmt.lines.first(), stmt.lines.last()) else {
        return Err(Error::validation("no statement lines read", stmt.clone()));
    };
    let (oldest, newest) = if first.date <= last.date {
        (first, last)
    } else {
        (last, first)
    };
    let (Some(oldest_balance), Some(newest_balance)) = (
        oldest.running_balance.as_ref(),
        newest.running_balance.as_ref(),
    ) else {
        return Err(Error::validation(
            "running balance missing on a boundary line",
            stmt.clone(),
        ));
    };
    let start = oldest_balance - &oldest.amount;
    let end = newest_balance.clone();
    stmt.start_balance = Some(start);
    stmt.end_balance = Some(end);
    Ok(())
}

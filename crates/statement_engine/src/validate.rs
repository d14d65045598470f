//! Final gate before a statement is handed back to the caller.

use crate::error::{Error, Result};
use crate::model::Statement;

/// Check the global statement invariants.
///
/// The end date must always be set. When there are lines, the start date
/// must cover the earliest line and the (exclusive) end date must lie past
/// the latest line. A statement with zero lines and a set end date is valid:
/// that is what a balance-only export produces.
pub fn assert_valid(stmt: &Statement) -> Result<()> {
    let Some(end_date) = stmt.end_date else {
        return Err(Error::validation(
            "the statement end date should be set",
            stmt.clone(),
        ));
    };
    let (Some(min), Some(max)) = (stmt.min_line_date(), stmt.max_line_date()) else {
        return Ok(());
    };
    match stmt.start_date {
        None => {
            return Err(Error::validation(
                "the statement start date should be set",
                stmt.clone(),
            ));
        }
        Some(start) if start > min => {
            return Err(Error::validation(
                format!(
                    "the statement start date ({start}) should be at most the \
smallest statement line date ({min})"
                ),
                stmt.clone(),
            ));
        }
        Some(_) => {}
    }
    if end_date <= max {
        return Err(Error::validation(
            format!(
                "the statement end date ({end_date}) should be greater than the \
largest statement line date ({max})"
            ),
            stmt.clone(),
        ));
    }
    Ok(())
}

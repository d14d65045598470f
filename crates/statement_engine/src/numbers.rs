use bigdecimal::BigDecimal;
use std::str::FromStr;

/// How an institution writes decimal amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    /// `238.45`, `-43.90` — dot decimal separator, no grouping.
    Dot,
    /// `1,25`, `1.827,97` — comma decimal separator, optional `.`/space
    /// grouping.
    Comma,
    /// `1.827,97`, `€ 1.827,97` or `1,827.97` — optional currency prefix,
    /// grouping style detected from the position of the comma.
    Flexible,
}

/// Parse one amount cell according to the institution's number format.
///
/// The returned value carries whatever sign the cell itself had; marker-based
/// sign rules are applied by the caller.
pub fn parse_decimal(raw: &str, format: NumberFormat) -> Result<BigDecimal, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty amount".to_string());
    }

    let cleaned = match format {
        NumberFormat::Dot => raw.to_string(),
        NumberFormat::Comma => raw
            .replace(' ', "")
            .replace('\u{a0}', "")
            .replace('.', "")
            .replace(',', "."),
        NumberFormat::Flexible => {
            // Amount is the last whitespace-separated token; anything before
            // it (a currency symbol such as `€`) is dropped.
            let token = raw
                .split_whitespace()
                .last()
                .ok_or_else(|| format!("no amount in {raw:?}"))?;
            if !token.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
                return Err(format!("not an amount: {raw:?}"));
            }
            let bytes = token.as_bytes();
            if bytes.len() >= 3 && bytes[bytes.len() - 3] == b',' {
                // Dutch grouping: 1.827,97
                token.replace('.', "").replace(',', ".")
            } else {
                // English grouping: 1,827.97
                token.replace(',', "")
            }
        }
    };

    BigDecimal::from_str(&cleaned).map_err(|e| format!("cannot parse amount {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn dot_format() {
        assert_eq!(parse_decimal("238.45", NumberFormat::Dot).unwrap(), dec("238.45"));
        assert_eq!(parse_decimal("-43.90", NumberFormat::Dot).unwrap(), dec("-43.90"));
        assert!(parse_decimal("", NumberFormat::Dot).is_err());
    }

    #[test]
    fn comma_format() {
        assert_eq!(parse_decimal("7,02", NumberFormat::Comma).unwrap(), dec("7.02"));
        assert_eq!(parse_decimal("-7,02", NumberFormat::Comma).unwrap(), dec("-7.02"));
        assert_eq!(
            parse_decimal("1.234,56", NumberFormat::Comma).unwrap(),
            dec("1234.56")
        );
    }

    #[test]
    fn flexible_format() {
        assert_eq!(
            parse_decimal("1.827,97", NumberFormat::Flexible).unwrap(),
            dec("1827.97")
        );
        assert_eq!(
            parse_decimal("€ 1.827,97", NumberFormat::Flexible).unwrap(),
            dec("1827.97")
        );
        assert_eq!(
            parse_decimal("1,827.97", NumberFormat::Flexible).unwrap(),
            dec("1827.97")
        );
        assert_eq!(parse_decimal("13,20", NumberFormat::Flexible).unwrap(), dec("13.20"));
        assert!(parse_decimal("geen bedrag", NumberFormat::Flexible).is_err());
    }
}

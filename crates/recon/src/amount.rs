//! Amount and currency helpers: grouped-number parsing, exchange rates
//! embedded in invoice remarks, and the accounts-receivable row test.

use crate::config::Markers;
use crate::error::ReconError;
use crate::sheet::CellValue;

/// Characters skipped after the start of the rate marker (marker + separator).
const RATE_VALUE_OFFSET: usize = 4;
/// Characters dropped before the USD-amount marker (trailing separator).
const RATE_VALUE_TRAIL: usize = 2;

/// Parse a comma-grouped decimal string ("1,234,567.89").
pub fn parse_amount(text: &str) -> Result<f64, ReconError> {
    let stripped: String = text.chars().filter(|c| *c != ',').collect();
    stripped
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ReconError::AmountParse {
            row: 0,
            value: text.to_string(),
        })
}

/// Numeric value of a cell: native numbers as-is, text through [`parse_amount`],
/// blank cells as `None`.
pub fn cell_amount(cell: &CellValue) -> Result<Option<f64>, ReconError> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) | CellValue::Currency(n) => Ok(Some(*n)),
        CellValue::Text(s) if s.trim().is_empty() => Ok(None),
        CellValue::Text(s) => parse_amount(s).map(Some),
        CellValue::Date(_) => Err(ReconError::AmountParse {
            row: 0,
            value: cell.display(),
        }),
    }
}

/// Character index of the first occurrence of `needle`.
fn char_find(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte_idx| haystack[..byte_idx].chars().count())
}

/// Exchange rate written into an invoice remark, e.g. `匯率：@30.15, 美金金額 1,000.00`.
///
/// The rate is the text from 4 characters past the start of the rate marker
/// up to 2 characters before the USD-amount marker. Remarks without both
/// markers in that order carry no rate and yield 1.0.
pub fn extract_exchange_rate(remark: &str, markers: &Markers) -> Result<f64, ReconError> {
    let (Some(rate_idx), Some(usd_idx)) = (
        char_find(remark, &markers.rate),
        char_find(remark, &markers.usd_amount),
    ) else {
        return Ok(1.0);
    };
    if rate_idx >= usd_idx {
        return Ok(1.0);
    }

    let start = rate_idx + RATE_VALUE_OFFSET;
    let end = usd_idx.saturating_sub(RATE_VALUE_TRAIL);
    let slice: String = if start < end {
        remark.chars().skip(start).take(end - start).collect()
    } else {
        String::new()
    };

    slice
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
        .ok_or(ReconError::RateParse { row: 0, value: slice })
}

/// An invoice is USD-denominated when its remark carries both markers.
pub fn is_foreign_currency_source(remark: &str, markers: &Markers) -> bool {
    remark.contains(&markers.rate) && remark.contains(&markers.usd_amount)
}

/// A ledger row is USD-denominated when its stored rate is above 1.0.
pub fn is_foreign_currency_target(rate: &CellValue) -> Result<bool, ReconError> {
    let rate = cell_amount(rate).map_err(|e| match e {
        ReconError::AmountParse { row, value } => ReconError::RateParse { row, value },
        other => other,
    })?;
    Ok(rate.is_some_and(|r| r > 1.0))
}

/// Ledger row test: the account is an accounts-receivable account and the
/// amount cell holds a usable non-negative number.
///
/// Single-character text (placeholder marks such as `-` or `*`) is not an
/// amount. None of the exclusions is an error.
pub fn is_eligible_receivable(account_description: &str, amount: &CellValue, ar_label: &str) -> bool {
    if !account_description.contains(ar_label) {
        return false;
    }
    match amount {
        CellValue::Number(n) | CellValue::Currency(n) => n.is_finite() && *n >= 0.0,
        CellValue::Text(s) => {
            let visible = s.trim();
            if visible.is_empty() || visible.chars().count() == 1 {
                return false;
            }
            parse_amount(visible).is_ok_and(|n| n >= 0.0)
        }
        CellValue::Empty | CellValue::Date(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Markers {
        Markers::default()
    }

    #[test]
    fn parse_grouped_amount() {
        assert_eq!(parse_amount("1,234,567.89").unwrap(), 1234567.89);
        assert_eq!(parse_amount("52,500").unwrap(), 52500.0);
        assert_eq!(parse_amount(" 980 ").unwrap(), 980.0);
    }

    #[test]
    fn parse_amount_rejects_text() {
        let err = parse_amount("abc").unwrap_err();
        assert!(matches!(err, ReconError::AmountParse { ref value, .. } if value == "abc"));
        assert!(parse_amount("").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn rate_between_markers() {
        let remark = "匯率：@30.15, 美金金額 1,000.00";
        assert_eq!(extract_exchange_rate(remark, &markers()).unwrap(), 30.15);
    }

    #[test]
    fn rate_offsets_count_characters_not_bytes() {
        // Leading CJK text shifts byte offsets but not character offsets
        let remark = "京傳企業 匯率：@28.6, 美金 500";
        assert_eq!(extract_exchange_rate(remark, &markers()).unwrap(), 28.6);
    }

    #[test]
    fn rate_without_markers_is_one() {
        assert_eq!(extract_exchange_rate("月結30天", &markers()).unwrap(), 1.0);
        assert_eq!(extract_exchange_rate("", &markers()).unwrap(), 1.0);
        // Only one marker
        assert_eq!(extract_exchange_rate("匯率：@30.15", &markers()).unwrap(), 1.0);
    }

    #[test]
    fn rate_markers_out_of_order_is_one() {
        let remark = "美金 1,000, 匯率：@30.15";
        assert_eq!(extract_exchange_rate(remark, &markers()).unwrap(), 1.0);
    }

    #[test]
    fn rate_slice_not_numeric_fails() {
        let remark = "匯率：@約三十, 美金 1,000";
        let err = extract_exchange_rate(remark, &markers()).unwrap_err();
        assert!(matches!(err, ReconError::RateParse { .. }));
    }

    #[test]
    fn rate_must_be_positive() {
        for remark in ["匯率：@0, 美金金額 1,000.00", "匯率：@-30.15, 美金 1,000", "匯率：@0.0, 美金 1,000"] {
            let err = extract_exchange_rate(remark, &markers()).unwrap_err();
            assert!(matches!(err, ReconError::RateParse { .. }), "{remark}");
        }
    }

    #[test]
    fn rate_markers_too_close_fails() {
        let err = extract_exchange_rate("匯率美金", &markers()).unwrap_err();
        assert!(matches!(err, ReconError::RateParse { ref value, .. } if value.is_empty()));
    }

    #[test]
    fn foreign_source_needs_both_markers() {
        assert!(is_foreign_currency_source("匯率：@30.15, 美金 1,000", &markers()));
        assert!(is_foreign_currency_source("美金 1,000 匯率", &markers()));
        assert!(!is_foreign_currency_source("匯率：@30.15", &markers()));
        assert!(!is_foreign_currency_source("", &markers()));
    }

    #[test]
    fn foreign_target_rate_above_one() {
        assert!(is_foreign_currency_target(&CellValue::Number(30.2)).unwrap());
        assert!(is_foreign_currency_target(&CellValue::text("29.85")).unwrap());
        assert!(!is_foreign_currency_target(&CellValue::Number(1.0)).unwrap());
        assert!(!is_foreign_currency_target(&CellValue::Empty).unwrap());
        assert!(!is_foreign_currency_target(&CellValue::text(" ")).unwrap());
        assert!(matches!(
            is_foreign_currency_target(&CellValue::text("n/a")),
            Err(ReconError::RateParse { .. })
        ));
    }

    #[test]
    fn eligible_receivable_rules() {
        let label = "應收帳款";
        let desc = "1191 應收帳款";
        assert!(is_eligible_receivable(desc, &CellValue::Number(52500.0), label));
        assert!(is_eligible_receivable(desc, &CellValue::Number(0.0), label));
        assert!(is_eligible_receivable(desc, &CellValue::text("52,500"), label));
        // Blank amount
        assert!(!is_eligible_receivable(desc, &CellValue::Empty, label));
        assert!(!is_eligible_receivable(desc, &CellValue::text("  "), label));
        // Single-character placeholder
        assert!(!is_eligible_receivable(desc, &CellValue::text("-"), label));
        assert!(!is_eligible_receivable(desc, &CellValue::text("5"), label));
        // Missing label
        assert!(!is_eligible_receivable("4101 銷貨收入", &CellValue::Number(52500.0), label));
        // Negative or unparseable
        assert!(!is_eligible_receivable(desc, &CellValue::Number(-10.0), label));
        assert!(!is_eligible_receivable(desc, &CellValue::text("待補"), label));
    }
}

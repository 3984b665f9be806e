use serde::Deserialize;

use crate::error::ReconError;
use crate::layout::ANNOTATION_COLS;

/// Default tolerance: 1% of the source transaction's amount.
pub const THRESHOLD_RATIO: f64 = 0.01;

pub const DEFAULT_EXTERNAL_SALES_FILE: &str = "External_Sales.xlsx";
pub const DEFAULT_LOG_FILE: &str = "excel_lookup.log";
pub const DEFAULT_INVOICE_SHEET: &str = "Sheet0";

/// Worksheet column limit of the xlsx format (XFD).
pub const MAX_COLUMNS: usize = 16_384;

// ---------------------------------------------------------------------------
// Top-level settings
// ---------------------------------------------------------------------------

/// Run settings. Every section is optional in the TOML file; omitted keys
/// fall back to the layouts and markers used by the monthly close workbooks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub markers: Markers,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub invoice_columns: InvoiceColumns,
    #[serde(default)]
    pub ledger_columns: LedgerColumns,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

/// Literal strings the classification rules look for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Markers {
    /// Invoice status of a cancelled invoice.
    pub void_status: String,
    /// Ledger voucher type kept by the preprocessor.
    pub voucher_type: String,
    /// Accounts-receivable label searched in the account description.
    pub ar_label: String,
    /// Exchange-rate marker in invoice remarks.
    pub rate: String,
    /// USD-amount marker in invoice remarks.
    pub usd_amount: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            void_status: "作廢".into(),
            voucher_type: "F".into(),
            ar_label: "應收帳款".into(),
            rate: "匯率".into(),
            usd_amount: "美金".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub threshold_ratio: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold_ratio: THRESHOLD_RATIO,
        }
    }
}

// ---------------------------------------------------------------------------
// Column layouts (0-based)
// ---------------------------------------------------------------------------

/// Invoice-detail sheet columns.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvoiceColumns {
    pub status: usize,
    pub number: usize,
    pub buyer: usize,
    pub date: usize,
    pub total: usize,
    pub remark: usize,
    /// Appended column receiving the match annotation.
    pub checked: usize,
}

impl Default for InvoiceColumns {
    fn default() -> Self {
        Self {
            status: 0,
            number: 1,
            buyer: 2,
            date: 3,
            total: 4,
            remark: 5,
            checked: 6,
        }
    }
}

/// Raw general-ledger columns, plus where the preprocessor inserts the
/// three annotation columns of the external-sales sheet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerColumns {
    pub voucher_type: usize,
    pub account_description: usize,
    pub amount: usize,
    pub exchange_rate: usize,
    pub invoice_number: usize,
    pub text: usize,
    pub invoice_date: usize,
    /// Insertion index of the annotation columns (3 = column D).
    pub insert_at: usize,
}

impl Default for LedgerColumns {
    fn default() -> Self {
        Self {
            voucher_type: 1,
            account_description: 2,
            amount: 3,
            exchange_rate: 4,
            invoice_number: 5,
            text: 6,
            invoice_date: 7,
            insert_at: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub external_sales: String,
    pub log_file: String,
    pub invoice_sheet: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            external_sales: DEFAULT_EXTERNAL_SALES_FILE.into(),
            log_file: DEFAULT_LOG_FILE.into(),
            invoice_sheet: DEFAULT_INVOICE_SHEET.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let ratio = self.matching.threshold_ratio;
        if !ratio.is_finite() || !(0.0..1.0).contains(&ratio) {
            return Err(ReconError::ConfigValidation(format!(
                "threshold_ratio must be in [0, 1), got {ratio}"
            )));
        }

        let m = &self.markers;
        for (name, value) in [
            ("void_status", &m.void_status),
            ("voucher_type", &m.voucher_type),
            ("ar_label", &m.ar_label),
            ("rate", &m.rate),
            ("usd_amount", &m.usd_amount),
        ] {
            if value.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "marker '{name}' must not be empty"
                )));
            }
        }

        let inv = &self.invoice_columns;
        let invoice_cols = [
            ("status", inv.status),
            ("number", inv.number),
            ("buyer", inv.buyer),
            ("date", inv.date),
            ("total", inv.total),
            ("remark", inv.remark),
            ("checked", inv.checked),
        ];
        check_bounds("invoice_columns", &invoice_cols, MAX_COLUMNS)?;
        check_distinct("invoice_columns", &invoice_cols)?;

        // Ledger columns move right by the annotation block in the output
        let gl = &self.ledger_columns;
        let ledger_cols = [
            ("voucher_type", gl.voucher_type),
            ("account_description", gl.account_description),
            ("amount", gl.amount),
            ("exchange_rate", gl.exchange_rate),
            ("invoice_number", gl.invoice_number),
            ("text", gl.text),
            ("invoice_date", gl.invoice_date),
            ("insert_at", gl.insert_at),
        ];
        check_bounds("ledger_columns", &ledger_cols, MAX_COLUMNS - ANNOTATION_COLS)?;
        check_distinct("ledger_columns", &ledger_cols[..ledger_cols.len() - 1])?;

        Ok(())
    }
}

fn check_bounds(section: &str, cols: &[(&str, usize)], limit: usize) -> Result<(), ReconError> {
    match cols.iter().find(|(_, col)| *col >= limit) {
        Some((name, col)) => Err(ReconError::ConfigValidation(format!(
            "{section}: '{name}' column {col} is beyond the last usable column {}",
            limit - 1
        ))),
        None => Ok(()),
    }
}

fn check_distinct(section: &str, cols: &[(&str, usize)]) -> Result<(), ReconError> {
    for (i, (name_a, col_a)) in cols.iter().enumerate() {
        for (name_b, col_b) in &cols[i + 1..] {
            if col_a == col_b {
                return Err(ReconError::ConfigValidation(format!(
                    "{section}: '{name_a}' and '{name_b}' both use column {col_a}"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::sheet::Sheet;

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    /// The external-sales sheet, header included.
    pub sheet: Sheet,
    /// Data rows kept.
    pub retained: usize,
    /// Data rows dropped by the voucher-type / AR-label filter.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Void,
    Matched,
    Unmatched,
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Matched => write!(f, "matched"),
            Self::Unmatched => write!(f, "unmatched"),
        }
    }
}

/// Result for one invoice row.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceOutcome {
    /// 1-based sheet row.
    pub row: usize,
    pub invoice_number: String,
    pub outcome: MatchOutcome,
    /// 1-based external-sales rows annotated for this invoice.
    pub ledger_rows: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub invoices_scanned: usize,
    pub void: usize,
    /// Invoices with at least one ledger hit.
    pub matched_invoices: usize,
    pub unmatched: usize,
    /// External-sales rows passing the receivable test.
    pub eligible_ledger_rows: usize,
    /// Running count of ledger hits. An invoice matching two ledger rows
    /// adds two.
    pub match_count: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutput {
    pub invoices: Sheet,
    pub external_sales: Sheet,
    pub stats: MatchStats,
    pub outcomes: Vec<InvoiceOutcome>,
}

//! Named-field decoders for the three sheet layouts.
//!
//! Every fixed column offset used by the engine is resolved here, from the
//! column settings in [`crate::config`]. The external-sales layout is the
//! general-ledger layout with three annotation columns inserted.

use crate::amount::{self, cell_amount};
use crate::config::{InvoiceColumns, LedgerColumns, Markers};
use crate::error::ReconError;
use crate::sheet::{CellValue, Sheet};
use crate::transaction::{CurrencyMode, Origin, Transaction};

/// Number of annotation columns inserted into the external-sales sheet.
pub const ANNOTATION_COLS: usize = 3;

// ---------------------------------------------------------------------------
// Invoice detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InvoiceRow<'a> {
    pub status: &'a CellValue,
    pub number: &'a CellValue,
    pub buyer: &'a CellValue,
    pub date: &'a CellValue,
    pub total: &'a CellValue,
    pub remark: &'a CellValue,
}

impl<'a> InvoiceRow<'a> {
    pub fn decode(sheet: &'a Sheet, row: usize, cols: &InvoiceColumns) -> Self {
        Self {
            status: sheet.get(row, cols.status),
            number: sheet.get(row, cols.number),
            buyer: sheet.get(row, cols.buyer),
            date: sheet.get(row, cols.date),
            total: sheet.get(row, cols.total),
            remark: sheet.get(row, cols.remark),
        }
    }

    pub fn is_void(&self, markers: &Markers) -> bool {
        self.status.as_text().is_some_and(|s| s.trim() == markers.void_status)
    }

    pub fn is_foreign_currency(&self, markers: &Markers) -> bool {
        amount::is_foreign_currency_source(&self.remark.display(), markers)
    }

    /// Build the source transaction. Fails when the total or the embedded
    /// rate cannot be parsed.
    pub fn to_transaction(&self, markers: &Markers) -> Result<Transaction, ReconError> {
        let amount_local = match self.total {
            CellValue::Text(s) => amount::parse_amount(s)?,
            other => cell_amount(other)?.ok_or_else(|| ReconError::AmountParse {
                row: 0,
                value: String::new(),
            })?,
        };

        let (mode, rate) = if self.is_foreign_currency(markers) {
            let rate = amount::extract_exchange_rate(&self.remark.display(), markers)?;
            (CurrencyMode::Foreign, rate)
        } else {
            (CurrencyMode::Local, 1.0)
        };

        Ok(Transaction::new(
            self.number.display(),
            self.buyer.display(),
            date_text(self.date, Origin::InvoiceDetail),
            amount_local,
            0.0,
            mode,
            rate,
            Origin::InvoiceDetail,
        ))
    }
}

// ---------------------------------------------------------------------------
// General ledger (raw export)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LedgerRow<'a> {
    pub voucher_type: &'a CellValue,
    pub account_description: &'a CellValue,
}

impl<'a> LedgerRow<'a> {
    pub fn decode(sheet: &'a Sheet, row: usize, cols: &LedgerColumns) -> Self {
        Self {
            voucher_type: sheet.get(row, cols.voucher_type),
            account_description: sheet.get(row, cols.account_description),
        }
    }

    /// Preprocessor filter: voucher type equals the marker and the AR label
    /// appears after the first character of the account description.
    pub fn is_receivable_voucher(&self, markers: &Markers) -> bool {
        let type_ok = matches!(self.voucher_type, CellValue::Text(s) if *s == markers.voucher_type);
        let label_pos = self
            .account_description
            .as_text()
            .and_then(|desc| desc.find(&markers.ar_label));
        type_ok && label_pos.is_some_and(|pos| pos > 0)
    }
}

// ---------------------------------------------------------------------------
// External sales (preprocessed ledger)
// ---------------------------------------------------------------------------

/// Column positions of the external-sales sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalSalesColumns {
    pub unified_invoice_number: usize,
    pub invoice_amount: usize,
    pub matched: usize,
    pub amount: usize,
    pub exchange_rate: usize,
    pub invoice_number: usize,
    pub text: usize,
    pub invoice_date: usize,
    pub account_description: usize,
}

impl ExternalSalesColumns {
    pub fn from_ledger(cols: &LedgerColumns) -> Self {
        let at = cols.insert_at;
        let shift = |c: usize| if c >= at { c + ANNOTATION_COLS } else { c };
        Self {
            unified_invoice_number: at,
            invoice_amount: at + 1,
            matched: at + 2,
            amount: shift(cols.amount),
            exchange_rate: shift(cols.exchange_rate),
            invoice_number: shift(cols.invoice_number),
            text: shift(cols.text),
            invoice_date: shift(cols.invoice_date),
            account_description: shift(cols.account_description),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExternalSalesRow<'a> {
    pub account_description: &'a CellValue,
    pub amount: &'a CellValue,
    pub exchange_rate: &'a CellValue,
    pub invoice_number: &'a CellValue,
    pub text: &'a CellValue,
    pub invoice_date: &'a CellValue,
}

impl<'a> ExternalSalesRow<'a> {
    pub fn decode(sheet: &'a Sheet, row: usize, cols: &ExternalSalesColumns) -> Self {
        Self {
            account_description: sheet.get(row, cols.account_description),
            amount: sheet.get(row, cols.amount),
            exchange_rate: sheet.get(row, cols.exchange_rate),
            invoice_number: sheet.get(row, cols.invoice_number),
            text: sheet.get(row, cols.text),
            invoice_date: sheet.get(row, cols.invoice_date),
        }
    }

    pub fn is_eligible_receivable(&self, markers: &Markers) -> bool {
        amount::is_eligible_receivable(
            &self.account_description.display(),
            self.amount,
            &markers.ar_label,
        )
    }

    /// Build the target transaction. An amount that is not a number carries
    /// through as NaN and never matches.
    pub fn to_transaction(&self) -> Result<Transaction, ReconError> {
        let amount_local = cell_amount(self.amount).ok().flatten().unwrap_or(f64::NAN);

        let (mode, rate, amount_foreign) = if amount::is_foreign_currency_target(self.exchange_rate)? {
            let rate = cell_amount(self.exchange_rate)?.unwrap_or(1.0);
            (CurrencyMode::Foreign, rate, amount_local / rate)
        } else {
            (CurrencyMode::Local, 1.0, 0.0)
        };

        Ok(Transaction::new(
            self.invoice_number.display(),
            self.text.display(),
            date_text(self.invoice_date, Origin::GeneralLedger),
            amount_local,
            amount_foreign,
            mode,
            rate,
            Origin::GeneralLedger,
        ))
    }
}

/// Date cells rendered in the origin's text format; text passes through.
fn date_text(cell: &CellValue, origin: Origin) -> String {
    match cell {
        CellValue::Date(d) => d.format(origin.date_format()).to_string(),
        other => other.display(),
    }
}

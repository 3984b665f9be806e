//! General ledger → external sales: keep accounts-receivable vouchers and
//! insert the annotation columns the matcher fills in.

use crate::config::Settings;
use crate::error::ReconError;
use crate::layout::{ExternalSalesColumns, LedgerRow, ANNOTATION_COLS};
use crate::model::PreprocessOutput;
use crate::sheet::{CellValue, Sheet, SheetLayout};

pub const EXTERNAL_SALES_SHEET: &str = "Sheet0";
pub const HEADER_UNIFIED_INVOICE_NO: &str = "統一發票號碼";
pub const HEADER_INVOICE_AMOUNT: &str = "發票稅後\t台幣總金額\t(美金報價)";
pub const HEADER_MATCHED: &str = "比對";

const DEFAULT_FONT: &str = "Calibri";
const DEFAULT_COL_WIDTH: f64 = 12.0;
/// Header autofilter spans A1:Z1.
const AUTOFILTER_LAST_COL: usize = 25;

/// Build the external-sales sheet from a general-ledger sheet.
///
/// The header row is copied verbatim. A data row is kept when its voucher
/// type equals the configured marker and its account description contains
/// the AR label after the first character.
pub fn preprocess(ledger: &Sheet, settings: &Settings) -> Result<PreprocessOutput, ReconError> {
    let Some(header) = ledger.row(0) else {
        return Err(ReconError::EmptySheet(ledger.name.clone()));
    };

    let gl_cols = &settings.ledger_columns;
    let mut sheet = Sheet::new(EXTERNAL_SALES_SHEET);
    sheet.push_row(header.to_vec());

    let mut retained = 0;
    let mut skipped = 0;
    for (idx, row) in ledger.rows().iter().enumerate().skip(1) {
        if LedgerRow::decode(ledger, idx, gl_cols).is_receivable_voucher(&settings.markers) {
            sheet.push_row(row.clone());
            retained += 1;
        } else {
            skipped += 1;
        }
    }

    let cols = ExternalSalesColumns::from_ledger(gl_cols);
    sheet.insert_cols(gl_cols.insert_at, ANNOTATION_COLS);
    sheet.set(0, cols.unified_invoice_number, CellValue::text(HEADER_UNIFIED_INVOICE_NO));
    sheet.set(0, cols.invoice_amount, CellValue::text(HEADER_INVOICE_AMOUNT));
    sheet.set(0, cols.matched, CellValue::text(HEADER_MATCHED));
    sheet.layout = external_sales_layout(&cols);

    tracing::info!(
        "general ledger '{}': {} rows kept, {} rows skipped",
        ledger.name,
        retained,
        skipped
    );

    Ok(PreprocessOutput {
        sheet,
        retained,
        skipped,
    })
}

/// Presentation of the external-sales workbook.
pub fn external_sales_layout(cols: &ExternalSalesColumns) -> SheetLayout {
    let mut layout = SheetLayout {
        default_col_width: Some(DEFAULT_COL_WIDTH),
        font_name: Some(DEFAULT_FONT.into()),
        wrap_cols: vec![cols.invoice_amount],
        autofilter: Some((0, 0, 0, AUTOFILTER_LAST_COL)),
        ..Default::default()
    };
    layout.col_widths.insert(2, 16.0);
    layout.col_widths.insert(14, 28.0);
    layout.col_widths.insert(cols.unified_invoice_number, 20.0);
    layout
}

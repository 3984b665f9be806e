//! File-level driver: read the workbooks, run the engine, write the
//! annotated documents back.

use std::path::{Path, PathBuf};

use ledgermatch_recon::layout::ExternalSalesColumns;
use ledgermatch_recon::preprocess::external_sales_layout;
use ledgermatch_recon::{preprocess, reconcile, PreprocessOutput, ReconcileOutput, RunContext};

use crate::error::IoError;
use crate::xlsx::{read_sheet, read_workbook, write_sheet, write_workbooks};

/// Path the annotated copy of `input` is written to. Legacy `.xls`
/// workbooks are written next to the original as `.xlsx`.
pub fn writable_path(input: &Path) -> PathBuf {
    let is_xls = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xls"));
    if is_xls {
        input.with_extension("xlsx")
    } else {
        input.to_path_buf()
    }
}

/// Stage 1: general ledger → external-sales workbook.
pub fn run_preprocess(
    ledger_path: &Path,
    external_sales_path: &Path,
    ctx: &mut RunContext<'_>,
) -> Result<PreprocessOutput, IoError> {
    ctx.notify("1. 讀取總帳資料");
    let ledger = read_sheet(ledger_path, None)?;

    ctx.notify("2. 篩選應收帳款傳票");
    let output = preprocess(&ledger, ctx.settings)?;

    ctx.notify("3. 寫入外銷明細");
    write_sheet(external_sales_path, &output.sheet)?;
    tracing::info!(
        "external sales written to '{}' ({} rows)",
        external_sales_path.display(),
        output.retained
    );
    Ok(output)
}

/// Stage 2: invoice detail ↔ external sales. Both documents are rewritten
/// with their annotations; every other sheet of the invoice workbook is
/// carried through. Nothing is written if matching or any save fails.
pub fn run_match(
    invoice_path: &Path,
    external_sales_path: &Path,
    ctx: &mut RunContext<'_>,
) -> Result<ReconcileOutput, IoError> {
    ctx.notify("4. 讀取發票明細");
    let invoice_sheet = ctx.settings.output.invoice_sheet.clone();
    let mut workbook = read_workbook(invoice_path)?;
    let idx = workbook
        .iter()
        .position(|s| s.name == invoice_sheet)
        .ok_or_else(|| IoError::MissingSheet {
            path: invoice_path.to_path_buf(),
            sheet: invoice_sheet.clone(),
        })?;
    let external_sales = read_sheet(external_sales_path, None)?;

    ctx.notify("5. 比對發票與外銷明細");
    let mut output = reconcile(&workbook[idx], &external_sales, ctx)?;

    ctx.notify("6. 寫入比對結果");
    let invoice_out = writable_path(invoice_path);
    if invoice_out != invoice_path {
        tracing::warn!(
            "'{}' is a legacy workbook; annotated copy written to '{}'",
            invoice_path.display(),
            invoice_out.display()
        );
    }
    workbook[idx] = output.invoices.clone();

    // Re-read sheets carry no layout; restore the external-sales presentation
    let es_cols = ExternalSalesColumns::from_ledger(&ctx.settings.ledger_columns);
    output.external_sales.layout = external_sales_layout(&es_cols);
    write_workbooks(&[
        (invoice_out.as_path(), workbook.as_slice()),
        (external_sales_path, std::slice::from_ref(&output.external_sales)),
    ])?;
    tracing::info!(
        "{} sheets written to '{}'",
        workbook.len(),
        invoice_out.display()
    );

    Ok(output)
}

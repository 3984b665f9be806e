//! Invoice detail ↔ external sales matching.
//!
//! Every non-void invoice is compared against every eligible external-sales
//! row. All hits are annotated: one invoice may mark several ledger rows
//! (split postings), and a later invoice overwrites an earlier annotation on
//! the same ledger row.

use crate::context::RunContext;
use crate::error::ReconError;
use crate::layout::{ExternalSalesColumns, ExternalSalesRow, InvoiceRow};
use crate::model::{InvoiceOutcome, MatchOutcome, MatchStats, ReconcileOutput};
use crate::sheet::{CellValue, Sheet};

pub const HEADER_INVOICE_CHECKED: &str = "發票配對";
pub const INVOICE_VOID: &str = "作廢";
pub const INVOICE_MATCHED: &str = "是";
pub const INVOICE_UNMATCHED: &str = "否";
pub const LEDGER_MATCHED: &str = "配對";

const BANNER_RULE: &str = "==========================================================";

/// Match invoices against the external-sales sheet and return both sheets
/// annotated. Parse failures abort the run with no output.
pub fn reconcile(
    invoices: &Sheet,
    external_sales: &Sheet,
    ctx: &mut RunContext<'_>,
) -> Result<ReconcileOutput, ReconError> {
    if invoices.row_count() == 0 {
        return Err(ReconError::EmptySheet(invoices.name.clone()));
    }
    if external_sales.row_count() == 0 {
        return Err(ReconError::EmptySheet(external_sales.name.clone()));
    }

    let settings = ctx.settings;
    let markers = &settings.markers;
    let threshold_ratio = settings.matching.threshold_ratio;
    let checked_col = settings.invoice_columns.checked;
    let es_cols = ExternalSalesColumns::from_ledger(&settings.ledger_columns);

    if let Some(range) = ctx.date_range {
        tracing::warn!(
            "invoice date range {} - {} is not applied; all invoice rows are matched",
            range.begin.format("%Y/%m/%d"),
            range.end.format("%Y/%m/%d")
        );
    }

    let eligible: Vec<usize> = (1..external_sales.row_count())
        .filter(|&jt| ExternalSalesRow::decode(external_sales, jt, &es_cols).is_eligible_receivable(markers))
        .collect();

    let mut invoices_out = invoices.clone();
    let mut sales_out = external_sales.clone();
    invoices_out.set(0, checked_col, CellValue::text(HEADER_INVOICE_CHECKED));

    let mut stats = MatchStats {
        eligible_ledger_rows: eligible.len(),
        ..Default::default()
    };
    let mut outcomes = Vec::with_capacity(invoices.row_count().saturating_sub(1));
    let total_rows = invoices.row_count();

    for js in 1..total_rows {
        ctx.progress(js as f64 / total_rows as f64 * 100.0);
        stats.invoices_scanned += 1;

        let row = InvoiceRow::decode(invoices, js, &settings.invoice_columns);
        if row.is_void(markers) {
            tracing::info!("row {}: invoice {} is void, skipped", js + 1, row.number.display());
            invoices_out.set(js, checked_col, CellValue::text(INVOICE_VOID));
            stats.void += 1;
            outcomes.push(InvoiceOutcome {
                row: js + 1,
                invoice_number: row.number.display(),
                outcome: MatchOutcome::Void,
                ledger_rows: Vec::new(),
            });
            continue;
        }

        let source = row.to_transaction(markers).map_err(|e| e.at_row(js + 1))?;
        tracing::info!("row {}: source transaction\n{}", js + 1, source);

        let mut ledger_rows = Vec::new();
        for &jt in &eligible {
            let target = ExternalSalesRow::decode(external_sales, jt, &es_cols)
                .to_transaction()
                .map_err(|e| e.at_row(jt + 1))?;
            if !source.matches(&target, threshold_ratio) {
                continue;
            }

            stats.match_count += 1;
            tracing::info!(">>>>>>>>>>>>>> 找到匹配交易紀錄 <<<<<<<<<<<<<<<");
            tracing::info!("已匹配交易數量: {}", stats.match_count);
            tracing::info!("external sales row {}\n{}", jt + 1, target);
            tracing::info!("{BANNER_RULE}");

            invoices_out.set(js, checked_col, CellValue::text(INVOICE_MATCHED));
            sales_out.set(jt, es_cols.unified_invoice_number, CellValue::text(source.invoice_number.clone()));
            sales_out.set(jt, es_cols.invoice_amount, CellValue::Currency(source.amount_local));
            sales_out.set(jt, es_cols.matched, CellValue::text(LEDGER_MATCHED));
            ledger_rows.push(jt + 1);
        }

        let outcome = if ledger_rows.is_empty() {
            tracing::info!(
                ">>>>>>>>>>>>>> 無法找到匹配交易紀錄 <<<<<<<<<<<<<<<, {} eligible rows scanned",
                eligible.len()
            );
            tracing::info!("{BANNER_RULE}");
            invoices_out.set(js, checked_col, CellValue::text(INVOICE_UNMATCHED));
            stats.unmatched += 1;
            MatchOutcome::Unmatched
        } else {
            stats.matched_invoices += 1;
            MatchOutcome::Matched
        };

        outcomes.push(InvoiceOutcome {
            row: js + 1,
            invoice_number: source.invoice_number,
            outcome,
            ledger_rows,
        });
    }
    ctx.progress(100.0);

    tracing::info!(
        "matching done: {} invoices, {} void, {} matched, {} unmatched, {} ledger hits",
        stats.invoices_scanned,
        stats.void,
        stats.matched_invoices,
        stats.unmatched,
        stats.match_count
    );

    Ok(ReconcileOutput {
        invoices: invoices_out,
        external_sales: sales_out,
        stats,
        outcomes,
    })
}

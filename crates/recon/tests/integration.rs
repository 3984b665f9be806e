use std::path::PathBuf;

use ledgermatch_recon::reconcile::{INVOICE_MATCHED, INVOICE_UNMATCHED, INVOICE_VOID, LEDGER_MATCHED};
use ledgermatch_recon::{
    preprocess, reconcile, CellValue, MatchOutcome, MatchStats, NoopSink, RunContext, RunSink,
    Settings, Sheet,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn text_row(cells: &[&str]) -> Vec<CellValue> {
    cells.iter().map(|c| CellValue::text(*c)).collect()
}

fn gl_row(voucher: &str, kind: &str, desc: &str, amount: CellValue, rate: f64, buyer: &str) -> Vec<CellValue> {
    vec![
        voucher.into(),
        kind.into(),
        desc.into(),
        amount,
        CellValue::Number(rate),
        "".into(),
        buyer.into(),
        "03/05/2021".into(),
    ]
}

/// Raw ledger export: three AR vouchers, one journal voucher, one revenue line.
fn general_ledger() -> Sheet {
    Sheet::from_rows(
        "總帳",
        vec![
            text_row(&["傳票號碼", "傳票類別", "科目名稱", "金額", "匯率", "發票號碼", "摘要", "發票日期"]),
            gl_row("F-0301", "F", "1191 應收帳款", CellValue::Number(10000.0), 1.0, "雅博股份有限公司"),
            gl_row("F-0302", "F", "1191 應收帳款", CellValue::Number(30500.0), 30.5, "京傳企業股份"),
            gl_row("F-0303", "F", "1191 應收帳款", CellValue::text("5,000"), 1.0, "星辰科技"),
            gl_row("J-0304", "J", "1191 應收帳款", CellValue::Number(10000.0), 1.0, "雅博股份有限公司"),
            gl_row("F-0305", "F", "4101 銷貨收入", CellValue::Number(10000.0), 1.0, "雅博股份有限公司"),
        ],
    )
}

fn invoice_detail() -> Sheet {
    Sheet::from_rows(
        "Sheet0",
        vec![
            text_row(&["發票狀態", "發票號碼", "買方名稱", "發票日期", "總計", "備註"]),
            text_row(&["作廢", "AB00000001", "雅博股份有限公司", "2021/03/01", "10,000", ""]),
            text_row(&["開立", "AB00000002", "雅博股份有限公司", "2021/03/05", "10,050", ""]),
            text_row(&[
                "開立",
                "AB00000003",
                "京傳企業股份有限公司",
                "2021/03/06",
                "30,150",
                "匯率：@30.15, 美金金額 1,000.00",
            ]),
        ],
    )
}

#[derive(Default)]
struct Recorder {
    progress: Vec<f64>,
}

impl RunSink for Recorder {
    fn progress(&mut self, percent: f64) {
        self.progress.push(percent);
    }
}

#[test]
fn end_to_end_month_close() {
    let settings = Settings::default();
    let pre = preprocess(&general_ledger(), &settings).unwrap();
    assert_eq!(pre.retained, 3);
    assert_eq!(pre.skipped, 2);

    let mut sink = Recorder::default();
    let out = {
        let mut ctx = RunContext::new(&settings, &mut sink);
        reconcile(&invoice_detail(), &pre.sheet, &mut ctx).unwrap()
    };

    assert_eq!(
        out.stats,
        MatchStats {
            invoices_scanned: 3,
            void: 1,
            matched_invoices: 2,
            unmatched: 0,
            eligible_ledger_rows: 3,
            match_count: 2,
        }
    );

    let inv = &out.invoices;
    assert_eq!(inv.get(1, 6), &CellValue::text(INVOICE_VOID));
    assert_eq!(inv.get(2, 6), &CellValue::text(INVOICE_MATCHED));
    assert_eq!(inv.get(3, 6), &CellValue::text(INVOICE_MATCHED));

    let es = &out.external_sales;
    assert_eq!(es.get(1, 3), &CellValue::text("AB00000002"));
    assert_eq!(es.get(1, 4), &CellValue::Currency(10050.0));
    assert_eq!(es.get(1, 5), &CellValue::text(LEDGER_MATCHED));
    assert_eq!(es.get(2, 3), &CellValue::text("AB00000003"));
    assert_eq!(es.get(2, 4), &CellValue::Currency(30150.0));
    assert!(es.get(3, 3).is_empty());
    assert!(es.get(3, 5).is_empty());

    let outcomes: Vec<MatchOutcome> = out.outcomes.iter().map(|o| o.outcome).collect();
    assert_eq!(outcomes, vec![MatchOutcome::Void, MatchOutcome::Matched, MatchOutcome::Matched]);
    assert_eq!(out.outcomes[2].ledger_rows, vec![3]);

    assert_eq!(sink.progress.last(), Some(&100.0));
    assert_eq!(sink.progress.len(), 4);
}

#[test]
fn inputs_are_not_mutated() {
    let settings = Settings::default();
    let pre = preprocess(&general_ledger(), &settings).unwrap();
    let invoices = invoice_detail();
    let mut sink = NoopSink;
    let mut ctx = RunContext::new(&settings, &mut sink);
    reconcile(&invoices, &pre.sheet, &mut ctx).unwrap();

    assert!(invoices.get(2, 6).is_empty());
    assert!(pre.sheet.get(1, 3).is_empty());
}

#[test]
fn strict_tolerance_from_fixture() {
    let toml = std::fs::read_to_string(fixtures_dir().join("strict.toml")).unwrap();
    let settings = Settings::from_toml(&toml).unwrap();
    assert_eq!(settings.output.external_sales, "External_Sales_Mar.xlsx");
    // Untouched sections keep their defaults
    assert_eq!(settings.markers.void_status, "作廢");

    let pre = preprocess(&general_ledger(), &settings).unwrap();
    let mut sink = NoopSink;
    let mut ctx = RunContext::new(&settings, &mut sink);
    let out = reconcile(&invoice_detail(), &pre.sheet, &mut ctx).unwrap();

    // 10,050 vs 10,000 is outside 0.1%; the USD invoice is still exact
    assert_eq!(out.invoices.get(2, 6), &CellValue::text(INVOICE_UNMATCHED));
    assert_eq!(out.invoices.get(3, 6), &CellValue::text(INVOICE_MATCHED));
    assert_eq!(out.stats.unmatched, 1);
    assert_eq!(out.stats.match_count, 1);
}

#[test]
fn same_ledger_row_claimed_twice_keeps_last_invoice() {
    let settings = Settings::default();
    let pre = preprocess(&general_ledger(), &settings).unwrap();
    let mut invoices = invoice_detail();
    invoices.push_row(text_row(&["開立", "AB00000004", "雅博股份有限公司", "2021/03/07", "9,990", ""]));

    let mut sink = NoopSink;
    let mut ctx = RunContext::new(&settings, &mut sink);
    let out = reconcile(&invoices, &pre.sheet, &mut ctx).unwrap();

    assert_eq!(out.external_sales.get(1, 3), &CellValue::text("AB00000004"));
    assert_eq!(out.external_sales.get(1, 4), &CellValue::Currency(9990.0));
    assert_eq!(out.stats.matched_invoices, 3);
    assert_eq!(out.stats.match_count, 3);
}

#[test]
fn unparseable_ledger_rate_aborts() {
    let settings = Settings::default();
    let mut ledger = general_ledger();
    ledger.set(1, 4, CellValue::text("三十"));
    let pre = preprocess(&ledger, &settings).unwrap();

    let mut sink = NoopSink;
    let mut ctx = RunContext::new(&settings, &mut sink);
    let err = reconcile(&invoice_detail(), &pre.sheet, &mut ctx).unwrap_err();
    assert_eq!(err.to_string(), "row 2: cannot parse exchange rate '三十'");
}

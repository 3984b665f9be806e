// Excel import (xls, xlsx via calamine) and export (xlsx via rust_xlsxwriter)

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Datelike, NaiveDate};
use ledgermatch_recon::sheet::{CURRENCY_FORMAT, DATE_FORMAT};
use ledgermatch_recon::{CellValue, Sheet, SheetLayout};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet, XlsxError};
use tempfile::NamedTempFile;

use crate::error::IoError;

/// Days from 0001-01-01 (CE day 1) to the Excel 1900-system epoch, 1899-12-30.
const EXCEL_EPOCH_CE_DAYS: i32 = 693_594;

/// Largest serial Excel can display (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Read one sheet into the engine model. `None` reads the first sheet.
///
/// Cells keep their native type: numbers stay numbers, date-formatted cells
/// become dates, and empty strings are dropped. Formula cells keep their
/// cached value in the grid and their text alongside.
pub fn read_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet, IoError> {
    let mut workbook = open(path)?;
    let names = workbook.sheet_names();
    let name = match sheet_name {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| IoError::MissingSheet {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
            })?,
        None => names.first().cloned().ok_or_else(|| IoError::Read {
            path: path.to_path_buf(),
            sheet: String::new(),
            message: "workbook contains no sheets".into(),
        })?,
    };
    load_sheet(&mut workbook, path, &name)
}

/// Read every sheet of a workbook, in workbook order.
pub fn read_workbook(path: &Path) -> Result<Vec<Sheet>, IoError> {
    let mut workbook = open(path)?;
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(IoError::Read {
            path: path.to_path_buf(),
            sheet: String::new(),
            message: "workbook contains no sheets".into(),
        });
    }
    names
        .iter()
        .map(|name| load_sheet(&mut workbook, path, name))
        .collect()
}

fn open(path: &Path) -> Result<Sheets<BufReader<File>>, IoError> {
    open_workbook_auto(path).map_err(|e| IoError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_sheet(workbook: &mut Sheets<BufReader<File>>, path: &Path, name: &str) -> Result<Sheet, IoError> {
    let range = workbook.worksheet_range(name).map_err(|e| IoError::Read {
        path: path.to_path_buf(),
        sheet: name.to_string(),
        message: e.to_string(),
    })?;

    let mut sheet = Sheet::new(name);
    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    for (row_idx, row) in range.rows().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let value = import_cell(cell);
            if value.is_empty() {
                continue;
            }
            sheet.set(start_row as usize + row_idx, start_col as usize + col_idx, value);
        }
    }

    match workbook.worksheet_formula(name) {
        Ok(formulas) => {
            let (start_row, start_col) = formulas.start().unwrap_or((0, 0));
            for (row_idx, row) in formulas.rows().enumerate() {
                for (col_idx, formula) in row.iter().enumerate() {
                    if formula.is_empty() {
                        continue;
                    }
                    let (r, c) = (start_row as usize + row_idx, start_col as usize + col_idx);
                    // Formulas with an empty cached result still need a grid slot
                    if sheet.get(r, c).is_empty() {
                        sheet.set(r, c, CellValue::Empty);
                    }
                    sheet.set_formula(r, c, formula.as_str());
                }
            }
        }
        Err(e) => tracing::warn!(
            "'{}' sheet '{}': formulas not readable, cached values kept: {}",
            path.display(),
            name,
            e
        ),
    }

    tracing::debug!(
        "read '{}' sheet '{}': {} rows x {} cols",
        path.display(),
        sheet.name,
        sheet.row_count(),
        sheet.col_count()
    );
    Ok(sheet)
}

fn import_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            serial_to_date(serial).map_or(CellValue::Number(serial), CellValue::Date)
        }
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map_or_else(|| CellValue::Text(s.clone()), CellValue::Date),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Calendar date of an Excel 1900-system serial; the time part is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(serial.floor() as i32 + EXCEL_EPOCH_CE_DAYS)
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - EXCEL_EPOCH_CE_DAYS)
}

/// Write `sheet` as a single-sheet xlsx workbook, replacing `path`.
pub fn write_sheet(path: &Path, sheet: &Sheet) -> Result<(), IoError> {
    write_workbook(path, std::slice::from_ref(sheet))
}

/// Write `sheets` as one xlsx workbook, replacing `path`.
///
/// Currency cells get the currency number format, date cells the date
/// format, formula cells their formula with the cached value as result.
/// Each sheet layout supplies font, widths, wrapping and autofilter.
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<(), IoError> {
    build_workbook(path, sheets)?
        .save(path)
        .map_err(|e| write_error(path, e))?;
    tracing::debug!("wrote '{}': {} sheets", path.display(), sheets.len());
    Ok(())
}

/// Replace several workbooks together. Every workbook is first saved to a
/// temporary file next to its target; targets are only replaced once all of
/// them saved, so a failed save leaves every target untouched.
pub fn write_workbooks(outputs: &[(&Path, &[Sheet])]) -> Result<(), IoError> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, sheets) in outputs {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(dir).map_err(|e| IoError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        build_workbook(path, sheets)?
            .save(temp.path())
            .map_err(|e| write_error(path, e))?;
        staged.push((temp, *path));
    }

    for (temp, path) in staged {
        temp.persist(path).map_err(|e| IoError::Write {
            path: path.to_path_buf(),
            message: e.error.to_string(),
        })?;
        tracing::debug!("replaced '{}'", path.display());
    }
    Ok(())
}

fn build_workbook(path: &Path, sheets: &[Sheet]) -> Result<Workbook, IoError> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .map_err(|e| write_error(path, e))?;
        export_sheet_cells(worksheet, sheet).map_err(|e| write_error(path, e))?;
        apply_layout(worksheet, &sheet.layout, sheet.col_count()).map_err(|e| write_error(path, e))?;
    }
    Ok(workbook)
}

fn export_sheet_cells(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), XlsxError> {
    let layout = &sheet.layout;
    let base = base_format(layout);

    for (r, row) in sheet.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (row32, col16) = (r as u32, c as u16);
            let mut format = base.clone();
            if layout.wrap_cols.contains(&c) {
                format = format.set_text_wrap();
            }
            format = match cell {
                CellValue::Currency(_) => format.set_num_format(CURRENCY_FORMAT),
                CellValue::Date(_) => format.set_num_format(DATE_FORMAT),
                _ => format,
            };

            if let Some(text) = sheet.formula(r, c) {
                let formula = Formula::new(text).set_result(cell.display());
                worksheet.write_formula_with_format(row32, col16, formula, &format)?;
                continue;
            }

            match cell {
                CellValue::Empty => continue,
                CellValue::Text(s) => worksheet.write_string_with_format(row32, col16, s, &format)?,
                CellValue::Number(n) | CellValue::Currency(n) => {
                    worksheet.write_number_with_format(row32, col16, *n, &format)?
                }
                CellValue::Date(d) => worksheet.write_number_with_format(row32, col16, date_to_serial(*d), &format)?,
            };
        }
    }
    Ok(())
}

fn base_format(layout: &SheetLayout) -> Format {
    match &layout.font_name {
        Some(font) => Format::new().set_font_name(font),
        None => Format::new(),
    }
}

fn apply_layout(worksheet: &mut Worksheet, layout: &SheetLayout, col_count: usize) -> Result<(), XlsxError> {
    if let Some(width) = layout.default_col_width {
        for col in (0..col_count).filter(|c| !layout.col_widths.contains_key(c)) {
            worksheet.set_column_width(col as u16, width)?;
        }
    }
    for (col, width) in &layout.col_widths {
        worksheet.set_column_width(*col as u16, *width)?;
    }
    if let Some((min_r, min_c, max_r, max_c)) = layout.autofilter {
        worksheet.autofilter(min_r as u32, min_c as u16, max_r as u32, max_c as u16)?;
    }
    Ok(())
}

fn write_error(path: &Path, e: XlsxError) -> IoError {
    IoError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_date_conversion() {
        let d = NaiveDate::from_ymd_opt(2021, 3, 5).unwrap();
        assert_eq!(date_to_serial(d), 44260.0);
        assert_eq!(serial_to_date(44260.0), Some(d));
        // Time of day is dropped
        assert_eq!(serial_to_date(44260.75), Some(d));
        assert_eq!(serial_to_date(25569.0), NaiveDate::from_ymd_opt(1970, 1, 1));
    }

    #[test]
    fn serial_out_of_range() {
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(-3.0), None);
        assert_eq!(serial_to_date(f64::NAN), None);
        assert_eq!(serial_to_date(3_000_000.0), None);
    }

    #[test]
    fn import_cell_types() {
        assert_eq!(import_cell(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(import_cell(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(import_cell(&Data::String("作廢".into())), CellValue::text("作廢"));
        assert_eq!(import_cell(&Data::Bool(true)), CellValue::text("TRUE"));
        assert_eq!(
            import_cell(&Data::DateTimeIso("2021-03-05T00:00:00".into())),
            CellValue::Date(NaiveDate::from_ymd_opt(2021, 3, 5).unwrap())
        );
    }

    #[test]
    fn formulas_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("totals.xlsx");
        let mut sheet = Sheet::from_rows("Sheet0", vec![vec![1.0.into(), 2.0.into(), 3.0.into()]]);
        sheet.set_formula(0, 2, "A1+B1");
        write_sheet(&path, &sheet).unwrap();

        let read = read_workbook(&path).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].formula(0, 2), Some("A1+B1"));
        assert_eq!(read[0].formula(0, 0), None);
    }

    #[test]
    fn failed_staging_leaves_targets_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("invoices.xlsx");
        std::fs::write(&kept, b"original").unwrap();
        let unreachable = dir.path().join("missing").join("External_Sales.xlsx");
        let sheet = Sheet::from_rows("Sheet0", vec![vec![CellValue::text("x")]]);

        let err = write_workbooks(&[
            (kept.as_path(), std::slice::from_ref(&sheet)),
            (unreachable.as_path(), std::slice::from_ref(&sheet)),
        ])
        .unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
        assert_eq!(std::fs::read(&kept).unwrap(), b"original");
        assert!(!unreachable.exists());
        // No staged temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn staged_writes_replace_all_targets() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.xlsx");
        let b = dir.path().join("b.xlsx");
        std::fs::write(&a, b"stale").unwrap();
        let first = Sheet::from_rows("Sheet0", vec![vec![CellValue::text("a")]]);
        let second = Sheet::from_rows("Sheet1", vec![vec![CellValue::text("b")]]);

        write_workbooks(&[
            (a.as_path(), std::slice::from_ref(&first)),
            (b.as_path(), std::slice::from_ref(&second)),
        ])
        .unwrap();
        assert_eq!(read_sheet(&a, None).unwrap().get(0, 0), &CellValue::text("a"));
        assert_eq!(read_sheet(&b, Some("Sheet1")).unwrap().get(0, 0), &CellValue::text("b"));
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = read_sheet(Path::new("/nonexistent/ledger.xlsx"), None).unwrap_err();
        assert!(matches!(err, IoError::Open { .. }));
    }
}

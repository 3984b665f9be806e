// Spreadsheet I/O for the reconciliation pipeline

pub mod error;
pub mod pipeline;
pub mod xlsx;

pub use error::IoError;
pub use pipeline::{run_match, run_preprocess, writable_path};
pub use xlsx::{read_sheet, read_workbook, write_sheet, write_workbook, write_workbooks};

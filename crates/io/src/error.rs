use std::path::PathBuf;

use ledgermatch_recon::ReconError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// Workbook could not be opened (missing file, unsupported format).
    #[error("cannot open '{}': {message}", path.display())]
    Open { path: PathBuf, message: String },
    /// Sheet exists but its cells could not be read.
    #[error("cannot read sheet '{sheet}' of '{}': {message}", path.display())]
    Read {
        path: PathBuf,
        sheet: String,
        message: String,
    },
    #[error("sheet '{sheet}' not found in '{}'", path.display())]
    MissingSheet { path: PathBuf, sheet: String },
    #[error("cannot write '{}': {message}", path.display())]
    Write { path: PathBuf, message: String },
    #[error(transparent)]
    Recon(#[from] ReconError),
}

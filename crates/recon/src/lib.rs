//! `ledgermatch-recon`: invoice detail vs. general ledger reconciliation.
//!
//! Pure engine crate: receives pre-loaded sheets, returns annotated sheets
//! and match statistics. No CLI or file IO dependencies.

pub mod amount;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod model;
pub mod preprocess;
pub mod reconcile;
pub mod sheet;
pub mod transaction;

pub use config::Settings;
pub use context::{DateRange, NoopSink, RunContext, RunSink};
pub use error::ReconError;
pub use model::{InvoiceOutcome, MatchOutcome, MatchStats, PreprocessOutput, ReconcileOutput};
pub use preprocess::preprocess;
pub use reconcile::reconcile;
pub use sheet::{CellValue, Sheet, SheetLayout};
pub use transaction::{CurrencyMode, Origin, Transaction};

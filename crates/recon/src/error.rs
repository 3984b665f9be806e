use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Settings validation error (column collision, bad ratio, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A numeric amount cell could not be parsed.
    #[error("row {row}: cannot parse amount '{value}'")]
    AmountParse { row: usize, value: String },
    /// An exchange rate (remark slice or ledger rate cell) could not be parsed.
    #[error("row {row}: cannot parse exchange rate '{value}'")]
    RateParse { row: usize, value: String },
    /// Sheet has no header row.
    #[error("sheet '{0}' is empty")]
    EmptySheet(String),
}

impl ReconError {
    /// Attach the 1-based sheet row to a parse error raised without one.
    pub fn at_row(self, row: usize) -> Self {
        match self {
            Self::AmountParse { value, .. } => Self::AmountParse { row, value },
            Self::RateParse { value, .. } => Self::RateParse { row, value },
            other => other,
        }
    }
}

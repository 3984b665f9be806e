//! CLI Exit Code Registry
//!
//! Single source of truth for `lmatch` exit codes. Scripts driving the
//! monthly close rely on them.
//!
//! | Code | Description                                             |
//! |------|---------------------------------------------------------|
//! | 0    | Success                                                 |
//! | 2    | Usage error (bad arguments, bad dates, invalid config)  |
//! | 3    | I/O error (cannot open, read or write a workbook)       |
//! | 4    | Parse error (amount or exchange rate in the data)       |

use ledgermatch_io::IoError;
use ledgermatch_recon::ReconError;

/// Success - both stages completed and both documents were written.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, malformed or inverted dates, bad settings.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - workbook missing, unreadable, or not writable.
pub const EXIT_IO: u8 = 3;

/// Parse error - a cell in the input data could not be interpreted.
pub const EXIT_PARSE: u8 = 4;

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        ReconError::AmountParse { .. } | ReconError::RateParse { .. } | ReconError::EmptySheet(_) => EXIT_PARSE,
    }
}

pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Recon(inner) => recon_exit_code(inner),
        IoError::Open { .. } | IoError::Read { .. } | IoError::MissingSheet { .. } | IoError::Write { .. } => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parse_errors_map_to_parse_code() {
        let err = IoError::Recon(ReconError::RateParse { row: 3, value: "x".into() });
        assert_eq!(io_exit_code(&err), EXIT_PARSE);
    }

    #[test]
    fn config_errors_are_usage() {
        assert_eq!(recon_exit_code(&ReconError::ConfigValidation("x".into())), EXIT_USAGE);
    }

    #[test]
    fn missing_sheet_is_io() {
        let err = IoError::MissingSheet { path: PathBuf::from("a.xlsx"), sheet: "Sheet0".into() };
        assert_eq!(io_exit_code(&err), EXIT_IO);
    }
}

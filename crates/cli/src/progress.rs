//! Terminal rendering of run notifications.

use std::io::Write;

use ledgermatch_recon::RunSink;

/// Phase messages on their own line, matching progress as a single
/// rewritten `\r` line on stderr.
#[derive(Debug, Default)]
pub struct StderrProgress {
    last_percent: Option<u32>,
}

impl RunSink for StderrProgress {
    fn notify(&mut self, message: &str) {
        if self.last_percent.take().is_some() {
            eprintln!();
        }
        eprintln!("{message}");
    }

    fn progress(&mut self, percent: f64) {
        let whole = percent.floor() as u32;
        if self.last_percent == Some(whole) {
            return;
        }
        self.last_percent = Some(whole);
        eprint!("\r比對進度: {whole:>3}%");
        if whole >= 100 {
            eprintln!();
            self.last_percent = None;
        }
        let _ = std::io::stderr().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_percent_is_skipped() {
        let mut bar = StderrProgress::default();
        bar.progress(33.3);
        assert_eq!(bar.last_percent, Some(33));
        bar.progress(33.9);
        assert_eq!(bar.last_percent, Some(33));
        bar.progress(100.0);
        assert_eq!(bar.last_percent, None);
    }
}

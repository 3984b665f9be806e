use std::fmt;

use chrono::NaiveDate;

/// Characters of the source buyer name used as the substring prefix.
pub const BUYER_PREFIX_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyMode {
    /// Denominated in local currency (NTD).
    Local,
    /// Denominated in USD; the local amount is a converted figure.
    Foreign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    InvoiceDetail,
    GeneralLedger,
}

impl Origin {
    /// `strftime` pattern of `invoice_date` for this origin.
    pub fn date_format(&self) -> &'static str {
        match self {
            Self::InvoiceDetail => "%Y/%m/%d",
            Self::GeneralLedger => "%m/%d/%Y",
        }
    }
}

/// One invoice or ledger record normalized for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub invoice_number: String,
    pub buyer_name: String,
    pub invoice_date: String,
    pub amount_local: f64,
    pub amount_foreign: f64,
    pub currency_mode: CurrencyMode,
    pub exchange_rate: f64,
    pub origin: Origin,
}

impl Transaction {
    /// Invoice-detail rows in foreign mode derive `amount_foreign` from the
    /// local amount and rate; ledger rows keep the supplied figure.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_number: impl Into<String>,
        buyer_name: impl Into<String>,
        invoice_date: impl Into<String>,
        amount_local: f64,
        amount_foreign: f64,
        currency_mode: CurrencyMode,
        exchange_rate: f64,
        origin: Origin,
    ) -> Self {
        let amount_foreign = match (currency_mode, origin) {
            (CurrencyMode::Foreign, Origin::InvoiceDetail) => amount_local / exchange_rate,
            _ => amount_foreign,
        };
        Self {
            invoice_number: invoice_number.into(),
            buyer_name: buyer_name.into(),
            invoice_date: invoice_date.into(),
            amount_local,
            amount_foreign,
            currency_mode,
            exchange_rate,
            origin,
        }
    }

    /// Amount in this transaction's own currency.
    pub fn amount(&self) -> f64 {
        match self.currency_mode {
            CurrencyMode::Local => self.amount_local,
            CurrencyMode::Foreign => self.amount_foreign,
        }
    }

    /// Fuzzy match of this (source) transaction against `other` (target).
    ///
    /// - the first [`BUYER_PREFIX_CHARS`] characters of this buyer name must
    ///   occur somewhere in the target's buyer name;
    /// - the target amount, taken in *this* transaction's currency, must be
    ///   within `threshold_ratio` of this transaction's amount. The tolerance
    ///   is relative to the source, so the predicate is not symmetric.
    ///
    /// A non-numeric target amount never matches. Dates are not compared.
    pub fn matches(&self, other: &Transaction, threshold_ratio: f64) -> bool {
        let prefix: String = self.buyer_name.chars().take(BUYER_PREFIX_CHARS).collect();
        if !other.buyer_name.contains(&prefix) {
            return false;
        }

        let (source, target) = match self.currency_mode {
            CurrencyMode::Local => (self.amount_local, other.amount_local),
            CurrencyMode::Foreign => (self.amount_foreign, other.amount_foreign),
        };
        if !target.is_finite() {
            return false;
        }

        let threshold = source * threshold_ratio;
        let diff = target - source;
        diff.abs() <= threshold
    }

    fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.invoice_date, self.origin.date_format()).ok()
    }
}

/// Multi-line audit description, one field per line.
impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\t發票號碼: {}", self.invoice_number)?;
        writeln!(f, "\t買方名稱: {}", self.buyer_name)?;
        match self.parsed_date() {
            Some(date) => writeln!(f, "\t發票日期: {}", date)?,
            None => writeln!(f, "\t發票日期: {}", self.invoice_date)?,
        }
        match self.currency_mode {
            CurrencyMode::Foreign => {
                writeln!(f, "\t交易類型: 美金交易/交易匯率@ {}", self.exchange_rate)?;
                writeln!(f, "\t發票金額: {}", self.amount_local)?;
                writeln!(f, "\t美金/台幣匯率: {}", self.exchange_rate)?;
                write!(f, "\t交易美金金額: {:.2}", self.amount_foreign)
            }
            CurrencyMode::Local => {
                writeln!(f, "\t交易類型: 台幣交易")?;
                write!(f, "\t發票金額: {}", self.amount_local)
            }
        }
    }
}

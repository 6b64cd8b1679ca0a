//! Fungible token quantities in the chain's `"<amount> <SYMBOL>"` notation.
//!
//! The ledger works in integer base units (`amount * 10^precision`) so that
//! reservations never accumulate floating point drift.

use std::fmt;

use crate::core::SchedulerError;

/// A parsed token quantity such as `12.5000 CLUMBER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenQuantity {
    /// Amount in base units.
    pub amount: u64,
    /// Number of decimal places carried by the symbol.
    pub precision: u8,
    /// Token symbol.
    pub symbol: String,
}

impl TokenQuantity {
    /// Build a quantity from base units.
    pub fn new(amount: u64, precision: u8, symbol: impl Into<String>) -> Self {
        Self {
            amount,
            precision,
            symbol: symbol.into(),
        }
    }

    /// Parse the chain notation. The precision is taken from the number of
    /// fractional digits present.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Malformed`] for anything that is not
    /// `<digits>[.<digits>] <SYMBOL>`.
    pub fn parse(input: &str) -> Result<Self, SchedulerError> {
        let malformed = || SchedulerError::Malformed(format!("token quantity `{input}`"));

        let (number, symbol) = input.trim().split_once(' ').ok_or_else(malformed)?;
        let symbol = symbol.trim();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(malformed());
        }

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty()
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let precision = u8::try_from(fraction.len()).map_err(|_| malformed())?;
        let amount = format!("{whole}{fraction}")
            .parse::<u64>()
            .map_err(|_| malformed())?;

        Ok(Self::new(amount, precision, symbol))
    }

    /// Rescale to a different precision, truncating extra fractional digits.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn rescale(&self, precision: u8) -> Option<u64> {
        if precision >= self.precision {
            let factor = 10u64.checked_pow(u32::from(precision - self.precision))?;
            self.amount.checked_mul(factor)
        } else {
            let factor = 10u64.checked_pow(u32::from(self.precision - precision))?;
            Some(self.amount / factor)
        }
    }
}

impl fmt::Display for TokenQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precision == 0 {
            return write!(f, "{} {}", self.amount, self.symbol);
        }
        let scale = 10u64.pow(u32::from(self.precision));
        write!(
            f,
            "{}.{:0width$} {}",
            self.amount / scale,
            self.amount % scale,
            self.symbol,
            width = usize::from(self.precision)
        )
    }
}

/// Convert a whole-token amount (as written in configuration) to base units.
///
/// Returns `None` on overflow.
#[must_use]
pub fn whole_to_base_units(whole: u64, precision: u8) -> Option<u64> {
    10u64
        .checked_pow(u32::from(precision))
        .and_then(|scale| whole.checked_mul(scale))
}

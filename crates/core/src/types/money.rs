//! Decimal money types for dual-currency pricing.
//!
//! All monetary arithmetic uses [`rust_decimal::Decimal`] - never floating
//! point. Amounts accumulate unrounded; rounding to two fractional digits
//! happens only in the display helpers, so summing many discounted lines
//! never compounds rounding error.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A US-dollar amount backed by decimal arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Usd(Decimal);

impl Usd {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a raw decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole dollars.
    #[must_use]
    pub fn from_dollars(dollars: i64) -> Self {
        Self(Decimal::from(dollars))
    }

    /// Create an amount from cents (e.g., `1999` for $19.99).
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// The unrounded decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Apply a percentage discount (0-100).
    ///
    /// A zero or absent discount leaves the amount unchanged. Matches the
    /// pricing rule `p * (1 - d/100)` without intermediate rounding.
    #[must_use]
    pub fn with_discount(&self, percent: Decimal) -> Self {
        if percent > Decimal::ZERO {
            Self(self.0 * (Decimal::ONE - percent / Decimal::ONE_HUNDRED))
        } else {
            *self
        }
    }

    /// Multiply by a quantity of units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Rounded to cents, midpoint away from zero.
    ///
    /// Only display paths should call this; everything else stays unrounded.
    #[must_use]
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Format for display (e.g., `$19.99`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.rounded())
    }

    /// Convert into local currency at the given rate.
    #[must_use]
    pub fn in_local(&self, rate: ExchangeRate) -> LocalAmount {
        LocalAmount(self.0 * rate.per_usd())
    }
}

impl Add for Usd {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Usd {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Usd {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Local-currency units per US dollar (the BCV reference rate).
///
/// Treated as a volatile, eventually-stale read-only value. A rate is only
/// constructible when positive, so "rate not loaded yet" is always
/// `Option<ExchangeRate>::None`, never a zero that would render `$0.00 Bs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    /// Create a rate; returns `None` for zero or negative values.
    #[must_use]
    pub fn new(per_usd: Decimal) -> Option<Self> {
        (per_usd > Decimal::ZERO).then_some(Self(per_usd))
    }

    /// Local-currency units per one US dollar.
    #[must_use]
    pub const fn per_usd(&self) -> Decimal {
        self.0
    }
}

/// A dollar amount converted to local currency for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalAmount(Decimal);

impl LocalAmount {
    /// The unrounded decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display (e.g., `Bs 728.46`).
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("Bs {rounded:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("valid decimal literal")
    }

    #[test]
    fn test_discounted_line() {
        // $100 at 10% off, times 2 = $180.00
        let unit = Usd::from_dollars(100).with_discount(dec("10"));
        assert_eq!(unit.times(2), Usd::from_dollars(180));
        assert_eq!(unit.times(2).display(), "$180.00");
    }

    #[test]
    fn test_zero_discount_is_identity() {
        let price = Usd::from_cents(1999);
        assert_eq!(price.with_discount(Decimal::ZERO), price);
    }

    #[test]
    fn test_rounding_happens_once_at_display() {
        // Three units at $0.999 after discount: unrounded sum is $2.997,
        // displayed as $3.00. Per-line rounding would give $1.00 * 3 = $3.00
        // here, but the stored amount must stay exact.
        let unit = Usd::new(dec("0.999"));
        let total = unit.times(3);
        assert_eq!(total.amount(), dec("2.997"));
        assert_eq!(total.display(), "$3.00");
    }

    #[test]
    fn test_sum_accumulates_unrounded() {
        let lines = [Usd::new(dec("1.005")), Usd::new(dec("1.005"))];
        let total: Usd = lines.into_iter().sum();
        assert_eq!(total.amount(), dec("2.010"));
        assert_eq!(total.display(), "$2.01");
    }

    #[test]
    fn test_exchange_rate_rejects_non_positive() {
        assert!(ExchangeRate::new(Decimal::ZERO).is_none());
        assert!(ExchangeRate::new(dec("-36.5")).is_none());
        assert!(ExchangeRate::new(dec("36.52")).is_some());
    }

    #[test]
    fn test_local_conversion() {
        let rate = ExchangeRate::new(dec("36.5")).expect("positive rate");
        let local = Usd::from_dollars(10).in_local(rate);
        assert_eq!(local.amount(), dec("365.0"));
        assert_eq!(local.display(), "Bs 365.00");
    }
}

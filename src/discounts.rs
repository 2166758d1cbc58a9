//! Discounts

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to discount calculations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscountError {
    /// The percentage is outside `0..=100`.
    #[error("discount percentage {0} is outside 0..=100")]
    OutOfRange(Decimal),

    /// Percentage calculation could not be safely represented in minor units.
    #[error("percentage conversion overflowed")]
    PercentConversion,
}

/// Coupon errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponError {
    /// No code was entered.
    #[error("please enter a coupon code")]
    EmptyCode,

    /// The coupon validator turned the code down.
    #[error("{0}")]
    Rejected(String),
}

/// A percentage taken off an amount, in percent points (`15` is 15% off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct PercentOff(Decimal);

impl PercentOff {
    /// No discount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a percentage from percent points.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::OutOfRange`] if `points` is negative or above 100.
    pub fn new(points: Decimal) -> Result<Self, DiscountError> {
        if points < Decimal::ZERO || points > Decimal::ONE_HUNDRED {
            return Err(DiscountError::OutOfRange(points));
        }

        Ok(Self(points))
    }

    /// Percent points (`15` for 15%).
    #[must_use]
    pub fn points(self) -> Decimal {
        self.0
    }

    /// Calculates the discount on an amount in minor units, rounded half-up to
    /// a whole minor unit.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::PercentConversion`] if the result does not fit
    /// in an `i64`.
    pub fn of_minor(self, minor: i64) -> Result<i64, DiscountError> {
        let Some(applied) = Decimal::from(minor)
            .checked_mul(self.0)
            .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
        else {
            return Err(DiscountError::PercentConversion);
        };

        applied
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(DiscountError::PercentConversion)
    }
}

impl TryFrom<Decimal> for PercentOff {
    type Error = DiscountError;

    fn try_from(points: Decimal) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<PercentOff> for Decimal {
    fn from(percent: PercentOff) -> Self {
        percent.0
    }
}

impl fmt::Display for PercentOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// Sitewide promotion settings, loaded once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoConfig {
    /// Whether the promotion applies at all.
    pub enabled: bool,

    /// Percentage taken off the residual after the loyalty reward.
    pub discount_percent: PercentOff,

    /// Label shown next to the promotion line.
    pub label: String,
}

impl PromoConfig {
    /// A promotion that never applies.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            discount_percent: PercentOff::ZERO,
            label: String::new(),
        }
    }

    /// The percentage to apply, or `None` if the promotion is switched off.
    #[must_use]
    pub fn active_percent(&self) -> Option<PercentOff> {
        self.enabled.then_some(self.discount_percent)
    }
}

impl Default for PromoConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// A coupon accepted by the coupon validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCoupon {
    /// Normalised coupon code.
    pub code: String,

    /// Percentage taken off the residual after loyalty and promo discounts.
    pub discount_percent: PercentOff,
}

impl AppliedCoupon {
    /// Creates an applied coupon.
    #[must_use]
    pub fn new(code: impl Into<String>, discount_percent: PercentOff) -> Self {
        Self {
            code: code.into(),
            discount_percent,
        }
    }
}

/// Normalises user input into a coupon code: trimmed and upper-cased.
///
/// # Errors
///
/// Returns [`CouponError::EmptyCode`] for blank input.
pub fn normalize_coupon_code(raw: &str) -> Result<String, CouponError> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(CouponError::EmptyCode);
    }

    Ok(code.to_uppercase())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn percent_rejects_out_of_range() {
        assert_eq!(
            PercentOff::new(Decimal::from(101)),
            Err(DiscountError::OutOfRange(Decimal::from(101)))
        );

        assert!(PercentOff::new(Decimal::from(-1)).is_err());
        assert!(PercentOff::new(Decimal::ONE_HUNDRED).is_ok());
    }

    #[test]
    fn of_minor_rounds_half_up() -> TestResult {
        let percent = PercentOff::new(Decimal::from(15))?;

        // 0.15 * 8000 = 1200
        assert_eq!(percent.of_minor(8000)?, 1200);

        // 0.10 * 6805 = 680.5 -> 681
        assert_eq!(PercentOff::new(Decimal::from(10))?.of_minor(6805)?, 681);

        // 0.10 * 6804 = 680.4 -> 680
        assert_eq!(PercentOff::new(Decimal::from(10))?.of_minor(6804)?, 680);

        Ok(())
    }

    #[test]
    fn of_minor_handles_fractional_percentages() -> TestResult {
        let percent = PercentOff::new(Decimal::new(125, 1))?;

        // 12.5% of 299 = 37.375 -> 37
        assert_eq!(percent.of_minor(299)?, 37);

        Ok(())
    }

    #[test]
    fn of_minor_handles_extreme_amounts() -> TestResult {
        let percent = PercentOff::new(Decimal::ONE_HUNDRED)?;

        assert_eq!(percent.of_minor(i64::MAX)?, i64::MAX);
        assert_eq!(PercentOff::ZERO.of_minor(i64::MAX)?, 0);

        Ok(())
    }

    #[test]
    fn percent_deserializes_from_number() -> TestResult {
        let percent: PercentOff = serde_json::from_str("15")?;

        assert_eq!(percent.points(), Decimal::from(15));
        assert!(serde_json::from_str::<PercentOff>("150").is_err());

        Ok(())
    }

    #[test]
    fn percent_display_drops_trailing_zeros() -> TestResult {
        let percent = PercentOff::new(Decimal::new(1500, 2))?;

        assert_eq!(percent.to_string(), "15%");

        Ok(())
    }

    #[test]
    fn disabled_promo_has_no_active_percent() -> TestResult {
        let promo = PromoConfig {
            enabled: false,
            discount_percent: PercentOff::new(Decimal::from(15))?,
            label: "15% OFF SITEWIDE".to_string(),
        };

        assert_eq!(promo.active_percent(), None);
        assert_eq!(PromoConfig::default(), PromoConfig::disabled());

        Ok(())
    }

    #[test]
    fn coupon_codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_coupon_code("  spring10 "), Ok("SPRING10".to_string()));
        assert_eq!(normalize_coupon_code("   "), Err(CouponError::EmptyCode));
    }
}

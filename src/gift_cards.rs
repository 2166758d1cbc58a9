//! Gift cards
//!
//! A gift card goes through two steps before it offsets a total: the code is
//! checked against the gift-card service, which reports its balance, and the
//! checked card is then explicitly applied.

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::Serialize;
use thiserror::Error;

use crate::pricing::{decimal_to_minor, minor_to_decimal};

/// Largest top-up accepted, in minor units (500.00).
pub const MAX_TOP_UP_MINOR: i64 = 50_000;

/// Gift card errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GiftCardError {
    /// No code was entered.
    #[error("please enter a gift card code")]
    EmptyCode,

    /// The gift-card service does not know the code.
    #[error("{0}")]
    Rejected(String),

    /// The card exists but holds no balance.
    #[error("gift card {0} has no remaining balance")]
    ZeroBalance(String),

    /// `apply` was called without a checked card.
    #[error("check a gift card before applying it")]
    NothingChecked,

    /// The top-up amount is not positive or has more than two decimal places.
    #[error("invalid top-up amount: {0}")]
    InvalidAmount(Decimal),

    /// The top-up amount exceeds [`MAX_TOP_UP_MINOR`].
    #[error("top-up amount {0} exceeds the maximum of {max}", max = minor_to_decimal(MAX_TOP_UP_MINOR))]
    AboveMaximum(Decimal),
}

/// A gift card with the balance reported by the gift-card service.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftCardRedemption {
    code: String,
    balance: Money<'static, Currency>,
}

impl GiftCardRedemption {
    /// Creates a redemption for a checked card.
    ///
    /// # Errors
    ///
    /// Returns [`GiftCardError::ZeroBalance`] if the balance is not positive.
    pub fn new(
        code: impl Into<String>,
        balance: Money<'static, Currency>,
    ) -> Result<Self, GiftCardError> {
        let code = code.into();

        if balance.to_minor_units() <= 0 {
            return Err(GiftCardError::ZeroBalance(code));
        }

        Ok(Self { code, balance })
    }

    /// Gift card code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Balance as last reported.
    #[must_use]
    pub fn balance(&self) -> &Money<'static, Currency> {
        &self.balance
    }
}

/// How much of a gift card an order consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftCardUsage {
    /// Gift card code.
    pub code: String,

    /// Balance before the order.
    pub balance: Money<'static, Currency>,

    /// Amount taken from the balance: `min(balance, total)`.
    pub used: Money<'static, Currency>,
}

/// Gift card payload sent with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftCardPayload {
    /// Gift card code.
    pub code: String,

    /// Balance before the order.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,

    /// Amount taken from the balance.
    #[serde(with = "rust_decimal::serde::float")]
    pub used: Decimal,
}

impl From<&GiftCardUsage> for GiftCardPayload {
    fn from(usage: &GiftCardUsage) -> Self {
        Self {
            code: usage.code.clone(),
            balance: minor_to_decimal(usage.balance.to_minor_units()),
            used: minor_to_decimal(usage.used.to_minor_units()),
        }
    }
}

/// Checked and applied gift cards for a session.
#[derive(Debug, Clone, Default)]
pub struct GiftCardWallet {
    pending: Option<GiftCardRedemption>,
    applied: Option<GiftCardRedemption>,
}

impl GiftCardWallet {
    /// Stores a freshly checked card, replacing any earlier unapplied one.
    pub fn record_check(&mut self, redemption: GiftCardRedemption) -> &GiftCardRedemption {
        self.pending.insert(redemption)
    }

    /// Promotes the checked card to applied.
    ///
    /// # Errors
    ///
    /// Returns [`GiftCardError::NothingChecked`] if no card has been checked.
    pub fn apply(&mut self) -> Result<&GiftCardRedemption, GiftCardError> {
        let checked = self.pending.take().ok_or(GiftCardError::NothingChecked)?;

        Ok(self.applied.insert(checked))
    }

    /// Clears both the checked and the applied card.
    pub fn remove(&mut self) {
        self.pending = None;
        self.applied = None;
    }

    /// The checked card awaiting application.
    #[must_use]
    pub fn pending(&self) -> Option<&GiftCardRedemption> {
        self.pending.as_ref()
    }

    /// The applied card.
    #[must_use]
    pub fn applied(&self) -> Option<&GiftCardRedemption> {
        self.applied.as_ref()
    }
}

/// Trims a gift card code, rejecting blank input.
///
/// # Errors
///
/// Returns [`GiftCardError::EmptyCode`] for blank input.
pub fn normalize_gift_code(raw: &str) -> Result<String, GiftCardError> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(GiftCardError::EmptyCode);
    }

    Ok(code.to_string())
}

/// A validated top-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopUp {
    /// Amount in minor units.
    pub amount_minor: i64,

    /// Trimmed gift card code.
    pub code: String,
}

impl TopUp {
    /// Amount in major units, as sent on the wire.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        minor_to_decimal(self.amount_minor)
    }
}

/// Validates a top-up: the amount must be positive, have at most two decimal
/// places and not exceed [`MAX_TOP_UP_MINOR`]; the code must not be blank.
///
/// # Errors
///
/// Returns a [`GiftCardError`] describing the first failed check.
pub fn validate_top_up(amount: Decimal, code: &str) -> Result<TopUp, GiftCardError> {
    let code = normalize_gift_code(code)?;

    let amount_minor = decimal_to_minor(amount)
        .filter(|minor| *minor > 0)
        .ok_or(GiftCardError::InvalidAmount(amount))?;

    if amount_minor > MAX_TOP_UP_MINOR {
        return Err(GiftCardError::AboveMaximum(amount));
    }

    Ok(TopUp { amount_minor, code })
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::EUR;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn zero_balance_is_rejected() {
        assert_eq!(
            GiftCardRedemption::new("GC-1", Money::from_minor(0, EUR)),
            Err(GiftCardError::ZeroBalance("GC-1".to_string()))
        );
    }

    #[test]
    fn apply_requires_a_checked_card() -> TestResult {
        let mut wallet = GiftCardWallet::default();

        assert_eq!(wallet.apply(), Err(GiftCardError::NothingChecked));

        wallet.record_check(GiftCardRedemption::new("GC-1", Money::from_minor(3000, EUR))?);

        assert_eq!(wallet.apply()?.code(), "GC-1");
        assert!(wallet.pending().is_none());
        assert!(wallet.applied().is_some());

        Ok(())
    }

    #[test]
    fn remove_clears_pending_and_applied() -> TestResult {
        let mut wallet = GiftCardWallet::default();

        wallet.record_check(GiftCardRedemption::new("GC-1", Money::from_minor(3000, EUR))?);
        wallet.apply()?;
        wallet.record_check(GiftCardRedemption::new("GC-2", Money::from_minor(500, EUR))?);

        wallet.remove();

        assert!(wallet.pending().is_none());
        assert!(wallet.applied().is_none());

        Ok(())
    }

    #[test]
    fn top_up_validation() -> TestResult {
        let top_up = validate_top_up(Decimal::new(2550, 2), "  GC-1 ")?;

        assert_eq!(top_up.amount_minor, 2550);
        assert_eq!(top_up.code, "GC-1");
        assert_eq!(top_up.amount(), Decimal::new(2550, 2));

        assert_eq!(
            validate_top_up(Decimal::ZERO, "GC-1"),
            Err(GiftCardError::InvalidAmount(Decimal::ZERO))
        );
        assert_eq!(
            validate_top_up(Decimal::new(1001, 3), "GC-1"),
            Err(GiftCardError::InvalidAmount(Decimal::new(1001, 3)))
        );
        assert_eq!(
            validate_top_up(Decimal::new(50001, 2), "GC-1"),
            Err(GiftCardError::AboveMaximum(Decimal::new(50001, 2)))
        );
        assert_eq!(
            validate_top_up(Decimal::ONE, " "),
            Err(GiftCardError::EmptyCode)
        );

        assert!(validate_top_up(Decimal::new(500, 0), "GC-1").is_ok());

        Ok(())
    }

    #[test]
    fn payload_uses_major_units() -> TestResult {
        let usage = GiftCardUsage {
            code: "GC-1".to_string(),
            balance: Money::from_minor(3000, EUR),
            used: Money::from_minor(2000, EUR),
        };

        let json = serde_json::to_value(GiftCardPayload::from(&usage))?;

        assert_eq!(
            json,
            serde_json::json!({ "code": "GC-1", "balance": 30.0, "used": 20.0 })
        );

        Ok(())
    }
}

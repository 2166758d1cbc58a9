//! Pricing
//!
//! The pricing pipeline turns a cart plus the active discounts into a
//! [`Receipt`]. All arithmetic runs on whole minor units, so every
//! intermediate is already rounded to two decimal places; percentage
//! discounts are rounded half-up as they are computed.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError};
use thiserror::Error;
use tracing::debug;

use crate::{
    cart::Cart,
    discounts::{AppliedCoupon, DiscountError, PromoConfig},
    gift_cards::{GiftCardRedemption, GiftCardUsage},
    loyalty::{LoyaltyAllocation, LoyaltyConfig},
    receipt::Receipt,
};

/// Errors that can occur while pricing a cart.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// An amount does not fit in minor units.
    #[error("amount overflowed")]
    Overflow,

    /// Wrapped discount calculation error.
    #[error(transparent)]
    Discount(#[from] DiscountError),

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Converts a major-unit decimal into minor units.
///
/// Returns `None` for amounts with more than two decimal places or that do
/// not fit in an `i64`.
pub fn decimal_to_minor(amount: Decimal) -> Option<i64> {
    let minor = amount.checked_mul(Decimal::ONE_HUNDRED)?;

    if !minor.fract().is_zero() {
        return None;
    }

    minor.to_i64()
}

/// Converts minor units into a major-unit decimal.
pub fn minor_to_decimal(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Applies loyalty, promo, coupon and gift card in that fixed order.
#[derive(Debug, Clone, Default)]
pub struct PricingPipeline {
    loyalty: LoyaltyConfig,
    promo: PromoConfig,
}

impl PricingPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(loyalty: LoyaltyConfig, promo: PromoConfig) -> Self {
        Self { loyalty, promo }
    }

    /// Loyalty settings.
    #[must_use]
    pub fn loyalty(&self) -> &LoyaltyConfig {
        &self.loyalty
    }

    /// Sitewide promotion.
    #[must_use]
    pub fn promo(&self) -> &PromoConfig {
        &self.promo
    }

    /// Replaces the sitewide promotion.
    pub fn set_promo(&mut self, promo: PromoConfig) {
        self.promo = promo;
    }

    /// Prices the cart.
    ///
    /// Each discount is taken from the residual left by the previous ones:
    /// loyalty from the subtotal, then the promo, then the coupon. The gift
    /// card offsets the resulting total.
    ///
    /// # Errors
    ///
    /// - [`PricingError::Overflow`]: an amount does not fit in minor units.
    /// - [`PricingError::Money`]: the gift card is in another currency.
    pub fn price(
        &self,
        cart: &Cart,
        coupon: Option<&AppliedCoupon>,
        gift_card: Option<&GiftCardRedemption>,
    ) -> Result<Receipt, PricingError> {
        let currency = cart.currency();

        let subtotal = cart.iter().try_fold(0_i64, |acc, line| {
            line.line_total()
                .and_then(|total| acc.checked_add(total.to_minor_units()))
                .ok_or(PricingError::Overflow)
        })?;

        let total_items = cart.total_items();
        let free_items = self.loyalty.free_items(total_items);
        let allocation = LoyaltyAllocation::allocate(cart, free_items);

        let loyalty_discount = allocation.free_units().iter().try_fold(0_i64, |acc, free| {
            cart.get_line(free.line_idx)
                .and_then(|line| {
                    line.unit_price()
                        .to_minor_units()
                        .checked_mul(i64::from(free.units))
                })
                .and_then(|amount| acc.checked_add(amount))
                .ok_or(PricingError::Overflow)
        })?;

        let after_loyalty = subtotal
            .checked_sub(loyalty_discount)
            .ok_or(PricingError::Overflow)?;

        let promo_discount = match self.promo.active_percent() {
            Some(percent) => percent.of_minor(after_loyalty)?,
            None => 0,
        };

        let after_promo = after_loyalty
            .checked_sub(promo_discount)
            .ok_or(PricingError::Overflow)?;

        let coupon_discount = match coupon {
            Some(coupon) => coupon.discount_percent.of_minor(after_promo)?,
            None => 0,
        };

        let total = after_promo
            .checked_sub(coupon_discount)
            .ok_or(PricingError::Overflow)?
            .max(0);

        let gift_card = gift_card
            .map(|card| {
                let balance = *card.balance();

                if balance.currency() != currency {
                    return Err(MoneyError::CurrencyMismatch {
                        expected: currency.iso_alpha_code,
                        actual: balance.currency().iso_alpha_code,
                    });
                }

                Ok(GiftCardUsage {
                    code: card.code().to_string(),
                    balance,
                    used: Money::from_minor(balance.to_minor_units().min(total), currency),
                })
            })
            .transpose()?;

        let final_payment = total
            .checked_sub(gift_card.as_ref().map_or(0, |usage| usage.used.to_minor_units()))
            .ok_or(PricingError::Overflow)?;

        debug!(
            subtotal,
            loyalty_discount, promo_discount, coupon_discount, total, final_payment, "priced cart"
        );

        Ok(Receipt {
            subtotal: Money::from_minor(subtotal, currency),
            loyalty_discount: Money::from_minor(loyalty_discount, currency),
            promo_discount: Money::from_minor(promo_discount, currency),
            coupon_discount: Money::from_minor(coupon_discount, currency),
            total: Money::from_minor(total, currency),
            gift_card,
            final_payment: Money::from_minor(final_payment, currency),
            coupon: coupon.cloned(),
            allocation,
            progress: self.loyalty.progress(total_items),
            total_items,
            currency,
        })
    }
}

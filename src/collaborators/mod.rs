//! Collaborators
//!
//! Request/response services the shop depends on. Each one is a trait so the
//! session can run against [`HttpShopApi`] or a mock.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::ShopData,
    discounts::{AppliedCoupon, DiscountError, PercentOff, PromoConfig},
    gift_cards::GiftCardPayload,
    products::Category,
    receipt::PriceBreakdown,
};

pub mod errors;
pub mod http;

pub use errors::ApiError;
pub use http::HttpShopApi;

/// Sitewide settings as served by the settings source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShopSettings {
    /// Whether the sitewide promotion is on.
    #[serde(default)]
    pub global_promo_enabled: bool,

    /// Promotion percentage.
    #[serde(default)]
    pub global_promo_percent: Decimal,

    /// Promotion label.
    #[serde(default)]
    pub global_promo_label: String,
}

impl ShopSettings {
    /// Converts the settings into a validated promotion.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::OutOfRange`] if the percentage is outside `0..=100`.
    pub fn into_promo(self) -> Result<PromoConfig, DiscountError> {
        Ok(PromoConfig {
            enabled: self.global_promo_enabled,
            discount_percent: PercentOff::new(self.global_promo_percent)?,
            label: self.global_promo_label,
        })
    }
}

/// Coupon validator answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponVerdict {
    /// The coupon is valid.
    Valid {
        /// Percentage taken off.
        discount_percent: PercentOff,
    },

    /// The coupon was refused.
    Invalid {
        /// Reason shown to the user.
        message: String,
    },
}

/// Gift-card checker answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiftCardVerdict {
    /// The card exists.
    Valid {
        /// Remaining balance in major units.
        balance: Decimal,
    },

    /// The card was refused.
    Invalid {
        /// Reason shown to the user.
        message: String,
    },
}

/// Username validator answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameVerdict {
    /// The account exists.
    Valid {
        /// Canonical spelling of the username, when the validator reports it.
        username: Option<String>,
    },

    /// No such account.
    NotFound,
}

/// One cart line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    /// Product `type`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Product id, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name.
    pub name: String,

    /// Unit price in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Units ordered.
    pub quantity: u32,

    /// Category slug.
    pub category: Category,
}

/// Order payload sent to the order creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Cart lines.
    pub cart: Vec<OrderLine>,

    /// Verified username.
    pub username: String,

    /// Optional message for the recipient.
    pub message: String,

    /// Applied coupon.
    pub coupon: Option<AppliedCoupon>,

    /// Sitewide promotion, when enabled.
    pub global_promo: Option<PromoConfig>,

    /// Total before gift card, in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,

    /// Gift card usage.
    pub gift_card: Option<GiftCardPayload>,

    /// Amount left to pay, in major units.
    #[serde(with = "rust_decimal::serde::float")]
    pub final_payment_amount: Decimal,

    /// Discount breakdown.
    pub breakdown: PriceBreakdown,
}

/// Order creator acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderAck {
    /// Payment page to send the buyer to.
    #[serde(default)]
    pub approval_url: Option<String>,

    /// Page to show after a completed order that needs no payment.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Source of the dynamic catalog groups.
#[automock]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches bundles, skin sets, daily skins and calendars.
    async fn fetch_catalog(&self) -> Result<ShopData, ApiError>;
}

/// Source of the sitewide settings.
#[automock]
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Fetches the sitewide settings.
    async fn fetch_settings(&self) -> Result<ShopSettings, ApiError>;
}

/// Validates coupon codes.
#[automock]
#[async_trait]
pub trait CouponValidator: Send + Sync {
    /// Validates a normalised coupon code.
    async fn validate_coupon(&self, code: &str) -> Result<CouponVerdict, ApiError>;
}

/// Checks and tops up gift cards.
#[automock]
#[async_trait]
pub trait GiftCardService: Send + Sync {
    /// Looks up a gift card balance.
    async fn check_gift_code(&self, code: &str) -> Result<GiftCardVerdict, ApiError>;

    /// Starts a top-up payment, returning the approval URL.
    async fn top_up(&self, amount: Decimal, code: &str) -> Result<String, ApiError>;
}

/// Checks that a buyer account exists.
#[automock]
#[async_trait]
pub trait UsernameValidator: Send + Sync {
    /// Validates a username.
    async fn validate_username(&self, username: &str) -> Result<UsernameVerdict, ApiError>;
}

/// Creates orders.
#[automock]
#[async_trait]
pub trait OrderCreator: Send + Sync {
    /// Submits an order.
    async fn create_order(&self, order: OrderRequest) -> Result<OrderAck, ApiError>;
}

/// Every collaborator a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Catalog source.
    pub catalog: Arc<dyn CatalogSource>,

    /// Settings source.
    pub settings: Arc<dyn SettingsSource>,

    /// Coupon validator.
    pub coupons: Arc<dyn CouponValidator>,

    /// Gift-card service.
    pub gift_cards: Arc<dyn GiftCardService>,

    /// Username validator.
    pub usernames: Arc<dyn UsernameValidator>,

    /// Order creator.
    pub orders: Arc<dyn OrderCreator>,
}

impl Collaborators {
    /// Uses one HTTP client for every collaborator.
    #[must_use]
    pub fn http(api: HttpShopApi) -> Self {
        let api = Arc::new(api);

        Self {
            catalog: api.clone(),
            settings: api.clone(),
            coupons: api.clone(),
            gift_cards: api.clone(),
            usernames: api.clone(),
            orders: api,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use crate::gift_cards::GiftCardUsage;

    use super::*;

    #[test]
    fn settings_convert_to_promo() -> TestResult {
        let settings: ShopSettings = serde_json::from_str(
            r#"{"global_promo_enabled": true, "global_promo_percent": 15, "global_promo_label": "15% OFF"}"#,
        )?;

        let promo = settings.into_promo()?;

        assert!(promo.enabled);
        assert_eq!(promo.discount_percent.points(), Decimal::from(15));
        assert_eq!(promo.label, "15% OFF");

        Ok(())
    }

    #[test]
    fn settings_reject_out_of_range_percent() -> TestResult {
        let settings: ShopSettings =
            serde_json::from_str(r#"{"global_promo_enabled": true, "global_promo_percent": 120}"#)?;

        assert!(settings.into_promo().is_err());

        Ok(())
    }

    #[test]
    fn missing_settings_mean_disabled_promo() -> TestResult {
        let settings: ShopSettings = serde_json::from_str("{}")?;

        assert_eq!(settings.into_promo()?, PromoConfig::disabled());

        Ok(())
    }

    #[test]
    fn order_request_serializes_in_wire_shape() -> TestResult {
        let usage = GiftCardUsage {
            code: "GC-1".to_string(),
            balance: Money::from_minor(3000, EUR),
            used: Money::from_minor(2000, EUR),
        };

        let order = OrderRequest {
            cart: vec![OrderLine {
                kind: "GOLD_PACK_SMALL".to_string(),
                id: None,
                name: "Small Gold Pack".to_string(),
                price: Decimal::new(99, 2),
                quantity: 2,
                category: Category::Coins,
            }],
            username: "Wolfie".to_string(),
            message: String::new(),
            coupon: None,
            global_promo: None,
            total: Decimal::new(2000, 2),
            gift_card: Some(GiftCardPayload::from(&usage)),
            final_payment_amount: Decimal::ZERO,
            breakdown: PriceBreakdown {
                subtotal: Decimal::new(2000, 2),
                loyalty_discount: Decimal::ZERO,
                promo_discount: Decimal::ZERO,
                coupon_discount: Decimal::ZERO,
            },
        };

        let json = serde_json::to_value(&order)?;

        assert_eq!(
            json.pointer("/cart/0/type"),
            Some(&serde_json::json!("GOLD_PACK_SMALL"))
        );
        assert_eq!(json.pointer("/cart/0/price"), Some(&serde_json::json!(0.99)));
        assert_eq!(json.pointer("/cart/0/id"), None);
        assert_eq!(json.pointer("/giftCard/used"), Some(&serde_json::json!(20.0)));
        assert_eq!(json.pointer("/finalPaymentAmount"), Some(&serde_json::json!(0.0)));
        assert_eq!(json.pointer("/globalPromo"), Some(&serde_json::Value::Null));

        Ok(())
    }
}

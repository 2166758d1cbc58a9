//! HTTP client for the shop API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    catalog::ShopData,
    collaborators::{
        ApiError, CatalogSource, CouponValidator, CouponVerdict, GiftCardService,
        GiftCardVerdict, OrderAck, OrderCreator, OrderRequest, SettingsSource, ShopSettings,
        UsernameValidator, UsernameVerdict,
    },
    discounts::PercentOff,
};

/// Default shop API address.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Talks to the shop API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpShopApi {
    base_url: String,
    http: Client,
}

impl HttpShopApi {
    /// Create a client rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/shop/{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.http.get(self.url(path)).send().await?;

        read_envelope(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(self.url(path)).json(body).send().await?;

        read_envelope(response).await
    }
}

/// Either an explicit `{ "error": ... }` body or the expected payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Failure { error: String },
    Success(T),
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let text = response.text().await?;

    match serde_json::from_str::<Envelope<T>>(&text) {
        Ok(Envelope::Failure { error }) => Err(ApiError::Rejected(error)),
        Ok(Envelope::Success(payload)) if status.is_success() => Ok(payload),
        Ok(Envelope::Success(_)) => Err(ApiError::UnexpectedResponse(format!(
            "request failed with status {status}: {text}"
        ))),
        Err(err) => Err(ApiError::UnexpectedResponse(format!(
            "status {status}, malformed body: {err}"
        ))),
    }
}

#[derive(Debug, Serialize)]
struct CodeBody<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct UsernameBody<'a> {
    username: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TopUpBody<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    gift_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct CouponResponse {
    valid: bool,
    #[serde(default)]
    discount_percent: Option<Decimal>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GiftCodeResponse {
    valid: bool,
    #[serde(default)]
    balance: Option<Decimal>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsernameResponse {
    valid: bool,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopUpResponse {
    approval_url: String,
}

#[async_trait]
impl CatalogSource for HttpShopApi {
    #[tracing::instrument(name = "shop_api.fetch_catalog", skip(self), err)]
    async fn fetch_catalog(&self) -> Result<ShopData, ApiError> {
        let data: ShopData = self.get("data").await?;

        debug!(records = data.len(), "fetched catalog");

        Ok(data)
    }
}

#[async_trait]
impl SettingsSource for HttpShopApi {
    #[tracing::instrument(name = "shop_api.fetch_settings", skip(self), err)]
    async fn fetch_settings(&self) -> Result<ShopSettings, ApiError> {
        self.get("settings").await
    }
}

#[async_trait]
impl CouponValidator for HttpShopApi {
    #[tracing::instrument(name = "shop_api.validate_coupon", skip(self), err)]
    async fn validate_coupon(&self, code: &str) -> Result<CouponVerdict, ApiError> {
        let response: CouponResponse = self.post("validate-coupon", &CodeBody { code }).await?;

        if !response.valid {
            return Ok(CouponVerdict::Invalid {
                message: response
                    .message
                    .unwrap_or_else(|| "Invalid coupon code".to_string()),
            });
        }

        let points = response.discount_percent.ok_or_else(|| {
            ApiError::UnexpectedResponse("valid coupon without discount_percent".to_string())
        })?;

        let discount_percent = PercentOff::new(points)
            .map_err(|err| ApiError::UnexpectedResponse(err.to_string()))?;

        Ok(CouponVerdict::Valid { discount_percent })
    }
}

#[async_trait]
impl GiftCardService for HttpShopApi {
    #[tracing::instrument(name = "shop_api.check_gift_code", skip(self), err)]
    async fn check_gift_code(&self, code: &str) -> Result<GiftCardVerdict, ApiError> {
        let response: GiftCodeResponse = self.post("check-gift-code", &CodeBody { code }).await?;

        if !response.valid {
            return Ok(GiftCardVerdict::Invalid {
                message: response
                    .message
                    .unwrap_or_else(|| "Invalid gift card code".to_string()),
            });
        }

        let balance = response.balance.ok_or_else(|| {
            ApiError::UnexpectedResponse("valid gift card without balance".to_string())
        })?;

        Ok(GiftCardVerdict::Valid { balance })
    }

    #[tracing::instrument(name = "shop_api.top_up", skip(self), err)]
    async fn top_up(&self, amount: Decimal, code: &str) -> Result<String, ApiError> {
        let body = TopUpBody {
            amount,
            gift_code: code,
        };

        let response: TopUpResponse = self.post("gift-card/top-up", &body).await?;

        Ok(response.approval_url)
    }
}

#[async_trait]
impl UsernameValidator for HttpShopApi {
    #[tracing::instrument(name = "shop_api.validate_username", skip(self), err)]
    async fn validate_username(&self, username: &str) -> Result<UsernameVerdict, ApiError> {
        let response: UsernameResponse = self
            .post("validate-username", &UsernameBody { username })
            .await?;

        if response.valid {
            Ok(UsernameVerdict::Valid {
                username: response.username,
            })
        } else {
            Ok(UsernameVerdict::NotFound)
        }
    }
}

#[async_trait]
impl OrderCreator for HttpShopApi {
    #[tracing::instrument(
        name = "shop_api.create_order",
        skip(self, order),
        fields(lines = order.cart.len()),
        err
    )]
    async fn create_order(&self, order: OrderRequest) -> Result<OrderAck, ApiError> {
        self.post("create-cart-order", &order).await
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn urls_are_rooted_under_shop_api() {
        let api = HttpShopApi::new("https://shop.example/");

        assert_eq!(
            api.url("validate-coupon"),
            "https://shop.example/api/shop/validate-coupon"
        );
    }

    #[test]
    fn error_body_wins_over_payload() -> TestResult {
        let envelope: Envelope<OrderAck> = serde_json::from_str(r#"{"error": "Cart is empty"}"#)?;

        assert!(matches!(envelope, Envelope::Failure { error } if error == "Cart is empty"));

        Ok(())
    }

    #[test]
    fn payload_without_error_is_success() -> TestResult {
        let envelope: Envelope<OrderAck> =
            serde_json::from_str(r#"{"approval_url": "https://pay.example/approve"}"#)?;

        let Envelope::Success(ack) = envelope else {
            return Err("expected success".into());
        };

        assert_eq!(ack.approval_url.as_deref(), Some("https://pay.example/approve"));
        assert_eq!(ack.redirect, None);

        Ok(())
    }

    #[test]
    fn catalog_payload_parses() -> TestResult {
        let envelope: Envelope<ShopData> = serde_json::from_str(
            r#"{"bundles": [{"type": "BUNDLE_SPRING_TIME", "price": 2.99}], "calendars": []}"#,
        )?;

        let Envelope::Success(data) = envelope else {
            return Err("expected success".into());
        };

        assert_eq!(data.bundles.len(), 1);
        assert!(data.skin_sets.is_empty());

        Ok(())
    }

    #[test]
    fn top_up_body_uses_camel_case() -> TestResult {
        let body = TopUpBody {
            amount: Decimal::new(2500, 2),
            gift_code: "GC-1",
        };

        assert_eq!(
            serde_json::to_value(&body)?,
            serde_json::json!({ "amount": 25.0, "giftCode": "GC-1" })
        );

        Ok(())
    }
}

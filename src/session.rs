//! Session
//!
//! A [`ShopSession`] owns all mutable shop state for one buyer: the catalog,
//! the cart, the applied coupon and gift card, the current receipt and the
//! checkout attempt. Every mutation prices the new state before installing
//! it: [`ShopSession::receipt`] always reflects the current cart, and a
//! mutation that cannot be priced leaves the session unchanged.

use rust_decimal::Decimal;
use rusty_money::Money;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cart::{AddOutcome, Cart, CartError, CartLine, QuantityChange},
    catalog::{Catalog, CatalogError},
    checkout::{
        CheckoutError, CheckoutForm, CheckoutOrchestrator, CheckoutOutcome, CheckoutState, Step,
    },
    collaborators::{
        ApiError, Collaborators, CouponVerdict, GiftCardVerdict, OrderLine, OrderRequest,
    },
    discounts::{AppliedCoupon, CouponError, PromoConfig, normalize_coupon_code},
    gift_cards::{
        GiftCardError, GiftCardPayload, GiftCardRedemption, GiftCardWallet, normalize_gift_code,
        validate_top_up,
    },
    loyalty::LoyaltyConfig,
    notifications::Notifier,
    pricing::{PricingError, PricingPipeline, decimal_to_minor, minor_to_decimal},
    products::Product,
    receipt::Receipt,
};

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Catalog error.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Cart error.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Pricing error.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Coupon error.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// Gift card error.
    #[error(transparent)]
    GiftCard(#[from] GiftCardError),

    /// Checkout error.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Collaborator error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No catalog product has the given id or type.
    #[error("unknown product: {0}")]
    UnknownProduct(String),
}

/// What [`ShopSession::load`] managed to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Dynamic products now listed.
    pub dynamic_products: usize,

    /// Whether the sitewide promotion is active.
    pub promo_enabled: bool,
}

/// Session-scoped shop state.
#[derive(Debug)]
pub struct ShopSession {
    catalog: Catalog,
    cart: Cart,
    pipeline: PricingPipeline,
    coupon: Option<AppliedCoupon>,
    gift_cards: GiftCardWallet,
    receipt: Receipt,
    checkout: CheckoutOrchestrator,
    notifier: Notifier,
    collaborators: Collaborators,
}

impl ShopSession {
    /// Creates a session with an empty cart and no promotion.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the empty cart cannot be priced.
    pub fn new(
        catalog: Catalog,
        collaborators: Collaborators,
        notifier: Notifier,
    ) -> Result<Self, SessionError> {
        let cart = Cart::new(catalog.currency());
        let pipeline = PricingPipeline::new(LoyaltyConfig::default(), PromoConfig::disabled());
        let receipt = pipeline.price(&cart, None, None)?;

        Ok(Self {
            catalog,
            cart,
            pipeline,
            coupon: None,
            gift_cards: GiftCardWallet::default(),
            receipt,
            checkout: CheckoutOrchestrator::default(),
            notifier,
            collaborators,
        })
    }

    /// Fetches the sitewide settings and the dynamic catalog.
    ///
    /// Both requests run concurrently. A failed settings fetch disables the
    /// promotion; a failed catalog fetch leaves the base items listed. Neither
    /// is an error for the session.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be re-priced.
    #[tracing::instrument(name = "session.load", skip(self), err)]
    pub async fn load(&mut self) -> Result<LoadSummary, SessionError> {
        let (settings, catalog) = tokio::join!(
            self.collaborators.settings.fetch_settings(),
            self.collaborators.catalog.fetch_catalog()
        );

        let promo = match settings {
            Ok(settings) => settings.into_promo().map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };

        let promo = promo.unwrap_or_else(|error| {
            warn!(%error, "promo settings unavailable, promotion disabled");

            self.notifier.warning("Promotions are unavailable right now");

            PromoConfig::disabled()
        });

        let promo_enabled = promo.active_percent().is_some();

        let mut pipeline = self.pipeline.clone();
        pipeline.set_promo(promo);

        let dynamic_products = match catalog {
            Ok(data) => self.catalog.load_shop_data(data),
            Err(ApiError::Rejected(message)) => {
                warn!(%message, "catalog source rejected the request");

                self.notifier.error(message);

                0
            }
            Err(err) => {
                warn!(error = %err, "failed to load shop data");

                self.notifier.error("Failed to load shop data");

                0
            }
        };

        self.receipt = pipeline.price(
            &self.cart,
            self.coupon.as_ref(),
            self.gift_cards.applied(),
        )?;
        self.pipeline = pipeline;

        info!(dynamic_products, promo_enabled, "session loaded");

        Ok(LoadSummary {
            dynamic_products,
            promo_enabled,
        })
    }

    /// Adds one unit of a product to the cart.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Cart`]: the product cannot be added.
    /// - [`SessionError::Pricing`]: the cart with the product cannot be priced.
    pub fn add_to_cart(&mut self, product: Product) -> Result<AddOutcome, SessionError> {
        let mut cart = self.cart.clone();

        let outcome = match cart.add(product) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notifier.error(err.to_string());

                return Err(err.into());
            }
        };

        self.commit_cart(cart)?;

        self.notifier.success("Added to cart!");

        Ok(outcome)
    }

    /// Adds one unit of the catalog product with the given id or type.
    ///
    /// # Errors
    ///
    /// - [`SessionError::UnknownProduct`]: no such product.
    /// - [`SessionError::Cart`]: the product cannot be added.
    pub fn add_by_key(&mut self, key: &str) -> Result<AddOutcome, SessionError> {
        let product = self
            .catalog
            .find(key)
            .cloned()
            .ok_or_else(|| SessionError::UnknownProduct(key.to_string()))?;

        self.add_to_cart(product)
    }

    /// Removes the cart line at `index`; out of range indexes are a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be re-priced.
    pub fn remove_from_cart(&mut self, index: usize) -> Result<Option<CartLine>, SessionError> {
        let mut cart = self.cart.clone();
        let removed = cart.remove(index);

        self.commit_cart(cart)?;

        Ok(removed)
    }

    /// Changes the quantity of the cart line at `index` by `delta`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be re-priced.
    pub fn update_quantity(
        &mut self,
        index: usize,
        delta: i64,
    ) -> Result<QuantityChange, SessionError> {
        let mut cart = self.cart.clone();
        let change = cart.update_quantity(index, delta);

        self.commit_cart(cart)?;

        if change == QuantityChange::Pinned {
            self.notifier.info("This item can only be purchased once");
        }

        Ok(change)
    }

    /// Empties the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be re-priced.
    pub fn clear_cart(&mut self) -> Result<(), SessionError> {
        let mut cart = self.cart.clone();
        cart.clear();

        self.commit_cart(cart)
    }

    /// Validates and applies a coupon, replacing any applied one.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Coupon`]: blank or refused code.
    /// - [`SessionError::Api`]: the coupon validator failed.
    #[tracing::instrument(name = "session.apply_coupon", skip(self), err)]
    pub async fn apply_coupon(&mut self, raw_code: &str) -> Result<AppliedCoupon, SessionError> {
        let code = match normalize_coupon_code(raw_code) {
            Ok(code) => code,
            Err(err) => {
                self.notifier.error(err.to_string());

                return Err(err.into());
            }
        };

        let verdict = match self.collaborators.coupons.validate_coupon(&code).await {
            Ok(verdict) => verdict,
            Err(err) => {
                self.notifier.error("Failed to validate coupon");

                return Err(err.into());
            }
        };

        match verdict {
            CouponVerdict::Valid { discount_percent } => {
                let coupon = AppliedCoupon::new(code, discount_percent);

                self.receipt = self
                    .pipeline
                    .price(&self.cart, Some(&coupon), self.gift_cards.applied())?;
                self.coupon = Some(coupon.clone());

                self.notifier
                    .success(format!("Coupon applied! {discount_percent} off"));

                Ok(coupon)
            }
            CouponVerdict::Invalid { message } => {
                self.notifier.error(message.clone());

                Err(CouponError::Rejected(message).into())
            }
        }
    }

    /// Removes the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be re-priced.
    pub fn remove_coupon(&mut self) -> Result<(), SessionError> {
        self.receipt = self
            .pipeline
            .price(&self.cart, None, self.gift_cards.applied())?;
        self.coupon = None;

        self.notifier.info("Coupon removed");

        Ok(())
    }

    /// Looks up a gift card and keeps it ready to apply.
    ///
    /// # Errors
    ///
    /// - [`SessionError::GiftCard`]: blank, refused or empty card.
    /// - [`SessionError::Api`]: the gift-card service failed.
    #[tracing::instrument(name = "session.check_gift_card", skip(self), err)]
    pub async fn check_gift_card(
        &mut self,
        raw_code: &str,
    ) -> Result<GiftCardRedemption, SessionError> {
        let result = self.check_gift_card_inner(raw_code).await;

        match &result {
            Ok(redemption) => self
                .notifier
                .info(format!("Gift card balance: {}", redemption.balance())),
            Err(SessionError::Api(_)) => self.notifier.error("Failed to check gift card"),
            Err(err) => self.notifier.error(err.to_string()),
        }

        result
    }

    async fn check_gift_card_inner(
        &mut self,
        raw_code: &str,
    ) -> Result<GiftCardRedemption, SessionError> {
        let code = normalize_gift_code(raw_code)?;

        let balance = match self.collaborators.gift_cards.check_gift_code(&code).await? {
            GiftCardVerdict::Valid { balance } => balance,
            GiftCardVerdict::Invalid { message } => {
                return Err(GiftCardError::Rejected(message).into());
            }
        };

        let balance_minor = decimal_to_minor(balance).ok_or_else(|| {
            ApiError::UnexpectedResponse(format!("gift card balance {balance} is not a valid amount"))
        })?;

        let redemption =
            GiftCardRedemption::new(code, Money::from_minor(balance_minor, self.cart.currency()))?;

        Ok(self.gift_cards.record_check(redemption).clone())
    }

    /// Applies the checked gift card.
    ///
    /// # Errors
    ///
    /// Returns [`GiftCardError::NothingChecked`] if no card has been checked.
    pub fn apply_gift_card(&mut self) -> Result<(), SessionError> {
        let mut gift_cards = self.gift_cards.clone();

        if let Err(err) = gift_cards.apply() {
            self.notifier.error(err.to_string());

            return Err(err.into());
        }

        self.receipt = self
            .pipeline
            .price(&self.cart, self.coupon.as_ref(), gift_cards.applied())?;
        self.gift_cards = gift_cards;

        self.notifier.success("Gift card applied!");

        Ok(())
    }

    /// Removes the checked and applied gift cards.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the cart cannot be re-priced.
    pub fn remove_gift_card(&mut self) -> Result<(), SessionError> {
        self.receipt = self
            .pipeline
            .price(&self.cart, self.coupon.as_ref(), None)?;
        self.gift_cards.remove();

        self.notifier.info("Gift card removed");

        Ok(())
    }

    /// Starts a gift card top-up and returns the payment approval URL.
    ///
    /// # Errors
    ///
    /// - [`SessionError::GiftCard`]: invalid amount or code.
    /// - [`SessionError::Api`]: the gift-card service failed.
    #[tracing::instrument(name = "session.top_up", skip(self), err)]
    pub async fn top_up(&mut self, amount: Decimal, raw_code: &str) -> Result<String, SessionError> {
        let top_up = match validate_top_up(amount, raw_code) {
            Ok(top_up) => top_up,
            Err(err) => {
                self.notifier.error(err.to_string());

                return Err(err.into());
            }
        };

        match self
            .collaborators
            .gift_cards
            .top_up(top_up.amount(), &top_up.code)
            .await
        {
            Ok(approval_url) => Ok(approval_url),
            Err(err) => {
                self.notifier.error(match &err {
                    ApiError::Rejected(message) => message.clone(),
                    ApiError::Http(_) | ApiError::UnexpectedResponse(_) => {
                        "Failed to initiate top-up".to_string()
                    }
                });

                Err(err.into())
            }
        }
    }

    /// Runs a full checkout: username validation, then order creation.
    ///
    /// A gift-card-covered order empties the cart and clears the coupon and
    /// gift card.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Checkout`] for every failed step. The error is
    /// also emitted as a notification.
    #[tracing::instrument(name = "session.checkout", skip(self, form), err)]
    pub async fn checkout(&mut self, form: &CheckoutForm) -> Result<CheckoutOutcome, SessionError> {
        let attempt = self
            .checkout
            .begin(self.cart.is_empty(), form)
            .map_err(|err| self.report(err))?;

        let verdict = self
            .collaborators
            .usernames
            .validate_username(form.username.trim())
            .await;

        let step = self.checkout.identity_checked(attempt, verdict);
        self.applied(step)?;

        self.notifier.success("Username verified!");

        let Step::Applied(username) = self.checkout.await_payment(attempt, &self.receipt) else {
            return Err(CheckoutError::Abandoned.into());
        };

        let order = self.order_request(username, form.message.trim());
        let ack = self.collaborators.orders.create_order(order).await;

        let step = self.checkout.order_created(attempt, ack);
        let outcome = self.applied(step)?;

        if let CheckoutOutcome::Paid { .. } = outcome {
            let mut cart = self.cart.clone();
            cart.clear();

            self.receipt = self.pipeline.price(&cart, None, None)?;
            self.cart = cart;
            self.coupon = None;
            self.gift_cards.remove();

            self.notifier.success("Order complete! Paid with gift card.");
        }

        Ok(outcome)
    }

    /// Closes the checkout dialog, abandoning any running attempt.
    pub fn close_checkout(&mut self) {
        self.checkout.cancel();
    }

    fn applied<T>(&self, step: Step<Result<T, CheckoutError>>) -> Result<T, SessionError> {
        match step {
            Step::Applied(result) => result.map_err(|err| self.report(err)),
            Step::Stale => Err(CheckoutError::Abandoned.into()),
        }
    }

    fn report(&self, err: CheckoutError) -> SessionError {
        self.notifier.error(err.to_string());

        err.into()
    }

    fn order_request(&self, username: String, message: &str) -> OrderRequest {
        let cart = self
            .cart
            .iter()
            .map(|line| OrderLine {
                kind: line.product().kind().to_string(),
                id: line.product().id().map(str::to_string),
                name: line.product().name().to_string(),
                price: minor_to_decimal(line.unit_price().to_minor_units()),
                quantity: line.quantity(),
                category: line.product().category(),
            })
            .collect();

        let promo = self.pipeline.promo();

        OrderRequest {
            cart,
            username,
            message: message.to_string(),
            coupon: self.coupon.clone(),
            global_promo: promo.enabled.then(|| promo.clone()),
            total: minor_to_decimal(self.receipt.total().to_minor_units()),
            gift_card: self.receipt.gift_card().map(GiftCardPayload::from),
            final_payment_amount: minor_to_decimal(self.receipt.final_payment().to_minor_units()),
            breakdown: self.receipt.breakdown(),
        }
    }

    /// Prices `cart` with the current discounts and only then installs it.
    fn commit_cart(&mut self, cart: Cart) -> Result<(), SessionError> {
        self.receipt = self
            .pipeline
            .price(&cart, self.coupon.as_ref(), self.gift_cards.applied())?;
        self.cart = cart;

        Ok(())
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The cart.
    #[must_use]
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The receipt for the current cart.
    #[must_use]
    pub fn receipt(&self) -> &Receipt {
        &self.receipt
    }

    /// The applied coupon.
    #[must_use]
    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    /// Checked and applied gift cards.
    #[must_use]
    pub fn gift_cards(&self) -> &GiftCardWallet {
        &self.gift_cards
    }

    /// The sitewide promotion.
    #[must_use]
    pub fn promo(&self) -> &PromoConfig {
        self.pipeline.promo()
    }

    /// Checkout state.
    #[must_use]
    pub fn checkout_state(&self) -> &CheckoutState {
        self.checkout.state()
    }
}

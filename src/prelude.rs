//! Shopfront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{AddOutcome, Cart, CartError, CartLine, QuantityChange},
    catalog::{Catalog, CatalogError, CategoryFilter, ImageCdn, ShopData},
    checkout::{CheckoutError, CheckoutForm, CheckoutOutcome, CheckoutState},
    collaborators::{ApiError, Collaborators, HttpShopApi},
    discounts::{AppliedCoupon, PercentOff, PromoConfig},
    gift_cards::{GiftCardError, GiftCardRedemption},
    loyalty::{LoyaltyAllocation, LoyaltyConfig},
    notifications::{Notification, Notifier, Severity},
    pricing::{PricingError, PricingPipeline},
    products::{Category, Product},
    receipt::{Receipt, ReceiptError},
    session::{SessionError, ShopSession},
};

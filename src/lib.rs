//! Shopfront
//!
//! Shopfront is the storefront core for a virtual-goods shop: a merged product
//! catalog, a cart, and a pricing pipeline that stacks loyalty, sitewide
//! promotion, coupon and gift card discounts into one receipt. Checkout is
//! driven against pluggable collaborators for coupons, gift cards, usernames
//! and orders.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod collaborators;
pub mod config;
pub mod discounts;
pub mod gift_cards;
pub mod loyalty;
pub mod notifications;
pub mod observability;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod session;

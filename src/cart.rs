//! Cart

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::products::Product;

/// Errors related to cart mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// A single-purchase product is already in the cart.
    #[error("{0} is already in your cart")]
    AlreadyInCart(String),

    /// The product's currency differs from the cart currency (product, product currency, cart currency).
    #[error("{0} is priced in {1}, but the cart is in {2}")]
    CurrencyMismatch(String, &'static str, &'static str),
}

/// One distinct product in the cart with a quantity of at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    product: Product,
    quantity: u32,
}

impl CartLine {
    /// The product snapshot taken when the line was created.
    #[must_use]
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Units on this line.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price.
    #[must_use]
    pub fn unit_price(&self) -> &Money<'static, Currency> {
        self.product.price()
    }

    /// Unit price multiplied by quantity, or `None` on overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Money<'static, Currency>> {
        self.unit_price()
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
            .map(|minor| Money::from_minor(minor, self.unit_price().currency()))
    }
}

/// Result of a successful [`Cart::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added {
        /// Position of the new line.
        index: usize,
    },

    /// An existing line gained one unit.
    Incremented {
        /// Position of the existing line.
        index: usize,

        /// Quantity after the increment.
        quantity: u32,
    },
}

/// Result of [`Cart::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now holds `quantity` units.
    Updated {
        /// Quantity after the change.
        quantity: u32,
    },

    /// The quantity dropped to zero and the line was removed.
    Removed,

    /// The line belongs to a single-purchase category and stays at 1.
    Pinned,

    /// No line at that position; nothing changed.
    NoSuchLine,
}

/// Ordered collection of cart lines.
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: &'static Currency,
}

impl Cart {
    /// Creates an empty cart.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            lines: Vec::new(),
            currency,
        }
    }

    /// Adds one unit of `product`.
    ///
    /// An existing line with the same identity is incremented, unless the
    /// product's category is single-purchase, in which case the cart is left
    /// untouched and the add is rejected.
    ///
    /// # Errors
    ///
    /// - [`CartError::AlreadyInCart`]: a single-purchase product is already present.
    /// - [`CartError::CurrencyMismatch`]: the product is priced in another currency.
    pub fn add(&mut self, product: Product) -> Result<AddOutcome, CartError> {
        let product_currency = product.price().currency();

        if product_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                product.name().to_string(),
                product_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        let existing = self
            .lines
            .iter_mut()
            .enumerate()
            .find(|(_, line)| line.product.same_identity(&product));

        match existing {
            Some(_) if product.category().is_single_purchase() => {
                Err(CartError::AlreadyInCart(product.name().to_string()))
            }
            Some((index, line)) => {
                line.quantity = line.quantity.saturating_add(1);

                Ok(AddOutcome::Incremented {
                    index,
                    quantity: line.quantity,
                })
            }
            None => {
                self.lines.push(CartLine {
                    product,
                    quantity: 1,
                });

                Ok(AddOutcome::Added {
                    index: self.lines.len() - 1,
                })
            }
        }
    }

    /// Removes the line at `index`, returning it.
    ///
    /// Out of range indexes are a no-op. Positions after `index` shift down by
    /// one.
    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Adds `delta` to the quantity of the line at `index`, removing the line
    /// when the quantity reaches zero or below.
    pub fn update_quantity(&mut self, index: usize, delta: i64) -> QuantityChange {
        let Some(line) = self.lines.get_mut(index) else {
            return QuantityChange::NoSuchLine;
        };

        let next = i64::from(line.quantity).saturating_add(delta);

        if next <= 0 {
            self.lines.remove(index);

            return QuantityChange::Removed;
        }

        if next > 1 && line.product.category().is_single_purchase() {
            return QuantityChange::Pinned;
        }

        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);

        QuantityChange::Updated {
            quantity: line.quantity,
        }
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Get the line at `index`.
    #[must_use]
    pub fn get_line(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    /// Iterate over the lines in order.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Lines as a slice.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

//! Receipt

use std::{fmt::Write, io};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, MoneyError, iso::Currency};
use serde::Serialize;
use smallvec::SmallVec;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::Cart,
    discounts::{AppliedCoupon, PromoConfig},
    gift_cards::GiftCardUsage,
    loyalty::{LoyaltyAllocation, LoyaltyProgress},
    pricing::minor_to_decimal,
};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Wrapper for money errors.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// A line total could not be represented.
    #[error("line {0} total overflowed")]
    LineTotal(usize),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Output of the pricing pipeline for one cart state.
///
/// Every amount is in the cart currency and already rounded to whole minor
/// units.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub(crate) subtotal: Money<'static, Currency>,
    pub(crate) loyalty_discount: Money<'static, Currency>,
    pub(crate) promo_discount: Money<'static, Currency>,
    pub(crate) coupon_discount: Money<'static, Currency>,
    pub(crate) total: Money<'static, Currency>,
    pub(crate) gift_card: Option<GiftCardUsage>,
    pub(crate) final_payment: Money<'static, Currency>,
    pub(crate) coupon: Option<AppliedCoupon>,
    pub(crate) allocation: LoyaltyAllocation,
    pub(crate) progress: LoyaltyProgress,
    pub(crate) total_items: u64,
    pub(crate) currency: &'static Currency,
}

impl Receipt {
    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Money<'static, Currency> {
        self.subtotal
    }

    /// Price of the loyalty-free units.
    #[must_use]
    pub fn loyalty_discount(&self) -> Money<'static, Currency> {
        self.loyalty_discount
    }

    /// Sitewide promotion discount, taken after the loyalty discount.
    #[must_use]
    pub fn promo_discount(&self) -> Money<'static, Currency> {
        self.promo_discount
    }

    /// Coupon discount, taken after the promotion.
    #[must_use]
    pub fn coupon_discount(&self) -> Money<'static, Currency> {
        self.coupon_discount
    }

    /// Amount due before any gift card.
    #[must_use]
    pub fn total(&self) -> Money<'static, Currency> {
        self.total
    }

    /// Gift card usage, when a card is applied.
    #[must_use]
    pub fn gift_card(&self) -> Option<&GiftCardUsage> {
        self.gift_card.as_ref()
    }

    /// Amount left to pay after the gift card.
    #[must_use]
    pub fn final_payment(&self) -> Money<'static, Currency> {
        self.final_payment
    }

    /// Whether nothing remains to be paid.
    #[must_use]
    pub fn is_fully_covered(&self) -> bool {
        self.final_payment.to_minor_units() <= 0
    }

    /// Coupon the receipt was priced with.
    #[must_use]
    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    /// Loyalty-free units.
    #[must_use]
    pub fn allocation(&self) -> &LoyaltyAllocation {
        &self.allocation
    }

    /// Progress towards the next loyalty reward.
    #[must_use]
    pub fn progress(&self) -> &LoyaltyProgress {
        &self.progress
    }

    /// Units in the cart.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Loyalty-free units earned.
    #[must_use]
    pub fn free_items(&self) -> u64 {
        self.progress.free_items
    }

    /// Currency used for all monetary values.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Calculate the savings made by applying discounts, excluding gift cards.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings(&self) -> Result<Money<'static, Currency>, MoneyError> {
        self.subtotal.sub(self.total)
    }

    /// Calculates the savings as a percentage of the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] if the subtraction operation fails.
    pub fn savings_percent(&self) -> Result<Percentage, MoneyError> {
        let savings_minor = self.savings()?.to_minor_units();
        let subtotal_minor = self.subtotal.to_minor_units();

        if subtotal_minor == 0 {
            return Ok(Percentage::from(0.0));
        }

        Ok(Percentage::from(
            Decimal::from(savings_minor) / Decimal::from(subtotal_minor),
        ))
    }

    /// Discount breakdown as sent with an order.
    #[must_use]
    pub fn breakdown(&self) -> PriceBreakdown {
        PriceBreakdown {
            subtotal: minor_to_decimal(self.subtotal.to_minor_units()),
            loyalty_discount: minor_to_decimal(self.loyalty_discount.to_minor_units()),
            promo_discount: minor_to_decimal(self.promo_discount.to_minor_units()),
            coupon_discount: minor_to_decimal(self.coupon_discount.to_minor_units()),
        }
    }

    /// Writes the cart lines and the pricing summary as a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        cart: &Cart,
        promo: &PromoConfig,
    ) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Unit Price", "Line Total", "Loyalty"]);

        let mut color_ops: SmallVec<[(usize, usize, Color); 16]> = SmallVec::new();

        for (idx, line) in cart.iter().enumerate() {
            let line_total = line.line_total().ok_or(ReceiptError::LineTotal(idx))?;
            let free_units = self.allocation.free_units_for_line(idx);
            let row = idx + 1;

            let loyalty = if free_units == 0 {
                String::new()
            } else {
                color_ops.push((row, 5, Color::FG_GREEN));

                format!("FREE x{free_units}")
            };

            color_ops.push((row, 3, color_dark_grey()));

            builder.push_record([
                format!("#{:<3}", idx + 1),
                line.product().name().to_string(),
                line.quantity().to_string(),
                format!("{}", line.unit_price()),
                format!("{line_total}"),
                loyalty,
            ]);
        }

        write_receipt_table(&mut out, builder, color_ops)?;

        write_receipt_summary(&mut out, self, promo)
    }
}

/// Discount breakdown, in major units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    /// Subtotal.
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,

    /// Loyalty discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub loyalty_discount: Decimal,

    /// Promotion discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub promo_discount: Decimal,

    /// Coupon discount.
    #[serde(with = "rust_decimal::serde::float")]
    pub coupon_discount: Decimal,
}

fn write_receipt_table(
    out: &mut impl io::Write,
    builder: Builder,
    color_ops: SmallVec<[(usize, usize, Color); 16]>,
) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..5), Alignment::right());

    for (row, col, color) in color_ops {
        table.modify((row, col), color);
    }

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

fn write_receipt_summary(
    out: &mut impl io::Write,
    receipt: &Receipt,
    promo: &PromoConfig,
) -> Result<(), ReceiptError> {
    let savings = receipt.savings()?;
    let savings_points = percent_points_from_fractional_percentage(receipt.savings_percent()?);

    let mut lines: SmallVec<[(String, String); 8]> = SmallVec::new();

    lines.push((" Subtotal:".to_string(), format!("{}  ", receipt.subtotal())));

    if receipt.free_items() > 0 {
        lines.push((
            format!(" Loyalty ({} free):", receipt.free_items()),
            format!("-{}  ", receipt.loyalty_discount()),
        ));
    }

    if let Some(percent) = promo.active_percent() {
        let label = if promo.label.is_empty() {
            format!(" Promo ({percent}):")
        } else {
            format!(" {} ({percent}):", promo.label)
        };

        lines.push((label, format!("-{}  ", receipt.promo_discount())));
    }

    if let Some(coupon) = receipt.coupon() {
        lines.push((
            format!(" Coupon {} ({}):", coupon.code, coupon.discount_percent),
            format!("-{}  ", receipt.coupon_discount()),
        ));
    }

    lines.push((
        " \x1b[1mTotal:\x1b[0m".to_string(),
        format!("\x1b[1m{}  \x1b[0m", receipt.total()),
    ));

    if let Some(usage) = receipt.gift_card() {
        lines.push((
            format!(" Gift card {}:", usage.code),
            format!("-{}  ", usage.used),
        ));
        lines.push((" To pay:".to_string(), format!("{}  ", receipt.final_payment())));
    }

    lines.push((
        " Savings:".to_string(),
        format!("({savings_points:.2}%) {savings}  "),
    ));

    let label_width = lines
        .iter()
        .map(|(label, _)| visible_width(label))
        .max()
        .unwrap_or(0);

    let value_width = lines
        .iter()
        .map(|(_, value)| visible_width(value))
        .max()
        .unwrap_or(0);

    for (label, value) in &lines {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

/// Converts a fractional percentage to percent points for display.
fn percent_points_from_fractional_percentage(percentage: Percentage) -> Decimal {
    // `Percentage` is a fraction (e.g. 0.25), so multiply by 100 to print percent points.
    ((percentage * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

/// ANSI dark grey foreground.
fn color_dark_grey() -> Color {
    Color::new("\x1b[90m", "\x1b[0m")
}

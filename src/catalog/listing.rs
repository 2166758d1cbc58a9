//! Product listing table.

use std::io;

use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};

use crate::products::Product;

/// Writes one row per product: category, key, name, price, badges and expiry.
///
/// # Errors
///
/// Returns an error if the listing cannot be written.
pub fn write_listing<'a>(
    mut out: impl io::Write,
    products: impl IntoIterator<Item = &'a Product>,
) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["", "Key", "Name", "Price", "", "Expires"]);

    let mut rows = 0usize;

    for product in products {
        let mut badges = Vec::new();

        if product.is_best_value() {
            badges.push("BEST VALUE");
        }

        if product.is_new() {
            badges.push("NEW");
        }

        builder.push_record([
            product.category().emoji().to_string(),
            product.identity().to_string(),
            product.name().to_string(),
            format!("{}", product.price()),
            badges.join(" "),
            product.expires_at().unwrap_or_default().to_string(),
        ]);

        rows += 1;
    }

    if rows == 0 {
        return writeln!(out, "No products found");
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Columns::new(3..4), Alignment::right());

    writeln!(out, "{table}")
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use crate::products::Category;

    use super::*;

    #[test]
    fn lists_products_with_badges() -> TestResult {
        let products = [
            Product::new("GOLD_PACK_LARGE", "Chest of Gold", Money::from_minor(999, EUR), Category::Coins)
                .with_badges(true, false),
            Product::new("BUNDLE_SPRING", "Spring Bundle", Money::from_minor(299, EUR), Category::Bundles)
                .with_badges(false, true),
        ];

        let mut out = Vec::new();

        write_listing(&mut out, &products)?;

        let text = String::from_utf8(out)?;

        assert!(text.contains("Chest of Gold"));
        assert!(text.contains("BEST VALUE"));
        assert!(text.contains("NEW"));
        assert!(text.contains("BUNDLE_SPRING"));

        Ok(())
    }

    #[test]
    fn empty_listing_says_so() -> TestResult {
        let mut out = Vec::new();

        write_listing(&mut out, std::iter::empty())?;

        assert_eq!(String::from_utf8(out)?, "No products found\n");

        Ok(())
    }
}

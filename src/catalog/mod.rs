//! Catalog
//!
//! Merges the permanent base items with the dynamic catalog groups into one
//! ordered product list, and answers category/search queries over it.

use std::{fmt, str::FromStr};

use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::{debug, warn};

use crate::products::{Category, Product, UnknownCategory};

pub mod images;
pub mod listing;
pub mod records;

pub use images::ImageCdn;
pub use listing::write_listing;
pub use records::{ProductSource, ShopData};

use records::BaseItemsFixture;

/// Base items shipped with the crate.
const BASE_ITEMS_YAML: &str = include_str!("../../fixtures/base_items.yml");

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The base items fixture could not be parsed.
    #[error("failed to parse base items: {0}")]
    Fixture(#[from] serde_norway::Error),

    /// A record's price is negative or not representable in minor units.
    #[error("invalid price: {0}")]
    InvalidPrice(rust_decimal::Decimal),

    /// Unknown category in a filter.
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
}

/// Category filter for catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Every category.
    #[default]
    All,

    /// A single category.
    Only(Category),
}

impl CategoryFilter {
    /// Whether `category` passes the filter.
    #[must_use]
    pub fn admits(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => only == category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }

        Ok(Self::Only(s.parse()?))
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(category) => category.fmt(f),
        }
    }
}

/// The merged product catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    currency: &'static Currency,
    cdn: ImageCdn,
    base: Vec<Product>,
    dynamic: Option<Vec<Product>>,
}

impl Catalog {
    /// Creates a catalog holding the bundled base items.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the bundled fixture is malformed.
    pub fn new(currency: &'static Currency, cdn: ImageCdn) -> Result<Self, CatalogError> {
        let fixture: BaseItemsFixture = serde_norway::from_str(BASE_ITEMS_YAML)?;

        let base = fixture
            .items
            .into_iter()
            .map(|record| ProductSource::Base(record).into_product(currency, &cdn))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_base_items(base, currency, cdn))
    }

    /// Creates a catalog from explicit base items.
    #[must_use]
    pub fn with_base_items(base: Vec<Product>, currency: &'static Currency, cdn: ImageCdn) -> Self {
        Self {
            currency,
            cdn,
            base,
            dynamic: None,
        }
    }

    /// Replaces the dynamic groups with freshly fetched data.
    ///
    /// Records that cannot be normalised are skipped and logged. Returns the
    /// number of dynamic products now listed.
    pub fn load_shop_data(&mut self, data: ShopData) -> usize {
        let ShopData {
            bundles,
            skin_sets,
            daily_skins,
            calendars,
        } = data;

        let sources = bundles
            .into_iter()
            .map(ProductSource::Bundle)
            .chain(skin_sets.into_iter().map(ProductSource::SkinSet))
            .chain(daily_skins.into_iter().map(ProductSource::DailySkin))
            .chain(calendars.into_iter().map(ProductSource::Calendar));

        let mut products = Vec::new();

        for source in sources {
            match source.into_product(self.currency, &self.cdn) {
                Ok(product) => products.push(product),
                Err(error) => warn!(%error, "skipping catalog record"),
            }
        }

        debug!(count = products.len(), "loaded dynamic catalog");

        let count = products.len();

        self.dynamic = Some(products);

        count
    }

    /// Whether the dynamic catalog source has responded.
    #[must_use]
    pub fn has_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    /// Every product: base items first, then bundles, skin sets, daily skins
    /// and calendars.
    pub fn all_products(&self) -> impl Iterator<Item = &Product> {
        self.base.iter().chain(self.dynamic.iter().flatten())
    }

    /// Filters by category, then by case-insensitive substring match against
    /// name and identifiers. A blank query matches everything.
    pub fn search_and_filter(&self, filter: CategoryFilter, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();

        self.all_products()
            .filter(|product| filter.admits(product.category()))
            .filter(|product| needle.is_empty() || product.matches_query(&needle))
            .collect()
    }

    /// Finds a product by id or `type`.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Product> {
        self.all_products()
            .find(|product| product.id() == Some(key))
            .or_else(|| self.all_products().find(|product| product.kind() == key))
    }

    /// Currency every product is priced in.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use super::{records::*, *};

    fn shop_data() -> ShopData {
        ShopData {
            bundles: vec![BundleRecord {
                kind: "BUNDLE_SPRING_TIME".to_string(),
                name: None,
                price: Decimal::new(299, 2),
                cost: Some(450),
                image: None,
                is_new: true,
                is_best_value: false,
            }],
            skin_sets: vec![SkinSetRecord {
                kind: "WINTER_OUTFITS".to_string(),
                name: None,
                price: Decimal::new(249, 2),
                cost: Some(380),
                expire_date: None,
                item_sets: Vec::new(),
            }],
            daily_skins: vec![DailySkinRecord {
                kind: "AVATAR_ITEMS_SET".to_string(),
                name: None,
                price: Decimal::new(249, 2),
                cost: Some(380),
                image_name: Some("frost-cape".to_string()),
                expire_date: None,
                avatar_item_ids: Vec::new(),
            }],
            calendars: vec![CalendarRecord {
                id: "cal-1".to_string(),
                title: "Lunar Calendar".to_string(),
                price: Decimal::new(399, 2),
                cost: Some(600),
                description: None,
                image_name: None,
                duration_in_days: Some(14),
            }],
        }
    }

    #[test]
    fn base_items_fixture_parses() -> TestResult {
        let catalog = Catalog::new(EUR, ImageCdn::default())?;

        assert!(catalog.all_products().count() > 0);
        assert!(!catalog.has_dynamic());
        assert!(catalog.all_products().all(|p| p.price().currency() == EUR));

        Ok(())
    }

    #[test]
    fn base_items_are_listed_before_dynamic_groups() -> TestResult {
        let mut catalog = Catalog::new(EUR, ImageCdn::default())?;
        let base_count = catalog.all_products().count();

        assert_eq!(catalog.load_shop_data(shop_data()), 4);

        let categories: Vec<_> = catalog
            .all_products()
            .skip(base_count)
            .map(Product::category)
            .collect();

        assert_eq!(
            categories,
            vec![
                Category::Bundles,
                Category::Skinsets,
                Category::Dailyskins,
                Category::Calendar
            ]
        );

        Ok(())
    }

    #[test]
    fn reloading_replaces_dynamic_products() -> TestResult {
        let mut catalog = Catalog::new(EUR, ImageCdn::default())?;
        let base_count = catalog.all_products().count();

        catalog.load_shop_data(shop_data());
        catalog.load_shop_data(ShopData::default());

        assert!(catalog.has_dynamic());
        assert_eq!(catalog.all_products().count(), base_count);

        Ok(())
    }

    #[test]
    fn invalid_records_are_skipped() -> TestResult {
        let mut catalog = Catalog::new(EUR, ImageCdn::default())?;
        let mut data = shop_data();

        if let Some(bundle) = data.bundles.first_mut() {
            bundle.price = Decimal::new(-1, 0);
        }

        assert_eq!(catalog.load_shop_data(data), 3);

        Ok(())
    }

    #[test]
    fn sub_cent_bundle_is_listed_at_rounded_price() -> TestResult {
        let mut catalog = Catalog::new(EUR, ImageCdn::default())?;
        let data: ShopData =
            serde_json::from_str(r#"{"bundles": [{"type": "BUNDLE_X", "price": 0.125}]}"#)?;

        assert_eq!(catalog.load_shop_data(data), 1);

        let bundle = catalog.find("BUNDLE_X").ok_or("bundle missing")?;

        assert_eq!(bundle.price(), &Money::from_minor(13, EUR));

        Ok(())
    }

    #[test]
    fn filter_by_category_then_query() -> TestResult {
        let mut catalog = Catalog::new(EUR, ImageCdn::default())?;
        catalog.load_shop_data(shop_data());

        let bundles = catalog.search_and_filter(CategoryFilter::Only(Category::Bundles), "");
        assert_eq!(bundles.len(), 1);

        let spring = catalog.search_and_filter(CategoryFilter::All, "  SPRING ");
        assert_eq!(
            spring.iter().map(|p| p.name()).collect::<Vec<_>>(),
            vec!["Spring Time Bundle"]
        );

        let by_id = catalog.search_and_filter(CategoryFilter::All, "cal-1");
        assert_eq!(by_id.len(), 1);

        let none = catalog.search_and_filter(CategoryFilter::Only(Category::Calendar), "spring");
        assert!(none.is_empty());

        Ok(())
    }

    #[test]
    fn find_prefers_id_over_type() -> TestResult {
        let mut catalog = Catalog::with_base_items(Vec::new(), EUR, ImageCdn::default());
        catalog.load_shop_data(shop_data());

        assert_eq!(
            catalog.find("cal-1").map(Product::name),
            Some("Lunar Calendar")
        );
        assert_eq!(
            catalog.find("BUNDLE_SPRING_TIME").map(Product::price),
            Some(&Money::from_minor(299, EUR))
        );
        assert!(catalog.find("missing").is_none());

        Ok(())
    }

    #[test]
    fn category_filter_parses() -> TestResult {
        assert_eq!("all".parse::<CategoryFilter>()?, CategoryFilter::All);
        assert_eq!(
            "gift_card".parse::<CategoryFilter>()?,
            CategoryFilter::Only(Category::GiftCard)
        );
        assert!("hats".parse::<CategoryFilter>().is_err());

        Ok(())
    }
}

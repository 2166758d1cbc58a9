//! Catalog Records
//!
//! Wire and fixture shapes for every catalog source, and their normalisation
//! into [`Product`].

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;

use crate::{
    catalog::{CatalogError, images::ImageCdn},
    pricing::decimal_to_minor,
    products::{Category, Product, Rewards},
};

/// Dynamic catalog groups, as served by the catalog source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopData {
    /// Gem-offer bundles.
    #[serde(default)]
    pub bundles: Vec<BundleRecord>,

    /// Rotating outfit sets.
    #[serde(default)]
    pub skin_sets: Vec<SkinSetRecord>,

    /// Rotating daily skins.
    #[serde(default)]
    pub daily_skins: Vec<DailySkinRecord>,

    /// Purchasable calendars.
    #[serde(default)]
    pub calendars: Vec<CalendarRecord>,
}

impl ShopData {
    /// Total number of records across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.len()
            + self.skin_sets.len()
            + self.daily_skins.len()
            + self.calendars.len()
    }

    /// Whether every group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Permanent item declared in the base items fixture.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseItemRecord {
    /// Product `type`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name.
    pub name: String,

    /// Price in major units.
    pub price: Decimal,

    /// Virtual-currency cost.
    #[serde(default)]
    pub cost: Option<u32>,

    /// Category.
    pub category: Category,

    /// "Best value" badge.
    #[serde(default)]
    pub is_best_value: bool,

    /// Promo image name.
    #[serde(default)]
    pub image: Option<String>,

    /// In-game rewards.
    #[serde(flatten)]
    pub rewards: Rewards,
}

/// Wrapper for the base items fixture document.
#[derive(Debug, Deserialize)]
pub(crate) struct BaseItemsFixture {
    pub(crate) items: Vec<BaseItemRecord>,
}

/// Gem-offer bundle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRecord {
    /// Bundle `type`, e.g. `BUNDLE_SPRING_TIME`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name; derived from the `type` when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Price in major units.
    pub price: Decimal,

    /// Gem cost.
    #[serde(default)]
    pub cost: Option<u32>,

    /// Promo image name; derived from the `type` when absent.
    #[serde(default)]
    pub image: Option<String>,

    /// "New" badge.
    #[serde(default)]
    pub is_new: bool,

    /// "Best value" badge.
    #[serde(default)]
    pub is_best_value: bool,
}

/// One outfit inside a skin set or daily skin offer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSetRecord {
    /// Artwork name.
    #[serde(default)]
    pub image_name: Option<String>,

    /// Avatar items in the outfit.
    #[serde(default)]
    pub avatar_item_ids: Vec<String>,
}

/// Rotating outfit set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinSetRecord {
    /// Offer `type`, e.g. `WINTER_OUTFITS`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name; derived from the `type` when absent.
    #[serde(default)]
    pub name: Option<String>,

    /// Price in major units.
    pub price: Decimal,

    /// Gem cost.
    #[serde(default)]
    pub cost: Option<u32>,

    /// Offer expiry.
    #[serde(default)]
    pub expire_date: Option<String>,

    /// Outfits in the set.
    #[serde(default)]
    pub item_sets: Vec<ItemSetRecord>,
}

/// Rotating daily skin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySkinRecord {
    /// Offer `type`; shared by every daily skin.
    #[serde(rename = "type")]
    pub kind: String,

    /// Display name; falls back to the image name.
    #[serde(default)]
    pub name: Option<String>,

    /// Price in major units.
    pub price: Decimal,

    /// Gem cost.
    #[serde(default)]
    pub cost: Option<u32>,

    /// Artwork name, also used as the skin's identity.
    #[serde(default)]
    pub image_name: Option<String>,

    /// Offer expiry.
    #[serde(default)]
    pub expire_date: Option<String>,

    /// Avatar items in the skin.
    #[serde(default)]
    pub avatar_item_ids: Vec<String>,
}

/// Purchasable calendar.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRecord {
    /// Calendar id.
    pub id: String,

    /// Display name.
    pub title: String,

    /// Price in major units.
    pub price: Decimal,

    /// Gem cost.
    #[serde(default)]
    pub cost: Option<u32>,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Artwork base name.
    #[serde(default)]
    pub image_name: Option<String>,

    /// Length of the calendar.
    #[serde(default)]
    pub duration_in_days: Option<u32>,
}

/// `type` shared by all calendars.
pub const CALENDAR_KIND: &str = "CALENDAR";

/// A catalog record from any source, before normalisation.
#[derive(Debug, Clone)]
pub enum ProductSource {
    /// Permanent base item.
    Base(BaseItemRecord),

    /// Gem-offer bundle.
    Bundle(BundleRecord),

    /// Rotating outfit set.
    SkinSet(SkinSetRecord),

    /// Rotating daily skin.
    DailySkin(DailySkinRecord),

    /// Purchasable calendar.
    Calendar(CalendarRecord),
}

impl ProductSource {
    /// Normalises the record into a [`Product`] priced in `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidPrice`] if the price is negative or has
    /// no exact minor unit representation.
    pub fn into_product(
        self,
        currency: &'static Currency,
        cdn: &ImageCdn,
    ) -> Result<Product, CatalogError> {
        let product = match self {
            Self::Base(record) => {
                let images = record
                    .image
                    .as_deref()
                    .map(|image| cdn.promo(image))
                    .unwrap_or_default();

                let price = money(record.price, currency)?;

                Product::new(record.kind, record.name, price, record.category)
                    .with_cost(record.cost)
                    .with_badges(record.is_best_value, false)
                    .with_rewards(record.rewards)
                    .with_images(images)
            }
            Self::Bundle(record) => {
                let image = record
                    .image
                    .unwrap_or_else(|| bundle_image_name(&record.kind));
                let name = record
                    .name
                    .unwrap_or_else(|| bundle_display_name(&record.kind));

                let price = money(record.price, currency)?;

                Product::new(record.kind, name, price, Category::Bundles)
                    .with_cost(record.cost)
                    .with_badges(record.is_best_value, record.is_new)
                    .with_images(cdn.promo(&image))
            }
            Self::SkinSet(record) => {
                let name = record
                    .name
                    .unwrap_or_else(|| outfit_display_name(&record.kind));
                let images = cdn.outfit_set(
                    record
                        .item_sets
                        .iter()
                        .filter_map(|set| set.image_name.as_deref()),
                );

                let price = money(record.price, currency)?;

                Product::new(record.kind, name, price, Category::Skinsets)
                    .with_cost(record.cost)
                    .with_images(images)
                    .with_expiry(record.expire_date)
            }
            Self::DailySkin(record) => {
                let price = money(record.price, currency)?;
                let images = record
                    .image_name
                    .as_deref()
                    .map(|name| cdn.avatar_item(name))
                    .unwrap_or_default();
                let name = record
                    .name
                    .or_else(|| record.image_name.clone())
                    .unwrap_or_else(|| "Daily Skin".to_string());

                let product = Product::new(record.kind, name, price, Category::Dailyskins)
                    .with_cost(record.cost)
                    .with_images(images)
                    .with_expiry(record.expire_date);

                match record.image_name {
                    Some(image_name) => product.with_id(image_name),
                    None => product,
                }
            }
            Self::Calendar(record) => {
                let images = record
                    .image_name
                    .as_deref()
                    .map(|name| cdn.calendar(name))
                    .unwrap_or_default();

                Product::new(
                    CALENDAR_KIND,
                    record.title,
                    money(record.price, currency)?,
                    Category::Calendar,
                )
                .with_id(record.id)
                .with_description(record.description)
                .with_cost(record.cost)
                .with_images(images)
            }
        };

        Ok(product)
    }
}

/// Converts a major-unit price into money, rounding half-up to whole cents
/// and rejecting negative amounts.
fn money(
    price: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, CatalogError> {
    if price.is_sign_negative() {
        return Err(CatalogError::InvalidPrice(price));
    }

    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let minor = decimal_to_minor(rounded).ok_or(CatalogError::InvalidPrice(price))?;

    Ok(Money::from_minor(minor, currency))
}

/// `BUNDLE_SPRING_TIME` -> `Spring Time Bundle`.
pub fn bundle_display_name(kind: &str) -> String {
    let base = kind.strip_prefix("BUNDLE_").unwrap_or(kind);

    format!("{} Bundle", title_case(base))
}

/// `WINTER_OUTFITS` -> `Winter Outfits`.
pub fn outfit_display_name(kind: &str) -> String {
    let base = kind.strip_suffix("_OUTFITS").unwrap_or(kind);

    format!("{} Outfits", title_case(base))
}

/// `BUNDLE_SPRING_TIME` -> `bundle-spring_time`.
pub fn bundle_image_name(kind: &str) -> String {
    let base = kind.strip_prefix("BUNDLE_").unwrap_or(kind);

    format!("bundle-{}", base.to_lowercase())
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();

            chars.next().map_or_else(String::new, |first| {
                first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

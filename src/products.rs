//! Products

use std::{fmt, str::FromStr};

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

/// A category slug that is not part of the catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Gold coin packs.
    Coins,

    /// Battle pass coins.
    Bpcoins,

    /// Emotes.
    Emote,

    /// Premium membership.
    Premium,

    /// Loot boxes.
    Lootbox,

    /// Role cards.
    Rolecards,

    /// Calendars.
    Calendar,

    /// Bundles.
    Bundles,

    /// Daily rotating skins.
    Dailyskins,

    /// Outfit sets.
    Skinsets,

    /// Stored-value gift cards.
    GiftCard,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 11] = [
        Self::Coins,
        Self::Bpcoins,
        Self::Emote,
        Self::Premium,
        Self::Lootbox,
        Self::Rolecards,
        Self::Calendar,
        Self::Bundles,
        Self::Dailyskins,
        Self::Skinsets,
        Self::GiftCard,
    ];

    /// Slug used on the wire and in filters.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Bpcoins => "bpcoins",
            Self::Emote => "emote",
            Self::Premium => "premium",
            Self::Lootbox => "lootbox",
            Self::Rolecards => "rolecards",
            Self::Calendar => "calendar",
            Self::Bundles => "bundles",
            Self::Dailyskins => "dailyskins",
            Self::Skinsets => "skinsets",
            Self::GiftCard => "gift_card",
        }
    }

    /// Emoji shown on category tabs and empty states.
    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Coins => "🪙",
            Self::Bpcoins => "🎫",
            Self::Emote => "😀",
            Self::Premium => "👑",
            Self::Lootbox => "🎁",
            Self::Rolecards => "🎴",
            Self::Calendar => "📅",
            Self::Bundles | Self::Skinsets => "📦",
            Self::Dailyskins => "👕",
            Self::GiftCard => "💳",
        }
    }

    /// Whether at most one unit per product may sit in the cart.
    #[must_use]
    pub const fn is_single_purchase(self) -> bool {
        matches!(
            self,
            Self::Bundles
                | Self::Calendar
                | Self::Dailyskins
                | Self::Skinsets
                | Self::Premium
                | Self::Emote
                | Self::GiftCard
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.slug() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// In-game rewards granted by a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rewards {
    /// Gold coins granted.
    pub gold_reward: Option<u32>,

    /// Battle pass coins granted.
    pub battle_pass_coin_count: Option<u32>,

    /// Loot boxes granted.
    pub loot_box_count: Option<u32>,

    /// Role cards granted.
    pub role_card_count: Option<u32>,
}

/// Read-only catalog entry, normalised from one of the catalog sources.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    kind: String,
    id: Option<String>,
    name: String,
    description: Option<String>,
    price: Money<'static, Currency>,
    cost: Option<u32>,
    category: Category,
    best_value: bool,
    new: bool,
    rewards: Rewards,
    images: SmallVec<[String; 2]>,
    expires_at: Option<String>,
}

impl Product {
    /// Creates a product with the required fields; optional metadata is set
    /// with the `with_*` methods.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        price: Money<'static, Currency>,
        category: Category,
    ) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            name: name.into(),
            description: None,
            price,
            cost: None,
            category,
            best_value: false,
            new: false,
            rewards: Rewards::default(),
            images: SmallVec::new(),
            expires_at: None,
        }
    }

    /// Sets the product id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the virtual-currency cost.
    #[must_use]
    pub fn with_cost(mut self, cost: Option<u32>) -> Self {
        self.cost = cost;
        self
    }

    /// Sets the "best value" and "new" badges.
    #[must_use]
    pub fn with_badges(mut self, best_value: bool, new: bool) -> Self {
        self.best_value = best_value;
        self.new = new;
        self
    }

    /// Sets the reward metadata.
    #[must_use]
    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    /// Sets candidate image URLs, most preferred first.
    #[must_use]
    pub fn with_images(mut self, images: SmallVec<[String; 2]>) -> Self {
        self.images = images;
        self
    }

    /// Sets the offer expiry as reported by the catalog source.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: Option<String>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// The product `type`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The product id, when the source provides one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Stable identity: the id when present, otherwise the `type`.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.kind)
    }

    /// Whether two products denote the same cart line: equal `type`s, or
    /// equal ids when both products carry one.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.kind == other.kind
            || matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b)
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Unit price.
    #[must_use]
    pub fn price(&self) -> &Money<'static, Currency> {
        &self.price
    }

    /// Virtual-currency cost, informational only.
    #[must_use]
    pub fn cost(&self) -> Option<u32> {
        self.cost
    }

    /// Category.
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// "Best value" badge.
    #[must_use]
    pub fn is_best_value(&self) -> bool {
        self.best_value
    }

    /// "New" badge.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// Reward metadata.
    #[must_use]
    pub fn rewards(&self) -> &Rewards {
        &self.rewards
    }

    /// Candidate image URLs, most preferred first.
    #[must_use]
    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// Offer expiry.
    #[must_use]
    pub fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }

    /// Case-insensitive substring match against name and identifiers.
    ///
    /// `needle` must already be lower-cased.
    pub(crate) fn matches_query(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.kind.to_lowercase().contains(needle)
            || self
                .id
                .as_ref()
                .is_some_and(|id| id.to_lowercase().contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::EUR;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn category_round_trips_through_slug() -> TestResult {
        for category in Category::ALL {
            assert_eq!(category.slug().parse::<Category>()?, category);
        }

        assert_eq!(
            "hats".parse::<Category>(),
            Err(UnknownCategory("hats".to_string()))
        );

        Ok(())
    }

    #[test]
    fn category_serde_matches_slug() -> TestResult {
        assert_eq!(serde_json::to_string(&Category::GiftCard)?, "\"gift_card\"");
        assert_eq!(
            serde_json::from_str::<Category>("\"dailyskins\"")?,
            Category::Dailyskins
        );

        Ok(())
    }

    #[test]
    fn single_purchase_categories() {
        let single: Vec<_> = Category::ALL
            .into_iter()
            .filter(|category| category.is_single_purchase())
            .collect();

        assert_eq!(
            single,
            vec![
                Category::Emote,
                Category::Premium,
                Category::Calendar,
                Category::Bundles,
                Category::Dailyskins,
                Category::Skinsets,
                Category::GiftCard,
            ]
        );
    }

    #[test]
    fn lines_match_by_type_or_id() {
        let a = Product::new("CALENDAR", "Spring", Money::from_minor(399, EUR), Category::Calendar)
            .with_id("cal-1");
        let b = Product::new("CALENDAR", "Summer", Money::from_minor(399, EUR), Category::Calendar)
            .with_id("cal-2");
        let c = Product::new("GOLD_SMALL", "Gold", Money::from_minor(99, EUR), Category::Coins);

        assert_eq!(a.identity(), "cal-1");
        assert_eq!(c.identity(), "GOLD_SMALL");
        assert!(a.same_identity(&b));
        assert!(a.same_identity(&a.clone()));
        assert!(!a.same_identity(&c));
        assert!(c.same_identity(&c.clone().with_id("gold-1")));
    }

    #[test]
    fn matching_ids_match_across_types() {
        let a = Product::new("GOLD_SMALL", "Gold", Money::from_minor(99, EUR), Category::Coins)
            .with_id("gold-1");
        let b = Product::new("GOLD_PROMO", "Gold", Money::from_minor(99, EUR), Category::Coins)
            .with_id("gold-1");
        let c = Product::new("GOLD_PROMO", "Gold", Money::from_minor(99, EUR), Category::Coins);
        let d = Product::new("GOLD_LARGE", "Gold", Money::from_minor(99, EUR), Category::Coins);

        assert!(a.same_identity(&b));
        assert!(b.same_identity(&c));
        assert!(!a.same_identity(&d));
    }

    #[test]
    fn query_matches_name_and_identifiers() {
        let product = Product::new(
            "BUNDLE_SPRING_TIME",
            "Spring Time Bundle",
            Money::from_minor(299, EUR),
            Category::Bundles,
        );

        assert!(product.matches_query("spring"));
        assert!(product.matches_query("bundle_spring"));
        assert!(!product.matches_query("winter"));
    }
}

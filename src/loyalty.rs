//! Loyalty
//!
//! Every `items_required`th purchased unit is free, and the free units are
//! always the cheapest ones in the cart. The same allocation drives both the
//! discount and the "FREE" markers on cart lines so the two never disagree.

use serde::Serialize;
use smallvec::SmallVec;

use crate::cart::Cart;

/// How loyalty-free units are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    /// Globally cheapest units first.
    #[default]
    CheapestFree,
}

/// Loyalty program settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyConfig {
    /// Units needed to earn one free unit.
    pub items_required: u64,

    /// Selection rule for free units.
    pub reward_type: RewardType,
}

impl LoyaltyConfig {
    /// Number of free units earned by `total_items` purchased units.
    ///
    /// A zero `items_required` disables the program.
    #[must_use]
    pub fn free_items(&self, total_items: u64) -> u64 {
        total_items.checked_div(self.items_required).unwrap_or(0)
    }

    /// Progress towards the next free unit.
    #[must_use]
    pub fn progress(&self, total_items: u64) -> LoyaltyProgress {
        let progress = total_items.checked_rem(self.items_required).unwrap_or(0);

        LoyaltyProgress {
            progress,
            items_required: self.items_required,
            items_until_free: self.items_required.saturating_sub(progress),
            free_items: self.free_items(total_items),
        }
    }
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            items_required: 5,
            reward_type: RewardType::CheapestFree,
        }
    }
}

/// Progress towards the next free unit, for the loyalty progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgress {
    /// Units counted towards the next reward.
    pub progress: u64,

    /// Units needed per reward.
    pub items_required: u64,

    /// Units still needed for the next reward.
    pub items_until_free: u64,

    /// Rewards already earned.
    pub free_items: u64,
}

/// Free units taken from one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeUnits {
    /// Cart line position.
    pub line_idx: usize,

    /// Units of that line that are free.
    pub units: u32,
}

/// Which cart units are loyalty-free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoyaltyAllocation {
    free: SmallVec<[FreeUnits; 4]>,
}

impl LoyaltyAllocation {
    /// Allocates `free_items` free units over the cart, cheapest units first.
    ///
    /// Lines are visited in ascending unit price; equal prices keep cart
    /// order. Each visited line contributes as many units as it has, up to
    /// the remaining number of free slots.
    #[must_use]
    pub fn allocate(cart: &Cart, free_items: u64) -> Self {
        let mut by_price: SmallVec<[(usize, i64, u32); 8]> = cart
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx, line.unit_price().to_minor_units(), line.quantity()))
            .collect();

        // Stable, so equal prices keep their cart order.
        by_price.sort_by_key(|&(_, price, _)| price);

        let mut remaining = free_items;
        let mut free = SmallVec::new();

        for (line_idx, _, quantity) in by_price {
            if remaining == 0 {
                break;
            }

            let units = u32::try_from(remaining.min(u64::from(quantity))).unwrap_or(quantity);

            if units == 0 {
                continue;
            }

            free.push(FreeUnits { line_idx, units });
            remaining = remaining.saturating_sub(u64::from(units));
        }

        Self { free }
    }

    /// Free units per line, in allocation order (cheapest first).
    #[must_use]
    pub fn free_units(&self) -> &[FreeUnits] {
        &self.free
    }

    /// Whether any unit of the line at `line_idx` is free.
    #[must_use]
    pub fn is_line_free(&self, line_idx: usize) -> bool {
        self.free_units_for_line(line_idx) > 0
    }

    /// Number of free units on the line at `line_idx`.
    #[must_use]
    pub fn free_units_for_line(&self, line_idx: usize) -> u32 {
        self.free
            .iter()
            .find(|free| free.line_idx == line_idx)
            .map_or(0, |free| free.units)
    }

    /// Total number of units marked free.
    #[must_use]
    pub fn allocated_units(&self) -> u64 {
        self.free.iter().map(|free| u64::from(free.units)).sum()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use crate::products::{Category, Product};

    use super::*;

    fn cart_with(lines: &[(&str, i64, u32)]) -> TestResult<Cart> {
        let mut cart = Cart::new(EUR);

        for &(kind, price, quantity) in lines {
            for _ in 0..quantity {
                cart.add(Product::new(
                    kind,
                    kind,
                    Money::from_minor(price, EUR),
                    Category::Coins,
                ))?;
            }
        }

        Ok(cart)
    }

    #[test]
    fn free_items_is_floor_of_total_over_required() {
        let config = LoyaltyConfig::default();

        assert_eq!(config.free_items(4), 0);
        assert_eq!(config.free_items(5), 1);
        assert_eq!(config.free_items(12), 2);
    }

    #[test]
    fn zero_required_disables_program() {
        let config = LoyaltyConfig {
            items_required: 0,
            reward_type: RewardType::CheapestFree,
        };

        assert_eq!(config.free_items(10), 0);
        assert_eq!(config.progress(10).progress, 0);
    }

    #[test]
    fn progress_counts_towards_next_reward() {
        let progress = LoyaltyConfig::default().progress(7);

        assert_eq!(
            progress,
            LoyaltyProgress {
                progress: 2,
                items_required: 5,
                items_until_free: 3,
                free_items: 1,
            }
        );
    }

    #[test]
    fn cheapest_units_are_freed_first() -> TestResult {
        let cart = cart_with(&[("A", 1000, 3), ("B", 200, 3)])?;

        let allocation = LoyaltyAllocation::allocate(&cart, 1);

        assert_eq!(
            allocation.free_units(),
            [FreeUnits {
                line_idx: 1,
                units: 1
            }]
        );
        assert!(allocation.is_line_free(1));
        assert!(!allocation.is_line_free(0));

        Ok(())
    }

    #[test]
    fn allocation_spills_into_next_cheapest_line() -> TestResult {
        let cart = cart_with(&[("A", 500, 4), ("B", 100, 2), ("C", 300, 4)])?;

        let allocation = LoyaltyAllocation::allocate(&cart, 3);

        assert_eq!(allocation.free_units_for_line(1), 2);
        assert_eq!(allocation.free_units_for_line(2), 1);
        assert_eq!(allocation.free_units_for_line(0), 0);
        assert_eq!(allocation.allocated_units(), 3);

        Ok(())
    }

    #[test]
    fn ties_keep_cart_order() -> TestResult {
        let cart = cart_with(&[("A", 100, 1), ("B", 100, 1)])?;

        let allocation = LoyaltyAllocation::allocate(&cart, 1);

        assert!(allocation.is_line_free(0));
        assert!(!allocation.is_line_free(1));

        Ok(())
    }

    #[test]
    fn more_free_slots_than_units_frees_everything() -> TestResult {
        let cart = cart_with(&[("A", 100, 2)])?;

        let allocation = LoyaltyAllocation::allocate(&cart, 10);

        assert_eq!(allocation.allocated_units(), 2);

        Ok(())
    }
}

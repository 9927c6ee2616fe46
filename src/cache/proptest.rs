//! Property-Based Tests for the Cache Key and Memory Tier
//!
//! # Test Properties
//!
//! 1. **Determinism**: criteria differing only in list order share a key
//! 2. **Shape**: every key has seven `:`-separated fields
//! 3. **Capacity**: the memory tier never holds more than its capacity

#![cfg(test)]

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use super::key::CacheKey;
use super::memory::{MemoryConfig, MemoryTier};
use crate::clock::ManualClock;
use crate::domain::model::{FilterCriteria, Gender, Product};

// =============================================================================
// Property Strategies
// =============================================================================

fn gender_strategy() -> impl Strategy<Value = Option<Gender>> {
    prop_oneof![
        Just(None),
        Just(Some(Gender::Male)),
        Just(Some(Gender::Female)),
        Just(Some(Gender::Unisex)),
    ]
}

fn list_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,8}", 0..6)
}

fn bound_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![Just(None), Just(Some(0.0)), (1u32..500).prop_map(|v| Some(v as f64))]
}

prop_compose! {
    fn criteria_strategy()(
        gender in gender_strategy(),
        min in bound_strategy(),
        max in bound_strategy(),
        categories in list_strategy(),
        brands in list_strategy(),
        rating in prop::option::of(0u8..=5),
    ) -> FilterCriteria {
        let mut criteria = FilterCriteria::new()
            .with_budget(min, max)
            .with_categories(categories)
            .with_brands(brands);
        criteria.gender = gender;
        criteria.min_rating = rating.map(f64::from);
        criteria
    }
}

// =============================================================================
// Key Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_key_ignores_list_order(criteria in criteria_strategy()) {
        let mut shuffled = criteria.clone();
        shuffled.categories.reverse();
        let mid = shuffled.brands.len() / 2;
        shuffled.brands.rotate_left(mid);

        prop_assert_eq!(CacheKey::encode(&criteria), CacheKey::encode(&shuffled));
    }

    #[test]
    fn prop_key_ignores_duplicates(criteria in criteria_strategy()) {
        let mut doubled = criteria.clone();
        doubled.categories.extend(criteria.categories.iter().cloned());

        prop_assert_eq!(CacheKey::encode(&criteria), CacheKey::encode(&doubled));
    }

    #[test]
    fn prop_key_shape(criteria in criteria_strategy()) {
        let key = CacheKey::encode(&criteria);
        let fields: Vec<&str> = key.as_str().split(':').collect();

        prop_assert_eq!(fields.len(), 7);
        prop_assert_eq!(fields[0], "products");
    }

    #[test]
    fn prop_key_is_stable(criteria in criteria_strategy()) {
        prop_assert_eq!(CacheKey::encode(&criteria), CacheKey::encode(&criteria.clone()));
    }
}

// =============================================================================
// Memory Tier Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_memory_never_exceeds_capacity(
        capacity in 1usize..20,
        keys in prop::collection::vec(0u16..64, 1..200),
    ) {
        let tier = MemoryTier::new(
            MemoryConfig { ttl: Duration::from_secs(300), capacity },
            Arc::new(ManualClock::starting_now()),
        );

        for key in &keys {
            tier.put(&format!("k-{}", key), vec![Product::new("p", "Tee", "tops", 10.0)]);
            prop_assert!(tier.len() <= capacity);
            prop_assert_eq!(tier.keys().len(), tier.len());
        }

        // the last key written is always present
        let last = format!("k-{}", keys[keys.len() - 1]);
        prop_assert!(tier.contains(&last));
    }
}

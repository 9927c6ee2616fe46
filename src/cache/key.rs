//! Cache Key Encoder
//!
//! Deterministic serialization of [`FilterCriteria`] into the string key
//! shared by the memory and database tiers:
//!
//! ```text
//! products:<gender>:<min>:<max>:<categories>:<brands>:<min_rating>
//! products:female:0:100:dresses:all:0
//! ```
//!
//! Absent or zero fields collapse to sentinels (`all`, `0`, `9999`) and list
//! fields are sorted and de-duplicated, so criteria that differ only in list
//! ordering share a key.

use std::fmt;

use crate::domain::model::FilterCriteria;

/// Namespace prefix of every product listing key
pub const KEY_PREFIX: &str = "products";

/// Sentinel for an absent gender or empty list
pub const ALL: &str = "all";

/// Sentinel for an absent upper price bound
pub const DEFAULT_MAX_PRICE: f64 = 9999.0;

const DELIMITER: &str = ":";

/// Encoded filter criteria
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Encode criteria. Total and pure.
    pub fn encode(criteria: &FilterCriteria) -> Self {
        let budget = criteria.budget.unwrap_or_default();

        let parts = [
            KEY_PREFIX.to_string(),
            criteria
                .gender
                .map(|g| g.as_str().to_string())
                .unwrap_or_else(|| ALL.to_string()),
            number(budget.min, 0.0),
            number(budget.max, DEFAULT_MAX_PRICE),
            list(&criteria.categories),
            list(&criteria.brands),
            number(criteria.min_rating, 0.0),
        ];

        Self(parts.join(DELIMITER))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&FilterCriteria> for CacheKey {
    fn from(criteria: &FilterCriteria) -> Self {
        Self::encode(criteria)
    }
}

/// Zero, NaN and absent values all fall back to `default`.
fn number(value: Option<f64>, default: f64) -> String {
    let v = value
        .filter(|v| *v != 0.0 && !v.is_nan())
        .unwrap_or(default);
    format!("{}", v)
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        return ALL.to_string();
    }

    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Gender;

    #[test]
    fn test_empty_criteria_uses_sentinels() {
        let key = CacheKey::encode(&FilterCriteria::new());
        assert_eq!(key.as_str(), "products:all:0:9999:all:all:0");
    }

    #[test]
    fn test_full_criteria() {
        let criteria = FilterCriteria::new()
            .with_gender(Gender::Female)
            .with_budget(Some(25.0), Some(149.5))
            .with_categories(["tops", "dresses"])
            .with_brands(["COS"])
            .with_min_rating(4.0);

        assert_eq!(
            CacheKey::encode(&criteria).as_str(),
            "products:female:25:149.5:dresses,tops:COS:4"
        );
    }

    #[test]
    fn test_list_order_and_duplicates_ignored() {
        let a = FilterCriteria::new().with_categories(["shoes", "bags", "dresses"]);
        let b = FilterCriteria::new().with_categories(["dresses", "shoes", "bags", "shoes"]);
        assert_eq!(CacheKey::encode(&a), CacheKey::encode(&b));
    }

    #[test]
    fn test_zero_and_absent_bounds_share_a_key() {
        let zero = FilterCriteria::new()
            .with_budget(Some(0.0), Some(0.0))
            .with_min_rating(0.0);
        assert_eq!(CacheKey::encode(&zero), CacheKey::encode(&FilterCriteria::new()));
    }

    #[test]
    fn test_nan_falls_back_to_default() {
        let criteria = FilterCriteria::new().with_budget(Some(f64::NAN), None);
        assert_eq!(
            CacheKey::encode(&criteria).as_str(),
            "products:all:0:9999:all:all:0"
        );
    }

    #[test]
    fn test_distinct_criteria_distinct_keys() {
        let women = FilterCriteria::new().with_gender(Gender::Female);
        let men = FilterCriteria::new().with_gender(Gender::Male);
        assert_ne!(CacheKey::encode(&women), CacheKey::encode(&men));
    }
}

//! Product Filter Pipeline
//!
//! Client-side narrowing of a product list with a removal report. Stages run
//! in a fixed order:
//!
//! 1. gender (unisex and genderless products always pass)
//! 2. budget (products without a positive price always pass)
//! 3. validation (id, name and category are required)
//! 4. excluded ids
//! 5. category (matches category or type)
//! 6. brand (case-insensitive)
//! 7. minimum rating
//!
//! Removal reasons are recorded for the first three stages.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::model::{FilterCriteria, Gender, Product};

/// Reasons listed per stage in [`FilterReport::summary`]
const SUMMARY_REASON_LIMIT: usize = 5;

/// Product counts after each recorded stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterStats {
    pub initial: usize,
    pub after_gender: usize,
    pub after_budget: usize,
    pub after_validation: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
}

/// Why products were dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedReasons {
    pub gender: Vec<String>,
    pub budget: Vec<String>,
    pub validation: Vec<String>,
}

/// Pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterReport {
    pub products: Vec<Product>,
    pub stats: FilterStats,
    pub removed: RemovedReasons,
}

impl FilterReport {
    /// Percentage of the input that survived; zero for an empty input.
    pub fn retention_rate(&self) -> f64 {
        if self.stats.initial == 0 {
            0.0
        } else {
            self.stats.final_count as f64 / self.stats.initial as f64 * 100.0
        }
    }

    /// Multi-line report for debugging.
    pub fn summary(&self) -> String {
        let stats = &self.stats;
        let mut lines = vec![
            "=== Product Filtering Stats ===".to_string(),
            format!("Initial products: {}", stats.initial),
            format!(
                "After gender filter: {} ({} removed)",
                stats.after_gender,
                self.removed.gender.len()
            ),
            format!(
                "After budget filter: {} ({} removed)",
                stats.after_budget,
                self.removed.budget.len()
            ),
            format!(
                "After validation: {} ({} removed)",
                stats.after_validation,
                self.removed.validation.len()
            ),
            format!("Final products: {}", stats.final_count),
            format!("Retention rate: {:.1}%", self.retention_rate()),
        ];

        append_reasons(&mut lines, "gender", &self.removed.gender);
        append_reasons(&mut lines, "budget", &self.removed.budget);

        lines.join("\n")
    }
}

fn append_reasons(lines: &mut Vec<String>, stage: &str, reasons: &[String]) {
    if reasons.is_empty() {
        return;
    }

    lines.push(format!("\nRemoved by {}:", stage));
    lines.extend(
        reasons
            .iter()
            .take(SUMMARY_REASON_LIMIT)
            .map(|r| format!("  - {}", r)),
    );
    if reasons.len() > SUMMARY_REASON_LIMIT {
        lines.push(format!("  ... and {} more", reasons.len() - SUMMARY_REASON_LIMIT));
    }
}

/// Run the pipeline over `products`.
pub fn filter_products(
    products: Vec<Product>,
    criteria: &FilterCriteria,
    exclude_ids: &[String],
) -> FilterReport {
    let mut stats = FilterStats {
        initial: products.len(),
        ..FilterStats::default()
    };
    let mut removed = RemovedReasons::default();

    debug!(count = stats.initial, "Starting product filter pipeline");

    let mut filtered = by_gender(products, criteria.gender, &mut removed.gender);
    stats.after_gender = filtered.len();
    debug!(
        count = filtered.len(),
        removed = stats.initial - stats.after_gender,
        "Gender filter"
    );

    filtered = by_budget(filtered, criteria, &mut removed.budget);
    stats.after_budget = filtered.len();
    debug!(
        count = filtered.len(),
        removed = stats.after_gender - stats.after_budget,
        "Budget filter"
    );

    filtered = by_validation(filtered, &mut removed.validation);
    stats.after_validation = filtered.len();
    debug!(
        count = filtered.len(),
        removed = stats.after_budget - stats.after_validation,
        "Validation filter"
    );

    if !exclude_ids.is_empty() {
        let excluded: HashSet<&str> = exclude_ids.iter().map(String::as_str).collect();
        filtered.retain(|p| !excluded.contains(p.id.as_str()));
        debug!(count = filtered.len(), "Excluded ids");
    }

    if !criteria.categories.is_empty() {
        filtered.retain(|p| {
            criteria.categories.contains(&p.category)
                || p
                    .product_type
                    .as_ref()
                    .is_some_and(|t| criteria.categories.contains(t))
        });
        debug!(count = filtered.len(), "Category filter");
    }

    if !criteria.brands.is_empty() {
        let brands: HashSet<String> = criteria.brands.iter().map(|b| b.to_lowercase()).collect();
        filtered.retain(|p| {
            p.brand
                .as_ref()
                .is_some_and(|b| brands.contains(&b.to_lowercase()))
        });
        debug!(count = filtered.len(), "Brand filter");
    }

    if let Some(min_rating) = criteria.min_rating {
        filtered.retain(|p| p.rating.is_some_and(|r| r != 0.0 && r >= min_rating));
        debug!(count = filtered.len(), "Rating filter");
    }

    stats.final_count = filtered.len();

    let report = FilterReport {
        products: filtered,
        stats,
        removed,
    };
    info!(
        initial = stats.initial,
        final_count = stats.final_count,
        removed_gender = report.removed.gender.len(),
        removed_budget = report.removed.budget.len(),
        removed_validation = report.removed.validation.len(),
        retention_pct = report.retention_rate(),
        "Product filter summary"
    );
    report
}

fn by_gender(
    products: Vec<Product>,
    gender: Option<Gender>,
    removed: &mut Vec<String>,
) -> Vec<Product> {
    let wanted = match gender {
        None | Some(Gender::Unisex) => return products,
        Some(g) => g.as_str(),
    };

    products
        .into_iter()
        .filter(|p| match p.gender.as_deref() {
            None | Some("") => true,
            Some(g) if g == Gender::Unisex.as_str() || g == wanted => true,
            Some(g) => {
                removed.push(format!(
                    "{} ({}): gender mismatch - wanted {}, got {}",
                    p.id, p.name, wanted, g
                ));
                false
            }
        })
        .collect()
}

fn by_budget(
    products: Vec<Product>,
    criteria: &FilterCriteria,
    removed: &mut Vec<String>,
) -> Vec<Product> {
    let budget = criteria.budget.unwrap_or_default();
    if budget.effective_min().is_none() && budget.effective_max().is_none() {
        return products;
    }
    // once either bound is active, every present bound applies, zero included
    let (min, max) = (budget.min, budget.max);

    products
        .into_iter()
        .filter(|p| {
            let price = p.price;
            // validation reports these
            if price.is_nan() || price <= 0.0 {
                return true;
            }

            if let Some(max) = max.filter(|max| price > *max) {
                removed.push(format!(
                    "{} ({}): €{} exceeds max budget €{}",
                    p.id, p.name, price, max
                ));
                return false;
            }
            if let Some(min) = min.filter(|min| price < *min) {
                removed.push(format!(
                    "{} ({}): €{} below min budget €{}",
                    p.id, p.name, price, min
                ));
                return false;
            }
            true
        })
        .collect()
}

fn by_validation(products: Vec<Product>, removed: &mut Vec<String>) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| {
            if p.id.is_empty() {
                removed.push("Product missing ID".to_string());
                return false;
            }
            if p.name.trim().is_empty() {
                removed.push(format!("{}: missing name", p.id));
                return false;
            }
            if p.category.is_empty() {
                removed.push(format!("{} ({}): missing category", p.id, p.name));
                return false;
            }

            if p.image_url.as_deref().map_or(true, str::is_empty) {
                warn!(id = %p.id, name = %p.name, "Product missing image URL");
            }
            if p.price.is_nan() || p.price <= 0.0 {
                warn!(id = %p.id, name = %p.name, "Product missing or invalid price");
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("w-1", "Wrap dress", "dresses", 59.0)
                .with_gender("female")
                .with_brand("Arket")
                .with_rating(4.5),
            Product::new("w-2", "Slip dress", "dresses", 189.0)
                .with_gender("female")
                .with_brand("COS"),
            Product::new("m-1", "Oxford shirt", "tops", 45.0)
                .with_gender("male")
                .with_brand("Uniqlo")
                .with_rating(4.1),
            Product::new("u-1", "Canvas tote", "accessories", 25.0)
                .with_gender("unisex")
                .with_type("bags"),
            Product::new("n-1", "Silk scarf", "accessories", 0.0).with_brand("arket"),
        ]
    }

    fn ids(report: &FilterReport) -> Vec<&str> {
        report.products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_no_criteria_keeps_valid_products() {
        let report = filter_products(catalog(), &FilterCriteria::new(), &[]);
        assert_eq!(report.stats.final_count, 5);
        assert_eq!(report.retention_rate(), 100.0);
    }

    #[test]
    fn test_gender_keeps_unisex_and_genderless() {
        let criteria = FilterCriteria::new().with_gender(Gender::Female);
        let report = filter_products(catalog(), &criteria, &[]);

        assert_eq!(ids(&report), vec!["w-1", "w-2", "u-1", "n-1"]);
        assert_eq!(report.stats.after_gender, 4);
        assert_eq!(
            report.removed.gender,
            vec!["m-1 (Oxford shirt): gender mismatch - wanted female, got male".to_string()]
        );
    }

    #[test]
    fn test_unisex_criteria_does_not_filter() {
        let criteria = FilterCriteria::new().with_gender(Gender::Unisex);
        let report = filter_products(catalog(), &criteria, &[]);
        assert_eq!(report.stats.after_gender, 5);
        assert!(report.removed.gender.is_empty());
    }

    #[test]
    fn test_budget_reasons_and_unpriced_products() {
        let criteria = FilterCriteria::new().with_budget(Some(30.0), Some(100.0));
        let report = filter_products(catalog(), &criteria, &[]);

        assert_eq!(ids(&report), vec!["w-1", "m-1", "n-1"]);
        assert_eq!(
            report.removed.budget,
            vec![
                "w-2 (Slip dress): €189 exceeds max budget €100".to_string(),
                "u-1 (Canvas tote): €25 below min budget €30".to_string(),
            ]
        );
    }

    #[test]
    fn test_zero_budget_is_ignored() {
        let criteria = FilterCriteria::new().with_budget(Some(0.0), Some(0.0));
        let report = filter_products(catalog(), &criteria, &[]);
        assert_eq!(report.stats.after_budget, 5);
    }

    #[test]
    fn test_zero_max_applies_alongside_active_min() {
        let criteria = FilterCriteria::new().with_budget(Some(10.0), Some(0.0));
        let report = filter_products(catalog(), &criteria, &[]);

        assert_eq!(ids(&report), vec!["n-1"]);
        assert_eq!(report.removed.budget.len(), 4);
        assert_eq!(
            report.removed.budget[0],
            "w-1 (Wrap dress): €59 exceeds max budget €0"
        );
    }

    #[test]
    fn test_validation_removes_incomplete_products() {
        let mut products = catalog();
        products.push(Product::new("", "Ghost", "tops", 10.0));
        products.push(Product::new("x-1", "   ", "tops", 10.0));
        products.push(Product::new("x-2", "Mystery", "", 10.0));

        let report = filter_products(products, &FilterCriteria::new(), &[]);
        assert_eq!(report.stats.after_validation, 5);
        assert_eq!(
            report.removed.validation,
            vec![
                "Product missing ID".to_string(),
                "x-1: missing name".to_string(),
                "x-2 (Mystery): missing category".to_string(),
            ]
        );
    }

    #[test]
    fn test_exclude_category_brand_rating() {
        let excluded = vec!["w-2".to_string()];

        let report = filter_products(catalog(), &FilterCriteria::new(), &excluded);
        assert!(!ids(&report).contains(&"w-2"));

        let criteria = FilterCriteria::new().with_categories(["bags"]);
        assert_eq!(ids(&filter_products(catalog(), &criteria, &[])), vec!["u-1"]);

        let criteria = FilterCriteria::new().with_brands(["ARKET"]);
        assert_eq!(ids(&filter_products(catalog(), &criteria, &[])), vec!["w-1", "n-1"]);

        let criteria = FilterCriteria::new().with_min_rating(4.2);
        assert_eq!(ids(&filter_products(catalog(), &criteria, &[])), vec!["w-1"]);
    }

    #[test]
    fn test_summary_truncates_reasons() {
        let products: Vec<Product> = (0..8)
            .map(|i| {
                Product::new(format!("m-{}", i), "Chino", "trousers", 60.0).with_gender("male")
            })
            .collect();
        let criteria = FilterCriteria::new().with_gender(Gender::Female);

        let report = filter_products(products, &criteria, &[]);
        let summary = report.summary();

        assert!(summary.starts_with("=== Product Filtering Stats ==="));
        assert!(summary.contains("After gender filter: 0 (8 removed)"));
        assert!(summary.contains("Retention rate: 0.0%"));
        assert!(summary.contains("\nRemoved by gender:"));
        assert_eq!(summary.matches("  - ").count(), 5);
        assert!(summary.ends_with("  ... and 3 more"));
        assert!(!summary.contains("Removed by budget"));
    }

    #[test]
    fn test_empty_input() {
        let report = filter_products(Vec::new(), &FilterCriteria::new(), &[]);
        assert_eq!(report.retention_rate(), 0.0);
        assert!(report.summary().contains("Initial products: 0"));
    }

    #[test]
    fn test_report_json_field_names() {
        let report = filter_products(catalog(), &FilterCriteria::new(), &[]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["afterGender"], 5);
        assert_eq!(json["stats"]["final"], 5);
    }
}

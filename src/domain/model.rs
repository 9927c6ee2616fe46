//! Catalog value objects
//!
//! `Product` is transported verbatim from the product store; the cache never
//! mutates it. `FilterCriteria` is immutable per request.

use serde::{Deserialize, Serialize};

/// Gender filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unisex => "unisex",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "unisex" => Ok(Gender::Unisex),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// Price bounds in euros
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Budget {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Lower bound when it constrains anything (set, non-zero, not NaN).
    pub fn effective_min(&self) -> Option<f64> {
        self.min.filter(|v| constrains(*v))
    }

    /// Upper bound when it constrains anything (set, non-zero, not NaN).
    pub fn effective_max(&self) -> Option<f64> {
        self.max.filter(|v| constrains(*v))
    }
}

/// Zero and NaN bounds are treated as absent, matching the cache key.
fn constrains(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Product listing filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_budget(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.budget = Some(Budget::new(min, max));
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brands = brands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    /// Gender restriction, if any. `Unisex` does not restrict.
    pub fn gender_restriction(&self) -> Option<Gender> {
        self.gender.filter(|g| *g != Gender::Unisex)
    }

    /// Rating restriction when set, non-zero and not NaN.
    pub fn effective_min_rating(&self) -> Option<f64> {
        self.min_rating.filter(|v| constrains(*v))
    }

    /// Origin store predicate: in stock plus every active field restriction.
    ///
    /// Products without a gender always pass the gender check; products
    /// without a rating never pass an active rating check.
    pub fn matches(&self, product: &Product) -> bool {
        if !product.in_stock {
            return false;
        }

        if let Some(gender) = self.gender_restriction() {
            match product.gender.as_deref() {
                None => {}
                Some(g) if g == gender.as_str() || g == Gender::Unisex.as_str() => {}
                Some(_) => return false,
            }
        }

        let budget = self.budget.unwrap_or_default();
        if let Some(max) = budget.effective_max() {
            if product.price > max {
                return false;
            }
        }
        if let Some(min) = budget.effective_min() {
            if product.price < min {
                return false;
            }
        }

        if !self.categories.is_empty() && !self.categories.contains(&product.category) {
            return false;
        }

        if !self.brands.is_empty() {
            match &product.brand {
                Some(brand) if self.brands.contains(brand) => {}
                _ => return false,
            }
        }

        if let Some(min_rating) = self.effective_min_rating() {
            match product.rating {
                Some(rating) if rating >= min_rating => {}
                _ => return false,
            }
        }

        true
    }
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub retailer: Option<String>,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
}

fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Minimal in-stock product; remaining fields are empty.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            brand: None,
            price,
            image_url: None,
            category: category.into(),
            product_type: None,
            gender: None,
            colors: Vec::new(),
            sizes: Vec::new(),
            tags: Vec::new(),
            retailer: None,
            affiliate_url: None,
            product_url: None,
            description: None,
            in_stock: true,
            rating: None,
            review_count: None,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = Some(product_type.into());
        self
    }

    pub fn out_of_stock(mut self) -> Self {
        self.in_stock = false;
        self
    }
}

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::UnknownCategory;

pub const DEFAULT_CATEGORY: &str = "음식점";

/// (label, upstream search type, price ceiling in won)
const BUILTIN: &[(&str, &str, u64)] = &[
    ("카페", "CAFE_COFFEE", 2500),
    ("프랜차이즈", "DINING_FASTFOOD", 6000),
    ("분식", "DINING_SNACK", 6000),
    ("한식", "DINING_KOREAN", 7000),
    ("중식", "DINING_CHINESE", 6000),
    ("일식", "DINING_JAPANESE", 10000),
    ("양식", "DINING_WESTERN", 10000),
    ("음식점", "DINING", 10000),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub type_code: String,
    pub price_ceiling: u64,
}

impl Category {
    pub fn new(label: &str, type_code: &str, price_ceiling: u64) -> Self {
        Self {
            label: label.to_string(),
            type_code: type_code.to_string(),
            price_ceiling,
        }
    }

    /// Prices at the ceiling are admitted.
    pub fn admits(&self, price: u64) -> bool {
        price <= self.price_ceiling
    }
}

/// Read-only category table. Loaded once, shared by every pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTable {
    #[serde(rename = "category")]
    categories: Vec<Category>,
}

impl CategoryTable {
    pub fn builtin() -> Self {
        Self {
            categories: BUILTIN
                .iter()
                .map(|(label, code, ceiling)| Category::new(label, code, *ceiling))
                .collect(),
        }
    }

    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Load a table from TOML:
    ///
    /// ```toml
    /// [[category]]
    /// label = "카페"
    /// type_code = "CAFE_COFFEE"
    /// price_ceiling = 2500
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category table: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse category table: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let table: CategoryTable = toml::from_str(content)?;
        if table.categories.is_empty() {
            bail!("category table is empty");
        }
        Ok(table)
    }

    pub fn get(&self, label: &str) -> Result<&Category, UnknownCategory> {
        self.categories
            .iter()
            .find(|c| c.label == label)
            .ok_or_else(|| UnknownCategory(label.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

use serde::Deserialize;

use crate::models::{ItemCondition, ItemType};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ItemSort {
    #[default]
    DateDesc,
    DateAsc,
    PriceAsc,
    PriceDesc,
    TitleAsc,
    RatingDesc,
}

/// Marketplace filters. Unset filters match everything.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub q: Option<String>,
    pub category: Option<String>,
    pub types: Option<Vec<ItemType>>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub conditions: Option<Vec<ItemCondition>>,
    pub sort_by: Option<ItemSort>,
}

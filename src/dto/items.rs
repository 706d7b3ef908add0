use serde::{Deserialize, Serialize};

use crate::models::{Item, ItemCondition, ItemType};

#[derive(Debug, Deserialize, Clone)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: String,
    pub price: i64,
    #[serde(default)]
    pub is_negotiable: bool,
    pub category: Vec<String>,
    pub item_type: ItemType,
    pub image_url: String,
    pub condition: ItemCondition,
}

#[derive(Serialize, Debug)]
#[serde(transparent)]
pub struct ItemList {
    pub items: Vec<Item>,
}

use serde::Serialize;

use crate::models::Item;

#[derive(Debug, Serialize)]
pub struct CartSummary {
    /// Cart entries in insertion order; an item added twice appears twice.
    pub items: Vec<Item>,
    pub subtotal: i64,
}

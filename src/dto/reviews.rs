use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct AddReviewRequest {
    pub reviewee_id: Uuid,
    pub item_id: Uuid,
    pub rating: u8,
    pub comment: String,
}

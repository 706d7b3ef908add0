use serde::Deserialize;
use uuid::Uuid;

use crate::models::NotificationType;

#[derive(Debug, Deserialize, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationType,
    pub message: String,
    pub related_item_id: Option<Uuid>,
    pub related_user_id: Option<Uuid>,
}

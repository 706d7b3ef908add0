use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currency every price and transaction amount is denominated in.
pub const BASE_CURRENCY: Currency = Currency::Inr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub school_level: String,
    pub grade: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub twitter_url: String,
    #[serde(default)]
    pub linkedin_url: String,
    #[serde(default)]
    pub github_url: String,
    pub reviews_received: Vec<Review>,
    pub saved_item_ids: Vec<Uuid>,
    pub purchased_item_ids: Vec<Uuid>,
    pub notification_settings: NotificationSettings,
    pub payment_methods: Vec<PaymentMethod>,
    pub transaction_history: Vec<Transaction>,
    pub plan: Plan,
    pub martcoin_balance: u64,
    pub cart: Vec<Uuid>,
}

impl User {
    pub fn has_saved(&self, item_id: Uuid) -> bool {
        self.saved_item_ids.contains(&item_id)
    }

    pub fn has_purchased(&self, item_id: Uuid) -> bool {
        self.purchased_item_ids.contains(&item_id)
    }

    pub fn default_payment_method(&self) -> Option<&PaymentMethod> {
        self.payment_methods.iter().find(|pm| pm.is_default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Premier,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Pro => "Pro",
            Plan::Premier => "Premier",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub in_app: InAppSettings,
    pub email: EmailSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InAppSettings {
    pub new_messages: bool,
    pub item_sold: bool,
    pub new_reviews: bool,
    pub price_drops: bool,
    pub item_saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    pub new_messages: bool,
    pub item_sold: bool,
    pub new_reviews: bool,
    pub price_drops: bool,
    pub item_saved: bool,
    pub weekly_digest: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            in_app: InAppSettings {
                new_messages: true,
                item_sold: true,
                new_reviews: true,
                price_drops: true,
                item_saved: true,
            },
            email: EmailSettings {
                new_messages: true,
                item_sold: true,
                new_reviews: false,
                price_drops: false,
                item_saved: false,
                weekly_digest: true,
            },
        }
    }
}

impl NotificationSettings {
    /// Whether an in-app notification of this type should be delivered.
    pub fn wants_in_app(&self, kind: NotificationType) -> bool {
        match kind {
            NotificationType::NewMessage => self.in_app.new_messages,
            NotificationType::ItemSold => self.in_app.item_sold,
            NotificationType::NewReview => self.in_app.new_reviews,
            NotificationType::PriceDrop => self.in_app.price_drops,
            NotificationType::ItemSaved => self.in_app.item_saved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub is_negotiable: bool,
    pub category: Vec<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub image_url: String,
    pub condition: ItemCondition,
    pub seller_id: Uuid,
    pub seller: String,
    pub posted_date: DateTime<Utc>,
    pub status: ItemStatus,
}

impl Item {
    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "For Sale")]
    Sale,
    #[serde(rename = "For Rent")]
    Rent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemCondition {
    New,
    #[serde(rename = "Used - Like New")]
    UsedLikeNew,
    #[serde(rename = "Used - Good")]
    UsedGood,
    #[serde(rename = "Used - Fair")]
    UsedFair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Available,
    Sold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_item_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_user_id: Option<Uuid>,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewMessage,
    ItemSold,
    NewReview,
    PriceDrop,
    ItemSaved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Uuid,
    #[serde(flatten)]
    pub details: PaymentDetails,
    pub is_default: bool,
}

/// Brand-specific payment data, tagged by `brand` in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "brand", rename_all = "kebab-case")]
pub enum PaymentDetails {
    Visa(Card),
    Mastercard(Card),
    GooglePay { email: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub last4: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
}

impl PaymentDetails {
    pub fn brand(&self) -> &'static str {
        match self {
            PaymentDetails::Visa(_) => "visa",
            PaymentDetails::Mastercard(_) => "mastercard",
            PaymentDetails::GooglePay { .. } => "google-pay",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub item_title: String,
    pub amount: i64,
    pub currency: Currency,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental_duration_hours: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Purchase,
    Rental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub item_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_profile_picture_url: Option<String>,
    pub posted_date: DateTime<Utc>,
}

/// Average star rating over the reviews a user has received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateRating {
    pub avg: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    Amoled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountTab {
    Profile,
    Password,
    Listings,
    Reviews,
    Wishlist,
    Settings,
    Notifications,
    Payments,
}

/// Where the user should land once a login-gated action can proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "page", content = "tab")]
pub enum Destination {
    Marketplace,
    Account(AccountTab),
    Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSelection {
    pub name: Plan,
    pub price: i64,
}

/// What a checkout is paying for. Transient; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseContext {
    Item(Item),
    Cart(Vec<Item>),
    Plan(PlanSelection),
}

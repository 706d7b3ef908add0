#![allow(dead_code)]

use campusmart_core::{
    db::connect,
    dto::{auth::RegisterRequest, items::CreateItemRequest, payments::AddPaymentMethodRequest},
    models::{Card, Item, ItemCondition, ItemType, PaymentDetails, PaymentMethod, User},
    services::{catalog_service, payment_service, session_service},
    state::AppState,
    store::Store,
};

pub const PASSWORD: &str = "correct-horse";

pub async fn setup_state() -> anyhow::Result<AppState> {
    connect("sqlite::memory:", 1).await
}

pub async fn setup_store() -> anyhow::Result<(AppState, Store)> {
    let state = setup_state().await?;
    let store = Store::load(state.clone()).await?;
    Ok((state, store))
}

/// Register a member and leave them signed in.
pub async fn register_member(store: &mut Store, name: &str, email: &str) -> anyhow::Result<User> {
    let outcome = session_service::register(
        store,
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: PASSWORD.into(),
            school_level: "College".into(),
            grade: "Sophomore".into(),
        },
    )
    .await?;
    Ok(outcome.data.user)
}

/// List an item as the signed-in member.
pub async fn list_item(
    store: &mut Store,
    title: &str,
    price: i64,
    item_type: ItemType,
) -> anyhow::Result<Item> {
    let outcome = catalog_service::add_item(
        store,
        CreateItemRequest {
            title: title.into(),
            description: format!("{title} in great shape"),
            price,
            is_negotiable: false,
            category: vec!["Code Scripts".into()],
            item_type,
            image_url: "https://example.com/item.png".into(),
            condition: ItemCondition::UsedGood,
        },
    )
    .await?;
    Ok(outcome.data)
}

pub fn visa(last4: &str, is_default: bool) -> AddPaymentMethodRequest {
    AddPaymentMethodRequest {
        details: PaymentDetails::Visa(Card {
            last4: last4.into(),
            expiry_month: 12,
            expiry_year: 2030,
        }),
        is_default,
    }
}

pub async fn add_card(store: &mut Store) -> anyhow::Result<PaymentMethod> {
    Ok(payment_service::add_payment_method(store, visa("4242", true))
        .await?
        .data)
}

pub async fn sign_in(store: &mut Store, email: &str) -> anyhow::Result<()> {
    session_service::login(
        store,
        campusmart_core::dto::auth::LoginRequest {
            email: email.into(),
            password: PASSWORD.into(),
            remember_me: false,
        },
    )
    .await?;
    Ok(())
}

pub fn current(store: &Store) -> User {
    store.current_user().cloned().expect("signed in")
}

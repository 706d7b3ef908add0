use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::require_session,
    dto::payments::AddPaymentMethodRequest,
    error::{AppError, AppResult},
    models::{PaymentDetails, PaymentMethod},
    response::Outcome,
    store::{Changeset, Store},
};

/// Add a payment method. The first method a user adds is always the default.
pub async fn add_payment_method(
    store: &mut Store,
    payload: AddPaymentMethodRequest,
) -> AppResult<Outcome<PaymentMethod>> {
    let mut user = require_session(store)?;
    validate_details(&payload.details)?;

    if payload.is_default {
        for method in &mut user.payment_methods {
            method.is_default = false;
        }
    }
    let method = PaymentMethod {
        id: Uuid::new_v4(),
        details: payload.details,
        is_default: user.payment_methods.is_empty() || payload.is_default,
    };
    user.payment_methods.push(method.clone());

    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(
        Some(user.id),
        "payment_method_add",
        Some("users"),
        Some(serde_json::json!({ "payment_method_id": method.id, "brand": method.details.brand() })),
    );
    Ok(Outcome::success(
        "Payment method added successfully!",
        method,
        None,
    ))
}

/// Remove a payment method, promoting the first remaining one if the default went.
pub async fn delete_payment_method(
    store: &mut Store,
    payment_method_id: Uuid,
) -> AppResult<Outcome<Vec<PaymentMethod>>> {
    let mut user = require_session(store)?;
    if !user.payment_methods.iter().any(|pm| pm.id == payment_method_id) {
        return Err(AppError::NotFound("Payment method"));
    }

    user.payment_methods.retain(|pm| pm.id != payment_method_id);
    if !user.payment_methods.iter().any(|pm| pm.is_default) {
        if let Some(first) = user.payment_methods.first_mut() {
            first.is_default = true;
        }
    }

    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(
        Some(user.id),
        "payment_method_delete",
        Some("users"),
        Some(serde_json::json!({ "payment_method_id": payment_method_id })),
    );
    Ok(Outcome::success(
        "Payment method removed.",
        user.payment_methods,
        None,
    ))
}

pub async fn set_default_payment_method(
    store: &mut Store,
    payment_method_id: Uuid,
) -> AppResult<Outcome<Vec<PaymentMethod>>> {
    let mut user = require_session(store)?;
    if !user.payment_methods.iter().any(|pm| pm.id == payment_method_id) {
        return Err(AppError::NotFound("Payment method"));
    }

    for method in &mut user.payment_methods {
        method.is_default = method.id == payment_method_id;
    }

    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(
        Some(user.id),
        "payment_method_default",
        Some("users"),
        Some(serde_json::json!({ "payment_method_id": payment_method_id })),
    );
    Ok(Outcome::success(
        "Default payment method updated.",
        user.payment_methods,
        None,
    ))
}

fn validate_details(details: &PaymentDetails) -> AppResult<()> {
    match details {
        PaymentDetails::Visa(card) | PaymentDetails::Mastercard(card) => {
            if card.last4.len() != 4 || !card.last4.chars().all(|c| c.is_ascii_digit()) {
                return Err(AppError::validation("Card must end in four digits."));
            }
            if !(1..=12).contains(&card.expiry_month) {
                return Err(AppError::validation("Enter a valid expiry month."));
            }
        }
        PaymentDetails::GooglePay { email } => {
            if !email.contains('@') {
                return Err(AppError::validation("Enter a valid Google Pay email."));
            }
        }
    }
    Ok(())
}

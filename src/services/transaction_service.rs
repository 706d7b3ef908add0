//! Purchase settlement, rentals and Martcoin accrual.
//!
//! Settlement is computed by pure `settle_*` functions over the current
//! snapshot; [`confirm_purchase`] then commits the buyer, the sold items and
//! any seller notifications as one changeset.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::{require_member, require_session},
    error::{AppError, AppResult},
    models::{
        BASE_CURRENCY, Destination, Item, ItemStatus, ItemType, Notification, NotificationType,
        PaymentMethod, Plan, PlanSelection, PurchaseContext, Transaction, TransactionStatus,
        TransactionType, User,
    },
    response::Outcome,
    services::notification_service::compose,
    store::{Changeset, Snapshot, Store},
};

/// One Martcoin per this many units of currency spent.
const MARTCOIN_RATE: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub transaction: Transaction,
    pub martcoins_earned: u64,
}

struct Settlement {
    buyer: User,
    items: Option<Vec<Item>>,
    notifications: Vec<Notification>,
    receipt: Receipt,
    message: String,
}

/// Stash a purchase for the payment step. Anonymous callers are sent to log in first.
pub fn begin_purchase(store: &mut Store, context: PurchaseContext) -> AppResult<Destination> {
    if matches!(&context, PurchaseContext::Cart(items) if items.is_empty()) {
        return Err(AppError::validation("Your cart is empty."));
    }
    store.pending_mut().purchase = Some(context);

    if store.current_user().is_none() {
        store.pending_mut().redirect = Some(Destination::Payment);
        return Err(AppError::LoginRequired {
            message: "Please log in to continue to checkout.".to_string(),
            resume: Destination::Payment,
        });
    }
    Ok(Destination::Payment)
}

pub fn select_plan(store: &mut Store, name: Plan, price: i64) -> AppResult<Destination> {
    begin_purchase(store, PurchaseContext::Plan(PlanSelection { name, price }))
}

pub fn pending_purchase(store: &Store) -> Option<&PurchaseContext> {
    store.pending().purchase.as_ref()
}

pub fn cancel_purchase(store: &mut Store) -> Option<PurchaseContext> {
    store.pending_mut().purchase.take()
}

/// Settle a purchase paid with one of the buyer's payment methods.
pub async fn confirm_purchase(
    store: &mut Store,
    context: Option<PurchaseContext>,
    payment_method: &PaymentMethod,
) -> AppResult<Outcome<Receipt>> {
    let (buyer, context) = match (store.current_user().cloned(), context) {
        (Some(buyer), Some(context)) if !is_empty(&context) => (buyer, context),
        _ => {
            store.pending_mut().purchase = None;
            tracing::warn!("purchase confirmed without a session or context");
            return Err(AppError::SessionExpired);
        }
    };
    if !buyer.payment_methods.iter().any(|pm| pm.id == payment_method.id) {
        return Err(AppError::validation("Please select a valid payment method."));
    }

    let now = Utc::now();
    let settlement = match &context {
        PurchaseContext::Cart(items) => settle_cart(store.snapshot(), buyer, items, now)?,
        PurchaseContext::Plan(plan) => settle_plan(buyer, plan, now)?,
        PurchaseContext::Item(item) => settle_item(store.snapshot(), buyer, item, now)?,
    };

    let Settlement {
        buyer,
        items,
        notifications,
        receipt,
        message,
    } = settlement;

    let mut changes = Changeset::new().users(store.snapshot().users_with(&buyer));
    if let Some(items) = items {
        changes = changes.items(items);
    }
    if !notifications.is_empty() {
        let mut all = store.notifications().to_vec();
        all.extend(notifications);
        changes = changes.notifications(all);
    }
    store.commit(changes).await?;
    store.pending_mut().purchase = None;

    tracing::info!(
        user_id = %buyer.id,
        amount = receipt.transaction.amount,
        martcoins = receipt.martcoins_earned,
        brand = payment_method.details.brand(),
        "purchase settled"
    );
    log_audit(
        Some(buyer.id),
        "purchase",
        Some("transactions"),
        Some(serde_json::json!({
            "transaction_id": receipt.transaction.id,
            "amount": receipt.transaction.amount,
            "payment_method_id": payment_method.id,
        })),
    );
    Ok(Outcome::success(message, receipt, None))
}

/// Record a rental. Rentals leave the item's status untouched and earn no Martcoins.
pub async fn confirm_rental(
    store: &mut Store,
    item_id: Uuid,
    duration_hours: u32,
) -> AppResult<Outcome<Transaction>> {
    let mut renter = require_member(
        store,
        "Please log in or create an account to rent items.",
        Destination::Marketplace,
    )?;
    if duration_hours == 0 {
        return Err(AppError::validation("Rental duration must be at least 1 hour."));
    }
    let item = store
        .snapshot()
        .item(item_id)
        .cloned()
        .ok_or(AppError::NotFound("Item"))?;
    if item.item_type != ItemType::Rent {
        return Err(AppError::validation("Only items listed for rent can be rented."));
    }

    let amount = item
        .price
        .checked_mul(i64::from(duration_hours))
        .ok_or_else(total_too_large)?;

    let transaction = Transaction {
        id: Uuid::new_v4(),
        date: Utc::now(),
        item_title: item.title.clone(),
        amount,
        currency: BASE_CURRENCY,
        status: TransactionStatus::Completed,
        transaction_type: TransactionType::Rental,
        rental_duration_hours: Some(duration_hours),
    };
    renter.transaction_history.insert(0, transaction.clone());

    let users = store.snapshot().users_with(&renter);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(
        Some(renter.id),
        "rental",
        Some("transactions"),
        Some(serde_json::json!({ "transaction_id": transaction.id, "item_id": item.id })),
    );
    let message = format!(
        "Successfully rented \"{}\" for {} hour(s)!",
        item.title, duration_hours
    );
    Ok(Outcome::success(message, transaction, None))
}

/// Current user's transactions, newest first.
pub fn transaction_history(store: &Store) -> AppResult<Vec<Transaction>> {
    Ok(require_session(store)?.transaction_history)
}

pub fn martcoins_for(amount: i64) -> u64 {
    u64::try_from(amount.max(0) / MARTCOIN_RATE).unwrap_or(0)
}

/// Sum of `prices`, rejecting totals that do not fit an amount.
pub(crate) fn checked_total(prices: impl IntoIterator<Item = i64>) -> AppResult<i64> {
    prices.into_iter().try_fold(0_i64, |total, price| {
        total.checked_add(price).ok_or_else(total_too_large)
    })
}

fn total_too_large() -> AppError {
    AppError::validation("Total is too large.")
}

fn credit_martcoins(buyer: &mut User, earned: u64) -> AppResult<()> {
    buyer.martcoin_balance = buyer
        .martcoin_balance
        .checked_add(earned)
        .ok_or_else(total_too_large)?;
    Ok(())
}

fn is_empty(context: &PurchaseContext) -> bool {
    matches!(context, PurchaseContext::Cart(items) if items.is_empty())
}

fn settle_cart(
    snapshot: &Snapshot,
    mut buyer: User,
    cart: &[Item],
    now: DateTime<Utc>,
) -> AppResult<Settlement> {
    let mut charged: Vec<&Item> = Vec::with_capacity(cart.len());
    let mut sold: Vec<&Item> = Vec::new();
    let mut seen = HashSet::new();
    for entry in cart {
        let item = snapshot.item(entry.id).ok_or(AppError::SessionExpired)?;
        if !item.is_available() {
            return Err(AppError::Unavailable(item.title.clone()));
        }
        charged.push(item);
        if seen.insert(item.id) {
            sold.push(item);
        }
    }
    let total = checked_total(charged.iter().map(|item| item.price))?;

    for item in &sold {
        if !buyer.purchased_item_ids.contains(&item.id) {
            buyer.purchased_item_ids.push(item.id);
        }
    }
    buyer.cart.clear();
    let martcoins_earned = martcoins_for(total);
    credit_martcoins(&mut buyer, martcoins_earned)?;

    let transaction = purchase_transaction(format!("{} items purchased", cart.len()), total, now);
    buyer.transaction_history.insert(0, transaction.clone());

    let notifications = sold
        .iter()
        .filter_map(|item| sale_notice(snapshot, &buyer, item, now))
        .collect();
    let items = mark_sold(snapshot, &seen);

    let mut message = format!("Successfully purchased {} items!", cart.len());
    if martcoins_earned > 0 {
        message.push_str(&format!(" You earned {martcoins_earned} Martcoins."));
    }

    Ok(Settlement {
        buyer,
        items: Some(items),
        notifications,
        receipt: Receipt {
            transaction,
            martcoins_earned,
        },
        message,
    })
}

fn settle_item(
    snapshot: &Snapshot,
    mut buyer: User,
    requested: &Item,
    now: DateTime<Utc>,
) -> AppResult<Settlement> {
    let item = snapshot.item(requested.id).ok_or(AppError::SessionExpired)?;
    if !item.is_available() {
        return Err(AppError::Unavailable(item.title.clone()));
    }

    // Repeat purchases of a re-listed item are recorded again.
    buyer.purchased_item_ids.push(item.id);
    let martcoins_earned = martcoins_for(item.price);
    credit_martcoins(&mut buyer, martcoins_earned)?;

    let transaction = purchase_transaction(item.title.clone(), item.price, now);
    buyer.transaction_history.insert(0, transaction.clone());

    let notifications = sale_notice(snapshot, &buyer, item, now).into_iter().collect();
    let items = mark_sold(snapshot, &HashSet::from([item.id]));

    let message = if martcoins_earned > 0 {
        format!("Purchase successful! You earned {martcoins_earned} Martcoins.")
    } else {
        "Purchase successful! The seller will be notified.".to_string()
    };

    Ok(Settlement {
        buyer,
        items: Some(items),
        notifications,
        receipt: Receipt {
            transaction,
            martcoins_earned,
        },
        message,
    })
}

fn settle_plan(mut buyer: User, plan: &PlanSelection, now: DateTime<Utc>) -> AppResult<Settlement> {
    if plan.price < 0 {
        return Err(AppError::validation("Plan price cannot be negative."));
    }

    buyer.plan = plan.name;
    let transaction = purchase_transaction(
        format!("{} Plan Subscription", plan.name.as_str()),
        plan.price,
        now,
    );
    buyer.transaction_history.insert(0, transaction.clone());

    Ok(Settlement {
        buyer,
        items: None,
        notifications: Vec::new(),
        receipt: Receipt {
            transaction,
            martcoins_earned: 0,
        },
        message: format!("Successfully subscribed to the {} plan!", plan.name.as_str()),
    })
}

fn purchase_transaction(item_title: String, amount: i64, now: DateTime<Utc>) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        date: now,
        item_title,
        amount,
        currency: BASE_CURRENCY,
        status: TransactionStatus::Completed,
        transaction_type: TransactionType::Purchase,
        rental_duration_hours: None,
    }
}

fn mark_sold(snapshot: &Snapshot, ids: &HashSet<Uuid>) -> Vec<Item> {
    snapshot
        .items
        .iter()
        .map(|item| {
            if ids.contains(&item.id) {
                Item {
                    status: ItemStatus::Sold,
                    ..item.clone()
                }
            } else {
                item.clone()
            }
        })
        .collect()
}

fn sale_notice(
    snapshot: &Snapshot,
    buyer: &User,
    item: &Item,
    now: DateTime<Utc>,
) -> Option<Notification> {
    if item.seller_id == buyer.id {
        return None;
    }
    let seller = snapshot.user(item.seller_id)?;
    compose(
        seller,
        NotificationType::ItemSold,
        format!("{} purchased your item \"{}\".", buyer.name, item.title),
        Some(item.id),
        Some(buyer.id),
        now,
    )
}

use std::{cmp::Ordering, collections::HashMap};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::require_member,
    dto::{
        cart::CartSummary,
        catalog::{CatalogQuery, ItemSort},
        items::{CreateItemRequest, ItemList},
    },
    error::{AppError, AppResult},
    models::{Destination, Item, ItemStatus, NotificationType},
    response::{Meta, Outcome},
    services::{
        notification_service::compose, review_service::compute_aggregate_rating,
        transaction_service::checked_total,
    },
    store::{Changeset, Store},
};

pub async fn add_item(store: &mut Store, payload: CreateItemRequest) -> AppResult<Outcome<Item>> {
    let seller = require_member(
        store,
        "Please log in or create an account to list an item.",
        Destination::Marketplace,
    )?;

    let CreateItemRequest {
        title,
        description,
        price,
        is_negotiable,
        category,
        item_type,
        image_url,
        condition,
    } = payload;
    if title.trim().is_empty() || description.trim().is_empty() || image_url.trim().is_empty() {
        return Err(AppError::validation("Please fill out all fields."));
    }
    let category = normalize_categories(category)?;
    validate_price(price)?;

    let item = Item {
        id: Uuid::new_v4(),
        title,
        description,
        price,
        is_negotiable,
        category,
        item_type,
        image_url,
        condition,
        seller_id: seller.id,
        seller: seller.name.clone(),
        posted_date: Utc::now(),
        status: ItemStatus::Available,
    };

    let mut items = Vec::with_capacity(store.items().len() + 1);
    items.push(item.clone());
    items.extend_from_slice(store.items());
    store.commit(Changeset::new().items(items)).await?;

    log_audit(
        Some(seller.id),
        "item_create",
        Some("items"),
        Some(serde_json::json!({ "item_id": item.id })),
    );
    Ok(Outcome::success("Item listed successfully!", item, None))
}

/// Replace a listing wholesale. Users who saved the item hear about price drops.
pub async fn update_item(store: &mut Store, mut item: Item) -> AppResult<Outcome<Item>> {
    let previous = store
        .snapshot()
        .item(item.id)
        .cloned()
        .ok_or(AppError::NotFound("Item"))?;
    validate_price(item.price)?;
    item.category = normalize_categories(std::mem::take(&mut item.category))?;

    let items: Vec<Item> = store
        .items()
        .iter()
        .map(|i| if i.id == item.id { item.clone() } else { i.clone() })
        .collect();

    let mut changes = Changeset::new().items(items);
    if item.price < previous.price {
        let now = Utc::now();
        let message = format!("\"{}\" dropped in price to {}.", item.title, item.price);
        let drops: Vec<_> = store
            .users()
            .iter()
            .filter(|u| u.id != item.seller_id && u.has_saved(item.id))
            .filter_map(|u| {
                compose(
                    u,
                    NotificationType::PriceDrop,
                    message.clone(),
                    Some(item.id),
                    Some(item.seller_id),
                    now,
                )
            })
            .collect();
        if !drops.is_empty() {
            let mut notifications = store.notifications().to_vec();
            notifications.extend(drops);
            changes = changes.notifications(notifications);
        }
    }
    store.commit(changes).await?;

    log_audit(
        store.session().current_user_id,
        "item_update",
        Some("items"),
        Some(serde_json::json!({ "item_id": item.id })),
    );
    Ok(Outcome::success("Item updated successfully!", item, None))
}

/// Remove a listing and every saved/cart reference to it.
pub async fn delete_item(store: &mut Store, item_id: Uuid) -> AppResult<Outcome<()>> {
    if store.snapshot().item(item_id).is_none() {
        return Err(AppError::NotFound("Item"));
    }

    let items = store
        .items()
        .iter()
        .filter(|i| i.id != item_id)
        .cloned()
        .collect();
    let users = store
        .users()
        .iter()
        .cloned()
        .map(|mut user| {
            user.saved_item_ids.retain(|id| *id != item_id);
            user.cart.retain(|id| *id != item_id);
            user
        })
        .collect();
    store
        .commit(Changeset::new().items(items).users(users))
        .await?;

    log_audit(
        store.session().current_user_id,
        "item_delete",
        Some("items"),
        Some(serde_json::json!({ "item_id": item_id })),
    );
    Ok(Outcome::success("Item deleted successfully!", (), None))
}

/// Add or remove an item from the wishlist. Returns whether it is now saved.
pub async fn toggle_save(store: &mut Store, item_id: Uuid) -> AppResult<Outcome<bool>> {
    let mut user = require_member(
        store,
        "Please log in or create an account to save items.",
        Destination::Marketplace,
    )?;
    let item = store
        .snapshot()
        .item(item_id)
        .cloned()
        .ok_or(AppError::NotFound("Item"))?;

    let was_saved = user.has_saved(item_id);
    if was_saved {
        user.saved_item_ids.retain(|id| *id != item_id);
    } else {
        user.saved_item_ids.push(item_id);
    }

    let mut changes = Changeset::new().users(store.snapshot().users_with(&user));
    if !was_saved && item.seller_id != user.id {
        let notice = store.snapshot().user(item.seller_id).and_then(|seller| {
            compose(
                seller,
                NotificationType::ItemSaved,
                format!("{} saved your item \"{}\".", user.name, item.title),
                Some(item.id),
                Some(user.id),
                Utc::now(),
            )
        });
        if let Some(notice) = notice {
            let mut notifications = store.notifications().to_vec();
            notifications.push(notice);
            changes = changes.notifications(notifications);
        }
    }
    store.commit(changes).await?;

    log_audit(
        Some(user.id),
        if was_saved { "wishlist_remove" } else { "wishlist_add" },
        Some("users"),
        Some(serde_json::json!({ "item_id": item_id })),
    );
    let message = if was_saved {
        "Item removed from wishlist!"
    } else {
        "Item added to wishlist!"
    };
    Ok(Outcome::success(message, !was_saved, None))
}

pub async fn add_to_cart(store: &mut Store, item_id: Uuid) -> AppResult<Outcome<Vec<Uuid>>> {
    let mut user = require_member(
        store,
        "Please log in to add items to your cart.",
        Destination::Marketplace,
    )?;
    if store.snapshot().item(item_id).is_none() {
        return Err(AppError::NotFound("Item"));
    }

    user.cart.push(item_id);
    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(
        Some(user.id),
        "cart_add",
        Some("users"),
        Some(serde_json::json!({ "item_id": item_id })),
    );
    Ok(Outcome::success("Item added to cart!", user.cart, None))
}

/// Drop every cart entry for `item_id`.
pub async fn remove_from_cart(store: &mut Store, item_id: Uuid) -> AppResult<Outcome<Vec<Uuid>>> {
    let mut user = require_member(
        store,
        "Please log in to manage your cart.",
        Destination::Marketplace,
    )?;

    user.cart.retain(|id| *id != item_id);
    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(
        Some(user.id),
        "cart_remove",
        Some("users"),
        Some(serde_json::json!({ "item_id": item_id })),
    );
    Ok(Outcome::success("Item removed from cart.", user.cart, None))
}

/// Filter, sort and page the marketplace. Sold items always sort last.
pub fn list_items(store: &Store, query: &CatalogQuery) -> Outcome<ItemList> {
    let (page, limit, offset) = query.pagination.normalize();
    let search = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase);

    let mut matches: Vec<&Item> = store
        .items()
        .iter()
        .filter(|item| {
            search.as_deref().is_none_or(|q| {
                item.title.to_lowercase().contains(q) || item.description.to_lowercase().contains(q)
            })
        })
        .filter(|item| {
            category.as_deref().is_none_or(|c| {
                item.category.iter().any(|cat| cat.to_lowercase().contains(c))
            })
        })
        .filter(|item| {
            query
                .types
                .as_ref()
                .is_none_or(|types| types.contains(&item.item_type))
        })
        .filter(|item| query.min_price.is_none_or(|min| item.price >= min))
        .filter(|item| query.max_price.is_none_or(|max| item.price <= max))
        .filter(|item| {
            query
                .conditions
                .as_ref()
                .is_none_or(|conditions| conditions.contains(&item.condition))
        })
        .collect();

    let sort = query.sort_by.unwrap_or_default();
    let ratings: HashMap<_, _> = store
        .users()
        .iter()
        .map(|u| (u.id, compute_aggregate_rating(u).avg))
        .collect();
    let rating_of = |item: &Item| ratings.get(&item.seller_id).copied().unwrap_or(0.0);

    matches.sort_by(|a, b| {
        let sold_last = a.is_available().cmp(&b.is_available()).reverse();
        if sold_last != Ordering::Equal {
            return sold_last;
        }
        match sort {
            ItemSort::DateDesc => b.posted_date.cmp(&a.posted_date),
            ItemSort::DateAsc => a.posted_date.cmp(&b.posted_date),
            ItemSort::PriceAsc => a.price.cmp(&b.price),
            ItemSort::PriceDesc => b.price.cmp(&a.price),
            ItemSort::TitleAsc => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            ItemSort::RatingDesc => rating_of(b).total_cmp(&rating_of(a)),
        }
    });

    let total = matches.len() as i64;
    let items = matches
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Outcome::success("Items", ItemList { items }, Some(Meta::new(page, limit, total)))
}

/// The signed-in user's wishlist, skipping ids that no longer resolve.
pub fn saved_items(store: &Store) -> Vec<Item> {
    let Some(user) = store.current_user() else {
        return Vec::new();
    };
    user.saved_item_ids
        .iter()
        .filter_map(|id| store.snapshot().item(*id).cloned())
        .collect()
}

pub fn cart_summary(store: &Store) -> AppResult<CartSummary> {
    let items: Vec<Item> = store
        .current_user()
        .map(|user| {
            user.cart
                .iter()
                .filter_map(|id| store.snapshot().item(*id).cloned())
                .collect()
        })
        .unwrap_or_default();
    let subtotal = checked_total(items.iter().map(|i| i.price))?;
    Ok(CartSummary { items, subtotal })
}

pub fn listings_by(store: &Store, seller_id: Uuid) -> Vec<Item> {
    store
        .items()
        .iter()
        .filter(|i| i.seller_id == seller_id)
        .cloned()
        .collect()
}

/// Trim category names and drop blank ones; at least one must remain.
fn normalize_categories(category: Vec<String>) -> AppResult<Vec<String>> {
    let category: Vec<String> = category
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if category.is_empty() {
        return Err(AppError::validation("Please select at least one category."));
    }
    Ok(category)
}

fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::validation("Price cannot be negative."));
    }
    Ok(())
}

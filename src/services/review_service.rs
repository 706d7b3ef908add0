use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::require_member,
    dto::reviews::AddReviewRequest,
    error::{AppError, AppResult},
    models::{AggregateRating, Destination, NotificationType, Review, User},
    response::Outcome,
    services::notification_service::compose,
    store::{Changeset, Store},
};

/// Mean rating and review count. Never stored; recompute on demand.
pub fn compute_aggregate_rating(user: &User) -> AggregateRating {
    let count = user.reviews_received.len();
    if count == 0 {
        return AggregateRating { avg: 0.0, count: 0 };
    }
    let total: u32 = user.reviews_received.iter().map(|r| u32::from(r.rating)).sum();
    AggregateRating {
        avg: f64::from(total) / count as f64,
        count,
    }
}

/// Whether the signed-in member bought `item_id` and may review it.
pub fn can_review(store: &Store, item_id: Uuid) -> bool {
    !store.is_guest()
        && store
            .current_user()
            .is_some_and(|user| user.has_purchased(item_id))
}

/// Append a review to the reviewee. Purchase eligibility is the caller's job;
/// see [`submit_review`].
pub async fn add_review(store: &mut Store, payload: AddReviewRequest) -> AppResult<Outcome<Review>> {
    let reviewer = require_member(
        store,
        "Please log in or create an account to leave a review.",
        Destination::Marketplace,
    )?;

    let AddReviewRequest {
        reviewee_id,
        item_id,
        rating,
        comment,
    } = payload;
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation("Please select a star rating."));
    }
    if comment.trim().is_empty() {
        return Err(AppError::validation("Please leave a comment."));
    }
    let mut reviewee = store
        .snapshot()
        .user(reviewee_id)
        .cloned()
        .ok_or(AppError::NotFound("User"))?;

    let now = Utc::now();
    let review = Review {
        id: Uuid::new_v4(),
        item_id,
        rating,
        comment,
        reviewer_id: reviewer.id,
        reviewer_name: reviewer.name.clone(),
        reviewer_profile_picture_url: reviewer.profile_picture_url.clone(),
        posted_date: now,
    };
    reviewee.reviews_received.insert(0, review.clone());

    let mut changes = Changeset::new().users(store.snapshot().users_with(&reviewee));
    if reviewee.id != reviewer.id {
        let notice = compose(
            &reviewee,
            NotificationType::NewReview,
            format!("{} left you a {}-star review.", reviewer.name, rating),
            Some(item_id),
            Some(reviewer.id),
            now,
        );
        if let Some(notice) = notice {
            let mut notifications = store.notifications().to_vec();
            notifications.push(notice);
            changes = changes.notifications(notifications);
        }
    }
    store.commit(changes).await?;

    log_audit(
        Some(reviewer.id),
        "review_create",
        Some("users"),
        Some(serde_json::json!({ "review_id": review.id, "reviewee_id": reviewee.id })),
    );
    Ok(Outcome::success("Review submitted successfully!", review, None))
}

/// Review a purchased item; the reviewee is the item's seller.
pub async fn submit_review(
    store: &mut Store,
    item_id: Uuid,
    rating: u8,
    comment: String,
) -> AppResult<Outcome<Review>> {
    require_member(
        store,
        "Please log in or create an account to leave a review.",
        Destination::Marketplace,
    )?;
    let seller_id = store
        .snapshot()
        .item(item_id)
        .map(|item| item.seller_id)
        .ok_or(AppError::NotFound("Item"))?;
    if !can_review(store, item_id) {
        return Err(AppError::NotEligible(
            "You can only review items you've purchased.".to_string(),
        ));
    }

    add_review(
        store,
        AddReviewRequest {
            reviewee_id: seller_id,
            item_id,
            rating,
            comment,
        },
    )
    .await
}

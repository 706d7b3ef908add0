//! Versioned upgrades for persisted blobs.
//!
//! Blobs written before schema versioning existed are stored at version 0.
//! Each step in [`STEPS`] lifts a blob by exactly one version, so a blob at
//! version `n` runs `STEPS[n..]` in order.

use serde_json::{Map, Value, json};

use crate::{
    error::{AppError, AppResult},
    storage::StorageKey,
};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

type UpgradeStep = fn(StorageKey, &mut Value);

const STEPS: [UpgradeStep; 1] = [v0_to_v1];

/// Bring `value` from `version` up to [`CURRENT_SCHEMA_VERSION`].
pub fn upgrade(key: StorageKey, version: i32, mut value: Value) -> AppResult<Value> {
    if version > CURRENT_SCHEMA_VERSION || version < 0 {
        return Err(AppError::Internal(anyhow::anyhow!(
            "{} is stored at unsupported schema version {version}",
            key.as_str()
        )));
    }

    for step in STEPS.iter().skip(version as usize) {
        step(key, &mut value);
    }
    Ok(value)
}

pub fn needs_upgrade(version: i32) -> bool {
    version < CURRENT_SCHEMA_VERSION
}

fn v0_to_v1(key: StorageKey, value: &mut Value) {
    match key {
        StorageKey::Users => {
            if let Some(users) = value.as_array_mut() {
                for user in users.iter_mut().filter_map(Value::as_object_mut) {
                    hydrate_user(user);
                }
            }
        }
        // The session pointer used to hold a full copy of the user record.
        StorageKey::CurrentUser => {
            if let Some(id) = value.get("id").cloned() {
                *value = id;
            }
        }
        _ => {}
    }
}

fn hydrate_user(user: &mut Map<String, Value>) {
    for field in [
        "reviewsReceived",
        "savedItemIds",
        "purchasedItemIds",
        "paymentMethods",
        "transactionHistory",
        "cart",
    ] {
        fill(user, field, json!([]));
    }
    for field in ["bio", "twitterUrl", "linkedinUrl", "githubUrl"] {
        fill(user, field, json!(""));
    }
    // Frozen at the v1 defaults; later changes to the live defaults must not leak in here.
    fill(
        user,
        "notificationSettings",
        json!({
            "inApp": {
                "newMessages": true,
                "itemSold": true,
                "newReviews": true,
                "priceDrops": true,
                "itemSaved": true
            },
            "email": {
                "newMessages": true,
                "itemSold": true,
                "newReviews": false,
                "priceDrops": false,
                "itemSaved": false,
                "weeklyDigest": true
            }
        }),
    );
    fill(user, "martcoinBalance", json!(0));

    let plan_missing = match user.get("plan") {
        None | Some(Value::Null) => true,
        Some(Value::String(plan)) => plan.is_empty(),
        Some(_) => false,
    };
    if plan_missing {
        user.insert("plan".to_string(), json!("Free"));
    }
}

fn fill(record: &mut Map<String, Value>, field: &str, default: Value) {
    if matches!(record.get(field), None | Some(Value::Null)) {
        record.insert(field.to_string(), default);
    }
}

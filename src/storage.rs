use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
    sea_query::Expr,
};
use serde_json::Value;

use crate::{
    db::OrmConn,
    entity::storage_entries::{ActiveModel, Column, Entity as StorageEntries},
    error::{AppError, AppResult},
    upgrade::CURRENT_SCHEMA_VERSION,
};

/// Logical keys of the persisted state, one JSON blob each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Users,
    Items,
    Notifications,
    CurrentUser,
    GuestMode,
    Theme,
    Currency,
    RememberedEmail,
}

impl StorageKey {
    pub const ALL: [StorageKey; 8] = [
        StorageKey::Users,
        StorageKey::Items,
        StorageKey::Notifications,
        StorageKey::CurrentUser,
        StorageKey::GuestMode,
        StorageKey::Theme,
        StorageKey::Currency,
        StorageKey::RememberedEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Users => "campusmart_users",
            StorageKey::Items => "campusmart_items",
            StorageKey::Notifications => "campusmart_notifications",
            StorageKey::CurrentUser => "campusmart_currentUser",
            StorageKey::GuestMode => "campusmart_isGuestMode",
            StorageKey::Theme => "campusmart_theme",
            StorageKey::Currency => "campusmart_currency",
            StorageKey::RememberedEmail => "campusmart_remembered_email",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub value: Value,
    pub schema_version: i32,
    pub revision: i64,
}

/// A blob to persist. `expected_revision` is the revision the writer last
/// saw; 0 means the writer believes the key has never been written.
#[derive(Debug, Clone)]
pub struct EntryWrite {
    pub key: StorageKey,
    pub value: Value,
    pub expected_revision: i64,
}

pub async fn load_entries(orm: &OrmConn) -> AppResult<HashMap<StorageKey, StoredEntry>> {
    let rows = StorageEntries::find().all(orm).await?;
    let mut entries = HashMap::with_capacity(rows.len());

    for row in rows {
        let Some(key) = StorageKey::parse(&row.key) else {
            tracing::debug!(key = %row.key, "ignoring unknown storage key");
            continue;
        };
        let value = match serde_json::from_str::<Value>(&row.value) {
            Ok(value) => value,
            // Unversioned display settings were written as bare strings.
            Err(_) if row.schema_version == 0 => Value::String(row.value),
            Err(err) => return Err(err.into()),
        };
        entries.insert(
            key,
            StoredEntry {
                value,
                schema_version: row.schema_version,
                revision: row.revision,
            },
        );
    }

    tracing::debug!(count = entries.len(), "loaded storage entries");
    Ok(entries)
}

/// Persist every write in one transaction, returning the new revisions.
///
/// Fails with [`AppError::StaleSnapshot`] without writing anything when any
/// key's stored revision differs from the expected one.
pub async fn write_entries(
    orm: &OrmConn,
    writes: Vec<EntryWrite>,
) -> AppResult<HashMap<StorageKey, i64>> {
    let txn = orm.begin().await?;
    let now = Utc::now();
    let mut revisions = HashMap::with_capacity(writes.len());

    for write in writes {
        let key = write.key.as_str();
        let value = serde_json::to_string(&write.value)?;
        let next_revision = write.expected_revision + 1;

        if write.expected_revision == 0 {
            let existing = StorageEntries::find_by_id(key.to_string()).one(&txn).await?;
            if existing.is_some() {
                tracing::warn!(key, "storage entry created elsewhere");
                return Err(AppError::StaleSnapshot);
            }
            ActiveModel {
                key: Set(key.to_string()),
                value: Set(value),
                schema_version: Set(CURRENT_SCHEMA_VERSION),
                revision: Set(next_revision),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        } else {
            let result = StorageEntries::update_many()
                .col_expr(Column::Value, Expr::value(value))
                .col_expr(Column::SchemaVersion, Expr::value(CURRENT_SCHEMA_VERSION))
                .col_expr(Column::Revision, Expr::value(next_revision))
                .col_expr(Column::UpdatedAt, Expr::value(now))
                .filter(Column::Key.eq(key))
                .filter(Column::Revision.eq(write.expected_revision))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                tracing::warn!(
                    key,
                    expected = write.expected_revision,
                    "storage entry revision mismatch"
                );
                return Err(AppError::StaleSnapshot);
            }
        }

        revisions.insert(write.key, next_revision);
    }

    txn.commit().await?;
    tracing::debug!(keys = revisions.len(), "persisted storage entries");
    Ok(revisions)
}

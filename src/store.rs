//! The entity store: in-memory collections mirrored to persistent storage.
//!
//! Operations read the current [`Snapshot`], build replacement collections and
//! hand them to [`Store::commit`] as a [`Changeset`]. A changeset is persisted
//! in a single storage transaction and only then swapped into memory, so a
//! failed write leaves both sides untouched.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Currency, Destination, Item, Notification, PurchaseContext, Theme, User},
    state::AppState,
    storage::{self, EntryWrite, StorageKey},
    upgrade::{needs_upgrade, upgrade},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub current_user_id: Option<Uuid>,
    pub guest_mode: bool,
}

impl Session {
    pub fn signed_in(user_id: Uuid) -> Self {
        Self {
            current_user_id: Some(user_id),
            guest_mode: false,
        }
    }

    pub fn guest() -> Self {
        Self {
            current_user_id: None,
            guest_mode: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub theme: Theme,
    pub currency: Currency,
    pub remembered_email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub items: Vec<Item>,
    pub notifications: Vec<Notification>,
    pub session: Session,
    pub preferences: Preferences,
}

impl Snapshot {
    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn item(&self, id: Uuid) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// The signed-in user, looked up fresh in the users collection.
    pub fn current_user(&self) -> Option<&User> {
        self.session.current_user_id.and_then(|id| self.user(id))
    }

    /// Users collection with `updated` swapped in for the record sharing its id.
    pub fn users_with(&self, updated: &User) -> Vec<User> {
        self.users
            .iter()
            .map(|u| if u.id == updated.id { updated.clone() } else { u.clone() })
            .collect()
    }
}

/// Replacement collections for one logical write.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    users: Option<Vec<User>>,
    items: Option<Vec<Item>>,
    notifications: Option<Vec<Notification>>,
    session: Option<Session>,
    preferences: Option<Preferences>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(mut self, users: Vec<User>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn items(mut self, items: Vec<Item>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_none()
            && self.items.is_none()
            && self.notifications.is_none()
            && self.session.is_none()
            && self.preferences.is_none()
    }
}

/// UI-flow state that lives only as long as the store.
#[derive(Debug, Clone, Default)]
pub struct Pending {
    pub redirect: Option<Destination>,
    pub purchase: Option<PurchaseContext>,
}

pub struct Store {
    state: AppState,
    snapshot: Snapshot,
    revisions: HashMap<StorageKey, i64>,
    pending: Pending,
}

impl Store {
    /// Read every persisted blob, upgrading old schema versions in place.
    pub async fn load(state: AppState) -> AppResult<Self> {
        let entries = storage::load_entries(&state.orm).await?;

        let mut revisions = HashMap::with_capacity(entries.len());
        let mut values = HashMap::with_capacity(entries.len());
        let mut upgraded = Vec::new();

        for (key, entry) in entries {
            revisions.insert(key, entry.revision);
            let stale = needs_upgrade(entry.schema_version);
            let value = upgrade(key, entry.schema_version, entry.value)?;
            if stale {
                upgraded.push(EntryWrite {
                    key,
                    value: value.clone(),
                    expected_revision: entry.revision,
                });
            }
            values.insert(key, value);
        }

        let snapshot = Snapshot {
            users: take(&mut values, StorageKey::Users)?.unwrap_or_default(),
            items: take(&mut values, StorageKey::Items)?.unwrap_or_default(),
            notifications: take(&mut values, StorageKey::Notifications)?.unwrap_or_default(),
            session: Session {
                current_user_id: take::<Option<Uuid>>(&mut values, StorageKey::CurrentUser)?
                    .flatten(),
                guest_mode: take(&mut values, StorageKey::GuestMode)?.unwrap_or(false),
            },
            preferences: Preferences {
                theme: take(&mut values, StorageKey::Theme)?.unwrap_or_default(),
                currency: take(&mut values, StorageKey::Currency)?.unwrap_or_default(),
                remembered_email: take::<Option<String>>(&mut values, StorageKey::RememberedEmail)?
                    .flatten(),
            },
        };

        if !upgraded.is_empty() {
            let keys: Vec<&str> = upgraded.iter().map(|w| w.key.as_str()).collect();
            tracing::info!(?keys, "upgraded stored blobs to current schema");
            let written = storage::write_entries(&state.orm, upgraded).await?;
            revisions.extend(written);
        }

        let mut store = Self {
            state,
            snapshot,
            revisions,
            pending: Pending::default(),
        };

        if let Some(id) = store.snapshot.session.current_user_id {
            if store.snapshot.user(id).is_none() {
                tracing::warn!(user_id = %id, "stored session points at a missing user");
                let session = Session {
                    current_user_id: None,
                    ..store.snapshot.session.clone()
                };
                store.commit(Changeset::new().session(session)).await?;
            }
        }

        tracing::debug!(
            users = store.snapshot.users.len(),
            items = store.snapshot.items.len(),
            notifications = store.snapshot.notifications.len(),
            "store loaded"
        );
        Ok(store)
    }

    /// Discard the in-memory snapshot and read storage again.
    pub async fn reload(&mut self) -> AppResult<()> {
        let pending = std::mem::take(&mut self.pending);
        *self = Self::load(self.state.clone()).await?;
        self.pending = pending;
        Ok(())
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn users(&self) -> &[User] {
        &self.snapshot.users
    }

    pub fn items(&self) -> &[Item] {
        &self.snapshot.items
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.snapshot.notifications
    }

    pub fn session(&self) -> &Session {
        &self.snapshot.session
    }

    pub fn preferences(&self) -> &Preferences {
        &self.snapshot.preferences
    }

    pub fn current_user(&self) -> Option<&User> {
        self.snapshot.current_user()
    }

    pub fn is_guest(&self) -> bool {
        self.snapshot.session.guest_mode
    }

    pub fn pending(&self) -> &Pending {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut Pending {
        &mut self.pending
    }

    /// Persist `changes` atomically, then apply them to the snapshot.
    pub async fn commit(&mut self, mut changes: Changeset) -> AppResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // A session may only point at a user that still exists.
        if let Some(users) = &changes.users {
            let session = changes
                .session
                .clone()
                .unwrap_or_else(|| self.snapshot.session.clone());
            if let Some(id) = session.current_user_id {
                if !users.iter().any(|u| u.id == id) {
                    changes.session = Some(Session {
                        current_user_id: None,
                        ..session
                    });
                }
            }
        }

        let writes = self.entry_writes(&changes)?;
        let revisions = storage::write_entries(&self.state.orm, writes).await?;
        self.revisions.extend(revisions);

        let Changeset {
            users,
            items,
            notifications,
            session,
            preferences,
        } = changes;
        if let Some(users) = users {
            self.snapshot.users = users;
        }
        if let Some(items) = items {
            self.snapshot.items = items;
        }
        if let Some(notifications) = notifications {
            self.snapshot.notifications = notifications;
        }
        if let Some(session) = session {
            self.snapshot.session = session;
        }
        if let Some(preferences) = preferences {
            self.snapshot.preferences = preferences;
        }
        Ok(())
    }

    fn entry_writes(&self, changes: &Changeset) -> AppResult<Vec<EntryWrite>> {
        let mut blobs: Vec<(StorageKey, Value)> = Vec::new();
        if let Some(users) = &changes.users {
            blobs.push((StorageKey::Users, serde_json::to_value(users)?));
        }
        if let Some(items) = &changes.items {
            blobs.push((StorageKey::Items, serde_json::to_value(items)?));
        }
        if let Some(notifications) = &changes.notifications {
            blobs.push((StorageKey::Notifications, serde_json::to_value(notifications)?));
        }
        if let Some(session) = &changes.session {
            blobs.push((StorageKey::CurrentUser, serde_json::to_value(session.current_user_id)?));
            blobs.push((StorageKey::GuestMode, Value::Bool(session.guest_mode)));
        }
        if let Some(preferences) = &changes.preferences {
            blobs.push((StorageKey::Theme, serde_json::to_value(preferences.theme)?));
            blobs.push((StorageKey::Currency, serde_json::to_value(preferences.currency)?));
            blobs.push((
                StorageKey::RememberedEmail,
                serde_json::to_value(&preferences.remembered_email)?,
            ));
        }

        Ok(blobs
            .into_iter()
            .map(|(key, value)| EntryWrite {
                key,
                value,
                expected_revision: self.revisions.get(&key).copied().unwrap_or(0),
            })
            .collect())
    }
}

fn take<T: DeserializeOwned>(
    values: &mut HashMap<StorageKey, Value>,
    key: StorageKey,
) -> AppResult<Option<T>> {
    let decoded = values
        .remove(&key)
        .map(serde_json::from_value::<T>)
        .transpose()?;
    Ok(decoded)
}

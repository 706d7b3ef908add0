use crate::{
    error::AppResult,
    models::{Currency, Theme},
    response::Outcome,
    store::{Changeset, Preferences, Store},
};

pub async fn set_theme(store: &mut Store, theme: Theme) -> AppResult<Outcome<Preferences>> {
    let preferences = Preferences {
        theme,
        ..store.preferences().clone()
    };
    store
        .commit(Changeset::new().preferences(preferences.clone()))
        .await?;
    tracing::debug!(?theme, "theme changed");
    Ok(Outcome::success("Theme updated.", preferences, None))
}

/// Change the display currency. Stored amounts stay in the base currency.
pub async fn set_currency(store: &mut Store, currency: Currency) -> AppResult<Outcome<Preferences>> {
    let preferences = Preferences {
        currency,
        ..store.preferences().clone()
    };
    store
        .commit(Changeset::new().preferences(preferences.clone()))
        .await?;
    tracing::debug!(?currency, "currency changed");
    Ok(Outcome::success("Currency updated.", preferences, None))
}

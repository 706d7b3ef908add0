use crate::{
    error::{AppError, AppResult},
    models::{Destination, User},
    store::Store,
};

/// Require a signed-in, non-guest user for a privileged action.
///
/// On rejection the intended destination is remembered so that a later
/// login or registration can resume it.
pub fn require_member(store: &mut Store, message: &str, resume: Destination) -> AppResult<User> {
    if !store.is_guest() {
        if let Some(user) = store.current_user() {
            return Ok(user.clone());
        }
    }

    tracing::warn!(guest = store.is_guest(), ?resume, "privileged action without login");
    store.pending_mut().redirect = Some(resume);
    Err(AppError::LoginRequired {
        message: message.to_string(),
        resume,
    })
}

/// Require the session that started a flow to still be signed in.
pub fn require_session(store: &Store) -> AppResult<User> {
    store.current_user().cloned().ok_or(AppError::SessionExpired)
}

use uuid::Uuid;

use crate::{
    audit::log_audit,
    auth::{require_member, require_session},
    dto::auth::{ChangePasswordRequest, LoginOutcome, LoginRequest, RegisterRequest, UpdateProfileRequest},
    error::{AppError, AppResult},
    models::{AccountTab, Destination, NotificationSettings, Plan, User},
    response::Outcome,
    store::{Changeset, Preferences, Session, Store},
};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(store: &mut Store, payload: RegisterRequest) -> AppResult<Outcome<LoginOutcome>> {
    let RegisterRequest {
        name,
        email,
        password,
        school_level,
        grade,
    } = payload;

    if [&name, &email, &password, &school_level, &grade]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(AppError::validation("Please fill in all fields."));
    }

    if store.users().iter().any(|u| u.email == email) {
        return Err(AppError::DuplicateEmail);
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password,
        school_level,
        grade,
        profile_picture_url: None,
        bio: String::new(),
        twitter_url: String::new(),
        linkedin_url: String::new(),
        github_url: String::new(),
        reviews_received: Vec::new(),
        saved_item_ids: Vec::new(),
        purchased_item_ids: Vec::new(),
        notification_settings: NotificationSettings::default(),
        payment_methods: Vec::new(),
        transaction_history: Vec::new(),
        plan: Plan::Free,
        martcoin_balance: 0,
        cart: Vec::new(),
    };

    let mut users = store.users().to_vec();
    users.push(user.clone());
    store
        .commit(
            Changeset::new()
                .users(users)
                .session(Session::signed_in(user.id)),
        )
        .await?;

    log_audit(
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    );

    let resume = store.pending_mut().redirect.take();
    Ok(Outcome::success(
        "Account created successfully!",
        LoginOutcome { user, resume },
        None,
    ))
}

pub async fn login(store: &mut Store, payload: LoginRequest) -> AppResult<Outcome<LoginOutcome>> {
    let LoginRequest {
        email,
        password,
        remember_me,
    } = payload;

    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::validation("Please enter both email and password."));
    }

    let user = store
        .users()
        .iter()
        .find(|u| u.email == email && u.password == password)
        .cloned()
        .ok_or(AppError::InvalidCredentials)?;

    let preferences = Preferences {
        remembered_email: remember_me.then(|| email.clone()),
        ..store.preferences().clone()
    };
    store
        .commit(
            Changeset::new()
                .session(Session::signed_in(user.id))
                .preferences(preferences),
        )
        .await?;

    log_audit(
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    );

    let resume = store.pending_mut().redirect.take();
    let message = format!("Welcome back, {}!", user.name);
    Ok(Outcome::success(message, LoginOutcome { user, resume }, None))
}

pub async fn logout(store: &mut Store) -> AppResult<Outcome<()>> {
    let user_id = store.session().current_user_id;
    store.commit(Changeset::new().session(Session::default())).await?;
    *store.pending_mut() = Default::default();

    log_audit(user_id, "user_logout", Some("users"), None);
    Ok(Outcome::success("You have been logged out.", (), None))
}

pub async fn enter_guest_mode(store: &mut Store) -> AppResult<Outcome<()>> {
    store.commit(Changeset::new().session(Session::guest())).await?;
    tracing::info!("entered guest mode");
    Ok(Outcome::success("You are now browsing as a guest.", (), None))
}

/// Guarded navigation to the account area.
pub fn open_account(store: &mut Store, tab: AccountTab) -> AppResult<Destination> {
    require_member(
        store,
        "Please log in or create an account to view your profile.",
        Destination::Account(tab),
    )?;
    Ok(Destination::Account(tab))
}

pub async fn update_profile(
    store: &mut Store,
    payload: UpdateProfileRequest,
) -> AppResult<Outcome<User>> {
    let mut user = require_session(store)?;

    if let Some(email) = &payload.email {
        if email.trim().is_empty() {
            return Err(AppError::validation("Email is required."));
        }
        if store
            .users()
            .iter()
            .any(|u| u.email == *email && u.id != user.id)
        {
            return Err(AppError::EmailInUse);
        }
    }
    for (field, label) in [
        (&payload.name, "Name"),
        (&payload.school_level, "School level"),
        (&payload.grade, "Grade level"),
    ] {
        if field.as_ref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::validation(format!("{label} is required.")));
        }
    }
    for url in [&payload.twitter_url, &payload.linkedin_url, &payload.github_url]
        .into_iter()
        .flatten()
    {
        if !url.is_empty() && !is_web_url(url) {
            return Err(AppError::validation("Please enter a valid URL."));
        }
    }

    let UpdateProfileRequest {
        name,
        email,
        school_level,
        grade,
        bio,
        profile_picture_url,
        twitter_url,
        linkedin_url,
        github_url,
        notification_settings,
    } = payload;

    if let Some(name) = name {
        user.name = name;
    }
    if let Some(email) = email {
        user.email = email;
    }
    if let Some(school_level) = school_level {
        user.school_level = school_level;
    }
    if let Some(grade) = grade {
        user.grade = grade;
    }
    if let Some(bio) = bio {
        user.bio = bio;
    }
    if let Some(url) = profile_picture_url {
        user.profile_picture_url = Some(url).filter(|u| !u.is_empty());
    }
    if let Some(url) = twitter_url {
        user.twitter_url = url;
    }
    if let Some(url) = linkedin_url {
        user.linkedin_url = url;
    }
    if let Some(url) = github_url {
        user.github_url = url;
    }
    if let Some(settings) = notification_settings {
        user.notification_settings = settings;
    }

    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(Some(user.id), "profile_update", Some("users"), None);
    Ok(Outcome::success("Profile updated successfully!", user, None))
}

pub async fn change_password(
    store: &mut Store,
    payload: ChangePasswordRequest,
) -> AppResult<Outcome<()>> {
    let mut user = require_session(store)?;

    if payload.new.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "Password must be at least 8 characters long.",
        ));
    }
    if user.password != payload.current {
        return Err(AppError::WrongPassword);
    }

    user.password = payload.new;
    let users = store.snapshot().users_with(&user);
    store.commit(Changeset::new().users(users)).await?;

    log_audit(Some(user.id), "password_change", Some("users"), None);
    Ok(Outcome::success("Password changed successfully!", (), None))
}

fn is_web_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            rest.chars().count() >= 2
                && !rest.chars().any(char::is_whitespace)
                && !rest.starts_with(['$', '.', '?', '#'])
        }
        None => false,
    }
}

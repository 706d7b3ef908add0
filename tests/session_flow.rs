mod common;

use campusmart_core::{
    dto::auth::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest},
    error::{AppError, ErrorKind},
    models::{AccountTab, Destination, Plan},
    services::{catalog_service, session_service},
    store::Store,
};
use common::{PASSWORD, register_member, setup_store};
use uuid::Uuid;

fn login_request(email: &str, password: &str, remember_me: bool) -> LoginRequest {
    LoginRequest {
        email: email.into(),
        password: password.into(),
        remember_me,
    }
}

#[tokio::test]
async fn registering_a_taken_email_is_a_conflict() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    let user = register_member(&mut store, "Ada", "a@x.com").await?;
    assert_eq!(user.plan, Plan::Free);
    assert_eq!(user.martcoin_balance, 0);
    assert!(user.cart.is_empty() && user.payment_methods.is_empty());
    assert_eq!(store.current_user().map(|u| u.id), Some(user.id));

    let err = session_service::register(
        &mut store,
        RegisterRequest {
            name: "Impostor".into(),
            email: "a@x.com".into(),
            password: "whatever1".into(),
            school_level: "College".into(),
            grade: "Senior".into(),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::DuplicateEmail));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(store.users().len(), 1);
    assert_eq!(store.current_user().map(|u| u.id), Some(user.id));
    Ok(())
}

#[tokio::test]
async fn registration_requires_every_field() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    let err = session_service::register(
        &mut store,
        RegisterRequest {
            name: "Ada".into(),
            email: "a@x.com".into(),
            password: PASSWORD.into(),
            school_level: "College".into(),
            grade: "  ".into(),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(store.users().is_empty());
    Ok(())
}

#[tokio::test]
async fn wrong_password_leaves_session_untouched() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    let ada = register_member(&mut store, "Ada", "a@x.com").await?;
    session_service::logout(&mut store).await?;

    let err = session_service::login(&mut store, login_request("a@x.com", "wrong", false))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert_eq!(err.kind(), ErrorKind::IncorrectCredential);
    assert!(store.current_user().is_none());

    let outcome = session_service::login(&mut store, login_request("a@x.com", PASSWORD, true)).await?;
    assert_eq!(outcome.message, "Welcome back, Ada!");
    assert_eq!(store.current_user().map(|u| u.id), Some(ada.id));
    assert_eq!(store.preferences().remembered_email.as_deref(), Some("a@x.com"));

    // A failed login for someone else keeps the previous user signed in.
    register_member(&mut store, "Bea", "b@x.com").await?;
    session_service::login(&mut store, login_request("a@x.com", PASSWORD, false)).await?;
    assert!(store.preferences().remembered_email.is_none());
    let err = session_service::login(&mut store, login_request("b@x.com", "nope", false))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert_eq!(store.current_user().map(|u| u.id), Some(ada.id));
    Ok(())
}

#[tokio::test]
async fn guest_actions_redirect_to_login_and_resume_after_registering() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    session_service::enter_guest_mode(&mut store).await?;
    assert!(store.is_guest());
    assert!(store.current_user().is_none());

    let err = catalog_service::toggle_save(&mut store, Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(store.pending().redirect, Some(Destination::Marketplace));

    let err = session_service::open_account(&mut store, AccountTab::Payments).unwrap_err();
    match err {
        AppError::LoginRequired { resume, .. } => {
            assert_eq!(resume, Destination::Account(AccountTab::Payments))
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let outcome = session_service::register(
        &mut store,
        RegisterRequest {
            name: "Ada".into(),
            email: "a@x.com".into(),
            password: PASSWORD.into(),
            school_level: "High School".into(),
            grade: "12th Grade (Senior)".into(),
        },
    )
    .await?;
    assert_eq!(
        outcome.data.resume,
        Some(Destination::Account(AccountTab::Payments))
    );
    assert!(!store.is_guest());
    assert!(store.pending().redirect.is_none());
    assert_eq!(
        session_service::open_account(&mut store, AccountTab::Profile)?,
        Destination::Account(AccountTab::Profile)
    );
    Ok(())
}

#[tokio::test]
async fn profile_email_must_not_collide_with_another_user() -> anyhow::Result<()> {
    let (state, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;
    let bea = register_member(&mut store, "Bea", "b@x.com").await?;

    let err = session_service::update_profile(
        &mut store,
        UpdateProfileRequest {
            email: Some("a@x.com".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::EmailInUse));

    let outcome = session_service::update_profile(
        &mut store,
        UpdateProfileRequest {
            email: Some("b@x.com".into()),
            name: Some("Beatrice".into()),
            github_url: Some("https://github.com/bea".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(outcome.data.name, "Beatrice");

    let err = session_service::update_profile(
        &mut store,
        UpdateProfileRequest {
            twitter_url: Some("not a url".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let reloaded = Store::load(state).await?;
    let stored = reloaded.snapshot().user(bea.id).expect("bea stored");
    assert_eq!(stored.name, "Beatrice");
    assert_eq!(stored.github_url, "https://github.com/bea");
    assert_eq!(reloaded.current_user().map(|u| u.id), Some(bea.id));
    Ok(())
}

#[tokio::test]
async fn change_password_checks_the_current_one() -> anyhow::Result<()> {
    let (_, mut store) = setup_store().await?;
    register_member(&mut store, "Ada", "a@x.com").await?;

    let err = session_service::change_password(
        &mut store,
        ChangePasswordRequest {
            current: "not-it".into(),
            new: "brand-new-secret".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::WrongPassword));

    let err = session_service::change_password(
        &mut store,
        ChangePasswordRequest {
            current: PASSWORD.into(),
            new: "short".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    session_service::change_password(
        &mut store,
        ChangePasswordRequest {
            current: PASSWORD.into(),
            new: "brand-new-secret".into(),
        },
    )
    .await?;
    session_service::logout(&mut store).await?;

    assert!(
        session_service::login(&mut store, login_request("a@x.com", PASSWORD, false))
            .await
            .is_err()
    );
    session_service::login(&mut store, login_request("a@x.com", "brand-new-secret", false)).await?;
    assert!(store.current_user().is_some());
    Ok(())
}

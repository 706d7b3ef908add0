use serde::{Deserialize, Serialize};

use crate::models::{Destination, NotificationSettings, User};

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub school_level: String,
    pub grade: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    /// Action the user was sent to log in for, if any.
    pub resume: Option<Destination>,
}

/// Profile fields to change; `None` leaves a field untouched.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub school_level: Option<String>,
    pub grade: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub twitter_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub notification_settings: Option<NotificationSettings>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChangePasswordRequest {
    pub current: String,
    pub new: String,
}

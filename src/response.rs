use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Error,
}

/// A human-readable status message for the presentation layer.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Result of a successful operation: the toast to show plus the payload.
#[derive(Debug, Serialize)]
pub struct Outcome<T> {
    pub message: String,
    pub data: T,
    pub meta: Option<Meta>,
}

impl<T> Outcome<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data,
            meta,
        }
    }

    pub fn toast(&self) -> Toast {
        Toast {
            message: self.message.clone(),
            severity: Severity::Success,
        }
    }
}

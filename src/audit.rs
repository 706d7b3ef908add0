use serde_json::Value;
use uuid::Uuid;

/// Record a completed mutation as a structured event on the `audit` target.
pub fn log_audit(user_id: Option<Uuid>, action: &str, resource: Option<&str>, metadata: Option<Value>) {
    let user_id = user_id.map(|id| id.to_string());
    let metadata = metadata.map(|m| m.to_string());
    tracing::info!(
        target: "audit",
        user_id = user_id.as_deref().unwrap_or("-"),
        action,
        resource = resource.unwrap_or("-"),
        metadata = metadata.as_deref().unwrap_or("{}"),
        "audit"
    );
}

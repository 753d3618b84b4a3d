use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr};
use serde_json::{Map, Value};
use std::{convert::Infallible, fmt, net::SocketAddr};
use uuid::Uuid;

use crate::entities::audit_log::{self, AuditLogCreate};
use crate::traits::Resource;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
}

impl AuditAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user, inserted as a request extension by whatever
/// middleware performs authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

/// Who made a write and from where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };
        let ip_address = header(FORWARDED_FOR)
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .or_else(|| header(REAL_IP))
            .map(str::to_string);

        Self {
            user_id: None,
            ip_address,
            user_agent: header("user-agent").map(str::to_string),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

impl<S> FromRequestParts<S> for AuditContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let mut context = Self::from_headers(&parts.headers);
        if context.ip_address.is_none() {
            context.ip_address = parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string());
        }
        if let Some(CurrentUser(user_id)) = parts.extensions.get::<CurrentUser>() {
            context.user_id = Some(*user_id);
        }
        Ok(context)
    }
}

/// The fields of `after` whose value differs from `before`.
///
/// Returns `None` when nothing changed or either side is not a JSON object.
#[must_use]
pub fn changed_fields(before: &Value, after: &Value) -> Option<Value> {
    let (Value::Object(before), Value::Object(after)) = (before, after) else {
        return None;
    };
    let changes: Map<String, Value> = after
        .iter()
        .filter(|(key, value)| before.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    (!changes.is_empty()).then_some(Value::Object(changes))
}

/// Write one audit log entry for `action` on `record`.
///
/// # Errors
///
/// Propagates the insert failure.
pub async fn record<T: Resource>(
    db: &DatabaseConnection,
    context: &AuditContext,
    action: AuditAction,
    record: &T,
    changes: Option<Value>,
) -> Result<audit_log::Model, DbErr> {
    let entry = AuditLogCreate {
        user_id: context.user_id,
        action: action.as_str().to_string(),
        auditable_id: record.id(),
        auditable_type: T::RESOURCE_NAME_SINGULAR.to_string(),
        changes,
        ip_address: context.ip_address.clone(),
        user_agent: context.user_agent.clone(),
    };
    let model = audit_log::ActiveModel::from(entry).insert(db).await?;
    tracing::debug!(
        resource = T::RESOURCE_NAME_SINGULAR,
        id = %model.auditable_id,
        action = %action,
        "audit entry written"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_changed_fields_only_reports_differences() {
        let before = json!({"name": "Desk", "stock": 3, "price": "10.00"});
        let after = json!({"name": "Desk", "stock": 5, "price": "12.50"});
        assert_eq!(
            changed_fields(&before, &after),
            Some(json!({"stock": 5, "price": "12.50"}))
        );
    }

    #[test]
    fn test_changed_fields_none_when_equal() {
        let value = json!({"name": "Desk"});
        assert_eq!(changed_fields(&value, &value), None);
    }

    #[test]
    fn test_changed_fields_includes_new_keys() {
        let before = json!({"name": "Desk"});
        let after = json!({"name": "Desk", "description": "Oak"});
        assert_eq!(
            changed_fields(&before, &after),
            Some(json!({"description": "Oak"}))
        );
    }

    #[test]
    fn test_changed_fields_requires_objects() {
        assert_eq!(changed_fields(&json!([1]), &json!([2])), None);
    }

    #[test]
    fn test_context_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(REAL_IP, HeaderValue::from_static("10.0.0.2"));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.5"));
        let context = AuditContext::from_headers(&headers);
        assert_eq!(context.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(context.user_agent.as_deref(), Some("curl/8.5"));
        assert_eq!(context.user_id, None);
    }

    #[test]
    fn test_context_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP, HeaderValue::from_static("10.0.0.2"));
        let context = AuditContext::from_headers(&headers);
        assert_eq!(context.ip_address.as_deref(), Some("10.0.0.2"));
        assert_eq!(context.user_agent, None);
    }

    #[tokio::test]
    async fn test_extractor_reads_current_user() {
        let user = Uuid::new_v4();
        let request = axum::http::Request::builder()
            .header("user-agent", "test-agent")
            .extension(CurrentUser(user))
            .body(())
            .unwrap();
        let (mut parts, ()) = request.into_parts();
        let context = AuditContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context.user_id, Some(user));
        assert_eq!(context.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(context.ip_address, None);
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::Created.to_string(), "created");
        assert_eq!(AuditAction::Updated.as_str(), "updated");
        assert_eq!(AuditAction::Deleted.as_str(), "deleted");
    }
}

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use catalogcrate::{
    ApiConfig, AppState,
    entities::{AuditLog, Category, Product, User, category, product},
    routes::resource_router,
    schema,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection, DbErr};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let _ = ApiConfig::default().init_tracing();
    let db = Database::connect("sqlite::memory:").await?;
    schema::create_tables(&db).await?;
    Ok(db)
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    setup_test_app_with_config(db, ApiConfig::default())
}

pub fn setup_test_app_with_config(db: DatabaseConnection, config: ApiConfig) -> Router {
    let api = Router::new()
        .nest("/categories", resource_router::<Category>())
        .nest("/products", resource_router::<Product>())
        .nest("/audit-logs", resource_router::<AuditLog>())
        .nest("/users", resource_router::<User>())
        .with_state(AppState::new(db, config));

    Router::new().nest("/api/v1", api)
}

/// Send one request and return the status, headers and JSON body
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    send_with_headers(app, method, uri, body, &[]).await
}

pub async fn send_with_headers(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, HeaderMap, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}

/// Insert a category with a fixed creation time.
pub async fn insert_category(
    db: &DatabaseConnection,
    name: &str,
    created_at: DateTime<Utc>,
) -> category::Model {
    category::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        name: ActiveValue::Set(name.to_string()),
        description: ActiveValue::Set(None),
        created_at: ActiveValue::Set(created_at),
        updated_at: ActiveValue::Set(created_at),
        deleted_at: ActiveValue::Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

/// Insert a product with a fixed creation time.
pub async fn insert_product(
    db: &DatabaseConnection,
    category_id: Uuid,
    name: &str,
    price: i64,
    stock: i32,
    created_at: DateTime<Utc>,
) -> product::Model {
    product::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        category_id: ActiveValue::Set(category_id),
        name: ActiveValue::Set(name.to_string()),
        description: ActiveValue::Set(Some(format!("{name} description"))),
        price: ActiveValue::Set(Decimal::new(price, 0)),
        stock: ActiveValue::Set(stock),
        created_at: ActiveValue::Set(created_at),
        updated_at: ActiveValue::Set(created_at),
        deleted_at: ActiveValue::Set(None),
    }
    .insert(db)
    .await
    .unwrap()
}

pub fn names(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

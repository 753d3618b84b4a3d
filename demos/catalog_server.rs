//! Catalog API server
//!
//! ```bash
//! cargo run --example catalog_server
//! DATABASE_URL=sqlite://catalog.db?mode=rwc RUST_LOG=debug cargo run --example catalog_server
//! ```
//!
//! Then try:
//! - <http://localhost:3000/api/v1/products?name=lamp&sort=-price,name&include=category>
//! - <http://localhost:3000/api/v1/audit-logs?auditableType=Product&include=auditable>
//! - <http://localhost:3000/openapi.json>

use axum::{Json, Router, routing::get};
use catalogcrate::{
    ApiConfig, AppState,
    entities::{AuditLog, Category, Product, User},
    openapi::ApiDoc,
    routes::resource_router,
    schema,
};
use sea_orm::Database;
use utoipa::OpenApi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ApiConfig::from_env()?;
    config.init_tracing();

    let db = Database::connect(&config.database_url).await?;
    schema::create_tables(&db).await?;

    let api = Router::new()
        .nest("/categories", resource_router::<Category>())
        .nest("/products", resource_router::<Product>())
        .nest("/users", resource_router::<User>())
        .nest("/audit-logs", resource_router::<AuditLog>())
        .with_state(AppState::new(db, config));

    let app = Router::new()
        .nest("/api/v1", api)
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on http://0.0.0.0:3000/api/v1");
    axum::serve(listener, app).await?;
    Ok(())
}

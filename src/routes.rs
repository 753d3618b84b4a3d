use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use hyper::HeaderMap;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::AuditContext;
use crate::config::ApiConfig;
use crate::errors::ServiceError;
use crate::filter::INCLUDE_KEY;
use crate::models::FilterRequest;
use crate::pagination::Page;
use crate::repository::Repository;
use crate::service::Service;
use crate::traits::Resource;

pub const PER_PAGE_KEY: &str = "per_page";
pub const PAGE_KEY: &str = "page";

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(db: DatabaseConnection, config: ApiConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    fn service<T: Resource>(&self) -> Service<T> {
        Service::new(Repository::new(self.db.clone()))
    }
}

/// List one page of resources.
///
/// Every query parameter other than `per_page` and `page` goes to the
/// resource's filter. The response carries a `Content-Range` header.
pub async fn index<T: Resource>(
    State(state): State<AppState>,
    Query(request): Query<FilterRequest>,
) -> Result<(HeaderMap, Json<Page<T>>), ServiceError> {
    let per_page = state.config.per_page(request.get_u64(PER_PAGE_KEY));
    let page = request.get_u64(PAGE_KEY).unwrap_or(1);
    let filter = T::query_filter(request);

    let page = state.service::<T>().list(&filter, per_page, page).await?;
    let headers = page.content_range(T::TABLE_NAME);
    Ok((headers, Json(page)))
}

/// Get one resource, optionally with `?include=` relations.
pub async fn show<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(request): Query<FilterRequest>,
) -> Result<Json<T>, ServiceError> {
    let relations: Vec<String> = request
        .get(INCLUDE_KEY)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let service = Service::new(Repository::<T>::new(state.db.clone()).with_relations(relations));
    Ok(Json(service.get(id).await?))
}

pub async fn store<T: Resource>(
    State(state): State<AppState>,
    audit: AuditContext,
    Json(payload): Json<T::CreateModel>,
) -> Result<(StatusCode, Json<T>), ServiceError> {
    let service = Service::new(Repository::<T>::new(state.db.clone()).with_audit(audit));
    let created = service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    audit: AuditContext,
    Json(payload): Json<T::UpdateModel>,
) -> Result<Json<T>, ServiceError> {
    let service = Service::new(Repository::<T>::new(state.db.clone()).with_audit(audit));
    Ok(Json(service.update(id, payload).await?))
}

/// Soft delete one resource.
pub async fn destroy<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    audit: AuditContext,
) -> Result<StatusCode, ServiceError> {
    let service = Service::new(Repository::<T>::new(state.db.clone()).with_audit(audit));
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `/` for index and store, `/{id}` for show, update and destroy.
///
/// Nest it wherever the application wants the resource to live.
pub fn resource_router<T: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(index::<T>).post(store::<T>))
        .route(
            "/{id}",
            get(show::<T>).put(update::<T>).patch(update::<T>).delete(destroy::<T>),
        )
}

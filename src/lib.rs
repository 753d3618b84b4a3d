pub mod audit;
pub mod config;
pub mod entities;
pub mod errors;
pub mod filter;
pub mod models;
pub mod openapi;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sort;
pub mod traits;

pub use audit::{AuditContext, CurrentUser};
pub use config::ApiConfig;
pub use errors::{ErrorKind, ServiceError};
pub use filter::{FilterError, Handler, QueryFilter};
pub use models::FilterRequest;
pub use pagination::Page;
pub use query::FilterQuery;
pub use repository::{CrudRepository, Handle, Repository};
pub use routes::AppState;
pub use service::Service;
pub use traits::{MergeIntoActiveModel, Resource};

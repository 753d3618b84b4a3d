use utoipa::OpenApi;

use crate::entities::{
    audit_log::{AuditLog, AuditLogCreate, AuditLogUpdate, Auditable},
    category::{Category, CategoryCreate, CategoryUpdate},
    product::{Product, ProductCreate, ProductUpdate},
    user::{User, UserCreate, UserUpdate},
};

/// Schemas for every catalog resource and its create/update payloads.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        description = "Filtered, paginated and soft-deleting CRUD over categories, products, users and their audit trail"
    ),
    components(schemas(
        Category,
        CategoryCreate,
        CategoryUpdate,
        Product,
        ProductCreate,
        ProductUpdate,
        User,
        UserCreate,
        UserUpdate,
        AuditLog,
        AuditLogCreate,
        AuditLogUpdate,
        Auditable,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_resource_has_a_schema() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.unwrap().schemas;
        for name in ["Category", "Product", "ProductUpdate", "User", "AuditLog", "Auditable"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }
}

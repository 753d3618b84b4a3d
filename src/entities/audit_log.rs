use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use super::{category::Category, product::Product, user::User};
use crate::filter::QueryFilter;
use crate::models::FilterRequest;
use crate::traits::{MergeIntoActiveModel, Resource, load_by_ids, undefined_relation};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(nullable)]
    pub user_id: Option<Uuid>,
    pub action: String,
    pub auditable_id: Uuid,
    pub auditable_type: String,
    #[sea_orm(nullable)]
    pub changes: Option<Json>,
    #[sea_orm(nullable)]
    pub ip_address: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The record an audit entry points at, resolved from `auditable_type`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Auditable {
    Product(Product),
    Category(Category),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub auditable_id: Uuid,
    pub auditable_type: String,
    #[schema(value_type = Option<Object>)]
    pub changes: Option<Json>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditable: Option<Auditable>,
}

impl From<Model> for AuditLog {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            auditable_id: model.auditable_id,
            auditable_type: model.auditable_type,
            changes: model.changes,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
            user: None,
            auditable: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct AuditLogCreate {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub action: String,
    pub auditable_id: Uuid,
    pub auditable_type: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub changes: Option<Json>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl From<AuditLogCreate> for ActiveModel {
    fn from(create: AuditLogCreate) -> Self {
        let now = Utc::now();
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(create.user_id),
            action: ActiveValue::Set(create.action),
            auditable_id: ActiveValue::Set(create.auditable_id),
            auditable_type: ActiveValue::Set(create.auditable_type),
            changes: ActiveValue::Set(create.changes),
            ip_address: ActiveValue::Set(create.ip_address),
            user_agent: ActiveValue::Set(create.user_agent),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct AuditLogUpdate {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<Object>)]
    pub changes: Option<Option<Json>>,
}

impl MergeIntoActiveModel<ActiveModel> for AuditLogUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(action) = self.action {
            existing.action = ActiveValue::Set(action);
        }
        if let Some(changes) = self.changes {
            existing.changes = ActiveValue::Set(changes);
        }
        Ok(existing)
    }
}

async fn load_auditables(db: &DatabaseConnection, items: &mut [AuditLog]) -> Result<(), DbErr> {
    let ids_of = |kind: &str| -> Vec<Uuid> {
        items
            .iter()
            .filter(|item| item.auditable_type == kind)
            .map(|item| item.auditable_id)
            .collect()
    };
    let products: HashMap<Uuid, Product> =
        load_by_ids(db, ids_of(Product::RESOURCE_NAME_SINGULAR)).await?;
    let categories: HashMap<Uuid, Category> =
        load_by_ids(db, ids_of(Category::RESOURCE_NAME_SINGULAR)).await?;

    for item in items.iter_mut() {
        item.auditable = match item.auditable_type.as_str() {
            t if t == Product::RESOURCE_NAME_SINGULAR => products
                .get(&item.auditable_id)
                .cloned()
                .map(Auditable::Product),
            t if t == Category::RESOURCE_NAME_SINGULAR => categories
                .get(&item.auditable_id)
                .cloned()
                .map(Auditable::Category),
            _ => None,
        };
    }
    Ok(())
}

#[async_trait]
impl Resource for AuditLog {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = AuditLogCreate;
    type UpdateModel = AuditLogUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const CREATED_AT_COLUMN: Self::ColumnType = Column::CreatedAt;
    const UPDATED_AT_COLUMN: Self::ColumnType = Column::UpdatedAt;
    const DELETED_AT_COLUMN: Self::ColumnType = Column::DeletedAt;
    const RESOURCE_NAME_SINGULAR: &'static str = "AuditLog";
    const RESOURCE_NAME_PLURAL: &'static str = "AuditLogs";
    const TABLE_NAME: &'static str = "audit_logs";

    fn id(&self) -> Uuid {
        self.id
    }

    fn query_filter(request: FilterRequest) -> QueryFilter<Column> {
        QueryFilter::new(request)
            .like("action", Column::Action)
            .exact("auditableType", Column::AuditableType)
            .uuid("auditableId", Column::AuditableId)
            .date_or_range("createdAt", Column::CreatedAt)
            .date_or_range("updatedAt", Column::UpdatedAt)
            .sortable_column(Column::Action)
            .sortable("createdAt", Column::CreatedAt)
            .sortable("updatedAt", Column::UpdatedAt)
    }

    async fn load_relations(
        db: &DatabaseConnection,
        items: &mut [Self],
        relations: &[String],
    ) -> Result<(), DbErr> {
        for relation in relations {
            match relation.as_str() {
                "user" => {
                    let ids = items.iter().filter_map(|item| item.user_id).collect();
                    let users = load_by_ids::<User>(db, ids).await?;
                    for item in items.iter_mut() {
                        item.user = item.user_id.and_then(|id| users.get(&id).cloned());
                    }
                }
                "auditable" => load_auditables(db, items).await?,
                other => return Err(undefined_relation::<Self>(other)),
            }
        }
        Ok(())
    }
}

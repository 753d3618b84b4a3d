use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::filter::QueryFilter;
use crate::models::FilterRequest;
use crate::traits::{MergeIntoActiveModel, Resource};

// Credentials and roles belong to the auth layer and are not stored here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct UserCreate {
    pub name: String,
    pub email: String,
}

impl From<UserCreate> for ActiveModel {
    fn from(create: UserCreate) -> Self {
        let now = Utc::now();
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(create.name),
            email: ActiveValue::Set(create.email),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl MergeIntoActiveModel<ActiveModel> for UserUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = ActiveValue::Set(name);
        }
        if let Some(email) = self.email {
            existing.email = ActiveValue::Set(email);
        }
        Ok(existing)
    }
}

#[async_trait]
impl Resource for User {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = UserCreate;
    type UpdateModel = UserUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const CREATED_AT_COLUMN: Self::ColumnType = Column::CreatedAt;
    const UPDATED_AT_COLUMN: Self::ColumnType = Column::UpdatedAt;
    const DELETED_AT_COLUMN: Self::ColumnType = Column::DeletedAt;
    const RESOURCE_NAME_SINGULAR: &'static str = "User";
    const RESOURCE_NAME_PLURAL: &'static str = "Users";
    const TABLE_NAME: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }

    fn query_filter(request: FilterRequest) -> QueryFilter<Column> {
        QueryFilter::new(request)
            .like("name", Column::Name)
            .like("email", Column::Email)
            .date_or_range("createdAt", Column::CreatedAt)
            .sortable_column(Column::Name)
            .sortable_column(Column::Email)
            .sortable("createdAt", Column::CreatedAt)
    }
}

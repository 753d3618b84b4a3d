use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::filter::QueryFilter;
use crate::models::FilterRequest;
use crate::traits::{MergeIntoActiveModel, Resource};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct CategoryCreate {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CategoryCreate> for ActiveModel {
    fn from(create: CategoryCreate) -> Self {
        let now = Utc::now();
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            name: ActiveValue::Set(create.name),
            description: ActiveValue::Set(create.description),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CategoryUpdate {
    #[serde(default)]
    pub name: Option<String>,
    /// `null` clears the description, an absent key leaves it alone.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
}

impl MergeIntoActiveModel<ActiveModel> for CategoryUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(name) = self.name {
            existing.name = ActiveValue::Set(name);
        }
        if let Some(description) = self.description {
            existing.description = ActiveValue::Set(description);
        }
        Ok(existing)
    }
}

#[async_trait]
impl Resource for Category {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = CategoryCreate;
    type UpdateModel = CategoryUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const CREATED_AT_COLUMN: Self::ColumnType = Column::CreatedAt;
    const UPDATED_AT_COLUMN: Self::ColumnType = Column::UpdatedAt;
    const DELETED_AT_COLUMN: Self::ColumnType = Column::DeletedAt;
    const RESOURCE_NAME_SINGULAR: &'static str = "Category";
    const RESOURCE_NAME_PLURAL: &'static str = "Categories";
    const TABLE_NAME: &'static str = "categories";
    const AUDITED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn query_filter(request: FilterRequest) -> QueryFilter<Column> {
        QueryFilter::new(request)
            .like("name", Column::Name)
            .like("description", Column::Description)
            .date_or_range("createdAt", Column::CreatedAt)
            .date_or_range("updatedAt", Column::UpdatedAt)
            .sortable_column(Column::Name)
            .sortable_column(Column::Description)
            .sortable("createdAt", Column::CreatedAt)
            .sortable("updatedAt", Column::UpdatedAt)
    }
}

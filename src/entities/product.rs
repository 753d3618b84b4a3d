use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::category::Category;
use crate::filter::QueryFilter;
use crate::models::FilterRequest;
use crate::traits::{MergeIntoActiveModel, Resource, load_by_ids, undefined_relation};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category_id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
            category: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ProductCreate {
    pub category_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock: i32,
}

impl From<ProductCreate> for ActiveModel {
    fn from(create: ProductCreate) -> Self {
        let now = Utc::now();
        Self {
            id: ActiveValue::Set(Uuid::new_v4()),
            category_id: ActiveValue::Set(create.category_id),
            name: ActiveValue::Set(create.name),
            description: ActiveValue::Set(create.description),
            price: ActiveValue::Set(create.price),
            stock: ActiveValue::Set(create.stock),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct ProductUpdate {
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: Option<i32>,
}

impl MergeIntoActiveModel<ActiveModel> for ProductUpdate {
    fn merge_into_activemodel(self, mut existing: ActiveModel) -> Result<ActiveModel, DbErr> {
        if let Some(category_id) = self.category_id {
            existing.category_id = ActiveValue::Set(category_id);
        }
        if let Some(name) = self.name {
            existing.name = ActiveValue::Set(name);
        }
        if let Some(description) = self.description {
            existing.description = ActiveValue::Set(description);
        }
        if let Some(price) = self.price {
            existing.price = ActiveValue::Set(price);
        }
        if let Some(stock) = self.stock {
            existing.stock = ActiveValue::Set(stock);
        }
        Ok(existing)
    }
}

#[async_trait]
impl Resource for Product {
    type EntityType = Entity;
    type ModelType = Model;
    type ColumnType = Column;
    type ActiveModelType = ActiveModel;
    type CreateModel = ProductCreate;
    type UpdateModel = ProductUpdate;

    const ID_COLUMN: Self::ColumnType = Column::Id;
    const CREATED_AT_COLUMN: Self::ColumnType = Column::CreatedAt;
    const UPDATED_AT_COLUMN: Self::ColumnType = Column::UpdatedAt;
    const DELETED_AT_COLUMN: Self::ColumnType = Column::DeletedAt;
    const RESOURCE_NAME_SINGULAR: &'static str = "Product";
    const RESOURCE_NAME_PLURAL: &'static str = "Products";
    const TABLE_NAME: &'static str = "products";
    const AUDITED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn query_filter(request: FilterRequest) -> QueryFilter<Column> {
        QueryFilter::new(request)
            .like("name", Column::Name)
            .like("description", Column::Description)
            .uuid("categoryId", Column::CategoryId)
            .date_or_range("createdAt", Column::CreatedAt)
            .date_or_range("updatedAt", Column::UpdatedAt)
            .sortable_column(Column::Name)
            .sortable_column(Column::Description)
            .sortable_column(Column::Price)
            .sortable_column(Column::Stock)
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
                "category" => {
                    let ids = items.iter().map(|item| item.category_id).collect();
                    let categories = load_by_ids::<Category>(db, ids).await?;
                    for item in items.iter_mut() {
                        item.category = categories.get(&item.category_id).cloned();
                    }
                }
                other => return Err(undefined_relation::<Self>(other)),
            }
        }
        Ok(())
    }
}

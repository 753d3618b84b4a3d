use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, IntoActiveModel, ModelTrait, QueryFilter as _,
};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use uuid::Uuid;

use crate::filter::QueryFilter;
use crate::models::FilterRequest;

pub trait MergeIntoActiveModel<ActiveModelType> {
    /// Merge this update model into an existing active model
    ///
    /// # Errors
    ///
    /// Returns a `DbErr` if the merge operation fails due to data conversion issues.
    fn merge_into_activemodel(self, existing: ActiveModelType) -> Result<ActiveModelType, DbErr>;
}

/// A soft-deletable catalog entity exposed through a repository and service.
///
/// Every implementor maps 1:1 to a table with a uuid primary key,
/// `created_at`/`updated_at` timestamps and a nullable `deleted_at` tombstone.
#[async_trait]
pub trait Resource: Sized + Send + Sync + Clone + Serialize + 'static
where
    Self: From<<Self::EntityType as EntityTrait>::Model>,
{
    type EntityType: EntityTrait<Model = Self::ModelType, Column = Self::ColumnType> + Sync;
    type ModelType: ModelTrait<Entity = Self::EntityType>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModelType>
        + Send
        + Sync;
    type ColumnType: ColumnTrait + Send + Sync;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType>
        + ActiveModelBehavior
        + Send
        + Sync;
    type CreateModel: Into<Self::ActiveModelType> + DeserializeOwned + Send + Sync;
    type UpdateModel: MergeIntoActiveModel<Self::ActiveModelType> + DeserializeOwned + Send + Sync;

    const ID_COLUMN: Self::ColumnType;
    const CREATED_AT_COLUMN: Self::ColumnType;
    const UPDATED_AT_COLUMN: Self::ColumnType;
    const DELETED_AT_COLUMN: Self::ColumnType;
    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;
    const TABLE_NAME: &'static str;
    /// Writes through the repository leave an audit log entry.
    const AUDITED: bool = false;

    fn id(&self) -> Uuid;

    /// The filter for this entity bound to one request.
    ///
    /// The default only understands `sort` (newest first by `createdAt`) and
    /// `include`.
    #[must_use]
    fn query_filter(request: FilterRequest) -> QueryFilter<Self::ColumnType> {
        QueryFilter::new(request).sortable("createdAt", Self::CREATED_AT_COLUMN)
    }

    /// Load the named relations onto already fetched records.
    ///
    /// # Errors
    ///
    /// Fails with a `DbErr` for a relation name this resource does not define.
    async fn load_relations(
        db: &DatabaseConnection,
        items: &mut [Self],
        relations: &[String],
    ) -> Result<(), DbErr> {
        let _ = (db, items);
        match relations.first() {
            Some(name) => Err(undefined_relation::<Self>(name)),
            None => Ok(()),
        }
    }
}

/// The error raised when `include` names a relation the resource lacks.
#[must_use]
pub fn undefined_relation<T: Resource>(name: &str) -> DbErr {
    DbErr::Custom(format!(
        "Call to undefined relationship [{name}] on model [{}]",
        T::RESOURCE_NAME_SINGULAR
    ))
}

/// Fetch the live (not soft-deleted) records with the given ids, keyed by id.
///
/// # Errors
///
/// Propagates any database error.
pub async fn load_by_ids<T: Resource>(
    db: &DatabaseConnection,
    ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, T>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let models = T::EntityType::find()
        .filter(T::ID_COLUMN.is_in(ids))
        .filter(T::DELETED_AT_COLUMN.is_null())
        .all(db)
        .await?;
    Ok(models
        .into_iter()
        .map(T::from)
        .map(|item| (item.id(), item))
        .collect())
}

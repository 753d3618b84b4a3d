use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, Iterable, ModelTrait, PaginatorTrait, QueryFilter as _, QueryOrder,
    QuerySelect, Select, sea_query::Expr,
};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::audit::{self, AuditAction, AuditContext, changed_fields};
use crate::pagination::Page;
use crate::query::FilterQuery;
use crate::traits::{MergeIntoActiveModel, Resource};

/// Largest `LIMIT` every backend binds; page sizes above it are capped.
const MAX_ROWS: u64 = i64::MAX.unsigned_abs();

/// A record to look up, either already materialized or by identifier.
#[derive(Debug)]
pub enum Handle<'a, T> {
    Record(&'a T),
    Id(Uuid),
}

impl<T: Resource> Handle<'_, T> {
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            Self::Record(record) => record.id(),
            Self::Id(id) => *id,
        }
    }
}

impl<'a, T> From<&'a T> for Handle<'a, T> {
    fn from(record: &'a T) -> Self {
        Self::Record(record)
    }
}

impl<T> From<Uuid> for Handle<'_, T> {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}

/// Storage operations for one resource.
///
/// Soft-deleted rows are invisible to every read. Failures surface as the raw
/// `DbErr`; translating them is the service's job.
#[async_trait]
pub trait CrudRepository<T: Resource>: Send + Sync {
    /// Every live record, newest first.
    async fn all(&self) -> Result<Vec<T>, DbErr>;

    async fn find(&self, handle: Handle<'_, T>) -> Result<Option<T>, DbErr>;

    /// Like [`CrudRepository::find`] but never loads relations.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DbErr>;

    async fn create(&self, fields: T::CreateModel) -> Result<T, DbErr>;

    /// Merge `fields` onto the stored row of `existing` and save it.
    ///
    /// When no column changes, nothing is written and no audit entry is
    /// recorded.
    async fn update(&self, existing: &T, fields: T::UpdateModel) -> Result<T, DbErr>;

    /// Set the tombstone on `existing`. Fails with `RecordNotFound` when the
    /// row is gone or already deleted.
    async fn delete(&self, existing: &T) -> Result<(), DbErr>;

    async fn paginate(
        &self,
        query: FilterQuery<T::ColumnType>,
        per_page: u64,
        page: u64,
    ) -> Result<Page<T>, DbErr>;
}

/// The Sea-ORM backed repository.
pub struct Repository<T> {
    db: DatabaseConnection,
    relations: Vec<String>,
    audit: Option<AuditContext>,
    _resource: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            relations: self.relations.clone(),
            audit: self.audit.clone(),
            _resource: PhantomData,
        }
    }
}

impl<T: Resource> Repository<T> {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            relations: Vec::new(),
            audit: None,
            _resource: PhantomData,
        }
    }

    /// Relations loaded by [`CrudRepository::all`] and [`CrudRepository::find`].
    #[must_use]
    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Record an audit entry for each write, when the resource is audited.
    #[must_use]
    pub fn with_audit(mut self, context: AuditContext) -> Self {
        self.audit = Some(context);
        self
    }

    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Read a row whether or not it has been soft deleted.
    ///
    /// # Errors
    ///
    /// Propagates any database error.
    pub async fn find_trashed(&self, id: Uuid) -> Result<Option<T>, DbErr> {
        let model = T::EntityType::find()
            .filter(T::ID_COLUMN.eq(id))
            .one(&self.db)
            .await?;
        Ok(model.map(T::from))
    }

    fn live() -> Select<T::EntityType> {
        T::EntityType::find().filter(T::DELETED_AT_COLUMN.is_null())
    }

    fn not_found(id: Uuid) -> DbErr {
        DbErr::RecordNotFound(format!("{} {id} not found", T::RESOURCE_NAME_SINGULAR))
    }

    async fn load(&self, items: &mut [T], relations: &[String]) -> Result<(), DbErr> {
        if relations.is_empty() {
            return Ok(());
        }
        T::load_relations(&self.db, items, relations).await
    }

    async fn record_audit(
        &self,
        action: AuditAction,
        record: &T,
        changes: Option<serde_json::Value>,
    ) -> Result<(), DbErr> {
        match &self.audit {
            Some(context) if T::AUDITED => {
                audit::record(&self.db, context, action, record, changes).await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<T: Resource> CrudRepository<T> for Repository<T> {
    async fn all(&self) -> Result<Vec<T>, DbErr> {
        let models = Self::live()
            .order_by_desc(T::CREATED_AT_COLUMN)
            .order_by_asc(T::ID_COLUMN)
            .all(&self.db)
            .await?;
        let mut items: Vec<T> = models.into_iter().map(T::from).collect();
        self.load(&mut items, &self.relations).await?;
        Ok(items)
    }

    async fn find(&self, handle: Handle<'_, T>) -> Result<Option<T>, DbErr> {
        let Some(item) = self.find_by_id(handle.id()).await? else {
            return Ok(None);
        };
        let mut items = [item];
        self.load(&mut items, &self.relations).await?;
        let [item] = items;
        Ok(Some(item))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, DbErr> {
        let model = Self::live()
            .filter(T::ID_COLUMN.eq(id))
            .one(&self.db)
            .await?;
        Ok(model.map(T::from))
    }

    async fn create(&self, fields: T::CreateModel) -> Result<T, DbErr> {
        let active_model: T::ActiveModelType = fields.into();
        let created = T::from(active_model.insert(&self.db).await?);
        tracing::debug!(resource = T::RESOURCE_NAME_SINGULAR, id = %created.id(), "created");
        self.record_audit(AuditAction::Created, &created, None).await?;
        Ok(created)
    }

    async fn update(&self, existing: &T, fields: T::UpdateModel) -> Result<T, DbErr> {
        let id = existing.id();
        let model = Self::live()
            .filter(T::ID_COLUMN.eq(id))
            .one(&self.db)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        let before = T::from(model.clone());
        let active_model: T::ActiveModelType = model.clone().into_active_model();
        let mut merged = fields.merge_into_activemodel(active_model)?;

        let dirty = T::ColumnType::iter().any(|column| match merged.get(column) {
            ActiveValue::Set(value) => value != model.get(column),
            _ => false,
        });
        if !dirty {
            tracing::debug!(resource = T::RESOURCE_NAME_SINGULAR, id = %id, "unchanged");
            return Ok(before);
        }
        merged.set(T::UPDATED_AT_COLUMN, Utc::now().into());
        let updated = T::from(merged.update(&self.db).await?);
        tracing::debug!(resource = T::RESOURCE_NAME_SINGULAR, id = %id, "updated");

        let changes = match (serde_json::to_value(&before), serde_json::to_value(&updated)) {
            (Ok(before), Ok(after)) => changed_fields(&before, &after),
            _ => None,
        };
        self.record_audit(AuditAction::Updated, &updated, changes).await?;
        Ok(updated)
    }

    async fn delete(&self, existing: &T) -> Result<(), DbErr> {
        let id = existing.id();
        let now = Utc::now();
        let result = T::EntityType::update_many()
            .col_expr(T::DELETED_AT_COLUMN, Expr::value(now))
            .col_expr(T::UPDATED_AT_COLUMN, Expr::value(now))
            .filter(T::ID_COLUMN.eq(id))
            .filter(T::DELETED_AT_COLUMN.is_null())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Self::not_found(id));
        }
        tracing::debug!(resource = T::RESOURCE_NAME_SINGULAR, id = %id, "soft deleted");
        self.record_audit(AuditAction::Deleted, existing, None).await
    }

    async fn paginate(
        &self,
        query: FilterQuery<T::ColumnType>,
        per_page: u64,
        page: u64,
    ) -> Result<Page<T>, DbErr> {
        let per_page = per_page.clamp(1, MAX_ROWS);
        let page = page.max(1);

        let mut select = query.apply_to(Self::live());
        if !query.has_ordering() {
            select = select.order_by_desc(T::CREATED_AT_COLUMN);
        }
        let select = select.order_by_asc(T::ID_COLUMN);

        let total = PaginatorTrait::count(select.clone(), &self.db).await?;
        let offset = Page::<T>::offset(per_page, page);
        let models = if offset < total {
            select.offset(offset).limit(per_page).all(&self.db).await?
        } else {
            Vec::new()
        };
        let mut items: Vec<T> = models.into_iter().map(T::from).collect();
        self.load(&mut items, &query.includes()).await?;
        tracing::debug!(
            resource = T::RESOURCE_NAME_PLURAL,
            total,
            page,
            per_page,
            "paginated"
        );
        Ok(Page::new(items, total, per_page, page))
    }
}

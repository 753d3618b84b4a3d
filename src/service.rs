use std::marker::PhantomData;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::filter::QueryFilter;
use crate::pagination::Page;
use crate::query::FilterQuery;
use crate::repository::{CrudRepository, Handle, Repository};
use crate::traits::Resource;

/// The error boundary in front of a repository.
///
/// Every storage error is translated here, once. A missing record is raised
/// as `NotFound` after the storage call has returned, so it never passes
/// through the storage translation a second time.
pub struct Service<T, R = Repository<T>> {
    repository: R,
    _resource: PhantomData<fn() -> T>,
}

impl<T, R: Clone> Clone for Service<T, R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            _resource: PhantomData,
        }
    }
}

impl<T, R> Service<T, R>
where
    T: Resource,
    R: CrudRepository<T>,
{
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            _resource: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn storage_error(action: &str) -> impl FnOnce(sea_orm::DbErr) -> ServiceError + '_ {
        move |err| ServiceError::from_storage(action, T::RESOURCE_NAME_SINGULAR, err)
    }

    /// One page of the records matching `filter`.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` for a filter value that does not parse, otherwise
    /// the translated storage error.
    pub async fn list(
        &self,
        filter: &QueryFilter<T::ColumnType>,
        per_page: u64,
        page: u64,
    ) -> Result<Page<T>, ServiceError> {
        let query = filter
            .apply(FilterQuery::new())
            .map_err(ServiceError::from_filter)?;
        self.repository
            .paginate(query, per_page, page)
            .await
            .map_err(|err| ServiceError::from_storage("retrieve", T::RESOURCE_NAME_PLURAL, err))
    }

    /// # Errors
    ///
    /// The translated storage error.
    pub async fn all(&self) -> Result<Vec<T>, ServiceError> {
        self.repository
            .all()
            .await
            .map_err(|err| ServiceError::from_storage("retrieve", T::RESOURCE_NAME_PLURAL, err))
    }

    /// The record behind `handle` with the repository's relations loaded.
    ///
    /// # Errors
    ///
    /// `NotFound` when the record is absent or soft deleted.
    pub async fn get<'a>(&self, handle: impl Into<Handle<'a, T>>) -> Result<T, ServiceError>
    where
        T: 'a,
    {
        self.repository
            .find(handle.into())
            .await
            .map_err(Self::storage_error("retrieve"))?
            .ok_or_else(|| ServiceError::not_found(T::RESOURCE_NAME_SINGULAR))
    }

    /// # Errors
    ///
    /// `NotFound` when the record is absent or soft deleted.
    pub async fn get_by_id(&self, id: Uuid) -> Result<T, ServiceError> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(Self::storage_error("retrieve"))?
            .ok_or_else(|| ServiceError::not_found(T::RESOURCE_NAME_SINGULAR))
    }

    /// # Errors
    ///
    /// `ValidationFailed` on a constraint violation, otherwise `Internal`.
    pub async fn create(&self, fields: T::CreateModel) -> Result<T, ServiceError> {
        self.repository
            .create(fields)
            .await
            .map_err(Self::storage_error("create"))
    }

    /// # Errors
    ///
    /// `NotFound` when the record is absent or soft deleted, `ValidationFailed`
    /// on a constraint violation, otherwise `Internal`.
    pub async fn update<'a>(
        &self,
        handle: impl Into<Handle<'a, T>>,
        fields: T::UpdateModel,
    ) -> Result<T, ServiceError>
    where
        T: 'a,
    {
        let existing = self.get_by_id(handle.into().id()).await?;
        self.repository
            .update(&existing, fields)
            .await
            .map_err(Self::storage_error("update"))
    }

    /// Soft delete the record behind `handle`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the record is absent or already deleted.
    pub async fn delete<'a>(&self, handle: impl Into<Handle<'a, T>>) -> Result<(), ServiceError>
    where
        T: 'a,
    {
        let existing = self.get_by_id(handle.into().id()).await?;
        self.repository
            .delete(&existing)
            .await
            .map_err(Self::storage_error("delete"))
    }
}

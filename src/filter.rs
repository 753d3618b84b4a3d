//! # Query filtering
//!
//! A [`QueryFilter`] turns the flat parameters of one request into operations
//! on a [`FilterQuery`]. Every parameter key is looked up in a table of
//! handlers registered when the filter is built; a key without a handler is
//! ignored.
//!
//! Two handlers exist on every filter:
//!
//! - `sort`: comma-separated fields, `-` prefix for descending, resolved
//!   against the whitelist given to [`QueryFilter::sortable`].
//! - `include`: comma-separated relation names, loaded after the rows are
//!   fetched. Unknown names fail at execution, not here.
//!
//! ```rust,ignore
//! let filter = QueryFilter::new(request)
//!     .like("name", Column::Name)
//!     .date_or_range("createdAt", Column::CreatedAt)
//!     .sortable("createdAt", Column::CreatedAt);
//!
//! // GET /products?name=lamp&createdAt=2024-01-01,2024-01-31&sort=-createdAt
//! let query = filter.apply(FilterQuery::new())?;
//! ```

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, Value};
use std::{fmt, sync::Arc};
use uuid::Uuid;

use crate::models::FilterRequest;
use crate::query::{FilterQuery, Predicate};
use crate::sort::{SortKey, resolve_sort};

pub const SORT_KEY: &str = "sort";
pub const INCLUDE_KEY: &str = "include";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A handler failed to interpret its parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    InvalidDate { parameter: String, value: String },
    InvalidUuid { parameter: String, value: String },
    Rejected { parameter: String, message: String },
}

impl FilterError {
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::InvalidDate { parameter, .. }
            | Self::InvalidUuid { parameter, .. }
            | Self::Rejected { parameter, .. } => parameter,
        }
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDate { parameter, value } => write!(
                f,
                "Invalid date '{value}' for '{parameter}', expected YYYY-MM-DD or YYYY-MM-DD,YYYY-MM-DD"
            ),
            Self::InvalidUuid { parameter, value } => {
                write!(f, "Invalid identifier '{value}' for '{parameter}'")
            }
            Self::Rejected { parameter, message } => write!(f, "{parameter}: {message}"),
        }
    }
}

impl std::error::Error for FilterError {}

pub type CustomHandler<C> =
    Arc<dyn Fn(FilterQuery<C>, &str) -> Result<FilterQuery<C>, FilterError> + Send + Sync>;

/// What a parameter does to the query.
#[derive(Clone)]
pub enum Handler<C> {
    /// Substring match, `%value%`. Wildcards in the value are passed through.
    Like(C),
    /// Equality on the raw string.
    Exact(C),
    /// Equality on a uuid column.
    Uuid(C),
    /// `a,b` selects the inclusive date range, a single value the exact date.
    DateOrRange(C),
    Custom(CustomHandler<C>),
}

impl<C: ColumnTrait> Handler<C> {
    fn call(
        &self,
        parameter: &str,
        query: FilterQuery<C>,
        value: &str,
    ) -> Result<FilterQuery<C>, FilterError> {
        match self {
            Self::Like(column) => Ok(query.filter(Predicate::Like {
                column: *column,
                pattern: format!("%{value}%"),
            })),
            Self::Exact(column) => Ok(query.filter(Predicate::Equals {
                column: *column,
                value: Value::from(value.to_string()),
            })),
            Self::Uuid(column) => {
                let id = Uuid::parse_str(value.trim()).map_err(|_| FilterError::InvalidUuid {
                    parameter: parameter.to_string(),
                    value: value.to_string(),
                })?;
                Ok(query.filter(Predicate::Equals {
                    column: *column,
                    value: Value::from(id),
                }))
            }
            Self::DateOrRange(column) => date_or_range(parameter, *column, query, value),
            Self::Custom(handler) => handler(query, value),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Like(column) => f.debug_tuple("Like").field(column).finish(),
            Self::Exact(column) => f.debug_tuple("Exact").field(column).finish(),
            Self::Uuid(column) => f.debug_tuple("Uuid").field(column).finish(),
            Self::DateOrRange(column) => f.debug_tuple("DateOrRange").field(column).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn parse_date(parameter: &str, value: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| FilterError::InvalidDate {
        parameter: parameter.to_string(),
        value: value.to_string(),
    })
}

fn date_or_range<C: ColumnTrait>(
    parameter: &str,
    column: C,
    query: FilterQuery<C>,
    value: &str,
) -> Result<FilterQuery<C>, FilterError> {
    let dates: Vec<&str> = value.split(',').collect();
    if dates.len() > 1 {
        let start = parse_date(parameter, dates[0])?;
        let end = parse_date(parameter, dates[1])?;
        Ok(query.filter(Predicate::DateBetween { column, start, end }))
    } else {
        let date = parse_date(parameter, value)?;
        Ok(query.filter(Predicate::DateEquals { column, date }))
    }
}

fn include<C: ColumnTrait>(query: FilterQuery<C>, value: &str) -> FilterQuery<C> {
    query.include(
        value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty()),
    )
}

/// Per-request filter: the bound request plus the handler table of one entity.
#[derive(Debug, Clone)]
pub struct QueryFilter<C> {
    request: FilterRequest,
    handlers: Vec<(&'static str, Handler<C>)>,
    sortable: Vec<SortKey<C>>,
}

impl<C: ColumnTrait> QueryFilter<C> {
    /// A filter with only the built-in `sort` (empty whitelist) and `include`.
    #[must_use]
    pub fn new(request: FilterRequest) -> Self {
        Self {
            request,
            handlers: Vec::new(),
            sortable: Vec::new(),
        }
    }

    /// Register `handler` under `key`. A later registration for the same key,
    /// or one named `sort`/`include`, replaces the earlier behaviour.
    #[must_use]
    pub fn handler(mut self, key: &'static str, handler: Handler<C>) -> Self {
        self.handlers.retain(|(existing, _)| *existing != key);
        self.handlers.push((key, handler));
        self
    }

    #[must_use]
    pub fn like(self, key: &'static str, column: C) -> Self {
        self.handler(key, Handler::Like(column))
    }

    #[must_use]
    pub fn exact(self, key: &'static str, column: C) -> Self {
        self.handler(key, Handler::Exact(column))
    }

    #[must_use]
    pub fn uuid(self, key: &'static str, column: C) -> Self {
        self.handler(key, Handler::Uuid(column))
    }

    #[must_use]
    pub fn date_or_range(self, key: &'static str, column: C) -> Self {
        self.handler(key, Handler::DateOrRange(column))
    }

    #[must_use]
    pub fn custom<F>(self, key: &'static str, handler: F) -> Self
    where
        F: Fn(FilterQuery<C>, &str) -> Result<FilterQuery<C>, FilterError> + Send + Sync + 'static,
    {
        self.handler(key, Handler::Custom(Arc::new(handler)))
    }

    /// Whitelist `column` for sorting under the public name `key`.
    #[must_use]
    pub fn sortable(mut self, key: &'static str, column: C) -> Self {
        self.sortable.push(SortKey::new(key, column));
        self
    }

    /// Whitelist `column` for sorting under its own name.
    #[must_use]
    pub fn sortable_column(mut self, column: C) -> Self {
        self.sortable.push(SortKey::column(column));
        self
    }

    #[must_use]
    pub fn request(&self) -> &FilterRequest {
        &self.request
    }

    #[must_use]
    pub fn sortable_keys(&self) -> &[SortKey<C>] {
        &self.sortable
    }

    #[must_use]
    pub fn handles(&self, key: &str) -> bool {
        key == SORT_KEY || key == INCLUDE_KEY || self.lookup(key).is_some()
    }

    fn lookup(&self, key: &str) -> Option<&Handler<C>> {
        self.handlers
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, handler)| handler)
    }

    /// Run every handler named by the bound request against `query`.
    ///
    /// # Errors
    ///
    /// Returns the first [`FilterError`] raised by a handler, untouched.
    pub fn apply(&self, query: FilterQuery<C>) -> Result<FilterQuery<C>, FilterError> {
        self.filter(query, &self.request)
    }

    /// Same dispatch as [`apply`](Self::apply), over an explicit set of parameters.
    ///
    /// # Errors
    ///
    /// Returns the first [`FilterError`] raised by a handler, untouched.
    pub fn filter(
        &self,
        query: FilterQuery<C>,
        params: &FilterRequest,
    ) -> Result<FilterQuery<C>, FilterError> {
        params
            .iter()
            .try_fold(query, |query, (key, value)| self.dispatch(key, value, query))
    }

    fn dispatch(
        &self,
        key: &str,
        value: &str,
        query: FilterQuery<C>,
    ) -> Result<FilterQuery<C>, FilterError> {
        if let Some(handler) = self.lookup(key) {
            tracing::trace!(parameter = key, ?handler, "applying filter");
            return handler.call(key, query, value);
        }
        match key {
            SORT_KEY => Ok(resolve_sort(value, &self.sortable)
                .into_iter()
                .fold(query, |query, (column, order)| query.order_by(column, order))),
            INCLUDE_KEY => Ok(include(query, value)),
            _ => Ok(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product::Column;
    use crate::query::QueryOp;
    use sea_orm::{IdenStatic, sea_query::Order};

    fn product_filter(request: FilterRequest) -> QueryFilter<Column> {
        QueryFilter::new(request)
            .like("name", Column::Name)
            .date_or_range("createdAt", Column::CreatedAt)
            .sortable_column(Column::Name)
            .sortable("createdAt", Column::CreatedAt)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_one_operation_per_handled_key() {
        let request = FilterRequest::from_query("name=lamp&colour=red&createdAt=2024-01-01&page=2");
        let query = product_filter(request).apply(FilterQuery::new()).unwrap();
        assert_eq!(query.ops().len(), 2);
        let columns: Vec<String> = query
            .predicates()
            .map(|p| p.column().as_str().to_string())
            .collect();
        assert_eq!(columns, vec!["name", "created_at"]);
    }

    #[test]
    fn test_like_wraps_value_without_escaping() {
        let request = FilterRequest::new().with("name", "50%_off");
        let query = product_filter(request).apply(FilterQuery::new()).unwrap();
        assert!(matches!(
            query.predicates().next(),
            Some(Predicate::Like { pattern, .. }) if pattern == "%50%_off%"
        ));
    }

    #[test]
    fn test_sort_resolves_through_whitelist() {
        let request = FilterRequest::new().with("sort", "-name,createdAt");
        let query = product_filter(request).apply(FilterQuery::new()).unwrap();
        assert_eq!(
            query.orderings(),
            vec![("name", Order::Desc), ("created_at", Order::Asc)]
        );
    }

    #[test]
    fn test_unlisted_sort_token_is_silently_dropped() {
        let request = FilterRequest::new().with("sort", "bogus");
        let query = product_filter(request).apply(FilterQuery::new()).unwrap();
        assert!(query.ops().is_empty());
    }

    #[test]
    fn test_date_range_and_exact_date() {
        let range = product_filter(FilterRequest::new().with("createdAt", "2024-01-01,2024-01-31"))
            .apply(FilterQuery::new())
            .unwrap();
        assert!(matches!(
            range.predicates().next(),
            Some(Predicate::DateBetween { start, end, .. })
                if *start == date(2024, 1, 1) && *end == date(2024, 1, 31)
        ));

        let exact = product_filter(FilterRequest::new().with("createdAt", "2024-01-01"))
            .apply(FilterQuery::new())
            .unwrap();
        assert!(matches!(
            exact.predicates().next(),
            Some(Predicate::DateEquals { date: d, .. }) if *d == date(2024, 1, 1)
        ));
    }

    #[test]
    fn test_invalid_date_propagates() {
        let err = product_filter(FilterRequest::new().with("createdAt", "yesterday"))
            .apply(FilterQuery::new())
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidDate {
                parameter: "createdAt".to_string(),
                value: "yesterday".to_string(),
            }
        );
    }

    #[test]
    fn test_include_records_relations_without_validation() {
        let request = FilterRequest::new().with("include", "category, nonsense");
        let query = product_filter(request).apply(FilterQuery::new()).unwrap();
        assert_eq!(query.includes(), vec!["category", "nonsense"]);
    }

    #[test]
    fn test_handlers_run_in_request_order() {
        let request = FilterRequest::from_query("sort=name&name=x&include=category");
        let query = product_filter(request).apply(FilterQuery::new()).unwrap();
        let kinds: Vec<&str> = query
            .ops()
            .iter()
            .map(|op| match op {
                QueryOp::Where(_) => "where",
                QueryOp::OrderBy { .. } => "order",
                QueryOp::Include(_) => "include",
            })
            .collect();
        assert_eq!(kinds, vec!["order", "where", "include"]);
    }

    #[test]
    fn test_apply_leaves_request_untouched() {
        let request = FilterRequest::from_query("name=lamp&sort=-name");
        let filter = product_filter(request.clone());
        let _ = filter.apply(FilterQuery::new()).unwrap();
        assert_eq!(filter.request(), &request);
    }

    #[test]
    fn test_filter_uses_explicit_params() {
        let filter = product_filter(FilterRequest::new().with("name", "ignored"));
        let explicit = FilterRequest::new().with("sort", "-createdAt");
        let query = filter.filter(FilterQuery::new(), &explicit).unwrap();
        assert_eq!(query.orderings(), vec![("created_at", Order::Desc)]);
        assert_eq!(query.predicates().count(), 0);
    }

    #[test]
    fn test_custom_handler_can_override_builtin() {
        let filter = product_filter(FilterRequest::new().with("include", "category"))
            .custom("include", |_, _| {
                Err(FilterError::Rejected {
                    parameter: "include".to_string(),
                    message: "not allowed".to_string(),
                })
            });
        assert!(filter.handles("include"));
        assert_eq!(
            filter.apply(FilterQuery::new()).unwrap_err().parameter(),
            "include"
        );
    }

    #[test]
    fn test_uuid_handler_rejects_garbage() {
        let filter = QueryFilter::new(FilterRequest::new().with("categoryId", "nope"))
            .uuid("categoryId", Column::CategoryId);
        assert!(matches!(
            filter.apply(FilterQuery::new()),
            Err(FilterError::InvalidUuid { .. })
        ));
    }
}

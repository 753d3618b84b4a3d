use sea_orm::{ColumnTrait, sea_query::Order};

const DESCENDING_PREFIX: char = '-';

/// Whitelist entry for the `sort` parameter.
///
/// A token resolves when it equals `key` (the public name, e.g. `createdAt`)
/// or the backing column's own name (e.g. `created_at`). Anything else can
/// never reach an `ORDER BY`.
#[derive(Debug, Clone, Copy)]
pub struct SortKey<C> {
    pub key: &'static str,
    pub column: C,
}

impl<C: ColumnTrait> SortKey<C> {
    #[must_use]
    pub const fn new(key: &'static str, column: C) -> Self {
        Self { key, column }
    }

    /// Whitelist entry whose public name is the column name itself.
    #[must_use]
    pub fn column(column: C) -> Self {
        Self { key: "", column }
    }
}

/// Split a sort token into its field name and direction.
fn parse_token(token: &str) -> (&str, Order) {
    token
        .strip_prefix(DESCENDING_PREFIX)
        .map_or((token, Order::Asc), |field| (field, Order::Desc))
}

/// Find the whitelisted column for a field name.
fn find_column<C>(field: &str, sortable: &[SortKey<C>]) -> Option<C>
where
    C: ColumnTrait,
{
    sortable
        .iter()
        .find(|entry| !entry.key.is_empty() && entry.key == field)
        .or_else(|| sortable.iter().find(|entry| entry.column.as_str() == field))
        .map(|entry| entry.column)
}

/// Resolve a `sort` value such as `-name,createdAt` into order clauses.
///
/// Clauses come back in the order the tokens were given. Tokens that are not
/// whitelisted, or are empty, are dropped.
pub fn resolve_sort<C>(value: &str, sortable: &[SortKey<C>]) -> Vec<(C, Order)>
where
    C: ColumnTrait,
{
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (field, order) = parse_token(token);
            let resolved = find_column(field, sortable).map(|column| (column, order));
            if resolved.is_none() {
                tracing::warn!(token, "dropping sort token outside the whitelist");
            }
            resolved
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product::Column;
    use sea_orm::IdenStatic;

    fn whitelist() -> Vec<SortKey<Column>> {
        vec![
            SortKey::column(Column::Name),
            SortKey::new("createdAt", Column::CreatedAt),
        ]
    }

    fn names(resolved: &[(Column, Order)]) -> Vec<(&str, Order)> {
        resolved
            .iter()
            .map(|(column, order)| (column.as_str(), order.clone()))
            .collect()
    }

    #[test]
    fn test_parse_token_direction() {
        assert_eq!(parse_token("name"), ("name", Order::Asc));
        assert_eq!(parse_token("-name"), ("name", Order::Desc));
    }

    #[test]
    fn test_multi_key_sort_keeps_token_order() {
        let resolved = resolve_sort("-name,createdAt", &whitelist());
        assert_eq!(
            names(&resolved),
            vec![("name", Order::Desc), ("created_at", Order::Asc)]
        );
    }

    #[test]
    fn test_alias_target_is_accepted_directly() {
        let resolved = resolve_sort("-created_at", &whitelist());
        assert_eq!(names(&resolved), vec![("created_at", Order::Desc)]);
    }

    #[test]
    fn test_unknown_token_is_dropped() {
        assert!(resolve_sort("bogus", &whitelist()).is_empty());
        let resolved = resolve_sort("bogus,-name", &whitelist());
        assert_eq!(names(&resolved), vec![("name", Order::Desc)]);
    }

    #[test]
    fn test_column_outside_whitelist_is_dropped() {
        // price is a real column but not in this whitelist
        assert!(resolve_sort("price,-stock", &whitelist()).is_empty());
    }

    #[test]
    fn test_empty_and_padded_tokens() {
        let resolved = resolve_sort(" name , ,-", &whitelist());
        assert_eq!(names(&resolved), vec![("name", Order::Asc)]);
    }
}

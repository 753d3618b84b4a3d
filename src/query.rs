use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, QueryFilter as _, QueryOrder, Select, Value,
    sea_query::{Alias, Expr, Func, Order, SimpleExpr},
};

/// A single predicate recorded by a filter handler.
#[derive(Debug, Clone)]
pub enum Predicate<C> {
    /// `column LIKE pattern`. The pattern is used as given, wildcards included.
    Like { column: C, pattern: String },
    /// `column = value`
    Equals { column: C, value: Value },
    /// `DATE(column) = date`
    DateEquals { column: C, date: NaiveDate },
    /// `DATE(column) BETWEEN start AND end`, both ends inclusive.
    DateBetween {
        column: C,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl<C: ColumnTrait> Predicate<C> {
    #[must_use]
    pub fn column(&self) -> C {
        match self {
            Self::Like { column, .. }
            | Self::Equals { column, .. }
            | Self::DateEquals { column, .. }
            | Self::DateBetween { column, .. } => *column,
        }
    }

    fn into_expr(self) -> SimpleExpr {
        match self {
            Self::Like { column, pattern } => column.like(pattern),
            Self::Equals { column, value } => column.eq(value),
            Self::DateEquals { column, date } => date_of(column).eq(date),
            Self::DateBetween { column, start, end } => date_of(column).between(start, end),
        }
    }
}

fn date_of<C: ColumnTrait>(column: C) -> Expr {
    Expr::expr(Func::cust(Alias::new("DATE")).arg(Expr::col(column)))
}

/// One operation against the query being built.
#[derive(Debug, Clone)]
pub enum QueryOp<C> {
    Where(Predicate<C>),
    OrderBy { column: C, order: Order },
    /// Relations to eager load once the rows are fetched.
    Include(Vec<String>),
}

/// The query value threaded through every filter handler.
///
/// Handlers take the query by value and hand back the extended query, so the
/// operations are recorded in exactly the order the handlers ran. Nothing
/// touches the database until [`FilterQuery::apply_to`] turns the recorded
/// operations into a Sea-ORM [`Select`].
#[derive(Debug, Clone)]
pub struct FilterQuery<C> {
    ops: Vec<QueryOp<C>>,
}

impl<C> Default for FilterQuery<C> {
    fn default() -> Self {
        Self { ops: Vec::new() }
    }
}

impl<C: ColumnTrait> FilterQuery<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn push(mut self, op: QueryOp<C>) -> Self {
        self.ops.push(op);
        self
    }

    #[must_use]
    pub fn filter(self, predicate: Predicate<C>) -> Self {
        self.push(QueryOp::Where(predicate))
    }

    #[must_use]
    pub fn order_by(self, column: C, order: Order) -> Self {
        self.push(QueryOp::OrderBy { column, order })
    }

    #[must_use]
    pub fn include<I, S>(self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(QueryOp::Include(
            relations.into_iter().map(Into::into).collect(),
        ))
    }

    #[must_use]
    pub fn ops(&self) -> &[QueryOp<C>] {
        &self.ops
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate<C>> {
        self.ops.iter().filter_map(|op| match op {
            QueryOp::Where(predicate) => Some(predicate),
            _ => None,
        })
    }

    /// Recorded order clauses as `(column name, direction)`.
    #[must_use]
    pub fn orderings(&self) -> Vec<(&str, Order)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                QueryOp::OrderBy { column, order } => Some((column.as_str(), order.clone())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn has_ordering(&self) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, QueryOp::OrderBy { .. }))
    }

    /// Requested relations, first occurrence wins.
    #[must_use]
    pub fn includes(&self) -> Vec<String> {
        let mut relations: Vec<String> = Vec::new();
        for op in &self.ops {
            if let QueryOp::Include(names) = op {
                for name in names {
                    if !relations.contains(name) {
                        relations.push(name.clone());
                    }
                }
            }
        }
        relations
    }

    /// Apply the recorded predicates (AND-combined) and order clauses to `select`.
    #[must_use]
    pub fn apply_to<E>(&self, select: Select<E>) -> Select<E>
    where
        E: EntityTrait<Column = C>,
    {
        let mut condition = Condition::all();
        let mut select = select;
        for op in &self.ops {
            match op {
                QueryOp::Where(predicate) => {
                    condition = condition.add(predicate.clone().into_expr());
                }
                QueryOp::OrderBy { column, order } => {
                    select = select.order_by(*column, order.clone());
                }
                QueryOp::Include(_) => {}
            }
        }
        if condition.is_empty() {
            select
        } else {
            select.filter(condition)
        }
    }
}

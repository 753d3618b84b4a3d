use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityName, EntityTrait, Iterable, Schema,
    sea_query::{Table, TableCreateStatement},
};

use crate::entities::{audit_log, category, product, user};

/// Columns of `entity` without its foreign key constraints.
fn columns_only<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut stmt = Table::create();
    stmt.table(entity.table_ref());
    for column in E::Column::iter() {
        stmt.col(&mut schema.get_column_def::<E>(column));
    }
    stmt
}

async fn create_table(
    db: &DatabaseConnection,
    table: &str,
    mut stmt: TableCreateStatement,
) -> Result<(), DbErr> {
    stmt.if_not_exists();
    db.execute(db.get_database_backend().build(&stmt)).await?;
    tracing::debug!(table, "table ready");
    Ok(())
}

/// Create every catalog table that does not exist yet.
///
/// Tables are created in foreign key order: users, categories, products,
/// then audit logs. `audit_logs.user_id` carries no constraint: the acting
/// user comes from the auth layer and need not have a `users` row.
///
/// # Errors
///
/// Propagates the first failing `CREATE TABLE`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());
    create_table(
        db,
        user::Entity.table_name(),
        schema.create_table_from_entity(user::Entity),
    )
    .await?;
    create_table(
        db,
        category::Entity.table_name(),
        schema.create_table_from_entity(category::Entity),
    )
    .await?;
    create_table(
        db,
        product::Entity.table_name(),
        schema.create_table_from_entity(product::Entity),
    )
    .await?;
    create_table(
        db,
        audit_log::Entity.table_name(),
        columns_only(&schema, audit_log::Entity),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbBackend;

    #[test]
    fn test_audit_log_table_has_no_foreign_keys() {
        let schema = Schema::new(DbBackend::Sqlite);
        let sql = DbBackend::Sqlite
            .build(&columns_only(&schema, audit_log::Entity))
            .to_string();
        assert!(sql.contains("\"user_id\""));
        assert!(sql.contains("PRIMARY KEY"));
        assert!(!sql.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_product_table_keeps_category_foreign_key() {
        let schema = Schema::new(DbBackend::Sqlite);
        let sql = DbBackend::Sqlite
            .build(&schema.create_table_from_entity(product::Entity))
            .to_string();
        assert!(sql.contains("FOREIGN KEY"));
    }
}

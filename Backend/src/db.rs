// Database connection and schema bootstrap

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::info;

use crate::config::AppConfig;
use crate::models::{
    customer, daily_record, feeding, inventory_movement, lot, mortality_record, movement_history,
    password_reset_tokens, purchase_order, purchase_order_line, rearing_unit, retail_sale,
    retail_sale_line, sales_record, security_question, sequence_counter, supplier, supply,
    supply_category, unit_daily_summary, user_group, users, water_condition, wholesale_order,
    wholesale_order_line,
};

pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(10)
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Creates every table (parents before children) and the composite unique
/// indexes. Safe to call on every start.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    // usuarios
    create_table(db, &schema, security_question::Entity).await?;
    create_table(db, &schema, users::Entity).await?;
    create_table(db, &schema, user_group::Entity).await?;
    create_table(db, &schema, password_reset_tokens::Entity).await?;

    // produccion
    create_table(db, &schema, rearing_unit::Entity).await?;
    create_table(db, &schema, lot::Entity).await?;
    create_table(db, &schema, mortality_record::Entity).await?;
    create_table(db, &schema, movement_history::Entity).await?;
    create_table(db, &schema, daily_record::Entity).await?;
    create_table(db, &schema, feeding::Entity).await?;
    create_table(db, &schema, water_condition::Entity).await?;
    create_table(db, &schema, unit_daily_summary::Entity).await?;
    create_table(db, &schema, sequence_counter::Entity).await?;

    // logistica
    create_table(db, &schema, supplier::Entity).await?;
    create_table(db, &schema, supply_category::Entity).await?;
    create_table(db, &schema, supply::Entity).await?;
    create_table(db, &schema, purchase_order::Entity).await?;
    create_table(db, &schema, purchase_order_line::Entity).await?;
    create_table(db, &schema, inventory_movement::Entity).await?;

    // comercializacion
    create_table(db, &schema, customer::Entity).await?;
    create_table(db, &schema, wholesale_order::Entity).await?;
    create_table(db, &schema, wholesale_order_line::Entity).await?;
    create_table(db, &schema, retail_sale::Entity).await?;
    create_table(db, &schema, retail_sale_line::Entity).await?;
    create_table(db, &schema, sales_record::Entity).await?;

    create_index(
        db,
        Index::create()
            .name("idx_daily_records_lot_date")
            .table(daily_record::Entity)
            .col(daily_record::Column::LotId)
            .col(daily_record::Column::Date)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_unit_daily_summaries_unit_date")
            .table(unit_daily_summary::Entity)
            .col(unit_daily_summary::Column::UnitId)
            .col(unit_daily_summary::Column::Date)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    create_index(
        db,
        Index::create()
            .name("idx_user_groups_user_group")
            .table(user_group::Entity)
            .col(user_group::Column::UserId)
            .col(user_group::Column::Group)
            .unique()
            .if_not_exists()
            .to_owned(),
    )
    .await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

async fn create_index(db: &DatabaseConnection, stmt: IndexCreateStatement) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Fresh in-memory SQLite database with the full schema.
/// A single pooled connection: every handle sees the same memory database.
#[cfg(test)]
pub async fn test_connection() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    create_schema(&db).await.expect("Failed to create schema");
    db
}

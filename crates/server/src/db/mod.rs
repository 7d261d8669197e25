/// 数据库访问层

pub mod models;

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use models::{host, sample, threshold};

/// 建立数据库连接 (SeaORM)
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, anyhow::Error> {
    info!("正在连接数据库: {}", database_url);

    let db = Database::connect(database_url).await?;
    info!("数据库连接成功");

    Ok(db)
}

/// 根据实体定义建表（已存在则跳过）
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, host::Entity).await?;
    create_table(db, sample::Entity).await?;
    create_table(db, threshold::Entity).await?;

    let backend = db.get_database_backend();
    let index = Index::create()
        .name("idx_samples_host_kind_timestamp")
        .table(sample::Entity)
        .col(sample::Column::Host)
        .col(sample::Column::MetricKind)
        .col(sample::Column::Timestamp)
        .if_not_exists()
        .to_owned();
    db.execute(backend.build(&index)).await?;

    info!("数据表结构已就绪");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    Ok(())
}

/// 持久化层错误统一转换为存储错误
pub fn storage_error(e: DbErr) -> common::Error {
    common::Error::Storage(e.to_string())
}

#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");
    init_schema(&db).await.expect("Failed to create schema");
    db
}

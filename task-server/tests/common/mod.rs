#![allow(dead_code)]

use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use task_server::task::{Task, TaskRepository};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};

/// Opens a private in-memory SQLite database with the migrations applied.
pub async fn setup_sqlite_db() -> anyhow::Result<DatabaseConnection> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let mut options = ConnectOptions::new("sqlite::memory:");
    // Every pooled connection would otherwise open its own empty database.
    options.max_connections(1);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let _ = tracing_subscriber::fmt().try_init();
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Stores `count` tasks titled `search task number 00`, `01`, ... with even ones done.
pub async fn create_numbered_tasks(
    db: &DatabaseConnection,
    count: usize,
) -> anyhow::Result<Vec<Task>> {
    let repository = TaskRepository::new(db);
    let mut created = Vec::with_capacity(count);
    for index in 0..count {
        let task = Task::new(format!("search task number {:02}", index))?.with_done(index % 2 == 0);
        created.push(repository.create(&task).await?);
    }
    Ok(created)
}

//! Repository checks against a real PostgreSQL server started in a container.
use task_server::task::{Task, TaskError, TaskRepository, TaskSearch};
use testcontainers_modules::{postgres, testcontainers};

mod common;

pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: sea_orm::DatabaseConnection,
}

async fn setup() -> anyhow::Result<TestContext> {
    let container = common::setup_container().await?;
    let db = common::setup_db(&container).await?;
    Ok(TestContext { db, container })
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn can_create_update_and_delete_on_postgres() {
    let state = setup().await.expect("Failed to setup test context");
    let repository = TaskRepository::new(&state.db);

    let mut task = repository
        .create(&Task::new("postgres task").unwrap())
        .await
        .expect("Failed to create task");
    task.set_done(true);
    let updated = repository.update(&task).await.expect("Failed to update task");
    let id = updated.id().unwrap().to_string();
    repository.delete(&id).await.expect("Failed to delete task");

    assert!(updated.done());
    assert_eq!(repository.find_by_query(&id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn unique_index_reports_duplicate_on_postgres() {
    let state = setup().await.expect("Failed to setup test context");
    let repository = TaskRepository::new(&state.db);
    repository
        .create(&Task::new("unique on postgres").unwrap())
        .await
        .unwrap();
    let mut other = repository
        .create(&Task::new("another").unwrap())
        .await
        .unwrap();

    other.set_title("unique on postgres");
    let result = repository.update(&other).await;

    assert!(matches!(result, Err(TaskError::Duplicate { .. })));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn search_counts_numbered_tasks_on_postgres() {
    let state = setup().await.expect("Failed to setup test context");
    common::create_numbered_tasks(&state.db, 100).await.unwrap();
    let repository = TaskRepository::new(&state.db);

    let done = repository
        .search(&TaskSearch {
            text: "search".to_string(),
            done: Some(true),
            page: 1,
            limit: 10,
        })
        .await
        .unwrap();
    let all = repository
        .search(&TaskSearch {
            text: "search".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(done.total, 50);
    assert_eq!(all.total, 100);
    assert_eq!(all.tasks.len(), 10);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn title_filter_is_literal_on_postgres() {
    let state = setup().await.expect("Failed to setup test context");
    let repository = TaskRepository::new(&state.db);
    for title in ["ABC upper", "abc lower", "a1c", "100% done", "1000 done"] {
        repository.create(&Task::new(title).unwrap()).await.unwrap();
    }
    let titles = |text: &'static str| {
        let repository = &repository;
        async move {
            let search = TaskSearch {
                text: text.to_string(),
                ..TaskSearch::default()
            };
            repository
                .search(&search)
                .await
                .unwrap()
                .tasks
                .iter()
                .map(|task| task.title().to_string())
                .collect::<Vec<_>>()
        }
    };

    assert_eq!(titles("abc").await, vec!["abc lower"]);
    assert!(titles("a_c").await.is_empty());
    assert_eq!(titles("100%").await, vec!["100% done"]);
}

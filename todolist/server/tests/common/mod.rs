use sea_orm::{Database, DatabaseConnection};
use testcontainers_modules::testcontainers::ContainerAsync;
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use todolist_server::todo::SeaOrmTodoRepository;

/// A repository on top of an empty `todo_item` table in a throwaway
/// PostgreSQL container.
pub struct TestContext {
    #[allow(dead_code)] // dropping the container stops the database
    pub container: ContainerAsync<Postgres>,
    #[allow(dead_code)]
    pub db: DatabaseConnection,
    pub repository: SeaOrmTodoRepository,
}

pub async fn setup() -> anyhow::Result<TestContext> {
    let _ = tracing_subscriber::fmt().try_init();

    let container = Postgres::default().start().await?;
    let db_url = format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        container.get_host().await?,
        container.get_host_port_ipv4(5432).await?
    );
    let db = Database::connect(&db_url).await?;

    let repository = SeaOrmTodoRepository::new(db.clone());
    repository.ensure_schema(true).await?;
    Ok(TestContext {
        container,
        db,
        repository,
    })
}

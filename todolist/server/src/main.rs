use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let config = todolist_server::config::Config::from_env()
        .inspect_err(|err| tracing::error!("Failed to load configuration: {}", err))?;
    todolist_server::web::start_web_server(config).await
}

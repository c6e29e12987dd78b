#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = task_server::config::Config::from_env().inspect_err(|err| {
        tracing::error!("Failed to load configuration (is TASK_DB set?): {}", err);
    })?;
    task_server::web::start_web_server(config).await
}

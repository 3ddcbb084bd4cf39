use anyhow::{Context, Result};
use common::database::{health_check, init_pool};
use dinnerclub::{AppConfig, AppState, create_router, database::migrate_schema};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging, RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")?;

    info!("Starting dinnerclub service");
    info!("Loaded configuration: {:?}", config);

    // Initialize database connection pool
    let pool = init_pool(&config.database).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    migrate_schema(&pool).await?;

    let app_state = AppState::new(pool, &config)?;

    // Start the web server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("dinnerclub service listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

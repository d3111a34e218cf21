use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use staffhelp::config::init_config;
use staffhelp::server::database::Database;
use staffhelp::server::handlers::AppState;
use staffhelp::server::routes::build_router;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("staffhelp_server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Fail fast on bad configuration, before opening any pool or socket.
    // A missing DATABASE_URL lands here.
    let config = init_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    let app = build_router(AppState { db });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

use placement_backend::{
    config::{get_config, init_config, LogFormat},
    database::pool::{create_pool, run_migrations},
    middleware::cors::cors_layer,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_format);

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool, config)?;

    tokio::fs::create_dir_all(&config.uploads_dir).await?;
    info!("Serving uploads from: {}", config.uploads_dir);

    let app = routes::api_router(app_state)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Social feed web server

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use social_feed::{app_state::AppState, config::Config, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("social_feed=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config.clone()).await?;
    let app = handlers::router(app_state);

    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Social feed listening on http://{}", addr);
    info!("Media served from {} under /media", config.media.root);

    axum::serve(listener, app).await?;

    Ok(())
}

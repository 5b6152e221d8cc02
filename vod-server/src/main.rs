use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vod_server::config::{Args, Config};
use vod_server::indexer::spawn_index_worker;
use vod_server::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vod_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = std::sync::Arc::new(Config::load(&args)?);
    info!(
        "media dir {}, index dir {}, fragment duration {}s",
        config.media_dir.display(),
        config.index_dir.display(),
        config.fragment_duration
    );

    let (index_sink, _worker) = spawn_index_worker(config.clone());
    let state = AppState {
        config: config.clone(),
        index_sink,
    };

    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!("listening on {}", config.listen);
    axum::serve(listener, app).await?;
    Ok(())
}

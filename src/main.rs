use std::time::Duration;

use chrono::Utc;
use tokio::task;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{config::Config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(environment = %config.app.environment, "Starting cinema booking engine");

    let state = AppState::new(config.clone()).await?;

    // --- Start background tasks ---

    // Rebuild the upcoming-shows listing so readers rarely hit the database
    let refresher = state.clone();
    let every = Duration::from_secs(config.redis.refresh_interval_secs.max(1));
    task::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            refresher.refresh_upcoming().await;
        }
    });

    let listing = state.upcoming_available_shows(Utc::now()).await?;
    info!("{} upcoming shows with free seats", listing.len());
    for entry in &listing {
        info!(
            show_id = entry.show.id,
            movie = %entry.movie_title,
            showroom = %entry.showroom_name,
            start = %entry.show.start_time,
            free_seats = entry.available_seats,
            "upcoming show"
        );
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    state.db.pool.close().await;
    Ok(())
}

use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use easyrent::{app, config, db, paths};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "easyrent=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = config::load().expect("Failed to load configuration");

  let db_path = paths::app_db_path();
  let pool = db::init_db(Path::new(&db_path)).expect("Failed to initialize database");

  {
    let conn = db::try_lock(&pool).expect("Database lock failed during startup");
    match easyrent::session::cleanup_expired_sessions(&conn) {
      Ok(n) if n > 0 => tracing::info!("Removed {} expired sessions", n),
      Ok(_) => {}
      Err(e) => tracing::warn!("Failed to clean up expired sessions: {}", e),
    }
  }

  let state = app::build_state(&config, pool).expect("Failed to initialize application state");
  let router = app::router_with_config(state, &config);

  let bind_addr = config.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://{}", bind_addr);

  axum::serve(listener, router)
    .await
    .expect("Server failed to start");
}

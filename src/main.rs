mod access;
mod app;
mod auth;
mod config;
mod error;
mod matches;
mod predictions;
mod state;
#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "matchday=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if let Err(e) = sqlx::migrate!("./migrations").run(&app_state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    if let Some(seed) = app_state.config.admin.as_ref() {
        match auth::services::seed_admin(&app_state.db, seed).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::debug!("users present; admin bootstrap skipped"),
            Err(e) => tracing::warn!(error = %e, "admin bootstrap failed"),
        }
    }

    app::serve(app::build_app(app_state)).await
}

mod activity;
mod admin;
mod app;
mod auth;
mod cache;
mod config;
mod error;
mod favorites;
mod fridges;
mod home;
mod images;
mod ingredients;
mod pagination;
mod profile;
mod ratings;
mod recipes;
mod reports;
mod search;
mod state;
mod storage;
mod tags;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "foodvault=debug,axum=info,tower_http=info".to_string());
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

    sqlx::migrate!("./migrations").run(&app_state.db).await?;
    auth::seed::ensure_admin(&app_state.db, &app_state.config.admin).await?;

    app::serve(app::build_app(app_state)).await
}

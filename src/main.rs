use hostel_server::clock::Clock;
use hostel_server::config::Config;
use hostel_server::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let pool = db::prepare_database(&config).await?;
    let app = hostel_server::app(pool, config.attendance, Clock::system());

    log::info!(
        "Starting hostel HTTP server on http://{} (attendance window: {:?})",
        config.bind_addr,
        config.attendance.window
    );
    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::prelude::*;

use medstock::cli::{Cli, Commands, DbCommands, ExpiryCommands};
use medstock::config::Config;
use medstock::forecast::HttpForecaster;
use medstock::gateway::RazorpayClient;
use medstock::notify::TracingNotifier;
use medstock::services::scheduler::run_expiry_sweeper;
use medstock::{AppState, cli, create_app, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let args = Cli::parse();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Expiry(ExpiryCommands::Sweep) => cli::handle_expiry_sweep(&config).await,
        Commands::Config => cli::handle_config_validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = RazorpayClient::new(
        config.razorpay_api_url.clone(),
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
        config.gateway_timeout_secs,
    );
    let forecaster = HttpForecaster::new(config.forecast_url.clone(), config.gateway_timeout_secs);

    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
        gateway: Arc::new(gateway),
        notifier: Arc::new(TracingNotifier),
        forecaster: Arc::new(forecaster),
    };

    // Background expiry sweep on the configured cron schedule.
    let sweeper_pool = pool.clone();
    let schedule = config.expiry_sweep_schedule.clone();
    tokio::spawn(async move {
        run_expiry_sweeper(sweeper_pool, &schedule).await;
    });

    let app = create_app(state).layer(cors_layer(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

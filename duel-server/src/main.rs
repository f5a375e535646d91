use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duel_core::RoomEngine;
use duel_persistence::Storage;
use duel_server::{
    auth::AuthService, config::Config, create_routes, room_service::RoomService,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Digit Duel server...");

    let config = Config::new();

    // Initialize database connection and run migrations
    let storage = match Storage::connect(&config.database_url).await {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let auth_service = match AuthService::from_config(&config) {
        Ok(auth) => {
            if auth.is_dev_mode() {
                info!("Starting in development authentication mode - token verification disabled");
            }
            Arc::new(auth)
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let room_service = Arc::new(RoomService::new(
        storage,
        RoomEngine::new(config.turn_clock()),
        config.sweeper(),
    ));

    let routes = create_routes(room_service.clone(), auth_service);

    // Start cleanup task
    if let Some(period) = config.cleanup_interval() {
        let cleanup_service = room_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = cleanup_service.cleanup_rooms().await {
                    tracing::error!("Room cleanup failed: {}", e);
                }
            }
        });
    } else {
        info!("Built-in room cleanup disabled; expecting external calls to /cleanup-rooms");
    }

    info!("Server starting on {}:{}", config.host, config.port);

    let host = match config.host.parse::<std::net::IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            tracing::error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((host, config.port), async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
                .expect("Failed to install SIGINT handler");
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler");

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

//! pickban-server: runs a draft coordinator configured from `PICKBAN_*`
//! environment variables.
//!
//! Logging follows `RUST_LOG` (default `info`).

mod settings;

use std::process::ExitCode;

use pickban::PickbanServer;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let bind_addr = settings.bind_addr();
    tracing::info!(
        %bind_addr,
        origins = ?settings.allowed_origins,
        grace_secs = settings.hub.session.reconnect_grace.as_secs(),
        game_secs = settings.hub.game_duration.as_secs(),
        vote_secs = settings.hub.voting_window.as_secs(),
        "starting pickban server"
    );

    let server = match PickbanServer::builder()
        .bind(&bind_addr)
        .allowed_origins(settings.allowed_origins)
        .hub_config(settings.hub)
        .build()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(%bind_addr, error = %e, "failed to start");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server stopped");
                return ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }
    ExitCode::SUCCESS
}

/// Shows what the client logs at each filter level while it signs in and
/// refreshes an expired token against the in-process fake backend.
///
/// $ cargo run --bin logger_demo
/// $ RUST_LOG=gymtrack=trace cargo run --bin logger_demo
use gymtrack::application_port::*;
use gymtrack::client::Client;
use gymtrack::infra_http::{DEMO_EMAIL, DEMO_PASSWORD, FakeGymBackend};
use gymtrack::infra_storage::MemoryKvStore;
use gymtrack::logger::*;
use gymtrack::settings::parse_settings;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Only warnings until the settings say otherwise.
    let logger = Logger::new_bootstrap();
    info!("not shown with the bootstrap filter");

    let settings = parse_settings(None)?;
    logger.reload_from_config(&LogConfig::from(&settings.log))?;
    info!(filter = %settings.log.filter, "filter reloaded from settings");

    let backend = Arc::new(FakeGymBackend::new(settings.api.base_url.clone()));
    let client = Client::with_parts(backend.clone(), Arc::new(MemoryKvStore::new())).await?;
    client
        .session_service
        .sign_in(SignInInput {
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
        })
        .await?;

    // Refresh start and settle are logged at info, queueing at debug.
    backend.expire_access_tokens();
    client.workout_service.groups().await?;

    // A terminal 401 is logged at warn.
    backend.expire_access_tokens();
    backend.revoke_refresh_tokens();
    if let Err(e) = client.workout_service.history().await {
        error!(error = %e, "history failed");
    }
    client.shutdown().await;

    let bad = LogConfig {
        filter: "gymtrack=loud".to_string(),
    };
    if let Err(e) = logger.reload_from_config(&bad) {
        warn!("rejected filter, keeping {}: {}", settings.log.filter, e);
    }

    Ok(())
}

/// Drives the in-process fake backend through an access token expiry while
/// several requests are in flight, then through a failed refresh.
///
/// $ cargo run --bin refresh_demo
use futures_util::future::join_all;
use gymtrack::application_port::*;
use gymtrack::client::Client;
use gymtrack::domain_port::{HttpTransport, KvStore};
use gymtrack::infra_http::{DEMO_EMAIL, DEMO_PASSWORD, FakeGymBackend};
use gymtrack::infra_storage::MemoryKvStore;
use gymtrack::logger::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "gymtrack=debug".to_string(),
    })?;

    let backend = Arc::new(
        FakeGymBackend::new("http://fake.gymtrack.local").with_latency(Duration::from_millis(50)),
    );
    let transport: Arc<dyn HttpTransport> = backend.clone();
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let client = Client::with_parts(transport, store).await?;

    let user = client
        .session_service
        .sign_in(SignInInput {
            email: DEMO_EMAIL.to_string(),
            password: DEMO_PASSWORD.to_string(),
        })
        .await?;
    println!("signed in as {}", user.name);

    // region concurrent expiry

    backend.expire_access_tokens();
    let groups = ["back", "biceps", "triceps", "legs", "shoulders"];
    let results = join_all(
        groups
            .iter()
            .map(|group| client.workout_service.exercises_by_group(group)),
    )
    .await;
    for (group, result) in groups.iter().zip(results) {
        match result {
            Ok(exercises) => println!("{:<10} {} exercise(s)", group, exercises.len()),
            Err(e) => println!("{:<10} failed: {}", group, e),
        }
    }
    println!("refresh calls after expiry: {}", backend.refresh_calls());

    // endregion

    // region failed refresh

    backend.expire_access_tokens();
    backend.revoke_refresh_tokens();
    let results = join_all((0..3).map(|_| client.workout_service.history())).await;
    for result in results {
        if let Err(e) = result {
            println!("history failed: {}", e);
        }
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
    println!(
        "signed in after failed refresh: {}",
        client.session_service.current_user().is_some()
    );

    // endregion

    println!("backend saw:");
    for request in backend.requests() {
        println!("  {}", request);
    }

    client.shutdown().await;
    Ok(())
}

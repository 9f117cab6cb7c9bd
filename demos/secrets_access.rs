//! # Example: secrets_access
//!
//! Wires the leadership and secrets leaves into an engine and asks the
//! authorizer who may manage and read a secret.
//!
//! ```text
//! leadership ──► secrets ──► audit
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example secrets_access
//! ```

use std::sync::Arc;

use depvisor::lease::{LeadershipTracker, leadership_manifold};
use depvisor::secrets::{InMemoryGrants, Role, SecretsAuthority, Tag, secrets_manifold};
use depvisor::{Context, Engine, EngineConfig, Manifold, WorkerError, WorkerFn};

const URI: &str = "secret:db-password";

fn audit() -> Manifold {
    Manifold::new(|ctx: Context| async move {
        let authority: SecretsAuthority = ctx.get("secrets")?;

        for unit in ["mysql/0", "mysql/1", "wordpress/0"] {
            let auth = authority.authorizer(Tag::unit(unit));
            let manage = match auth.can_manage(URI) {
                Ok(_) => "yes".to_string(),
                Err(err) => format!("no ({err})"),
            };
            let read = auth.can_read(URI, auth.caller());
            println!("[audit] {unit}: manage={manage} read={read}");
        }

        Ok::<_, WorkerError>(WorkerFn::spawn(|stop| async move {
            stop.cancelled().await;
            Ok(())
        }))
    })
    .with_inputs(["secrets"])
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tracker = LeadershipTracker::new();
    tracker.claim("mysql", "mysql/0");

    let grants = Arc::new(InMemoryGrants::new());
    grants.grant(URI, Tag::application("mysql"), Role::Manage);
    grants.grant(URI, Tag::unit("wordpress/0"), Role::View);

    let engine = Engine::new(EngineConfig::default())?;
    engine
        .install("leadership", leadership_manifold(tracker))
        .await?;
    engine
        .install("secrets", secrets_manifold("leadership", grants))
        .await?;
    engine.install("audit", audit()).await?;

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    engine.kill();
    engine.wait().await?;
    Ok(())
}

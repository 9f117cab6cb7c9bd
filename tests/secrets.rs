mod common;

use std::sync::Arc;

use common::{fast_config, running, wait_for};
use depvisor::lease::{LeaseError, LeadershipTracker, leadership_manifold};
use depvisor::secrets::{
    InMemoryGrants, Role, SecretAccess, SecretsAuthority, SecretsError, Tag, secrets_manifold,
};
use depvisor::{Context, Engine, Manifold, ValueWorker, WorkerError};
use tokio::sync::mpsc;

const URI: &str = "secret:db-password";

async fn authority_from_engine(
    tracker: LeadershipTracker,
    grants: Arc<InMemoryGrants>,
) -> (Engine, SecretsAuthority) {
    let engine = Engine::new(fast_config()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    engine
        .install("leadership", leadership_manifold(tracker))
        .await
        .unwrap();
    engine
        .install(
            "secrets",
            secrets_manifold("leadership", grants as Arc<dyn SecretAccess>),
        )
        .await
        .unwrap();
    engine
        .install(
            "consumer",
            Manifold::new(move |ctx: Context| {
                let tx = tx.clone();
                async move {
                    let authority: SecretsAuthority = ctx.get("secrets")?;
                    let _ = tx.send(authority);
                    Ok::<_, WorkerError>(ValueWorker::new(()))
                }
            })
            .with_inputs(["secrets"]),
        )
        .await
        .unwrap();

    wait_for(&engine, "consumer running", running("consumer")).await;
    let authority = rx.recv().await.unwrap();
    (engine, authority)
}

#[tokio::test]
async fn leader_unit_manages_application_secret() {
    let tracker = LeadershipTracker::new();
    let grants = Arc::new(InMemoryGrants::new());
    grants.grant(URI, Tag::application("mysql"), Role::Manage);
    tracker.claim("mysql", "mysql/0");

    let (engine, authority) = authority_from_engine(tracker.clone(), grants).await;

    let leader = authority.authorizer(Tag::unit("mysql/0"));
    let token = leader.can_manage(URI).unwrap();
    assert!(token.check(0, None).is_ok());

    let follower = authority.authorizer(Tag::unit("mysql/1"));
    assert!(matches!(
        follower.can_manage(URI),
        Err(SecretsError::Lease(LeaseError::NotLeader { .. }))
    ));

    // Leadership moves: the old token no longer passes, the new leader's does.
    tracker.claim("mysql", "mysql/1");
    assert!(token.check(1, None).is_err());
    assert!(follower.can_manage(URI).unwrap().check(0, None).is_ok());

    engine.kill();
    engine.wait().await.unwrap();
}

#[tokio::test]
async fn read_access_follows_grants() {
    let tracker = LeadershipTracker::new();
    let grants = Arc::new(InMemoryGrants::new());
    grants.grant(URI, Tag::unit("wordpress/0"), Role::View);
    grants.grant(URI, Tag::application("mysql"), Role::Manage);

    let (engine, authority) = authority_from_engine(tracker, Arc::clone(&grants)).await;
    let auth = authority.authorizer(Tag::unit("wordpress/0"));

    assert!(auth.can_read(URI, &Tag::unit("wordpress/0")));
    assert!(auth.can_read(URI, &Tag::unit("mysql/2")));
    assert!(!auth.can_read(URI, &Tag::unit("wordpress/1")));
    assert!(matches!(
        auth.can_manage(URI),
        Err(SecretsError::PermissionDenied)
    ));

    grants.revoke(URI, &Tag::unit("wordpress/0"));
    assert!(!auth.can_read(URI, &Tag::unit("wordpress/0")));

    engine.kill();
    engine.wait().await.unwrap();
}

#[tokio::test]
async fn secrets_can_only_be_owned_within_own_application() {
    let tracker = LeadershipTracker::new();
    tracker.claim("mysql", "mysql/0");
    let (engine, authority) =
        authority_from_engine(tracker, Arc::new(InMemoryGrants::new())).await;

    let leader = authority.authorizer(Tag::unit("mysql/0"));
    assert!(leader.owner_token(&Tag::application("mysql")).is_ok());
    assert!(leader.owner_token(&Tag::unit("mysql/0")).is_ok());
    assert!(matches!(
        leader.owner_token(&Tag::application("wordpress")),
        Err(SecretsError::PermissionDenied)
    ));

    let follower = authority.authorizer(Tag::unit("mysql/1"));
    assert!(follower.owner_token(&Tag::unit("mysql/1")).is_ok());
    assert!(follower.owner_token(&Tag::application("mysql")).is_err());

    engine.kill();
    engine.wait().await.unwrap();
}

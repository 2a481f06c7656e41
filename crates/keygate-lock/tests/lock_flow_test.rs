//! End-to-end tests for the session-lock flow: startup verification,
//! periodic and foreground re-verification, fatal unlock handling, and
//! durable logout.

use keygate_core::{UserId, UserMeta};
use keygate_lock::{
    persist_credentials, AppLifecycle, HostExit, LifecycleEvents, LockController,
};
use keygate_secrets::{AccessPolicy, MemoryStore, PromptOutcome, SecretStore};
use keygate_session::Session;
use secrecy::SecretString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct CountingExit(AtomicUsize);

impl HostExit for CountingExit {
    fn request_exit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    controller: Arc<LockController>,
    session: Session,
    host: Arc<CountingExit>,
    events: LifecycleEvents,
}

fn harness(store: Arc<MemoryStore>, interval: Option<Duration>) -> Harness {
    let session = Session::new();
    let host = Arc::new(CountingExit::default());
    let events = LifecycleEvents::new();
    let controller = Arc::new(LockController::new(
        session.clone(),
        store,
        host.clone(),
        events.subscribe_lifecycle(),
        interval,
    ));
    Harness {
        controller,
        session,
        host,
        events,
    }
}

async fn enroll_alice(store: &MemoryStore) {
    let meta = UserMeta {
        id: Some(UserId::Num(7)),
        username: Some("alice".to_string()),
        name: Some("Alice".to_string()),
        email: None,
        image: None,
    };
    persist_credentials(store, "alice", "tok123", &meta)
        .await
        .expect("enroll");
}

fn login_alice(session: &Session) {
    session.login(keygate_core::UserProfile::new(
        Some(UserId::Num(7)),
        Some("Alice".to_string()),
        Some("alice".to_string()),
        SecretString::from("tok123"),
    ));
}

// Scenario A: no stored credential at startup.
#[tokio::test]
async fn startup_without_credential_stays_unauthenticated() {
    let store = Arc::new(MemoryStore::new());
    let h = harness(store.clone(), None);

    h.controller.startup().await;

    let flags = h.controller.flags();
    assert!(!flags.checking_auth);
    assert!(!flags.is_locked);
    assert!(!h.session.is_authenticated());
    // No prompt was shown.
    assert_eq!(store.prompt_count(), 0);
    assert_eq!(h.host.0.load(Ordering::SeqCst), 0);
}

// Scenario B: stored credential unlocks and merges with metadata.
#[tokio::test]
async fn startup_unlock_merges_metadata() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), None);

    h.controller.startup().await;

    assert!(h.session.is_authenticated());
    let state = h.session.snapshot();
    let user = state.user().expect("user present");
    assert_eq!(user.id, Some(UserId::Num(7)));
    assert_eq!(user.name.as_deref(), Some("Alice"));
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert_eq!(user.expose_token(), "tok123");

    let flags = h.controller.flags();
    assert!(!flags.checking_auth);
    assert!(!flags.is_locked);
    // One verification, one prompt.
    assert_eq!(store.prompt_count(), 1);
    assert!(h.controller.last_verified().is_some());
}

// Scenario C: declined unlock requests termination exactly once and
// never falls through to an unauthenticated screen.
#[tokio::test]
async fn startup_unlock_failure_requests_exit_once() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    store.script_prompt(PromptOutcome::Deny);
    let h = harness(store.clone(), None);

    h.controller.startup().await;

    assert_eq!(h.host.0.load(Ordering::SeqCst), 1);
    assert!(!h.session.is_authenticated());
    let flags = h.controller.flags();
    // Cleanup ran, but the UI stays blocked for whatever instants remain.
    assert!(!flags.checking_auth);
    assert!(flags.is_locked);
}

// Scenario D: a trigger arriving while a verification is in flight is
// dropped — exactly one store read for the pair.
#[tokio::test]
async fn concurrent_triggers_run_one_verification() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    store.set_prompt_delay(Duration::from_millis(50));
    let h = harness(store.clone(), None);
    login_alice(&h.session);

    tokio::join!(h.controller.verify(), h.controller.verify());

    assert_eq!(store.prompt_count(), 1);
    assert!(!h.controller.flags().is_locked);
}

// Scenario E: malformed metadata degrades the profile, never the unlock.
#[tokio::test]
async fn startup_with_malformed_metadata_degrades_profile() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            "service_key",
            "alice",
            "tok123",
            AccessPolicy::BiometricOrPasscode,
        )
        .await
        .expect("set");
    store
        .set("user_meta", "alice", "{definitely not json", AccessPolicy::Open)
        .await
        .expect("set");
    let h = harness(store.clone(), None);

    h.controller.startup().await;

    assert!(h.session.is_authenticated());
    let state = h.session.snapshot();
    let user = state.user().expect("user present");
    assert!(user.id.is_none());
    assert!(user.name.is_none());
    assert_eq!(user.username.as_deref(), Some("alice"));
    assert_eq!(user.expose_token(), "tok123");
    assert_eq!(h.host.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn logout_is_durable_and_idempotent() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), None);
    h.controller.startup().await;
    assert!(h.session.is_authenticated());

    h.controller.logout().await.expect("first logout");
    assert!(!h.session.is_authenticated());
    assert!(h.session.snapshot().user().is_none());
    assert!(!store.has("service_key").await.expect("has"));
    assert!(!store.has("user_meta").await.expect("has"));
    assert!(!store.has("background_token").await.expect("has"));

    // Second call is a no-op that raises no error.
    h.controller.logout().await.expect("second logout");
    assert!(!h.session.is_authenticated());
}

#[tokio::test]
async fn lock_flag_blocks_ui_while_verification_in_flight() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    store.set_prompt_delay(Duration::from_millis(50));
    let h = harness(store.clone(), None);
    login_alice(&h.session);

    let controller = h.controller.clone();
    let task = tokio::spawn(async move { controller.verify().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Authenticated but locked: the UI must show only the loading view.
    assert!(h.session.is_authenticated());
    assert!(h.controller.flags().is_locked);

    task.await.expect("verify task");
    assert!(!h.controller.flags().is_locked);
}

#[tokio::test(start_paused = true)]
async fn periodic_timer_reverifies_and_releases_on_logout() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), Some(Duration::from_secs(10)));

    h.controller.startup().await;
    assert_eq!(store.prompt_count(), 1);

    let cancel = CancellationToken::new();
    let controller = h.controller.clone();
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { controller.run(run_cancel).await });

    // First periodic tick lands at +10s.
    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(store.prompt_count(), 2);

    h.controller.logout().await.expect("logout");
    tokio::time::sleep(Duration::from_secs(30)).await;
    // Timer released with the session; no further reads, no exit request.
    assert_eq!(store.prompt_count(), 2);
    assert_eq!(h.host.0.load(Ordering::SeqCst), 0);

    cancel.cancel();
    run.await.expect("run task");
}

#[tokio::test(start_paused = true)]
async fn foreground_transition_triggers_reverification() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), None);

    h.controller.startup().await;
    assert_eq!(store.prompt_count(), 1);

    let cancel = CancellationToken::new();
    let controller = h.controller.clone();
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { controller.run(run_cancel).await });
    tokio::time::sleep(Duration::from_millis(1)).await;

    // Going to the background alone does not re-verify.
    h.events.set_lifecycle(AppLifecycle::Background);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.prompt_count(), 1);

    // Returning to the foreground does.
    h.events.set_lifecycle(AppLifecycle::Active);
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(store.prompt_count(), 2);
    assert!(!h.controller.flags().is_locked);

    cancel.cancel();
    run.await.expect("run task");
}

#[tokio::test(start_paused = true)]
async fn foreground_trigger_during_inflight_verification_is_dropped() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), Some(Duration::from_secs(10)));

    h.controller.startup().await;
    assert_eq!(store.prompt_count(), 1);
    store.set_prompt_delay(Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let controller = h.controller.clone();
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { controller.run(run_cancel).await });

    // Let the periodic tick open its prompt, then bounce through the
    // background and back while the prompt is still up.
    tokio::time::sleep(Duration::from_millis(10_020)).await;
    h.events.set_lifecycle(AppLifecycle::Background);
    h.events.set_lifecycle(AppLifecycle::Active);

    // The transition landed mid-check; once that check resolves, no
    // second prompt follows.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(store.prompt_count(), 2);
    assert!(!h.controller.flags().is_locked);

    cancel.cancel();
    run.await.expect("run task");
}

#[tokio::test(start_paused = true)]
async fn periodic_unlock_failure_requests_exit() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), Some(Duration::from_secs(10)));

    h.controller.startup().await;
    store.script_prompt(PromptOutcome::Deny);

    let cancel = CancellationToken::new();
    let controller = h.controller.clone();
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { controller.run(run_cancel).await });

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(h.host.0.load(Ordering::SeqCst), 1);
    // Session state is left as it was before the failed check.
    assert!(h.session.is_authenticated());
    assert!(h.controller.flags().is_locked);

    cancel.cancel();
    run.await.expect("run task");
}

#[tokio::test]
async fn unauthenticated_foreground_transition_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    enroll_alice(&store).await;
    let h = harness(store.clone(), None);
    // No startup, session unauthenticated.

    let cancel = CancellationToken::new();
    let controller = h.controller.clone();
    let run_cancel = cancel.clone();
    let run = tokio::spawn(async move { controller.run(run_cancel).await });
    tokio::time::sleep(Duration::from_millis(5)).await;

    h.events.set_lifecycle(AppLifecycle::Background);
    h.events.set_lifecycle(AppLifecycle::Active);
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(store.prompt_count(), 0);

    cancel.cancel();
    run.await.expect("run task");
}

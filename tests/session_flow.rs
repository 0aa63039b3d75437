mod common;

use std::sync::Arc;
use std::time::Duration;

use limva::credits::{Credits, Feature};
use limva::session::{IdentityProvider, Readiness, RegisterData, RegisterError};
use limva::stats::SystemStats;
use limva::store::DocumentBackend;

use common::{secret, Harness, STUDENT, STUDENT_SECRET};

fn registration(email: &str, password: &str) -> RegisterData {
    RegisterData {
        email: email.to_string(),
        secret: secret(password),
        full_name: "Nguyễn Văn An".to_string(),
    }
}

#[tokio::test]
async fn register_seeds_credits_and_stats() {
    let harness = Harness::new();

    let identity = harness
        .session
        .register(registration(STUDENT, STUDENT_SECRET))
        .await
        .unwrap();

    assert_eq!(identity.display_name.as_deref(), Some("Nguyễn Văn An"));
    assert!(harness.session.is_authenticated());
    assert_eq!(harness.session.credits(), Credits::uniform(30));
    assert!(harness.remote.record(&identity.uid).await.is_some());

    let stats = harness.session.stats().system_stats().await;
    assert_eq!(
        stats.students_registered,
        SystemStats::default().students_registered + 1
    );
}

#[tokio::test]
async fn register_reports_localized_errors() {
    let harness = Harness::new();
    harness.add_student();

    assert_eq!(
        harness
            .session
            .register(registration("khong-hop-le", STUDENT_SECRET))
            .await,
        Err(RegisterError::InvalidEmail)
    );
    assert_eq!(
        harness
            .session
            .register(registration(STUDENT, STUDENT_SECRET))
            .await,
        Err(RegisterError::EmailInUse)
    );
    assert_eq!(
        harness
            .session
            .register(registration("moi@limva.edu.vn", "123"))
            .await,
        Err(RegisterError::WeakSecret)
    );
    assert_eq!(
        RegisterError::WeakSecret.to_string(),
        "Mật khẩu phải có ít nhất 6 ký tự."
    );
    assert!(!harness.session.is_authenticated());
}

#[tokio::test]
async fn stats_fall_back_to_defaults_when_remote_fails() {
    let harness = Harness::new();

    let identity = harness
        .session
        .register(registration(STUDENT, STUDENT_SECRET))
        .await
        .unwrap();

    harness.remote.set_failing(true);
    assert_eq!(
        harness.session.stats().system_stats().await,
        SystemStats::default()
    );
    assert!(harness.session.state().identity().is_some_and(|i| i.uid == identity.uid));
}

#[tokio::test]
async fn logout_clears_identity_and_credits() {
    let harness = Harness::new();
    harness.login_student().await;
    assert!(harness.session.consume_credit(Feature::Grader).await);

    harness.session.logout().await;

    assert!(!harness.session.is_authenticated());
    assert_eq!(harness.session.credits(), Credits::zero());
    assert_eq!(harness.session.state().readiness(), Readiness::SignedOut);
    assert!(harness.provider.current().is_none());
    assert!(!harness.session.consume_credit(Feature::Grader).await);
}

#[tokio::test]
async fn require_authenticated_raises_login_prompt() {
    let harness = Harness::new();

    assert!(!harness.session.require_authenticated());
    assert!(harness.session.state().login_prompt());

    harness.login_student().await;
    assert!(!harness.session.state().login_prompt());
    assert!(harness.session.require_authenticated());
}

#[tokio::test]
async fn watcher_applies_provider_changes_once() {
    let harness = Harness::new();
    harness.add_student();
    let session = Arc::new(harness.session);
    let watcher = session.watch_identity();

    let mut readiness = session.state().subscribe_readiness();

    // Sign in through the provider directly, as a restored browser session would.
    let identity = harness
        .provider
        .verify_credential(STUDENT, &secret(STUDENT_SECRET))
        .await
        .unwrap();

    tokio::time::timeout(
        Duration::from_secs(2),
        readiness.wait_for(|state| *state == Readiness::Ready),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(session.credits(), Credits::uniform(30));

    assert!(session.consume_credit(Feature::Generator).await);

    // A repeated notification for the same identity must not re-resolve.
    harness
        .provider
        .update_display_name(&identity, "An")
        .await
        .unwrap();
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(session.credits().generator, 29);
    assert_eq!(
        session
            .state()
            .identity()
            .and_then(|i| i.display_name),
        Some("An".to_string())
    );

    harness.provider.sign_out().await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(2),
        readiness.wait_for(|state| *state == Readiness::SignedOut),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!session.is_authenticated());

    watcher.abort();
}

#[tokio::test]
async fn debit_reaches_remote_document() {
    let harness = Harness::new();
    let uid = harness.login_student().await;

    assert!(harness.session.consume_credit(Feature::Generator).await);

    let document = harness.remote.inner.get("users", &uid).await.unwrap().unwrap();
    assert_eq!(
        document.fields.get("generator"),
        Some(&serde_json::Value::from(29))
    );
}

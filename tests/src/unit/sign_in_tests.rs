use super::support::{anon_work, is_new_design_name, project, Harness};
use anyhow::anyhow;
use atelier_core::{ChatMessage, CredentialMode, CredentialResult};

const EMAIL: &str = "user@example.com";
const PASSWORD: &str = "password123";

#[tokio::test]
async fn forwards_credentials_to_the_exchange() {
    let harness = Harness::new(
        Ok(CredentialResult::failed("Invalid credentials")),
        None,
        Vec::new(),
        "unused",
    );
    harness.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    let calls = harness.exchange.calls.lock().clone();
    assert_eq!(
        calls,
        vec![(CredentialMode::SignIn, EMAIL.to_string(), PASSWORD.to_string())]
    );
}

#[tokio::test]
async fn rejected_credentials_skip_reconciliation() {
    let expected = CredentialResult::failed("Invalid credentials");
    let harness = Harness::new(
        Ok(expected.clone()),
        Some(anon_work("hello", &[("/App.jsx", "code")])),
        vec![project("proj-1")],
        "unused",
    );

    let result = harness.controller.sign_in(EMAIL, "wrong").await.unwrap();

    assert_eq!(result, expected);
    assert!(harness.log.entries().is_empty());
    assert!(harness.anon_record().is_some());
    assert!(!harness.controller.state().is_loading);
}

#[tokio::test]
async fn loading_flag_spans_the_exchange() {
    let harness = Harness::new(
        Ok(CredentialResult::failed("Invalid credentials")),
        None,
        Vec::new(),
        "unused",
    );
    assert!(!harness.controller.state().is_loading);

    let mut call = Box::pin(harness.controller.sign_in(EMAIL, PASSWORD));
    assert!(futures::poll!(&mut call).is_pending());
    assert!(harness.controller.state().is_loading);

    call.await.unwrap();
    assert!(!harness.controller.state().is_loading);
}

#[tokio::test]
async fn exchange_error_resets_loading_and_propagates() {
    let harness = Harness::new(Err(anyhow!("Network error")), None, Vec::new(), "unused");

    let err = harness
        .controller
        .sign_in(EMAIL, PASSWORD)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Network error");
    assert!(!harness.controller.state().is_loading);
    assert!(harness.log.entries().is_empty());
}

#[tokio::test]
async fn migrates_anonymous_work() {
    let harness = Harness::new(
        Ok(CredentialResult::succeeded()),
        Some(anon_work("hello", &[("/App.jsx", "code")])),
        vec![project("proj-existing")],
        "proj-123",
    );

    let result = harness.controller.sign_in(EMAIL, PASSWORD).await.unwrap();
    assert_eq!(result, CredentialResult::succeeded());

    let created = harness.created();
    assert_eq!(created.len(), 1);
    assert!(created[0].name.contains("Design from"));
    assert_eq!(created[0].messages, vec![ChatMessage::user("hello")]);
    assert_eq!(
        created[0].data.get("/App.jsx").map(String::as_str),
        Some("code")
    );
    assert_eq!(created[0].data.len(), 1);

    assert_eq!(
        harness.log.entries(),
        vec!["anon.read", "projects.create", "anon.clear", "navigate:/proj-123"]
    );
    assert!(harness.anon_record().is_none());
}

#[tokio::test]
async fn redirects_to_most_recent_project() {
    let harness = Harness::new(
        Ok(CredentialResult::succeeded()),
        None,
        vec![project("proj-recent"), project("proj-old")],
        "unused",
    );

    harness.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(harness.navigations(), vec!["/proj-recent"]);
    assert!(harness.created().is_empty());
    assert_eq!(harness.log.count("anon.clear"), 0);
}

#[tokio::test]
async fn creates_a_project_when_nothing_exists() {
    let harness = Harness::new(Ok(CredentialResult::succeeded()), None, Vec::new(), "new-proj");

    harness.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    let created = harness.created();
    assert_eq!(created.len(), 1);
    assert!(is_new_design_name(&created[0].name), "{}", created[0].name);
    assert!(created[0].messages.is_empty());
    assert!(created[0].data.is_empty());
    assert_eq!(
        harness.log.entries(),
        vec!["anon.read", "projects.list", "projects.create", "navigate:/new-proj"]
    );
}

#[tokio::test]
async fn anon_work_without_messages_is_ignored() {
    let harness = Harness::new(
        Ok(CredentialResult::succeeded()),
        Some(anon_work("", &[("/App.jsx", "code")])),
        vec![project("proj-1")],
        "unused",
    );

    harness.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(harness.log.count("anon.clear"), 0);
    assert!(harness.created().is_empty());
    assert_eq!(harness.navigations(), vec!["/proj-1"]);
    assert!(harness.anon_record().is_some());
}

#[tokio::test]
async fn migration_does_not_consult_project_list() {
    let harness = Harness::new(
        Ok(CredentialResult::succeeded()),
        Some(anon_work("hi", &[])),
        Vec::new(),
        "migrated",
    );

    harness.controller.sign_in(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(harness.log.count("projects.list"), 0);
    assert_eq!(harness.navigations(), vec!["/migrated"]);
}

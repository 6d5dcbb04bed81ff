//! Integration tests for state_router
//!
//! These tests drive the full navigation pipeline: lazy boundaries, the auth
//! guard redirect, the login state's `returnTo` resolve and URL matching.

use state_router::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn contacts_subtree() -> Vec<StateNode> {
    vec![
        StateNode::new("contacts")
            .parent("app")
            .url("/contacts")
            .component(ComponentRef::new("Contacts"))
            .data(REQUIRES_AUTH, "true"),
        StateNode::new("contacts.contact").url("/:contactId"),
        StateNode::new("contacts.contact.edit").url("/edit"),
    ]
}

fn prefs_subtree() -> Vec<StateNode> {
    vec![
        StateNode::new("prefs")
            .parent("app")
            .url("/prefs")
            .data(REQUIRES_AUTH, "true"),
        StateNode::new("prefs.general").url("/general"),
    ]
}

fn mymessages_subtree() -> Vec<StateNode> {
    vec![
        StateNode::new("mymessages")
            .parent("app")
            .url("/mymessages")
            .redirect_to("mymessages.messagelist")
            .data(REQUIRES_AUTH, "true"),
        StateNode::new("mymessages.messagelist").url("/:folderId"),
        StateNode::new("mymessages.compose").url("/compose"),
    ]
}

struct Session(Arc<AtomicBool>);

impl Session {
    fn logged_out() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn guard(&self) -> AuthGuard {
        let flag = Arc::clone(&self.0);
        AuthGuard::new(move || flag.load(Ordering::SeqCst), app::LOGIN_STATE)
    }

    fn log_in(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn service(session: &Session) -> StateService {
    app::builder([
        app::future_state("contacts", |_| async { Ok(contacts_subtree()) }),
        app::future_state("prefs", |_| async { Ok(prefs_subtree()) }),
        app::future_state("mymessages", |_| async { Ok(mymessages_subtree()) }),
    ])
    .guard(session.guard())
    .build()
    .unwrap()
}

fn return_to(service: &StateService) -> TargetState {
    let active = service.current().unwrap();
    assert_eq!(active.name(), app::LOGIN_STATE);
    active
        .resolved()
        .get::<TargetState>(app::RETURN_TO_TOKEN)
        .cloned()
        .unwrap()
}

// ============================================================================
// Return-to Scenarios
// ============================================================================

#[tokio::test]
async fn test_guarded_navigation_returns_to_original_target() {
    init_logging();
    let session = Session::logged_out();
    let service = service(&session);

    let result = service.go("contacts").await;
    assert_eq!(result.active_state(), Some("login"));

    let active = service.current().unwrap();
    let superseded = active.transition().redirected_from().unwrap();
    assert_eq!(superseded.to().name(), "contacts");
    assert_eq!(return_to(&service), TargetState::new("contacts"));

    session.log_in();
    let target = return_to(&service);
    let result = service.go_to(target).await;
    assert_eq!(result.active_state(), Some("contacts"));
    assert_eq!(
        service.current().unwrap().component().map(ComponentRef::name),
        Some("Contacts")
    );
}

#[tokio::test]
async fn test_direct_login_returns_to_previous_state() {
    init_logging();
    let service = service(&Session::logged_out());

    assert!(service.go("home").await.is_success());
    assert!(service.go("login").await.is_success());

    let active = service.current().unwrap();
    assert!(active.transition().redirected_from().is_none());
    assert_eq!(active.transition().from().name(), "home");
    assert_eq!(return_to(&service), TargetState::new("home"));
}

#[tokio::test]
async fn test_first_load_of_login_returns_home() {
    init_logging();
    let service = service(&Session::logged_out());

    let result = service.navigate_url("/login").await;
    assert_eq!(result.active_state(), Some("login"));

    let active = service.current().unwrap();
    assert!(active.transition().is_initial());
    assert_eq!(return_to(&service), TargetState::new(HOME_STATE));
    assert!(return_to(&service).params().is_empty());
}

#[tokio::test]
async fn test_return_to_keeps_params_of_deep_link() {
    let session = Session::logged_out();
    let service = service(&session);

    let result = service.navigate_url("/contacts/42/edit?tab=notes").await;
    assert_eq!(result.active_state(), Some("login"));

    let target = return_to(&service);
    assert_eq!(target.name(), "contacts.contact.edit");
    assert_eq!(target.params().get("contactId"), Some("42"));
    assert_eq!(target.params().get("tab"), Some("notes"));

    session.log_in();
    let result = service.go_to(target).await;
    assert_eq!(result.active_state(), Some("contacts.contact.edit"));
    assert_eq!(service.current().unwrap().params().get("contactId"), Some("42"));
}

#[tokio::test]
async fn test_redirect_wins_over_from() {
    let service = service(&Session::logged_out());

    service.go("home").await;
    service.go("prefs.general").await;

    let active = service.current().unwrap();
    assert_eq!(active.transition().from().name(), "home");
    assert_eq!(return_to(&service).name(), "prefs.general");
}

// ============================================================================
// Lazy Loading Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_first_access_loads_once() {
    init_logging();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let session = Session::logged_out();
    session.log_in();

    let service = app::builder([app::future_state("contacts", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(contacts_subtree())
        }
    })])
    .guard(session.guard())
    .build()
    .unwrap();

    let (by_name, by_url) = tokio::join!(
        service.go("contacts.contact.edit"),
        service.navigate_url("/contacts/7")
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.loader().provider_calls(), 1);
    assert!(by_name.is_success());
    assert_eq!(by_url.active_state(), Some("contacts.contact"));

    let registry = service.registry();
    assert!(!registry.contains("contacts.**"));
    assert!(registry.contains("contacts.contact.edit"));
}

#[tokio::test]
async fn test_failed_load_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let service = app::builder([app::future_state("prefs", move |_| {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                Err(LazyLoadError::from("chunk failed to load"))
            } else {
                Ok(prefs_subtree())
            }
        }
    })])
    .build()
    .unwrap();

    let result = service.go("prefs").await;
    match result {
        NavigationResult::Error(NavigationError::Registry(RegistryError::LazyLoadFailure {
            boundary,
            message,
        })) => {
            assert_eq!(boundary, "prefs.**");
            assert_eq!(message, "chunk failed to load");
        }
        other => panic!("Expected LazyLoadFailure, got {:?}", other),
    }
    assert!(service.registry().contains("prefs.**"));

    assert!(service.go("prefs").await.is_success());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(!service.registry().contains("prefs.**"));
}

#[tokio::test]
async fn test_loaded_state_redirect() {
    let session = Session::logged_out();
    session.log_in();
    let service = service(&session);

    let result = service
        .go_with("mymessages", StateParams::new().with("folderId", "inbox"))
        .await;
    assert_eq!(result.active_state(), Some("mymessages.messagelist"));
    assert_eq!(
        service.href("mymessages.messagelist", &StateParams::new().with("folderId", "sent")),
        Ok("/mymessages/sent".to_string())
    );
}

// ============================================================================
// Registry and Routing Tests
// ============================================================================

#[tokio::test]
async fn test_app_redirects_to_welcome() {
    let service = service(&Session::logged_out());

    let result = service.go("app").await;
    assert_eq!(result.active_state(), Some("welcome"));
    assert_eq!(service.current().unwrap().path(), ["app", "welcome"]);
}

#[tokio::test]
async fn test_unknown_url_falls_back_to_welcome() {
    let service = service(&Session::logged_out());

    let result = service.navigate_url("/nowhere").await;
    assert_eq!(result.active_state(), Some(app::DEFAULT_STATE));
}

#[tokio::test]
async fn test_descendants_inherit_requires_auth() {
    let service = service(&Session::logged_out());

    for target in ["contacts.contact", "prefs.general", "mymessages.compose"] {
        let result = service.go(target).await;
        assert_eq!(result.active_state(), Some("login"), "{} should be protected", target);
    }
    for target in ["home", "welcome"] {
        assert_eq!(service.go(target).await.active_state(), Some(target));
    }
}

#[test]
fn test_duplicate_registration_is_atomic() {
    let service = app::builder(Vec::new()).build().unwrap();
    let before = service.registry().len();

    let err = service
        .register([
            StateNode::new("about").parent("app").url("/about"),
            StateNode::new("home").parent("app").url("/home"),
        ])
        .unwrap_err();

    assert_eq!(
        err,
        RegistryError::DuplicateName {
            name: "home".to_string()
        }
    );
    let registry = service.registry();
    assert_eq!(registry.len(), before);
    assert!(!registry.contains("about"));
}

#[test]
fn test_static_segments_beat_params() {
    let service = app::builder(Vec::new()).build().unwrap();
    service
        .register([
            StateNode::new("users").parent("app").url("/users"),
            StateNode::new("users.detail").url("/:userId"),
            StateNode::new("users.me").url("/me"),
        ])
        .unwrap();

    let registry = service.registry();
    assert_eq!(registry.match_url("/users/me").unwrap().target.name(), "users.me");

    let found = registry.match_url("/users/alice").unwrap();
    assert_eq!(found.target.name(), "users.detail");
    assert_eq!(found.target.params().get("userId"), Some("alice"));
}

#[test]
fn test_guard_redirect_becomes_linked_context() {
    let session = Session::logged_out();
    let service = service(&session);

    pollster::block_on(service.go("home"));
    let result = pollster::block_on(service.go("contacts"));
    assert_eq!(result.active_state(), Some("login"));

    let active = service.current().unwrap();
    let transition = active.transition();
    assert_eq!(transition.from().name(), "home");
    assert_eq!(transition.redirect_depth(), 1);
    assert_eq!(transition.original().to().name(), "contacts");
}

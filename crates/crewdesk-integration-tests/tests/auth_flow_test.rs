//! Sign-in to resolved profile, across session, client, store and state.
//!
//! The personal-data backend is a wiremock server; employees live in the
//! in-memory document store. A sign-in must end with a profile joining
//! both records, after exactly one authenticated persons lookup.

use std::sync::Arc;
use std::time::Duration;

use crewdesk_client::{ApiClient, ClientConfig, RecordingNavigator};
use crewdesk_core::{AccessLevel, AuthUid, Employee, Person};
use crewdesk_session::{MemoryIdentityProvider, SessionManager};
use crewdesk_state::{AuthEffects, AuthEvent, AuthState, AuthStore, ProfileResolver};
use crewdesk_store::{DocumentDb, EmployeeService};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    provider: Arc<MemoryIdentityProvider>,
    session: Arc<SessionManager>,
    employees: EmployeeService,
    store: AuthStore,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;

    let provider = Arc::new(MemoryIdentityProvider::new());
    provider.register("a@b.com", "x", AuthUid::new("U1").unwrap());
    let session = SessionManager::start(provider.clone()).unwrap();

    let config = ClientConfig::new(&format!("{}/api/", server.uri())).unwrap();
    let client = ApiClient::new(
        config,
        session.clone(),
        Arc::new(RecordingNavigator::at("/dashboard")),
    )
    .unwrap();

    let db = DocumentDb::in_memory();
    let employees = EmployeeService::new(&db);

    let resolver = ProfileResolver::new(
        Arc::new(client.persons().clone()),
        Arc::new(employees.clone()),
    );
    let store = AuthStore::new();
    Arc::new(AuthEffects::new(session.clone(), resolver))
        .spawn(store.clone())
        .unwrap();

    Harness {
        server,
        provider,
        session,
        employees,
        store,
    }
}

async fn settle(store: &AuthStore, done: impl FnMut(&AuthState) -> bool) -> AuthState {
    let mut rx = store.state().watch();
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done))
        .await
        .expect("auth state did not settle")
        .unwrap()
        .clone();
    state
}

#[tokio::test]
async fn sign_in_resolves_personal_and_employee_records() {
    let h = harness().await;
    let mut person = Person::new("U1", "Ann Smith");
    person.id = Some(7);
    Mock::given(method("GET"))
        .and(path("/api/persons/U1"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&person))
        .expect(1)
        .mount(&h.server)
        .await;
    let mut employee = Employee::new("U1");
    employee.access_level = Some(AccessLevel::Manager);
    h.employees.create(&employee).await.unwrap();

    h.store.dispatch(AuthEvent::login("a@b.com", "x"));
    let state = settle(&h.store, |s| s.profile.as_ref().is_some_and(|p| p.is_complete())).await;

    let profile = state.profile.unwrap();
    assert_eq!(profile.auth.local_id.as_str(), "U1");
    assert_eq!(profile.personal, Some(person));
    assert_eq!(profile.access_level(), Some(AccessLevel::Manager));
    assert!(!state.loading);
    assert!(state.error.is_none());

    let received = h.server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let auth = received[0]
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();
    let token = auth.strip_prefix("Bearer ").unwrap();
    assert!(!token.trim().is_empty());
    assert!(h.provider.token_requests() >= 1);
}

#[tokio::test]
async fn missing_personal_record_still_signs_in() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/api/persons/U1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;

    h.store.dispatch(AuthEvent::login("a@b.com", "x"));
    // Wait for the lookup to land before inspecting the profile.
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.server.received_requests().await.unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    let state = settle(&h.store, |s| s.profile.is_some() && !s.loading).await;

    let profile = state.profile.unwrap();
    assert!(profile.personal.is_none());
    assert!(profile.employee.is_none());
    assert_eq!(profile.display_name(), "a@b.com");
}

#[tokio::test]
async fn rejected_sign_in_never_reaches_the_backend() {
    let h = harness().await;
    h.store.dispatch(AuthEvent::login("a@b.com", "nope"));
    let state = settle(&h.store, |s| s.error.is_some()).await;

    assert!(state.profile.is_none());
    assert!(h.session.current_identity().is_none());
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn sign_out_clears_session_and_profile() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/api/persons/U1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Person::new("U1", "Ann")))
        .mount(&h.server)
        .await;

    h.store.dispatch(AuthEvent::login("a@b.com", "x"));
    settle(&h.store, |s| s.profile.as_ref().is_some_and(|p| p.personal.is_some())).await;

    h.store.dispatch(AuthEvent::LogoutRequested);
    let state = settle(&h.store, |s| s.profile.is_none() && !s.loading).await;
    assert_eq!(state, AuthState::default());
    assert!(h.session.current_identity().is_none());
    assert!(h.session.cached_token().is_none());
}

//! The persons client against the persons stub served on a real port.
//!
//! The stub requires a bearer token, so these tests also cover the
//! session-to-header path and the redirect on a rejected request.

use std::sync::Arc;
use std::time::Duration;

use crewdesk_client::{ApiClient, ApiError, ClientConfig, PersonsQuery, RecordingNavigator, Redirect};
use crewdesk_core::{AuthUid, Person, PersonPatch};
use crewdesk_persons_stub::{router, AppState};
use crewdesk_session::{MemoryIdentityProvider, SessionManager};

/// Start a persons stub on a random port. Returns its port and a shutdown
/// sender.
async fn start_stub(state: AppState) -> (u16, tokio::sync::oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                rx.await.ok();
            })
            .await
            .ok();
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    (port, tx)
}

async fn signed_in_session() -> Arc<SessionManager> {
    let provider = Arc::new(MemoryIdentityProvider::new());
    provider.register("a@b.com", "x", AuthUid::new("U1").unwrap());
    let session = SessionManager::start(provider).unwrap();
    session.sign_in("a@b.com", "x").await.unwrap();
    session
}

fn client(port: u16, session: Arc<SessionManager>) -> (ApiClient, Arc<RecordingNavigator>) {
    let config = ClientConfig::local_mock(port).unwrap();
    let navigator = Arc::new(RecordingNavigator::at("/persons"));
    let client = ApiClient::new(config, session, navigator.clone()).unwrap();
    (client, navigator)
}

#[tokio::test]
async fn persons_crud_through_stub() {
    let (port, shutdown) = start_stub(AppState::new(true)).await;
    let (client, navigator) = client(port, signed_in_session().await);
    let persons = client.persons();

    let mut ann = Person::new("U1", "Ann Smith");
    ann.email = Some("a@b.com".into());
    let created = persons.create_person(&ann).await.unwrap();
    assert!(created.id.is_some());
    assert_eq!(created.person_id, "U1");
    persons
        .create_person(&Person::new("U2", "Bob Jones"))
        .await
        .unwrap();

    let fetched = persons.get_person_by_id("U1").await.unwrap().unwrap();
    assert_eq!(fetched.email.as_deref(), Some("a@b.com"));
    assert_eq!(persons.get_person_by_id("U9").await.unwrap(), None);

    let all = persons.get_all_persons(&PersonsQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    let second_page = persons
        .get_all_persons(&PersonsQuery::default().page(2).limit(1))
        .await
        .unwrap();
    assert_eq!(second_page[0].person_id, "U2");
    let by_id = persons
        .get_all_persons(&PersonsQuery::default().ids(["U2"]))
        .await
        .unwrap();
    assert_eq!(by_id.len(), 1);

    let patch = PersonPatch {
        telegram: Some("@ann".into()),
        ..Default::default()
    };
    let updated = persons.update_person("U1", &patch).await.unwrap();
    assert_eq!(updated.telegram.as_deref(), Some("@ann"));
    assert_eq!(updated.full_name, "Ann Smith");

    let ack = persons.delete_person("U1").await.unwrap();
    assert!(!ack.message.is_empty());
    assert_eq!(persons.get_person_by_id("U1").await.unwrap(), None);

    assert!(navigator.redirects().is_empty());
    shutdown.send(()).ok();
}

#[tokio::test]
async fn signed_out_requests_are_redirected_to_login() {
    let (port, shutdown) = start_stub(AppState::new(true)).await;
    let session = signed_in_session().await;
    session.sign_out().await.unwrap();
    let (client, navigator) = client(port, session);

    let err = client.persons().get_person_by_id("U1").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { status: 401, .. }));
    assert_eq!(
        navigator.redirects(),
        vec![Redirect {
            path: "/login".into(),
            return_url: Some("/persons".into()),
        }]
    );
    shutdown.send(()).ok();
}

#[tokio::test]
async fn separate_stubs_do_not_share_data() {
    let (port_a, shutdown_a) = start_stub(AppState::new(false)).await;
    let (port_b, shutdown_b) = start_stub(AppState::new(false)).await;
    let session = signed_in_session().await;
    let (a, _) = client(port_a, session.clone());
    let (b, _) = client(port_b, session);

    a.persons()
        .create_person(&Person::new("U1", "Ann"))
        .await
        .unwrap();
    assert!(a.persons().get_person_by_id("U1").await.unwrap().is_some());
    assert!(b.persons().get_person_by_id("U1").await.unwrap().is_none());

    shutdown_a.send(()).ok();
    shutdown_b.send(()).ok();
}

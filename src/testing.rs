//! Shared fixtures for unit tests.

use crate::application_impl::RealAuthService;
use crate::client::*;
use crate::domain_model::*;
use crate::infra_local::MemoryLocalStore;
use crate::state::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport answering from a closure and recording every request.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        ScriptedTransport {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path == path)
            .count()
    }

    pub fn count_request(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

/// Scripted answers that are only released one at a time through `gate`,
/// keeping requests in flight for as long as a test needs.
pub struct HeldTransport {
    inner: ScriptedTransport,
    gate: Arc<Notify>,
    held: AtomicUsize,
}

impl HeldTransport {
    pub fn new(
        gate: Arc<Notify>,
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        HeldTransport {
            inner: ScriptedTransport::new(handler),
            gate,
            held: AtomicUsize::new(0),
        }
    }

    /// Requests currently waiting for the gate.
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    pub fn count(&self, path: &str) -> usize {
        self.inner.count(path)
    }
}

#[async_trait::async_trait]
impl Transport for HeldTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.held.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.held.fetch_sub(1, Ordering::SeqCst);
        self.inner.send(request).await
    }
}

/// Polls `condition` until it holds, failing after a second.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub fn json(status: u16, body: serde_json::Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        headers: Vec::new(),
        body: serde_json::to_vec(&body).unwrap(),
    })
}

pub fn user(id: i64, username: &str) -> User {
    User {
        id: UserId(id),
        username: username.to_owned(),
        email: Some(format!("{username}@example.com")),
        bio: None,
        avatar_url: None,
        created_at: None,
    }
}

pub fn author(id: i64, username: &str) -> Author {
    user(id, username).as_author()
}

pub fn post(id: i64, likes: u32, comments: u32) -> Post {
    Post {
        id: PostId(id),
        content: format!("post {id}"),
        media_url: None,
        author: author(9, "poster"),
        created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        counts: PostCounts { likes, comments },
    }
}

/// Client over `transport` with tokens already stored.
pub async fn session_with(transport: Arc<dyn Transport>) -> ApiClient {
    let session = Arc::new(SessionStore::new(Arc::new(MemoryLocalStore::new())));
    session
        .save_tokens(AccessToken("a1".into()), Some(RefreshToken("r1".into())))
        .await
        .unwrap();
    ApiClient::new(transport, session)
}

/// Everything a view needs, already signed in as `me`.
pub struct Harness {
    pub client: ApiClient,
    pub auth: Arc<AuthContext>,
    pub notices: Arc<RecordingNotices>,
    pub navigator: Arc<MemoryNavigator>,
    pub ids: Arc<LocalIdSource>,
}

impl Harness {
    pub fn gate(&self) -> ActionGate {
        ActionGate::new(self.auth.clone(), self.notices.clone())
    }
}

fn auth_over(client: &ApiClient, navigator: Arc<MemoryNavigator>) -> AuthContext {
    AuthContext::new(
        client.session().clone(),
        Arc::new(RealAuthService::new(client.clone())),
        navigator,
    )
}

pub async fn signed_in(transport: Arc<dyn Transport>, me: User) -> Harness {
    let client = session_with(transport).await;
    let navigator = Arc::new(MemoryNavigator::new("/"));
    let auth = Arc::new(auth_over(&client, navigator.clone()));
    auth.assume(me);
    Harness {
        client,
        auth,
        notices: Arc::new(RecordingNotices::default()),
        navigator,
        ids: Arc::new(LocalIdSource::new()),
    }
}

pub async fn signed_out(transport: Arc<dyn Transport>) -> Harness {
    let session = Arc::new(SessionStore::new(Arc::new(MemoryLocalStore::new())));
    let client = ApiClient::new(transport, session);
    let navigator = Arc::new(MemoryNavigator::new("/"));
    let auth = Arc::new(auth_over(&client, navigator.clone()));
    auth.assume_anonymous();
    Harness {
        client,
        auth,
        notices: Arc::new(RecordingNotices::default()),
        navigator,
        ids: Arc::new(LocalIdSource::new()),
    }
}

/// Notice sink keeping everything it was shown.
#[derive(Default)]
pub struct RecordingNotices {
    shown: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    pub fn all(&self) -> Vec<Notice> {
        self.shown.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.shown.lock().unwrap().last().cloned()
    }
}

impl NoticeSink for RecordingNotices {
    fn show(&self, notice: Notice) {
        self.shown.lock().unwrap().push(notice);
    }
}

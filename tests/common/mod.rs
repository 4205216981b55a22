//! In-process backend for integration tests: enough of the social API to
//! drive the client over real HTTP and WebSocket connections.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use trohm::client::*;
use trohm::domain_model::*;
use trohm::infra_local::MemoryLocalStore;
use trohm::state::*;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply, reject};

const CREATED_AT: &str = "2024-06-01T12:00:00Z";

// region backend state

struct Account {
    id: i64,
    username: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    access: HashMap<String, i64>,
    refresh: HashMap<String, i64>,
    next_token: u64,
    next_id: i64,
    requests: Vec<(i64, i64, i64)>, // (request id, from, to)
    follows: HashSet<(i64, i64)>,
    messages: Vec<Value>,
    posts: Vec<Value>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue(&mut self, user: i64) -> Value {
        self.next_token += 1;
        let access = format!("access-{}", self.next_token);
        let refresh = format!("refresh-{}", self.next_token);
        self.access.insert(access.clone(), user);
        self.refresh.insert(refresh.clone(), user);
        json!({"token": access, "refreshToken": refresh})
    }

    fn author(&self, id: i64) -> Value {
        let username = self
            .accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.username.clone())
            .unwrap_or_default();
        json!({"id": id, "username": username})
    }

    fn user(&self, id: i64) -> Option<Value> {
        self.accounts.iter().find(|a| a.id == id).map(|a| {
            json!({"id": a.id, "username": a.username, "email": a.email, "createdAt": CREATED_AT})
        })
    }
}

pub struct Backend {
    state: Mutex<State>,
    events: broadcast::Sender<(i64, String)>,
    refresh_calls: AtomicUsize,
}

impl Backend {
    fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Backend {
            state: Mutex::new(State::default()),
            events,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every access token stops working; refresh tokens stay valid.
    pub fn expire_access_tokens(&self) {
        self.state.lock().unwrap().access.clear();
    }

    /// Nothing issued so far works anymore.
    pub fn revoke_everything(&self) {
        let mut state = self.state.lock().unwrap();
        state.access.clear();
        state.refresh.clear();
    }

    pub fn live_refresh_tokens(&self) -> usize {
        self.state.lock().unwrap().refresh.len()
    }

    pub fn seed_post(&self, author: i64, content: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let post = json!({
            "id": id,
            "content": content,
            "author": state.author(author),
            "createdAt": CREATED_AT,
            "_count": {"likes": 0, "comments": 0}
        });
        state.posts.insert(0, post);
    }

    fn emit(&self, user: i64, event: Value) {
        // nobody listening is fine
        let _ = self.events.send((user, event.to_string()));
    }
}

// endregion

// region failures

#[derive(Debug)]
struct Fail {
    status: StatusCode,
    message: &'static str,
}

impl reject::Reject for Fail {}

fn fail(status: StatusCode, message: &'static str) -> Rejection {
    reject::custom(Fail { status, message })
}

async fn recover(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = match err.find::<Fail>() {
        Some(fail) => (fail.status, fail.message),
        None if err.is_not_found() => (StatusCode::NOT_FOUND, "Not found"),
        None => (StatusCode::BAD_REQUEST, "Bad request"),
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({"error": message})),
        status,
    ))
}

// endregion

// region routes

fn with(backend: Arc<Backend>) -> impl Filter<Extract = (Arc<Backend>,), Error = Infallible> + Clone {
    warp::any().map(move || backend.clone())
}

fn with_verification(
    backend: Arc<Backend>,
) -> impl Filter<Extract = (i64,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let backend = backend.clone();
        async move {
            let user = header
                .as_deref()
                .and_then(|h| h.strip_prefix("Bearer "))
                .and_then(|token| backend.state.lock().unwrap().access.get(token).copied());
            user.ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid token"))
        }
    })
}

fn ok(body: Value) -> Response {
    warp::reply::json(&body).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn routes(
    backend: Arc<Backend>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let b = backend;

    let register = warp::post()
        .and(warp::path!("api" / "auth" / "register"))
        .and(warp::body::json())
        .and(with(b.clone()))
        .and_then(|body: Value, b: Arc<Backend>| async move {
            let mut state = b.state.lock().unwrap();
            let email = body["email"].as_str().unwrap_or_default().to_owned();
            if state.accounts.iter().any(|a| a.email == email) {
                return Err(fail(StatusCode::CONFLICT, "Email already registered"));
            }
            let id = state.next_id();
            state.accounts.push(Account {
                id,
                username: body["username"].as_str().unwrap_or_default().to_owned(),
                email,
                password: body["password"].as_str().unwrap_or_default().to_owned(),
            });
            Ok::<_, Rejection>(
                warp::reply::with_status(warp::reply::json(&json!({"id": id})), StatusCode::CREATED)
                    .into_response(),
            )
        });

    let login = warp::post()
        .and(warp::path!("api" / "auth" / "login"))
        .and(warp::body::json())
        .and(with(b.clone()))
        .and_then(|body: Value, b: Arc<Backend>| async move {
            let mut state = b.state.lock().unwrap();
            let user = state
                .accounts
                .iter()
                .find(|a| body["email"] == a.email.as_str() && body["password"] == a.password.as_str())
                .map(|a| a.id)
                .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
            Ok::<_, Rejection>(ok(state.issue(user)))
        });

    let refresh = warp::post()
        .and(warp::path!("api" / "auth" / "refresh"))
        .and(warp::body::json())
        .and(with(b.clone()))
        .and_then(|body: Value, b: Arc<Backend>| async move {
            b.refresh_calls.fetch_add(1, Ordering::SeqCst);
            // widen the window in which concurrent 401s pile up
            tokio::time::sleep(Duration::from_millis(50)).await;
            let mut state = b.state.lock().unwrap();
            let token = body["refreshToken"].as_str().unwrap_or_default();
            let user = state
                .refresh
                .remove(token)
                .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;
            Ok::<_, Rejection>(ok(state.issue(user)))
        });

    let logout = warp::post()
        .and(warp::path!("api" / "auth" / "logout"))
        .and(warp::body::json())
        .and(with(b.clone()))
        .map(|body: Value, b: Arc<Backend>| {
            if let Some(token) = body["refreshToken"].as_str() {
                b.state.lock().unwrap().refresh.remove(token);
            }
            no_content()
        });

    let me = warp::get()
        .and(warp::path!("api" / "auth" / "me"))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .and_then(|me: i64, b: Arc<Backend>| async move {
            let user = b.state.lock().unwrap().user(me);
            user.map(ok)
                .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
        });

    let user = warp::get()
        .and(warp::path!("api" / "users" / i64))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .and_then(|id: i64, _me: i64, b: Arc<Backend>| async move {
            let user = b.state.lock().unwrap().user(id);
            user.map(ok)
                .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
        });

    let posts = warp::get()
        .and(warp::path!("api" / "posts"))
        .and(warp::query::<HashMap<String, String>>())
        .and(with(b.clone()))
        .map(|query: HashMap<String, String>, b: Arc<Backend>| {
            let state = b.state.lock().unwrap();
            let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
            let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
            let slice: Vec<Value> = state
                .posts
                .iter()
                .skip((page.max(1) - 1) * limit)
                .take(limit)
                .cloned()
                .collect();
            warp::reply::with_header(
                warp::reply::json(&slice),
                "x-total-count",
                state.posts.len().to_string(),
            )
            .into_response()
        });

    let stories = warp::get()
        .and(warp::path!("api" / "stories"))
        .and(with_verification(b.clone()))
        .map(|_me: i64| ok(json!([])));

    let send_message = warp::post()
        .and(warp::path!("api" / "messages"))
        .and(with_verification(b.clone()))
        .and(warp::body::json())
        .and(with(b.clone()))
        .map(|me: i64, body: Value, b: Arc<Backend>| {
            let to = body["recipientId"].as_i64().unwrap_or_default();
            let (message, notification) = {
                let mut state = b.state.lock().unwrap();
                let id = state.next_id();
                let message = json!({
                    "id": id,
                    "content": body["content"],
                    "sender": state.author(me),
                    "recipient": state.author(to),
                    "createdAt": CREATED_AT,
                    "read": false
                });
                state.messages.push(message.clone());
                let notification = json!({
                    "type": "notification",
                    "content": {"id": state.next_id(), "type": "message", "payload": {"from": me}}
                });
                (message, notification)
            };
            b.emit(to, notification);
            warp::reply::with_status(warp::reply::json(&message), StatusCode::CREATED)
                .into_response()
        });

    let inbox = warp::get()
        .and(warp::path!("api" / "messages"))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .map(|me: i64, b: Arc<Backend>| {
            let state = b.state.lock().unwrap();
            let inbox: Vec<Value> = state
                .messages
                .iter()
                .filter(|m| m["recipient"]["id"].as_i64() == Some(me))
                .cloned()
                .collect();
            ok(json!(inbox))
        });

    let users = warp::get()
        .and(warp::path!("api" / "users"))
        .and(with(b.clone()))
        .map(|b: Arc<Backend>| {
            let state = b.state.lock().unwrap();
            let users: Vec<Value> = state.accounts.iter().filter_map(|a| state.user(a.id)).collect();
            ok(json!(users))
        });

    let thread = warp::get()
        .and(warp::path!("api" / "messages" / "thread" / i64))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .map(|other: i64, me: i64, b: Arc<Backend>| {
            let state = b.state.lock().unwrap();
            let thread: Vec<Value> = state
                .messages
                .iter()
                .filter(|m| {
                    let (from, to) = (m["sender"]["id"].as_i64(), m["recipient"]["id"].as_i64());
                    (from, to) == (Some(me), Some(other)) || (from, to) == (Some(other), Some(me))
                })
                .cloned()
                .collect();
            ok(json!(thread))
        });

    let read_thread = warp::post()
        .and(warp::path!("api" / "messages" / "thread" / i64 / "read"))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .map(|other: i64, me: i64, b: Arc<Backend>| {
            let count = {
                let mut state = b.state.lock().unwrap();
                let mut count = 0;
                for m in state.messages.iter_mut().filter(|m| {
                    m["sender"]["id"].as_i64() == Some(other)
                        && m["recipient"]["id"].as_i64() == Some(me)
                }) {
                    m["read"] = json!(true);
                    count += 1;
                }
                count
            };
            b.emit(
                other,
                json!({"type": "messagesRead", "content": {"by": me, "count": count}}),
            );
            no_content()
        });

    let follow_status = warp::get()
        .and(warp::path!("api" / "users" / i64 / "follow-status"))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .map(|other: i64, me: i64, b: Arc<Backend>| {
            let state = b.state.lock().unwrap();
            let status = if state.follows.contains(&(me, other)) {
                "following"
            } else if state.requests.iter().any(|r| (r.1, r.2) == (me, other)) {
                "requested"
            } else {
                "none"
            };
            ok(json!({"status": status}))
        });

    let request_follow = warp::post()
        .and(warp::path!("api" / "users" / i64 / "request"))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .map(|other: i64, me: i64, b: Arc<Backend>| {
            let mut state = b.state.lock().unwrap();
            let id = state.next_id();
            state.requests.push((id, me, other));
            StatusCode::CREATED.into_response()
        });

    let incoming = warp::get()
        .and(warp::path!("api" / "requests"))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .map(|me: i64, b: Arc<Backend>| {
            let state = b.state.lock().unwrap();
            let list: Vec<Value> = state
                .requests
                .iter()
                .filter(|r| r.2 == me)
                .map(|r| json!({"id": r.0, "from": state.author(r.1), "createdAt": CREATED_AT}))
                .collect();
            ok(json!(list))
        });

    let decide = warp::post()
        .and(warp::path!("api" / "requests" / i64 / String))
        .and(with_verification(b.clone()))
        .and(with(b.clone()))
        .and_then(|id: i64, decision: String, me: i64, b: Arc<Backend>| async move {
            let mut state = b.state.lock().unwrap();
            let index = state
                .requests
                .iter()
                .position(|r| r.0 == id && r.2 == me)
                .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Request not found"))?;
            let (_, from, to) = state.requests.remove(index);
            if decision == "accept" {
                state.follows.insert((from, to));
            }
            Ok::<_, Rejection>(no_content())
        });

    let notifications = warp::get()
        .and(warp::path!("api" / "notifications"))
        .and(with_verification(b.clone()))
        .map(|_me: i64| ok(json!([])));

    let ws = warp::path("ws")
        .and(warp::path::end())
        .and(with_verification(b.clone()))
        .and(warp::ws())
        .and(with(b.clone()))
        .map(|me: i64, ws: warp::ws::Ws, b: Arc<Backend>| {
            // subscribe before the upgrade so nothing sent after connect is lost
            let mut events = b.events.subscribe();
            ws.on_upgrade(move |socket| async move {
                let (mut tx, mut rx) = socket.split();
                loop {
                    tokio::select! {
                        incoming = rx.next() => match incoming {
                            Some(Ok(m)) if m.is_close() => break,
                            Some(Ok(_)) => continue,
                            _ => break,
                        },
                        event = events.recv() => match event {
                            Ok((user, frame)) if user == me => {
                                if tx.send(warp::ws::Message::text(frame)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(_) => continue,
                            Err(_) => break,
                        },
                    }
                }
            })
        });

    register
        .or(login)
        .or(refresh)
        .or(logout)
        .or(me)
        .or(follow_status)
        .or(request_follow)
        .or(user)
        .or(users)
        .or(posts)
        .or(stories)
        .or(read_thread)
        .or(thread)
        .or(inbox)
        .or(send_message)
        .or(incoming)
        .or(decide)
        .or(notifications)
        .or(ws)
        .recover(recover)
}

// endregion

// region harness

pub struct TestServer {
    pub addr: SocketAddr,
    pub backend: Arc<Backend>,
}

impl TestServer {
    pub async fn start() -> TestServer {
        let backend = Arc::new(Backend::new());
        let (addr, server) = warp::serve(routes(backend.clone())).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        TestServer { addr, backend }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn client(&self) -> ApiClient {
        let session = Arc::new(SessionStore::new(Arc::new(MemoryLocalStore::new())));
        self.client_over(session)
    }

    pub fn client_over(&self, session: Arc<SessionStore>) -> ApiClient {
        let transport =
            ReqwestTransport::new(&self.base_url(), Duration::from_secs(5)).unwrap();
        ApiClient::new(Arc::new(transport), session)
    }
}

/// A signed-in client with its auth context.
pub struct Member {
    pub client: ApiClient,
    pub auth: Arc<AuthContext>,
    pub navigator: Arc<MemoryNavigator>,
    pub toasts: Arc<ToastCenter>,
}

impl Member {
    pub fn gate(&self) -> ActionGate {
        ActionGate::new(self.auth.clone(), self.toasts.clone())
    }
}

pub fn auth_context(client: &ApiClient, navigator: Arc<MemoryNavigator>) -> Arc<AuthContext> {
    Arc::new(AuthContext::new(
        client.session().clone(),
        Arc::new(trohm::application_impl::RealAuthService::new(client.clone())),
        navigator,
    ))
}

pub fn registration(username: &str) -> Registration {
    Registration {
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        password: format!("{username}-password"),
    }
}

/// Registers `username` and signs in through the auth context.
pub async fn member(server: &TestServer, username: &str) -> Member {
    let client = server.client();
    let navigator = Arc::new(MemoryNavigator::new("/"));
    let auth = auth_context(&client, navigator.clone());
    auth.initialize().await;
    auth.register(&registration(username)).await.unwrap();
    Member {
        client,
        auth,
        navigator,
        toasts: Arc::new(ToastCenter::new()),
    }
}

/// Polls `check` until it holds or a second has passed.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// endregion

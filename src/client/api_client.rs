use crate::client::*;
use crate::domain_model::*;
use crate::logger::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

pub const REFRESH_PATH: &str = "/api/auth/refresh";

type RefreshOutcome = Result<AccessToken, ApiError>;

/// Requests parked behind the one refresh call that is allowed in flight.
#[derive(Default)]
struct RefreshQueue {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    queue: Mutex<RefreshQueue>,
}

/// Authenticated client for the backend REST API.
///
/// Every request carries the current access token. A 401 answer triggers a
/// token refresh; concurrent 401s share that single refresh and are replayed
/// once it settles. When the refresh fails the session is expired and every
/// parked request fails with [`ApiError::SessionExpired`].
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

enum Recovery {
    Replay(AccessToken),
    Wait(oneshot::Receiver<RefreshOutcome>),
    Lead(oneshot::Receiver<RefreshOutcome>),
    Expired,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        ApiClient {
            inner: Arc::new(Inner {
                transport,
                session,
                queue: Mutex::new(RefreshQueue::default()),
            }),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Sends `request` through the refresh-aware path and returns the raw
    /// successful response.
    pub async fn execute(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        let sent_with = self.inner.session.access_token();
        let response = self.inner.dispatch(&request, sent_with.as_ref()).await?;
        if response.status != 401 {
            return check_status(response);
        }
        if request.retried {
            return Err(ApiError::Unauthorized);
        }

        let mut replay = request;
        replay.retried = true;

        let token = self.token_after_unauthorized(sent_with).await?;
        debug!(method = %replay.method, path = %replay.path, "replaying after refresh");
        let response = self.inner.dispatch(&replay, Some(&token)).await?;
        if response.status == 401 {
            return Err(ApiError::Unauthorized);
        }
        check_status(response)
    }

    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute(request).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::post(path)).await.map(|_| ())
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(path)).await.map(|_| ())
    }

    /// Sends without a token and without 401 handling.
    pub async fn send_unauthenticated(
        &self,
        request: ApiRequest,
    ) -> Result<HttpResponse, ApiError> {
        let response = self.inner.dispatch(&request, None).await?;
        check_status(response)
    }

    async fn token_after_unauthorized(
        &self,
        sent_with: Option<AccessToken>,
    ) -> Result<AccessToken, ApiError> {
        let recovery = {
            let mut queue = self.inner.queue.lock().unwrap_or_else(PoisonError::into_inner);
            let current = self.inner.session.access_token();
            match (&sent_with, current) {
                (_, Some(current)) if Some(&current) != sent_with.as_ref() => {
                    Recovery::Replay(current)
                }
                (Some(_), None) => Recovery::Expired,
                _ => {
                    let (tx, rx) = oneshot::channel();
                    queue.waiters.push(tx);
                    if queue.in_flight {
                        Recovery::Wait(rx)
                    } else {
                        queue.in_flight = true;
                        Recovery::Lead(rx)
                    }
                }
            }
        };

        let rx = match recovery {
            Recovery::Replay(token) => return Ok(token),
            Recovery::Expired => return Err(ApiError::SessionExpired),
            Recovery::Wait(rx) => rx,
            Recovery::Lead(rx) => {
                tokio::spawn(refresh(self.inner.clone()));
                rx
            }
        };

        rx.await.unwrap_or(Err(ApiError::SessionExpired))
    }
}

impl Inner {
    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, path = %request.path, retried = request.retried, "request");
        self.transport
            .send(request.to_http(token))
            .await
            .map_err(|e| ApiError::Network(e.0))
    }

    async fn request_new_token(&self) -> Result<TokenGrant, ApiError> {
        let body = match self.session.refresh_token() {
            Some(token) => serde_json::json!({ "refreshToken": token }),
            None => serde_json::json!({}),
        };
        let request = ApiRequest::post(REFRESH_PATH).json(&body)?;
        let response = check_status(self.dispatch(&request, None).await?)?;
        response.json()
    }
}

/// Runs as its own task so the queue is drained even if the request that
/// started it is dropped.
async fn refresh(inner: Arc<Inner>) {
    info!("refreshing access token");
    let outcome = match inner.request_new_token().await {
        Ok(TokenGrant {
            token: Some(token),
            refresh_token,
        }) => {
            if let Err(e) = inner.session.save_tokens(token.clone(), refresh_token).await {
                error!(error = %e, "failed to persist refreshed tokens");
            }
            Ok(token)
        }
        Ok(_) => {
            warn!("refresh response carried no token");
            inner.session.expire().await;
            Err(ApiError::SessionExpired)
        }
        Err(e) => {
            warn!(error = %e, "token refresh failed");
            inner.session.expire().await;
            Err(ApiError::SessionExpired)
        }
    };

    let waiters = {
        let mut queue = inner.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.in_flight = false;
        std::mem::take(&mut queue.waiters)
    };
    debug!(waiters = waiters.len(), ok = outcome.is_ok(), "refresh settled");
    for waiter in waiters {
        let _ = waiter.send(outcome.clone());
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(&response))
    }
}

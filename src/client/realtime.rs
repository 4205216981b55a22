use crate::client::*;
use crate::domain_model::*;
use crate::logger::*;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("invalid realtime url: {0}")]
    InvalidUrl(String),
    #[error("connect failed: {0}")]
    Connect(String),
}

pub struct RealtimeConnection {
    pub sender: Box<dyn ConnSender>,
    pub receiver: Box<dyn ConnReceiver>,
}

/// Opens the event socket, presenting the current access token on upgrade.
pub async fn connect(
    ws_url: &str,
    session: &SessionStore,
) -> Result<RealtimeConnection, RealtimeError> {
    let mut request = ws_url
        .into_client_request()
        .map_err(|e| RealtimeError::InvalidUrl(e.to_string()))?;
    if let Some(token) = session.access_token() {
        let value = HeaderValue::from_str(&format!("Bearer {}", token.0))
            .map_err(|e| RealtimeError::Connect(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (stream, _) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| RealtimeError::Connect(e.to_string()))?;
    info!(url = ws_url, "realtime connected");

    let (sink, stream) = stream.split();
    Ok(RealtimeConnection {
        sender: Box::new(sink),
        receiver: Box::new(stream),
    })
}

/// Feeds decoded server events to `handler` until the socket closes or
/// `cancel` fires. Frames that do not parse are skipped.
pub async fn run_listener(
    mut connection: RealtimeConnection,
    handler: Arc<dyn ServerEventHandler>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = connection.sender.send(ConnMessage::Close).await {
                    debug!(error = %e, "close frame not sent");
                }
                break;
            }
            message = connection.receiver.next() => {
                match message {
                    Some(Ok(ConnMessage::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => handler.handle(event).await,
                            Err(e) => warn!(error = %e, frame = %text, "malformed realtime frame"),
                        }
                    }
                    Some(Ok(ConnMessage::Close)) | None => {
                        info!("realtime connection closed");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "realtime connection failed");
                        break;
                    }
                }
            }
        }
    }
}

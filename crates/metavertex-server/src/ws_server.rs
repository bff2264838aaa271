// WebSocket feed pushing marketplace notifications to signed-in clients.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use metavertex_core::events::Notification;
use metavertex_core::model::user::User;
use metavertex_core::{MarketError, Marketplace};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Who is on the other end of a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub user_id: String,
    pub unique_id: String,
    pub is_admin: bool,
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Viewer {
            user_id: user.id.clone(),
            unique_id: user.unique_id.clone(),
            is_admin: user.user_type.is_admin(),
        }
    }
}

/// What to do with one frame from the client.
#[derive(Debug, PartialEq)]
pub enum FrameAction {
    Reply(Message),
    Close,
    Ignore,
}

pub fn classify(msg: &Message) -> FrameAction {
    match msg {
        Message::Text(text) if text.as_str().trim().eq_ignore_ascii_case("ping") => {
            FrameAction::Reply(Message::Text("pong".into()))
        }
        Message::Close(_) => FrameAction::Close,
        _ => FrameAction::Ignore,
    }
}

/// Wire form of `notification` if `viewer` may see it.
pub fn render(notification: &Notification, viewer: &Viewer) -> Option<String> {
    if !notification
        .audience
        .visible_to(&viewer.user_id, viewer.is_admin)
    {
        return None;
    }
    match notification.to_json() {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("failed to encode notification: {e}");
            None
        }
    }
}

/// `token` parameter of a `?a=b&token=...` query string.
pub fn token_from_query(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
}

/// Check the handshake request: path must be `/ws` and the token must
/// belong to an approved account.
fn authorize(market: &Marketplace, req: &Request) -> Result<User, (StatusCode, String)> {
    if req.uri().path() != "/ws" {
        return Err((StatusCode::NOT_FOUND, "Not found".into()));
    }
    let token = token_from_query(req.uri().query())
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Access token required".to_string()))?;
    market.authenticate(token).map_err(|e| match e {
        MarketError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
        MarketError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
        other => {
            warn!("WebSocket authentication failed: {other}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
        }
    })
}

fn refuse(status: StatusCode, message: String) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(message));
    *response.status_mut() = status;
    response
}

/// Accept connections forever, one task per client.
pub async fn run(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    info!("WebSocket server listening on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("Accepted TCP connection from {addr}");
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            handle_connection(stream, addr, state).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<AppState>) {
    let mut viewer: Option<Viewer> = None;
    let callback = |req: &Request, response: Response| match authorize(&state.market, req) {
        Ok(user) => {
            viewer = Some(Viewer::from(&user));
            Ok(response)
        }
        Err((status, message)) => Err(refuse(status, message)),
    };

    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake refused for {addr}: {e}");
            return;
        }
    };
    let Some(viewer) = viewer else {
        return;
    };
    info!("{} connected to the feed from {addr}", viewer.unique_id);

    let events = state.market.events().subscribe();
    let (mut write, read) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Message>(64);
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = write.send(msg).await {
                debug!("write to {addr} failed: {e}");
                break;
            }
        }
        let _ = write.close().await;
    });

    serve_client(read, &tx, events, &viewer, &addr.to_string()).await;
    drop(tx);
    let _ = writer.await;
    info!("{} disconnected from {addr}", viewer.unique_id);
}

/// Drive one client: forward visible notifications and answer its frames
/// until it closes, errors, or the outgoing channel is dropped.
///
/// Pending notifications are delivered before the next client frame is read.
pub async fn serve_client<St>(
    mut incoming: St,
    outgoing: &mpsc::Sender<Message>,
    mut events: broadcast::Receiver<Notification>,
    viewer: &Viewer,
    addr: &str,
) where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        tokio::select! {
            biased;

            received = events.recv() => match received {
                Ok(notification) => {
                    if let Some(json) = render(&notification, viewer) {
                        if outgoing.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {addr} fell behind and missed {skipped} notifications");
                }
                Err(RecvError::Closed) => break,
            },

            frame = incoming.next() => match frame {
                Some(Ok(msg)) => match classify(&msg) {
                    FrameAction::Reply(reply) => {
                        if outgoing.send(reply).await.is_err() {
                            break;
                        }
                    }
                    FrameAction::Close => {
                        info!("Client {addr} sent close frame");
                        break;
                    }
                    FrameAction::Ignore => {}
                },
                Some(Err(e)) => {
                    warn!("WebSocket error from {addr}: {e}");
                    break;
                }
                None => break,
            },
        }
    }
}

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::middleware::auth;
use crate::models::{member_role, AuthUser, Room};
use crate::routes::messages::store_message;
use crate::ws::broadcaster::ClientId;
use crate::ws::events::{ClientEvent, ServerEvent};
use crate::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    query: Query<std::collections::HashMap<String, String>>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    let auth_user = extract_session(&state, &headers, &query).await;
    ws.on_upgrade(move |socket| handle_socket(socket, state, auth_user))
}

async fn extract_session(
    state: &AppState,
    headers: &axum::http::HeaderMap,
    query: &std::collections::HashMap<String, String>,
) -> Option<AuthUser> {
    let token_from_query = query.get("token").cloned();

    let token_from_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string());

    let token_from_cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .filter_map(|c| c.trim().strip_prefix("session_token=").map(|t| t.to_string()))
        .next();

    let token = token_from_query
        .or(token_from_header)
        .or(token_from_cookie)
        .filter(|t| !t.is_empty())?;

    auth::lookup_session(state, &token).await
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, auth_user: Option<AuthUser>) {
    // Anonymous sockets are dropped without ceremony; every inbound event
    // requires an established identity.
    let user = match auth_user {
        Some(u) => u,
        None => return,
    };

    let client_id = state.broadcaster.next_client_id().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx): (mpsc::Sender<String>, mpsc::Receiver<String>) =
        state.broadcaster.outbound_queue();

    state
        .broadcaster
        .register(client_id, user.id.clone(), user.username.clone(), tx)
        .await;

    // Forward the bounded outbound queue into the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive loop
    let state_clone = state.clone();
    let user_clone = user.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Text(text) => {
                    let text_str: &str = &text;
                    if let Ok(event) = serde_json::from_str::<ClientEvent>(text_str) {
                        handle_client_event(&state_clone, client_id, &user_clone, event).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    handle_disconnect(&state, client_id, &user).await;
}

async fn handle_client_event(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Join { room } => {
            handle_join(state, client_id, user, &room).await;
        }
        ClientEvent::Leave { room } => {
            handle_leave(state, client_id, user, &room).await;
        }
        ClientEvent::Message { room, content } => {
            handle_message(state, client_id, user, &room, content).await;
        }
        ClientEvent::Typing { room, is_typing } => {
            handle_typing(state, client_id, user, &room, is_typing).await;
        }
    }
}

/// Subscribe to a room's fan-out. Join attempts from non-members are
/// silently ignored rather than errored: answering would confirm to
/// outsiders which room slugs exist.
async fn handle_join(state: &AppState, client_id: ClientId, user: &AuthUser, room_slug: &str) {
    let room = match Room::find_by_slug(&state.db, room_slug).await {
        Ok(Some(r)) => r,
        _ => {
            tracing::debug!("join ignored: unknown room {}", room_slug);
            return;
        }
    };

    match member_role(&state.db, &room.id, &user.id).await {
        Ok(Some(_)) => {}
        _ => {
            tracing::debug!("join ignored: {} is not a member of {}", user.id, room_slug);
            return;
        }
    }

    state.broadcaster.subscribe(client_id, room_slug).await;

    // Everyone in the room, including the joiner, sees the arrival
    state
        .broadcaster
        .broadcast_room(
            room_slug,
            &ServerEvent::Presence {
                room: room_slug.to_string(),
                msg: format!("{} joined the room", user.username),
            },
            None,
        )
        .await;
}

async fn handle_leave(state: &AppState, client_id: ClientId, user: &AuthUser, room_slug: &str) {
    if !state.broadcaster.is_subscribed(client_id, room_slug).await {
        return;
    }

    state.broadcaster.unsubscribe(client_id, room_slug).await;

    state
        .broadcaster
        .broadcast_room(
            room_slug,
            &ServerEvent::Presence {
                room: room_slug.to_string(),
                msg: format!("{} left the room", user.username),
            },
            None,
        )
        .await;
}

async fn handle_message(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    room_slug: &str,
    content: String,
) {
    let room = match Room::find_by_slug(&state.db, room_slug).await {
        Ok(Some(r)) => r,
        _ => return,
    };

    // store_message persists and fans out; failures go back to the sender
    // only and the event is dropped, never the connection.
    if let Err(e) = store_message(state, &room, user, &content, None).await {
        state
            .broadcaster
            .send_to(
                client_id,
                &ServerEvent::Error {
                    message: e.to_string(),
                },
            )
            .await;
    }
}

async fn handle_typing(
    state: &AppState,
    client_id: ClientId,
    user: &AuthUser,
    room_slug: &str,
    is_typing: bool,
) {
    // Ephemeral: fan out to everyone but the sender, never persisted.
    state
        .broadcaster
        .broadcast_room(
            room_slug,
            &ServerEvent::Typing {
                room: room_slug.to_string(),
                user: user.username.clone(),
                is_typing,
            },
            Some(client_id),
        )
        .await;
}

/// A disconnect tears down every subscription the connection held and
/// announces the departure to each room. Anything the connection already
/// submitted to the store completes on its own.
async fn handle_disconnect(state: &AppState, client_id: ClientId, user: &AuthUser) {
    let Some(client) = state.broadcaster.unregister(client_id).await else {
        return;
    };

    for room in &client.subscribed_rooms {
        state
            .broadcaster
            .broadcast_room(
                room,
                &ServerEvent::Presence {
                    room: room.clone(),
                    msg: format!("{} left the room", user.username),
                },
                None,
            )
            .await;
    }
}

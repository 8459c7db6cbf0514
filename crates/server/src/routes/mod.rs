pub mod invites;
pub mod members;
pub mod messages;
pub mod requests;
pub mod rooms;

use crate::ws;
use crate::AppState;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Rooms
        .route("/rooms", post(rooms::create_room))
        .route("/rooms", get(rooms::list_rooms))
        .route("/rooms/public", get(rooms::list_public_rooms))
        .route("/rooms/{slug}", get(rooms::get_room))
        .route("/rooms/{slug}", delete(rooms::delete_room))
        // Members
        .route("/rooms/{slug}/members", get(members::list_members))
        .route(
            "/rooms/{slug}/members/{userId}/promote",
            post(members::promote_member),
        )
        .route(
            "/rooms/{slug}/members/{userId}/demote",
            post(members::demote_member),
        )
        .route(
            "/rooms/{slug}/members/{userId}",
            delete(members::remove_member),
        )
        // Invites
        .route("/rooms/{slug}/invites", get(invites::list_invites))
        .route("/rooms/{slug}/invites", post(invites::create_invite))
        .route("/invites/redeem", post(invites::redeem_invite))
        .route("/invites/{inviteId}/revoke", post(invites::revoke_invite))
        .route("/invites/{inviteId}", delete(invites::delete_invite))
        // Access requests
        .route(
            "/rooms/{slug}/request-access",
            post(requests::request_access),
        )
        .route(
            "/rooms/{slug}/access-requests",
            get(requests::list_access_requests),
        )
        .route(
            "/access-requests/{requestId}/approve",
            post(requests::approve_request),
        )
        .route(
            "/access-requests/{requestId}/reject",
            post(requests::reject_request),
        )
        // Messages
        .route("/rooms/{slug}/messages", get(messages::list_messages))
        .route("/rooms/{slug}/messages", post(messages::send_message))
        .route("/messages/{messageId}", patch(messages::edit_message))
        .route("/messages/{messageId}", delete(messages::delete_message));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws::handler::ws_handler))
        .with_state(state)
}

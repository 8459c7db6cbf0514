mod invite;
mod message;
mod request;
mod room;

pub use invite::*;
pub use message::*;
pub use request::*;
pub use room::*;

/// Authenticated identity resolved by the session extractor. The identity
/// subsystem itself (registration, credentials) lives outside this service.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

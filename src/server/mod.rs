mod anisette;
mod apple;
mod auth;
mod error;

pub use anisette::{AnisetteData, RemoteAnisetteProvider};
pub use apple::AppleReportsServer;
pub use auth::Auth;
pub use error::{AuthError, TransportError};

#[cfg(test)]
pub(crate) mod test_server;

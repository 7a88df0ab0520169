//! # Scrimnet
//!
//! Lobby orchestration and team-formation service for competitive scrims.
//!
//! Players gather in code-addressed lobbies over WebSocket, form teams by
//! snake draft or auction, play, and have their ELO ratings updated when
//! the host declares a result. The server is authoritative: clients send
//! intents, the service validates them against the lobby phase machine,
//! and every member receives the resulting events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scrimnet::prelude::*;
//! use scrimnet_lobby::AlwaysPresent;
//! use scrimnet_rating::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ScrimnetError> {
//!     scrimnet::init_tracing();
//!     let server = ScrimnetServer::<AlwaysPresent, MemoryStore>::builder()
//!         .bind("0.0.0.0:8080")
//!         .build(AlwaysPresent, MemoryStore::new())
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::ScrimnetError;
pub use server::{ScrimnetServer, ScrimnetServerBuilder};

/// Installs the global tracing subscriber, filtered by `RUST_LOG`
/// (default `info`). Call once at startup.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Common imports for building and running a server.
pub mod prelude {
    pub use crate::{ScrimnetError, ScrimnetServer, ScrimnetServerBuilder};
    pub use scrimnet_lobby::{LobbyConfig, PresenceProvider};
    pub use scrimnet_protocol::{ClientIntent, ServerEvent};
    pub use scrimnet_rating::RatingStore;
}

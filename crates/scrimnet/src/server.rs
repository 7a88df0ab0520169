//! `ScrimnetServer` builder and accept loop.
//!
//! This is the entry point for running the lobby service. It ties the
//! layers together: transport → protocol → registry → lobby actors.

use std::sync::Arc;

use tokio::sync::Mutex;

use scrimnet_lobby::{LobbyConfig, LobbyRegistry, PresenceProvider};
use scrimnet_protocol::JsonCodec;
use scrimnet_rating::RatingStore;
use scrimnet_transport::{Listener, WsListener};

use crate::ScrimnetError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<P: PresenceProvider, S: RatingStore> {
    pub(crate) registry: Mutex<LobbyRegistry<P, S>>,
    pub(crate) codec: JsonCodec,
}

/// Builder for configuring and starting a Scrimnet server.
///
/// # Example
///
/// ```rust,ignore
/// use scrimnet::prelude::*;
///
/// let server = ScrimnetServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(AlwaysPresent, MemoryStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct ScrimnetServerBuilder {
    bind_addr: String,
    lobby_config: LobbyConfig,
}

impl ScrimnetServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            lobby_config: LobbyConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the lobby configuration.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Builds the server with the given presence provider and profile
    /// store. Uses `JsonCodec` over WebSocket — the format the web client
    /// speaks.
    pub async fn build<P: PresenceProvider, S: RatingStore>(
        self,
        presence: P,
        store: S,
    ) -> Result<ScrimnetServer<P, S>, ScrimnetError> {
        let listener = WsListener::bind(&self.bind_addr).await?;

        let registry =
            LobbyRegistry::new(Arc::new(presence), Arc::new(store), self.lobby_config);
        let state = Arc::new(ServerState {
            registry: Mutex::new(registry),
            codec: JsonCodec,
        });

        Ok(ScrimnetServer { listener, state })
    }
}

impl Default for ScrimnetServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Scrimnet server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ScrimnetServer<P: PresenceProvider, S: RatingStore> {
    listener: WsListener,
    state: Arc<ServerState<P, S>>,
}

impl<P: PresenceProvider, S: RatingStore> ScrimnetServer<P, S> {
    /// Creates a new builder.
    pub fn builder() -> ScrimnetServerBuilder {
        ScrimnetServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ScrimnetError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop: one handler task per connection, until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), ScrimnetError> {
        tracing::info!("Scrimnet server running");

        loop {
            match self.listener.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

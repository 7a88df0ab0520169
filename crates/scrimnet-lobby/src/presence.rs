//! The voice-presence collaborator seam.
//!
//! Whether members are actually sitting in the voice channel is decided by
//! an external service; the core only asks. Public lobbies require full
//! presence before team formation can start.

#![allow(async_fn_in_trait)]

use scrimnet_protocol::{LobbyCode, PlayerId};

/// Queries which lobby members are currently present in voice.
pub trait PresenceProvider: Send + Sync + 'static {
    /// Returns the subset of `members` reporting present.
    fn players_present(
        &self,
        lobby: &LobbyCode,
        members: &[PlayerId],
    ) -> impl std::future::Future<Output = Vec<PlayerId>> + Send;
}

/// Presence provider that reports everyone present. Used for development
/// and for deployments without a voice integration.
pub struct AlwaysPresent;

impl PresenceProvider for AlwaysPresent {
    async fn players_present(&self, _lobby: &LobbyCode, members: &[PlayerId]) -> Vec<PlayerId> {
        members.to_vec()
    }
}

//! Lobby registry: creates, tracks, and routes players to lobbies.
//!
//! This is the entry point for everything above the lobby layer. It owns
//! the code→handle table, the player→lobby index (one lobby per player at
//! a time), and the cross-lobby ledgers. Lobby state itself lives inside
//! the actors; the registry only routes.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;

use scrimnet_protocol::{
    ClientIntent, DraftMode, LobbyCode, LobbyPlayer, Phase, PlayerId, PublicLobby, UserData,
};
use scrimnet_rating::{DEFAULT_ELO, MatchFinalizer, RatingStore};

use crate::actor::{
    EventSender, LobbyDeps, LobbyHandle, PlayerIndex, SharedImmunity, SharedTimeouts, spawn_lobby,
};
use crate::{
    ImmunityLedger, Lobby, LobbyConfig, LobbyError, PresenceProvider, TimeoutLedger, code,
};

/// Largest lobby a host can configure.
const MAX_LOBBY_SIZE: usize = 32;

/// Manages all active lobbies.
pub struct LobbyRegistry<P, S> {
    lobbies: HashMap<LobbyCode, LobbyHandle>,
    /// Which lobby each player is in. Shared with the actors, which keep
    /// it current as members come and go.
    index: PlayerIndex,
    timeouts: SharedTimeouts,
    immunity: SharedImmunity,
    presence: Arc<P>,
    store: Arc<S>,
    finalizer: Arc<MatchFinalizer<S>>,
    config: LobbyConfig,
    rng: StdRng,
}

impl<P: PresenceProvider, S: RatingStore> LobbyRegistry<P, S> {
    pub fn new(presence: Arc<P>, store: Arc<S>, config: LobbyConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            lobbies: HashMap::new(),
            index: Arc::new(Mutex::new(HashMap::new())),
            timeouts: Arc::new(Mutex::new(TimeoutLedger::new())),
            immunity: Arc::new(Mutex::new(ImmunityLedger::new())),
            finalizer: Arc::new(MatchFinalizer::new(Arc::clone(&store))),
            presence,
            store,
            config,
            rng,
        }
    }

    /// Creates a lobby with `user` as host and joins them to it.
    pub async fn create(
        &mut self,
        user: UserData,
        max_players: usize,
        is_public: bool,
        is_ranked: bool,
        draft_mode: DraftMode,
        sender: EventSender,
    ) -> Result<LobbyCode, LobbyError> {
        self.check_timeout(&user.odiscord_id).await?;
        self.check_not_in_lobby(&user.odiscord_id).await?;
        if !(2..=MAX_LOBBY_SIZE).contains(&max_players) {
            return Err(LobbyError::InvalidMaxPlayers(max_players));
        }

        let code = self.unique_code();
        let host = self.lobby_player(user).await;
        let lobby = Lobby::new(
            code.clone(),
            host.clone(),
            max_players,
            is_public,
            is_ranked,
            draft_mode,
            self.config.clone(),
        );
        let handle = spawn_lobby(lobby, self.config.clone(), self.deps());
        handle.join(host, sender).await?;
        self.lobbies.insert(code.clone(), handle);
        tracing::info!(%code, max_players, is_public, "lobby created");
        Ok(code)
    }

    /// Joins (or, within the grace window, rejoins) a lobby by code.
    pub async fn join(
        &mut self,
        raw_code: &LobbyCode,
        user: UserData,
        sender: EventSender,
    ) -> Result<LobbyCode, LobbyError> {
        let code = LobbyCode::normalized(raw_code.as_str());
        self.check_timeout(&user.odiscord_id).await?;

        let current = self.index.lock().await.get(&user.odiscord_id).cloned();
        if let Some(current) = current {
            if current == code {
                let handle = self
                    .lobbies
                    .get(&code)
                    .ok_or_else(|| LobbyError::NotFound(code.clone()))?;
                handle.rejoin(user.odiscord_id, sender).await?;
                return Ok(code);
            }
            return Err(LobbyError::AlreadyInLobby(user.odiscord_id));
        }

        let handle = self
            .lobbies
            .get(&code)
            .ok_or_else(|| LobbyError::NotFound(code.clone()))?
            .clone();
        let player = self.lobby_player(user).await;
        match handle.join(player, sender).await {
            Ok(()) => Ok(code),
            Err(LobbyError::Unavailable(_)) => {
                self.prune(&code).await;
                Err(LobbyError::NotFound(code))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolves the lobby actor handling an intent from `sender`.
    ///
    /// Most intents carry a `lobbyId`; `timeoutPlayer` does not and is
    /// routed to the sender's own lobby. Callers should await the actor's
    /// reply on the returned handle without holding the registry: lobby
    /// work can be slow (match finalization retries storage with backoff)
    /// and must not stall every other connection behind the registry lock.
    pub async fn target(
        &self,
        sender: &PlayerId,
        intent: &ClientIntent,
    ) -> Result<LobbyHandle, LobbyError> {
        let code = match intent_lobby(intent) {
            Some(code) => LobbyCode::normalized(code.as_str()),
            None => self
                .index
                .lock()
                .await
                .get(sender)
                .cloned()
                .ok_or_else(|| LobbyError::NotInLobby(sender.clone()))?,
        };
        self.lobbies
            .get(&code)
            .cloned()
            .ok_or(LobbyError::NotFound(code))
    }

    /// Routes a lobby-scoped intent from `sender` to the right actor and
    /// waits for the reply. Convenience over [`target`] for callers that
    /// own the registry outright.
    ///
    /// [`target`]: Self::target
    pub async fn route(
        &mut self,
        sender: &PlayerId,
        intent: ClientIntent,
    ) -> Result<(), LobbyError> {
        let handle = self.target(sender, &intent).await?;
        match handle.intent(sender.clone(), intent).await {
            Err(LobbyError::Unavailable(code)) => {
                self.prune(&code).await;
                Err(LobbyError::NotFound(code))
            }
            other => other,
        }
    }

    /// A player's connection dropped; their lobby starts the grace timer.
    pub async fn disconnected(&self, player: &PlayerId) {
        let code = self.index.lock().await.get(player).cloned();
        if let Some(code) = code {
            if let Some(handle) = self.lobbies.get(&code) {
                handle.disconnected(player.clone()).await;
            }
        }
    }

    /// Public lobbies still accepting joiners, for the browse page.
    /// Lobbies whose actors are gone are pruned as a side effect.
    pub async fn public_lobbies(&mut self) -> Vec<PublicLobby> {
        let mut listed = Vec::new();
        let mut dead = Vec::new();
        for (code, handle) in &self.lobbies {
            match handle.info().await {
                Ok(info) if info.is_public && info.phase == Phase::Waiting => {
                    listed.push(PublicLobby {
                        code: info.code,
                        player_count: info.player_count,
                        max_players: info.max_players,
                        phase: info.phase,
                        is_ranked: info.is_ranked,
                    });
                }
                Ok(_) => {}
                Err(_) => dead.push(code.clone()),
            }
        }
        for code in dead {
            self.prune(&code).await;
        }
        listed
    }

    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    // -- Internals ---------------------------------------------------------

    async fn check_timeout(&self, player: &PlayerId) -> Result<(), LobbyError> {
        if let Some(mins) = self.timeouts.lock().await.remaining_mins(player) {
            return Err(LobbyError::TimedOut { mins });
        }
        Ok(())
    }

    async fn check_not_in_lobby(&self, player: &PlayerId) -> Result<(), LobbyError> {
        if self.index.lock().await.contains_key(player) {
            return Err(LobbyError::AlreadyInLobby(player.clone()));
        }
        Ok(())
    }

    /// Display rating snapshot from the profile store; new players (or an
    /// unreachable store) fall back to the default.
    async fn lobby_player(&self, user: UserData) -> LobbyPlayer {
        let elo = match self.store.profile(&user.odiscord_id).await {
            Ok(Some(profile)) => profile.elo,
            Ok(None) => DEFAULT_ELO,
            Err(e) => {
                tracing::warn!(player = %user.odiscord_id, error = %e, "profile fetch failed, using default rating");
                DEFAULT_ELO
            }
        };
        LobbyPlayer {
            odiscord_id: user.odiscord_id,
            username: user.username,
            avatar: user.avatar,
            elo,
        }
    }

    fn unique_code(&mut self) -> LobbyCode {
        loop {
            let candidate = code::generate_code(&mut self.rng);
            if !self.lobbies.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn deps(&self) -> LobbyDeps<P, S> {
        LobbyDeps {
            presence: Arc::clone(&self.presence),
            finalizer: Arc::clone(&self.finalizer),
            timeouts: Arc::clone(&self.timeouts),
            immunity: Arc::clone(&self.immunity),
            index: Arc::clone(&self.index),
        }
    }

    /// Drops a lobby whose actor is gone: the handle and every index
    /// entry still pointing at it.
    pub async fn prune(&mut self, code: &LobbyCode) {
        tracing::warn!(%code, "pruning unreachable lobby");
        self.lobbies.remove(code);
        self.index.lock().await.retain(|_, c| c != code);
    }
}

fn intent_lobby(intent: &ClientIntent) -> Option<&LobbyCode> {
    use ClientIntent::*;
    match intent {
        LeaveLobby { lobby_id }
        | KickPlayer { lobby_id, .. }
        | WhitelistPlayer { lobby_id, .. }
        | UnwhitelistPlayer { lobby_id, .. }
        | SetTeamColors { lobby_id, .. }
        | StartCaptainSelect { lobby_id }
        | SelectCaptain { lobby_id, .. }
        | RemoveCaptain { lobby_id, .. }
        | DraftPick { lobby_id, .. }
        | PlaceBid { lobby_id, .. }
        | AddScore { lobby_id, .. }
        | DeclareWinner { lobby_id, .. }
        | ResetLobby { lobby_id }
        | CloseLobby { lobby_id }
        | CheckVcStatus { lobby_id } => Some(lobby_id),
        CreateLobby { .. } | JoinLobby { .. } | TimeoutPlayer { .. } | GetPublicLobbies => None,
    }
}

// =========================================================================
// Tests
// =========================================================================

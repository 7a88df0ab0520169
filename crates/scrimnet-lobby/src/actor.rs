//! Lobby actor: an isolated Tokio task that owns one lobby.
//!
//! Each lobby runs in its own task and is mutated only through its command
//! channel, which serializes concurrent actions (no double-picks, no
//! double-bids). The actor also owns every timer that can change lobby
//! state autonomously — the auction deadline, the purge ticker, and the
//! reconnect-grace sweep — so a timer can never fire against a lobby that
//! no longer exists.

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::Instant;

use scrimnet_protocol::{
    ClientIntent, LobbyCode, LobbyPlayer, Phase, PlayerId, Recipient, ServerEvent, Winner,
};
use scrimnet_rating::{MatchFinalizer, RatingStore};

use crate::lobby::{Events, StartRoute};
use crate::{
    ImmunityLedger, Lobby, LobbyConfig, LobbyError, PresenceProvider, TimeoutLedger,
};

/// Channel for delivering server events to one member's connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Which lobby each player is currently in. Shared between the registry
/// (join-conflict checks) and the actors (membership changes).
pub(crate) type PlayerIndex = Arc<Mutex<HashMap<PlayerId, LobbyCode>>>;

pub(crate) type SharedTimeouts = Arc<Mutex<TimeoutLedger>>;
pub(crate) type SharedImmunity = Arc<Mutex<ImmunityLedger>>;

/// Commands sent to a lobby actor through its channel.
pub(crate) enum LobbyCommand {
    /// Add a new member.
    Join {
        player: LobbyPlayer,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// Reattach a member who reconnected within the grace window.
    Rejoin {
        player_id: PlayerId,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// A lobby-scoped client intent from a member.
    Intent {
        sender: PlayerId,
        intent: ClientIntent,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// A member's connection dropped; start their grace timer.
    Disconnected { player_id: PlayerId },

    /// Metadata for registry listings.
    Info { reply: oneshot::Sender<LobbyInfo> },

    /// Shut the lobby down.
    Close { reason: String },
}

/// A snapshot of lobby metadata for the public listing.
#[derive(Debug, Clone)]
pub struct LobbyInfo {
    pub code: LobbyCode,
    pub player_count: usize,
    pub max_players: usize,
    pub phase: Phase,
    pub is_public: bool,
    pub is_ranked: bool,
}

/// Handle to a running lobby actor. Cheap to clone.
#[derive(Clone)]
pub struct LobbyHandle {
    code: LobbyCode,
    sender: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    pub async fn join(&self, player: LobbyPlayer, sender: EventSender) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(LobbyCommand::Join {
                player,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?
    }

    pub async fn rejoin(
        &self,
        player_id: PlayerId,
        sender: EventSender,
    ) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(LobbyCommand::Rejoin {
                player_id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?
    }

    pub async fn intent(&self, sender: PlayerId, intent: ClientIntent) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(LobbyCommand::Intent {
                sender,
                intent,
                reply: reply_tx,
            })
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?
    }

    pub async fn disconnected(&self, player_id: PlayerId) {
        let _ = self
            .sender
            .send(LobbyCommand::Disconnected { player_id })
            .await;
    }

    pub async fn info(&self) -> Result<LobbyInfo, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(LobbyCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.code.clone()))
    }

    pub async fn close(&self, reason: impl Into<String>) {
        let _ = self
            .sender
            .send(LobbyCommand::Close {
                reason: reason.into(),
            })
            .await;
    }
}

/// Sleeps until `deadline`, or pends forever when no deadline is armed so
/// the `select!` loop simply ignores that branch.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

/// The internal lobby actor. Runs inside a Tokio task.
struct LobbyActor<P, S> {
    lobby: Lobby,
    config: LobbyConfig,
    senders: HashMap<PlayerId, EventSender>,
    receiver: mpsc::Receiver<LobbyCommand>,
    presence: Arc<P>,
    finalizer: Arc<MatchFinalizer<S>>,
    timeouts: SharedTimeouts,
    immunity: SharedImmunity,
    index: PlayerIndex,
    rng: StdRng,
    auction_deadline: Option<Instant>,
    purge_deadline: Option<Instant>,
    /// Grace deadlines for disconnected members.
    grace: HashMap<PlayerId, Instant>,
}

impl<P: PresenceProvider, S: RatingStore> LobbyActor<P, S> {
    async fn run(mut self) {
        tracing::info!(code = %self.lobby.code(), "lobby actor started");

        let reason = loop {
            let grace_deadline = self.next_grace_deadline();
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => {
                        if let Some(reason) = self.handle_command(cmd).await {
                            break reason;
                        }
                    }
                    None => break "registry dropped".to_string(),
                },
                _ = wait_until(self.auction_deadline) => self.on_auction_deadline(),
                _ = wait_until(self.purge_deadline) => self.on_purge_deadline().await,
                _ = wait_until(grace_deadline) => {
                    if let Some(reason) = self.on_grace_expiry().await {
                        break reason;
                    }
                }
            }
        };

        self.shutdown(reason).await;
    }

    async fn handle_command(&mut self, cmd: LobbyCommand) -> Option<String> {
        match cmd {
            LobbyCommand::Join {
                player,
                sender,
                reply,
            } => {
                let id = player.odiscord_id.clone();
                match self.lobby.add_member(player) {
                    Ok(events) => {
                        self.senders.insert(id.clone(), sender);
                        self.index.lock().await.insert(id, self.lobby.code().clone());
                        self.dispatch(events);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
                None
            }

            LobbyCommand::Rejoin {
                player_id,
                sender,
                reply,
            } => {
                match self.lobby.mark_rejoined(&player_id) {
                    Ok(events) => {
                        self.senders.insert(player_id.clone(), sender);
                        self.grace.remove(&player_id);
                        self.dispatch(events);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
                None
            }

            LobbyCommand::Intent {
                sender,
                intent,
                reply,
            } => match self.handle_intent(&sender, intent).await {
                Ok(close) => {
                    self.sync_timers();
                    let _ = reply.send(Ok(()));
                    close
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                    None
                }
            },

            LobbyCommand::Disconnected { player_id } => {
                if self.lobby.mark_disconnected(&player_id) {
                    tracing::info!(code = %self.lobby.code(), player = %player_id, "member disconnected, grace started");
                    self.senders.remove(&player_id);
                    self.grace
                        .insert(player_id, Instant::now() + self.lobby.reconnect_grace());
                }
                None
            }

            LobbyCommand::Info { reply } => {
                let _ = reply.send(LobbyInfo {
                    code: self.lobby.code().clone(),
                    player_count: self.lobby.member_count(),
                    max_players: self.lobby.max_players(),
                    phase: self.lobby.phase(),
                    is_public: self.lobby.is_public(),
                    is_ranked: self.lobby.is_ranked(),
                });
                None
            }

            LobbyCommand::Close { reason } => Some(reason),
        }
    }

    /// Handles one lobby-scoped intent. `Ok(Some(reason))` closes the
    /// lobby after the reply.
    async fn handle_intent(
        &mut self,
        sender: &PlayerId,
        intent: ClientIntent,
    ) -> Result<Option<String>, LobbyError> {
        match intent {
            ClientIntent::LeaveLobby { .. } => {
                let was_host = self.lobby.is_host(sender);
                let events = self.lobby.remove_member(sender)?;
                self.dispatch(events);
                self.cleanup_member(sender).await;
                if was_host {
                    return Ok(Some("host left".into()));
                }
                if self.lobby.member_count() == 0 {
                    return Ok(Some("lobby empty".into()));
                }
                Ok(None)
            }

            ClientIntent::KickPlayer { odiscord_id, .. } => {
                let events = self.lobby.kick(sender, &odiscord_id)?;
                self.dispatch(events);
                self.cleanup_member(&odiscord_id).await;
                Ok(None)
            }

            ClientIntent::WhitelistPlayer { odiscord_id, .. } => {
                let events = self.lobby.whitelist_add(sender, odiscord_id)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::UnwhitelistPlayer { odiscord_id, .. } => {
                let events = self.lobby.whitelist_remove(sender, &odiscord_id)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::TimeoutPlayer {
                odiscord_id,
                duration,
                reason,
            } => {
                let events = self.lobby.timeout_member(sender, &odiscord_id, duration)?;
                self.timeouts
                    .lock()
                    .await
                    .insert(odiscord_id.clone(), duration, reason);
                self.dispatch(events);
                self.cleanup_member(&odiscord_id).await;
                Ok(None)
            }

            ClientIntent::SetTeamColors {
                team1_color,
                team2_color,
                ..
            } => {
                let events = self.lobby.set_colors(sender, team1_color, team2_color)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::StartCaptainSelect { .. } => {
                let present = if self.lobby.is_public() {
                    self.presence
                        .players_present(self.lobby.code(), &self.lobby.member_ids())
                        .await
                } else {
                    self.lobby.member_ids()
                };
                match self.lobby.begin_start(sender, &present)? {
                    StartRoute::CaptainSelect => {
                        let events = self.lobby.enter_captain_select();
                        self.dispatch(events);
                    }
                    StartRoute::Purge { .. } => {
                        let immune = {
                            let mut ledger = self.immunity.lock().await;
                            self.lobby
                                .member_ids()
                                .into_iter()
                                .filter(|m| ledger.consume(m))
                                .collect()
                        };
                        let events = self.lobby.enter_purge(immune);
                        self.dispatch(events);
                        self.purge_deadline =
                            Some(Instant::now() + self.config.purge_countdown);
                    }
                }
                Ok(None)
            }

            ClientIntent::SelectCaptain { odiscord_id, .. } => {
                let (events, _mode) = self.lobby.select_captain(sender, &odiscord_id)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::RemoveCaptain { odiscord_id, .. } => {
                let events = self.lobby.remove_captain(sender, &odiscord_id)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::DraftPick { odiscord_id, .. } => {
                let events = self.lobby.draft_pick(sender, &odiscord_id)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::PlaceBid { amount, .. } => {
                let events = self.lobby.place_bid(sender, amount)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::AddScore { team, .. } => {
                let (events, winner) = self.lobby.add_score(sender, team)?;
                self.dispatch(events);
                if let Some(winner) = winner {
                    self.finalize(sender, winner).await?;
                }
                Ok(None)
            }

            ClientIntent::DeclareWinner { winner_team, .. } => {
                self.finalize(sender, winner_team).await?;
                Ok(None)
            }

            ClientIntent::ResetLobby { .. } => {
                let events = self.lobby.reset(sender)?;
                self.dispatch(events);
                Ok(None)
            }

            ClientIntent::CloseLobby { .. } => {
                self.lobby.require_host(sender)?;
                Ok(Some("closed by host".into()))
            }

            ClientIntent::CheckVcStatus { .. } => {
                let present = self
                    .presence
                    .players_present(self.lobby.code(), &self.lobby.member_ids())
                    .await;
                let events = self.lobby.vc_status(present);
                self.dispatch(events);
                Ok(None)
            }

            // Registry-level intents never reach a lobby actor.
            ClientIntent::CreateLobby { .. }
            | ClientIntent::JoinLobby { .. }
            | ClientIntent::GetPublicLobbies => Err(LobbyError::Unsupported),
        }
    }

    /// Runs the match finalizer and, on success, advances to `finished`.
    /// On failure the error propagates to the caller and the lobby stays
    /// in `playing`.
    async fn finalize(&mut self, host: &PlayerId, winner: Winner) -> Result<(), LobbyError> {
        let outcome = self.lobby.match_outcome(host, winner)?;
        let record = self.finalizer.finalize(outcome).await?;
        let events = self.lobby.finish_match(record.id);
        self.dispatch(events);
        Ok(())
    }

    /// Re-derives timer state from the lobby after a command. A member
    /// leaving mid-formation aborts back to `waiting`, and any timer armed
    /// for the abandoned sub-state has to be dropped with it.
    fn sync_timers(&mut self) {
        if self.lobby.phase() != Phase::Purging {
            self.purge_deadline = None;
        }
        self.auction_deadline = self.lobby.auction_deadline();
    }

    fn on_auction_deadline(&mut self) {
        match self.lobby.close_auction_window() {
            Ok((events, _progress)) => {
                self.dispatch(events);
                self.auction_deadline = self.lobby.auction_deadline();
            }
            Err(e) => {
                tracing::warn!(code = %self.lobby.code(), error = %e, "auction deadline without active window");
                self.auction_deadline = None;
            }
        }
    }

    async fn on_purge_deadline(&mut self) {
        let (victim, events) = self.lobby.purge_eliminate(&mut self.rng);
        self.dispatch(events);
        if let Some(victim) = victim {
            // Every eliminated player earns a token for their next purge.
            self.immunity.lock().await.grant(victim.clone());
            self.cleanup_member(&victim).await;
        }

        if self.lobby.phase() != Phase::Purging {
            // The formation aborted out from under the countdown.
            self.purge_deadline = None;
        } else if self.lobby.purge_complete() {
            let events = self.lobby.finish_purge();
            self.dispatch(events);
            self.purge_deadline = None;
        } else {
            self.purge_deadline = Some(Instant::now() + self.config.purge_step);
        }
    }

    fn next_grace_deadline(&self) -> Option<Instant> {
        self.grace.values().min().copied()
    }

    /// Expires one lapsed grace entry per call; the loop re-selects for
    /// the rest. A lapsed host closes the lobby.
    async fn on_grace_expiry(&mut self) -> Option<String> {
        let now = Instant::now();
        let expired = self
            .grace
            .iter()
            .find(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| id.clone())?;

        tracing::info!(code = %self.lobby.code(), player = %expired, "reconnect grace expired");
        if self.lobby.is_host(&expired) {
            return Some("host left".into());
        }

        match self.lobby.remove_member(&expired) {
            Ok(events) => self.dispatch(events),
            Err(e) => {
                tracing::warn!(code = %self.lobby.code(), error = %e, "grace expiry for non-member")
            }
        }
        self.cleanup_member(&expired).await;
        self.sync_timers();
        if self.lobby.member_count() == 0 {
            return Some("lobby empty".into());
        }
        None
    }

    async fn cleanup_member(&mut self, player: &PlayerId) {
        self.senders.remove(player);
        self.grace.remove(player);
        let mut index = self.index.lock().await;
        if index.get(player) == Some(self.lobby.code()) {
            index.remove(player);
        }
    }

    /// Delivers events to the right member channels. Sends are
    /// fire-and-forget; a gone receiver is a disconnect in flight.
    fn dispatch(&self, events: Events) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(id) => {
                    if let Some(sender) = self.senders.get(&id) {
                        let _ = sender.send(event);
                    }
                }
                Recipient::AllExcept(excluded) => {
                    for (id, sender) in &self.senders {
                        if *id != excluded {
                            let _ = sender.send(event.clone());
                        }
                    }
                }
            }
        }
    }

    async fn shutdown(self, reason: String) {
        tracing::info!(code = %self.lobby.code(), %reason, "lobby closed");
        let event = ServerEvent::LobbyClosed {
            reason: reason.clone(),
        };
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }

        let mut index = self.index.lock().await;
        for id in self.lobby.member_ids() {
            if index.get(&id) == Some(self.lobby.code()) {
                index.remove(&id);
            }
        }
    }
}

/// Arguments shared by every lobby the registry spawns.
pub(crate) struct LobbyDeps<P, S> {
    pub presence: Arc<P>,
    pub finalizer: Arc<MatchFinalizer<S>>,
    pub timeouts: SharedTimeouts,
    pub immunity: SharedImmunity,
    pub index: PlayerIndex,
}

/// Spawns a lobby actor task and returns the handle to command it.
pub(crate) fn spawn_lobby<P: PresenceProvider, S: RatingStore>(
    lobby: Lobby,
    config: LobbyConfig,
    deps: LobbyDeps<P, S>,
) -> LobbyHandle {
    let code = lobby.code().clone();
    let (tx, rx) = mpsc::channel(config.channel_size);

    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let actor = LobbyActor {
        lobby,
        config,
        senders: HashMap::new(),
        receiver: rx,
        presence: deps.presence,
        finalizer: deps.finalizer,
        timeouts: deps.timeouts,
        immunity: deps.immunity,
        index: deps.index,
        rng,
        auction_deadline: None,
        purge_deadline: None,
        grace: HashMap::new(),
    };

    tokio::spawn(actor.run());

    LobbyHandle { code, sender: tx }
}

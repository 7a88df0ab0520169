//! Per-connection handler: intent decoding, routing, and the event pump.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Loop: decode `ClientIntent` frames from the socket
//!   2. `createLobby`/`joinLobby` bind the connection to a player and hand
//!      the lobby an event channel
//!   3. Everything else routes through the registry to the lobby actor
//!   4. Broadcast events arriving on the channel are pumped back out
//!   5. On drop, the player's lobby starts its reconnect grace timer

use std::sync::Arc;

use tokio::sync::mpsc;

use scrimnet_lobby::{LobbyError, PresenceProvider};
use scrimnet_protocol::{ClientIntent, Codec, PlayerId, ServerEvent};
use scrimnet_rating::RatingStore;
use scrimnet_transport::{Connection, WsConnection};

use crate::ScrimnetError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<P, S>(
    conn: WsConnection,
    state: Arc<ServerState<P, S>>,
) -> Result<(), ScrimnetError>
where
    P: PresenceProvider,
    S: RatingStore,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // The handler keeps one sender so the channel survives lobby churn;
    // clones go to whichever lobby the player is in.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut player: Option<PlayerId> = None;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                // recv is infallible while we hold event_tx.
                if let Some(event) = event {
                    let bytes = state.codec.encode(&event)?;
                    if conn.send(&bytes).await.is_err() {
                        break;
                    }
                }
            }

            incoming = conn.recv() => {
                let data = match incoming {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };

                let intent: ClientIntent = match state.codec.decode(&data) {
                    Ok(intent) => intent,
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "failed to decode intent");
                        let event = ServerEvent::error(format!("invalid message: {e}"));
                        let bytes = state.codec.encode(&event)?;
                        let _ = conn.send(&bytes).await;
                        continue;
                    }
                };

                if let Err(e) =
                    dispatch_intent(&state, &event_tx, &mut player, intent).await
                {
                    let bytes = state.codec.encode(&ServerEvent::error(e))?;
                    if conn.send(&bytes).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    // The lobby keeps the seat warm for the reconnect grace window.
    if let Some(player) = player {
        tracing::info!(%conn_id, %player, "connection dropped");
        state.registry.lock().await.disconnected(&player).await;
    }
    Ok(())
}

/// Routes one decoded intent. Returns a client-facing message on
/// rejection; lobby state is unchanged in that case.
async fn dispatch_intent<P, S>(
    state: &Arc<ServerState<P, S>>,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
    player: &mut Option<PlayerId>,
    intent: ClientIntent,
) -> Result<(), String>
where
    P: PresenceProvider,
    S: RatingStore,
{
    match intent {
        ClientIntent::CreateLobby {
            user_data,
            max_players,
            is_public,
            is_ranked,
            draft_mode,
        } => {
            let id = user_data.odiscord_id.clone();
            state
                .registry
                .lock()
                .await
                .create(
                    user_data,
                    max_players,
                    is_public,
                    is_ranked,
                    draft_mode,
                    event_tx.clone(),
                )
                .await
                .map_err(|e| e.to_string())?;
            *player = Some(id);
            Ok(())
        }

        ClientIntent::JoinLobby { code, user_data } => {
            let id = user_data.odiscord_id.clone();
            state
                .registry
                .lock()
                .await
                .join(&code, user_data, event_tx.clone())
                .await
                .map_err(|e| e.to_string())?;
            *player = Some(id);
            Ok(())
        }

        ClientIntent::GetPublicLobbies => {
            let lobbies = state.registry.lock().await.public_lobbies().await;
            // Through the event channel so it serializes with broadcasts.
            let _ = event_tx.send(ServerEvent::LobbiesUpdate { lobbies });
            Ok(())
        }

        other => {
            let Some(sender) = player.as_ref() else {
                return Err("create or join a lobby first".into());
            };
            // Resolve the handle under the lock, then release it before
            // awaiting the actor: a finalization can retry storage for
            // most of a second, and the registry must stay available to
            // every other connection meanwhile.
            let handle = state
                .registry
                .lock()
                .await
                .target(sender, &other)
                .await
                .map_err(|e| e.to_string())?;
            match handle.intent(sender.clone(), other).await {
                Err(LobbyError::Unavailable(code)) => {
                    state.registry.lock().await.prune(&code).await;
                    Err(LobbyError::NotFound(code).to_string())
                }
                reply => reply.map_err(|e| e.to_string()),
            }
        }
    }
}

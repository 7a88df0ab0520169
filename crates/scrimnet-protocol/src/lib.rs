//! Wire protocol for Scrimnet.
//!
//! Defines the vocabulary the lobby service and its clients share:
//!
//! - **Identifiers and enums** ([`PlayerId`], [`LobbyCode`], [`TeamId`],
//!   [`Phase`], [`DraftMode`], [`Winner`]).
//! - **Intents** ([`ClientIntent`]) — what clients may ask for.
//! - **Events** ([`ServerEvent`]) — what the service pushes back.
//! - **Snapshots** ([`LobbySnapshot`]) — the full lobby state broadcast
//!   after every mutation.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — byte-level framing.
//!
//! This crate knows nothing about sockets, lobbies, or ratings; it only
//! fixes the JSON shapes the presentational client depends on.

mod codec;
mod error;
mod event;
mod intent;
mod snapshot;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use event::ServerEvent;
pub use intent::ClientIntent;
pub use snapshot::{
    AuctionSale, AuctionSnapshot, Bids, Budgets, LobbyPlayer, LobbySnapshot, PublicLobby,
    PurgeSnapshot, Score, Teams,
};
pub use types::{DraftMode, LobbyCode, Phase, PlayerId, Recipient, TeamId, UserData, Winner};

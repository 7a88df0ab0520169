//! Unified error type for the Scrimnet service.

use scrimnet_lobby::LobbyError;
use scrimnet_protocol::ProtocolError;
use scrimnet_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `scrimnet` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ScrimnetError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby-level error (full, not found, wrong phase, ...).
    #[error(transparent)]
    Lobby(#[from] LobbyError),
}

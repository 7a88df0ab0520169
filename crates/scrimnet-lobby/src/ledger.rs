//! Cross-lobby ledgers: timeouts and purge immunity.
//!
//! Both outlive any single lobby. The registry owns them behind shared
//! locks; lobby actors consult them at join time and during purges.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use scrimnet_protocol::PlayerId;

/// Active player timeouts. A timed-out player cannot join or create any
/// lobby until their entry expires.
#[derive(Debug, Default)]
pub struct TimeoutLedger {
    entries: HashMap<PlayerId, TimeoutEntry>,
}

#[derive(Debug)]
struct TimeoutEntry {
    until: Instant,
    reason: Option<String>,
}

impl TimeoutLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bars a player for `mins` minutes.
    pub fn insert(&mut self, player: PlayerId, mins: u64, reason: Option<String>) {
        tracing::info!(%player, mins, ?reason, "player timed out");
        self.entries.insert(
            player,
            TimeoutEntry {
                until: Instant::now() + Duration::from_secs(mins * 60),
                reason,
            },
        );
    }

    /// Remaining timeout in whole minutes (rounded up), pruning expired
    /// entries as a side effect.
    pub fn remaining_mins(&mut self, player: &PlayerId) -> Option<u64> {
        let entry = self.entries.get(player)?;
        let now = Instant::now();
        if entry.until <= now {
            self.entries.remove(player);
            return None;
        }
        let secs = (entry.until - now).as_secs();
        Some(secs.div_ceil(60).max(1))
    }

    /// The reason recorded for an active timeout, if any.
    pub fn reason(&self, player: &PlayerId) -> Option<&str> {
        self.entries.get(player)?.reason.as_deref()
    }
}

/// One-shot purge immunity tokens.
///
/// Every eliminated player earns a token; it is consumed at the start of
/// their next purge, exempting them from that round only.
#[derive(Debug, Default)]
pub struct ImmunityLedger {
    tokens: HashSet<PlayerId>,
}

impl ImmunityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants a token. Tokens do not stack.
    pub fn grant(&mut self, player: PlayerId) {
        self.tokens.insert(player);
    }

    /// Consumes the player's token if they hold one.
    pub fn consume(&mut self, player: &PlayerId) -> bool {
        self.tokens.remove(player)
    }

    pub fn holds(&self, player: &PlayerId) -> bool {
        self.tokens.contains(player)
    }
}
